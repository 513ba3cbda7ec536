//! Weight-based drug dose calculation.
//!
//! `single = weight * dose_per_kg`, `daily = single * frequency`. A daily total
//! above the policy threshold raises an advisory flag; the calculation itself
//! never refuses a dose.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default advisory ceiling for the daily total (mg/day)
pub const DAILY_THRESHOLD_MG: f64 = 2000.0;

/// Administration frequency
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DoseFrequency {
    OnceDaily,
    TwiceDaily,
    ThreeTimesDaily,
    FourTimesDaily,
}

impl DoseFrequency {
    pub const ALL: [DoseFrequency; 4] = [
        DoseFrequency::OnceDaily,
        DoseFrequency::TwiceDaily,
        DoseFrequency::ThreeTimesDaily,
        DoseFrequency::FourTimesDaily,
    ];

    pub fn per_day(&self) -> u32 {
        match self {
            DoseFrequency::OnceDaily => 1,
            DoseFrequency::TwiceDaily => 2,
            DoseFrequency::ThreeTimesDaily => 3,
            DoseFrequency::FourTimesDaily => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DoseFrequency::OnceDaily => "once daily",
            DoseFrequency::TwiceDaily => "twice daily",
            DoseFrequency::ThreeTimesDaily => "three times daily",
            DoseFrequency::FourTimesDaily => "four times daily",
        }
    }
}

impl fmt::Display for DoseFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DoseFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|f| f.label() == normalized)
            .ok_or_else(|| Error::invalid(format!("unknown dosing frequency: {}", s)))
    }
}

/// Case-insensitive label form; `-` and `_` count as spaces
fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace(|c: char| c == '-' || c == '_', " ")
}

impl TryFrom<u32> for DoseFrequency {
    type Error = Error;

    fn try_from(per_day: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.per_day() == per_day)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "frequency must be 1-4 times per day, got {}",
                    per_day
                ))
            })
    }
}

/// Dose calculator inputs
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseInput {
    pub patient_weight_kg: f64,
    pub dose_per_kg: f64,
    pub frequency_per_day: u32,
}

/// Dose calculator output
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseResult {
    pub single_dose_mg: f64,
    pub daily_dose_mg: f64,
    /// Advisory only; rendered as a warning by the caller
    pub over_threshold: bool,
    /// Ceiling `over_threshold` was judged against
    #[serde(default = "default_daily_threshold_mg")]
    pub threshold_mg: f64,
}

/// One selectable frequency option
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FrequencyOption {
    pub label: String,
    pub per_day: u32,
}

/// Threshold and frequency table used by the dose calculator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DosePolicy {
    #[serde(default = "default_daily_threshold_mg")]
    pub daily_threshold_mg: f64,

    #[serde(default = "default_frequencies")]
    pub frequencies: Vec<FrequencyOption>,
}

impl Default for DosePolicy {
    fn default() -> Self {
        Self {
            daily_threshold_mg: default_daily_threshold_mg(),
            frequencies: default_frequencies(),
        }
    }
}

fn default_daily_threshold_mg() -> f64 {
    DAILY_THRESHOLD_MG
}

fn default_frequencies() -> Vec<FrequencyOption> {
    DoseFrequency::ALL
        .iter()
        .map(|f| FrequencyOption {
            label: f.label().to_string(),
            per_day: f.per_day(),
        })
        .collect()
}

impl DosePolicy {
    /// Check the policy is usable
    ///
    /// Returns a list of problems (empty if valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(self.daily_threshold_mg.is_finite() && self.daily_threshold_mg > 0.0) {
            errors.push(format!(
                "daily_threshold_mg must be positive, got {}",
                self.daily_threshold_mg
            ));
        }
        if self.frequencies.is_empty() {
            errors.push("at least one frequency must be configured".into());
        }
        for option in &self.frequencies {
            if option.per_day == 0 {
                errors.push(format!("frequency '{}' has per_day = 0", option.label));
            }
        }

        errors
    }

    /// Resolve a frequency label to its per-day multiplier
    pub fn frequency(&self, label: &str) -> Result<u32> {
        let wanted = normalize_label(label);
        self.frequencies
            .iter()
            .find(|f| normalize_label(&f.label) == wanted)
            .map(|f| f.per_day)
            .ok_or_else(|| Error::invalid(format!("unknown dosing frequency: {}", label)))
    }

    /// Compute single and daily doses under this policy
    pub fn compute(
        &self,
        patient_weight_kg: f64,
        dose_per_kg: f64,
        frequency_per_day: u32,
    ) -> Result<DoseResult> {
        if !(patient_weight_kg.is_finite() && patient_weight_kg > 0.0) {
            return Err(Error::invalid(format!(
                "patient weight must be positive, got {} kg",
                patient_weight_kg
            )));
        }
        if !(dose_per_kg.is_finite() && dose_per_kg > 0.0) {
            return Err(Error::invalid(format!(
                "dose per kg must be positive, got {} mg/kg",
                dose_per_kg
            )));
        }
        if !self.frequencies.iter().any(|f| f.per_day == frequency_per_day) {
            return Err(Error::invalid(format!(
                "unsupported frequency: {} times per day",
                frequency_per_day
            )));
        }

        let single_dose_mg = patient_weight_kg * dose_per_kg;
        let daily_dose_mg = single_dose_mg * f64::from(frequency_per_day);
        let over_threshold = daily_dose_mg > self.daily_threshold_mg;

        if over_threshold {
            tracing::info!(
                "Daily dose {:.1} mg exceeds threshold {} mg",
                daily_dose_mg,
                self.daily_threshold_mg
            );
        }

        Ok(DoseResult {
            single_dose_mg,
            daily_dose_mg,
            over_threshold,
            threshold_mg: self.daily_threshold_mg,
        })
    }
}

impl DoseInput {
    pub fn compute(&self) -> Result<DoseResult> {
        compute_dose(
            self.patient_weight_kg,
            self.dose_per_kg,
            self.frequency_per_day,
        )
    }
}

/// Compute doses with the default 2000 mg/day threshold and 1-4x frequencies
pub fn compute_dose(
    patient_weight_kg: f64,
    dose_per_kg: f64,
    frequency_per_day: u32,
) -> Result<DoseResult> {
    DosePolicy::default().compute(patient_weight_kg, dose_per_kg, frequency_per_day)
}

//! BMI classification and target-weight calculation.
//!
//! Bands follow the WHO Asia-Pacific cut-offs:
//! - Underweight: below 18.5
//! - Normal: 18.5 up to 23.0
//! - Overweight: 23.0 up to 25.0
//! - Obese class 1: 25.0 up to 30.0
//! - Obese class 2 and above: 30.0 or more
//!
//! Every lower bound is inclusive.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Reference BMI used to derive the target weight
pub const TARGET_BMI: f64 = 22.0;

/// Height bounds (cm) the presentation layer enforces before calling [`classify`]
pub const HEIGHT_RANGE_CM: (f64, f64) = (50.0, 250.0);

/// Weight bounds (kg) the presentation layer enforces before calling [`classify`]
pub const WEIGHT_RANGE_KG: (f64, f64) = (10.0, 300.0);

/// BMI band
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese1,
    Obese2Plus,
}

impl BmiCategory {
    /// All bands in ascending order
    pub const ALL: [BmiCategory; 5] = [
        BmiCategory::Underweight,
        BmiCategory::Normal,
        BmiCategory::Overweight,
        BmiCategory::Obese1,
        BmiCategory::Obese2Plus,
    ];

    /// Band containing the given BMI value
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 23.0 {
            BmiCategory::Normal
        } else if bmi < 25.0 {
            BmiCategory::Overweight
        } else if bmi < 30.0 {
            BmiCategory::Obese1
        } else {
            BmiCategory::Obese2Plus
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese1 => "Obese (class 1)",
            BmiCategory::Obese2Plus => "Obese (class 2+)",
        }
    }

    /// Display color name for this band
    pub fn color(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "blue",
            BmiCategory::Normal => "green",
            BmiCategory::Overweight | BmiCategory::Obese1 => "orange",
            BmiCategory::Obese2Plus => "red",
        }
    }

    /// BMI range text as shown in the reference table
    pub fn range_text(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "< 18.5",
            BmiCategory::Normal => "18.5 - 22.9",
            BmiCategory::Overweight => "23.0 - 24.9",
            BmiCategory::Obese1 => "25.0 - 29.9",
            BmiCategory::Obese2Plus => "≥ 30.0",
        }
    }
}

/// Height and weight as entered by the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnthropometricInput {
    pub height_cm: f64,
    pub weight_kg: f64,
}

impl AnthropometricInput {
    pub fn new(height_cm: f64, weight_kg: f64) -> Self {
        Self {
            height_cm,
            weight_kg,
        }
    }

    /// Check the form bounds (50-250 cm, 10-300 kg)
    ///
    /// [`classify`] itself does not clamp or reject out-of-range values;
    /// callers run this first.
    pub fn validate_range(&self) -> Result<()> {
        check_range("height (cm)", self.height_cm, HEIGHT_RANGE_CM)?;
        check_range("weight (kg)", self.weight_kg, WEIGHT_RANGE_KG)?;
        Ok(())
    }

    pub fn classify(&self) -> Result<BmiResult> {
        classify(self.height_cm, self.weight_kg)
    }
}

/// What the patient needs to do to reach the target weight
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeightGoal {
    Lose(f64),
    Gain(f64),
    AtTarget,
}

/// Outcome of a BMI classification
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BmiResult {
    pub bmi: f64,
    pub category: BmiCategory,
    pub target_weight_kg: f64,
    /// Positive: must lose this many kg. Negative: must gain `abs(delta_kg)`.
    pub delta_kg: f64,
}

impl BmiResult {
    pub fn goal(&self) -> WeightGoal {
        if self.delta_kg > 0.0 {
            WeightGoal::Lose(self.delta_kg)
        } else if self.delta_kg < 0.0 {
            WeightGoal::Gain(self.delta_kg.abs())
        } else {
            WeightGoal::AtTarget
        }
    }
}

/// Compute BMI, its band, and the distance to the reference-BMI weight
///
/// Fails with [`Error::InvalidInput`] when height or weight is not a positive
/// finite number.
pub fn classify(height_cm: f64, weight_kg: f64) -> Result<BmiResult> {
    if !(height_cm.is_finite() && height_cm > 0.0) {
        return Err(Error::invalid(format!(
            "height must be positive, got {} cm",
            height_cm
        )));
    }
    if !(weight_kg.is_finite() && weight_kg > 0.0) {
        return Err(Error::invalid(format!(
            "weight must be positive, got {} kg",
            weight_kg
        )));
    }

    let height_m = height_cm / 100.0;
    let height_sq = height_m * height_m;
    let bmi = weight_kg / height_sq;
    let target_weight_kg = TARGET_BMI * height_sq;

    let result = BmiResult {
        bmi,
        category: BmiCategory::from_bmi(bmi),
        target_weight_kg,
        delta_kg: weight_kg - target_weight_kg,
    };

    tracing::debug!(
        bmi = result.bmi,
        category = ?result.category,
        "Classified {} cm / {} kg",
        height_cm,
        weight_kg
    );

    Ok(result)
}

/// Reject a value outside the inclusive `(min, max)` bounds of an input form
pub fn check_range(name: &str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )))
    }
}

//! Synthetic patient vitals for the monitoring dashboard.
//!
//! The dataset covers one month (2024-10-01 through 2024-10-31) of daily
//! readings. It is generated once from a fixed seed so every run shows the
//! same numbers.

use crate::{Error, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

const DATASET_SEED: u64 = 42;
const DATASET_DAYS: usize = 31;

/// UTF-8 byte order mark so spreadsheet tools detect the encoding
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static PATIENT_VITALS: Lazy<Vec<VitalRecord>> = Lazy::new(generate_patient_vitals);

/// One day of readings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VitalRecord {
    pub date: NaiveDate,
    pub systolic_mmhg: u32,
    pub diastolic_mmhg: u32,
    pub glucose_mg_dl: u32,
    pub temperature_c: f64,
}

/// Averages over a set of readings
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VitalSummary {
    pub count: usize,
    pub mean_systolic_mmhg: f64,
    pub mean_diastolic_mmhg: f64,
    pub mean_glucose_mg_dl: f64,
    pub mean_temperature_c: f64,
}

/// Get the cached synthetic dataset
pub fn patient_vitals() -> &'static [VitalRecord] {
    &PATIENT_VITALS
}

/// First and last date covered by the dataset
pub fn dataset_range() -> (NaiveDate, NaiveDate) {
    let records = patient_vitals();
    let first = records.first().map(|r| r.date).unwrap_or_else(dataset_start);
    let last = records.last().map(|r| r.date).unwrap_or_else(dataset_start);
    (first, last)
}

fn dataset_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 1).expect("2024-10-01 is a valid date")
}

fn generate_patient_vitals() -> Vec<VitalRecord> {
    let mut rng = StdRng::seed_from_u64(DATASET_SEED);

    // Column by column, like building a table one series at a time
    let systolic: Vec<u32> = (0..DATASET_DAYS)
        .map(|_| rng.random_range(110..140))
        .collect();
    let diastolic: Vec<u32> = (0..DATASET_DAYS)
        .map(|_| rng.random_range(70..90))
        .collect();
    let glucose: Vec<u32> = (0..DATASET_DAYS)
        .map(|_| rng.random_range(90..130))
        .collect();
    let temperature: Vec<f64> = (0..DATASET_DAYS)
        .map(|_| round_one_decimal(rng.random_range(36.0..37.5)))
        .collect();

    let records: Vec<VitalRecord> = dataset_start()
        .iter_days()
        .take(DATASET_DAYS)
        .enumerate()
        .map(|(i, date)| VitalRecord {
            date,
            systolic_mmhg: systolic[i],
            diastolic_mmhg: diastolic[i],
            glucose_mg_dl: glucose[i],
            temperature_c: temperature[i],
        })
        .collect();

    tracing::debug!("Generated {} synthetic vital records", records.len());
    records
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Records whose date falls within `start..=end`
pub fn filter_range(
    records: &[VitalRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<VitalRecord>> {
    if start > end {
        return Err(Error::invalid(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }

    Ok(records
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .cloned()
        .collect())
}

/// Mean of each series; `None` when there are no records
pub fn summarize(records: &[VitalRecord]) -> Option<VitalSummary> {
    if records.is_empty() {
        return None;
    }

    let n = records.len() as f64;
    let mean = |f: fn(&VitalRecord) -> f64| records.iter().map(f).sum::<f64>() / n;

    Some(VitalSummary {
        count: records.len(),
        mean_systolic_mmhg: mean(|r| f64::from(r.systolic_mmhg)),
        mean_diastolic_mmhg: mean(|r| f64::from(r.diastolic_mmhg)),
        mean_glucose_mg_dl: mean(|r| f64::from(r.glucose_mg_dl)),
        mean_temperature_c: mean(|r| r.temperature_c),
    })
}

/// Default file name for an exported range
pub fn default_export_name(start: NaiveDate, end: NaiveDate) -> String {
    format!("patient_vitals_{}_{}.csv", start, end)
}

/// Write records as CSV (BOM + header + one row per record)
///
/// Returns the number of rows written.
pub fn export_csv<W: Write>(records: &[VitalRecord], mut writer: W) -> Result<usize> {
    writer.write_all(UTF8_BOM)?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;

    Ok(records.len())
}

/// Export records to a file, creating parent directories as needed
pub fn export_csv_to_path(records: &[VitalRecord], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = std::fs::File::create(path)?;
    let count = export_csv(records, std::io::BufWriter::new(file))?;

    tracing::info!("Exported {} vital records to {:?}", count, path);
    Ok(count)
}

#![forbid(unsafe_code)]

//! Core calculations and services for the medcalc clinical toolkit.
//!
//! This crate provides:
//! - BMI classification with target-weight delta
//! - Weight-based drug dose calculation with an advisory daily ceiling
//! - Synthetic patient vitals (filtering, averages, CSV export)
//! - Prompt construction and the text generation client
//! - Session-scoped result storage
//! - Configuration and logging

pub mod error;
pub mod bmi;
pub mod dosage;
pub mod vitals;
pub mod prompt;
pub mod textgen;
pub mod session;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use bmi::{classify, AnthropometricInput, BmiCategory, BmiResult, WeightGoal};
pub use dosage::{compute_dose, DoseFrequency, DoseInput, DosePolicy, DoseResult};
pub use vitals::{VitalRecord, VitalSummary};
pub use prompt::{PatientCase, PromptFields, StaffProfile};
pub use textgen::{HttpTextGenerator, ServiceError, TextGenerator};
pub use session::SessionState;
pub use config::Config;

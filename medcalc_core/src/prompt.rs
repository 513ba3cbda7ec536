//! Prompt construction for the text generation service.
//!
//! Form fields are kept structured until the last moment; `to_prompt` turns
//! them into the instruction text sent to the model.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Medical staff registration form
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StaffProfile {
    pub name: String,
    pub department: String,
    pub specialty: String,
    pub introduction: String,
}

/// Patient details for a post-visit guidance message
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatientCase {
    pub name: String,
    pub age: u32,
    pub diagnosis: String,
    pub symptoms: String,
    pub treatment_plan: String,
}

/// Structured input for one generation request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptFields {
    StaffIntroduction(StaffProfile),
    PatientGuidance(PatientCase),
}

impl PromptFields {
    /// Every field must be filled in
    pub fn validate(&self) -> Result<()> {
        match self {
            PromptFields::StaffIntroduction(p) => {
                require("name", &p.name)?;
                require("department", &p.department)?;
                require("specialty", &p.specialty)?;
                require("introduction", &p.introduction)?;
            }
            PromptFields::PatientGuidance(c) => {
                require("name", &c.name)?;
                if c.age == 0 {
                    return Err(Error::invalid("age is required"));
                }
                require("diagnosis", &c.diagnosis)?;
                require("symptoms", &c.symptoms)?;
                require("treatment plan", &c.treatment_plan)?;
            }
        }
        Ok(())
    }

    /// Response length budget for this kind of request
    pub fn max_tokens(&self) -> u32 {
        match self {
            PromptFields::StaffIntroduction(_) => 500,
            PromptFields::PatientGuidance(_) => 1000,
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            PromptFields::StaffIntroduction(_) => "staff_introduction",
            PromptFields::PatientGuidance(_) => "patient_guidance",
        }
    }

    pub fn to_prompt(&self) -> String {
        match self {
            PromptFields::StaffIntroduction(p) => format!(
                "Using the staff details below, write a professional, patient-friendly \
introduction.

Staff details:
- Name: {}
- Department: {}
- Specialty: {}
- Current introduction: {}

Requirements:
1. Use language patients can easily understand
2. Convey expertise and trustworthiness
3. Keep it to 2-3 sentences
4. Keep the strengths of the current introduction while improving it

Reply with the improved introduction only:",
                p.name.trim(),
                p.department.trim(),
                p.specialty.trim(),
                p.introduction.trim()
            ),
            PromptFields::PatientGuidance(c) => format!(
                "Using the patient details below, write a guidance message for the patient.

Patient details:
- Name: {}
- Age: {}
- Diagnosis: {}
- Symptoms: {}
- Treatment plan: {}

Requirements:
1. Use language the patient can easily understand
2. Cover each of the following:
   - Precautions after the visit
   - Medication instructions (if applicable)
   - Lifestyle management
   - What to do if symptoms get worse
   - Follow-up visit information
3. Be kind and clear
4. Separate the message into sections

Reply with the guidance message only:",
                c.name.trim(),
                c.age,
                c.diagnosis.trim(),
                c.symptoms.trim(),
                c.treatment_plan.trim()
            ),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::invalid(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

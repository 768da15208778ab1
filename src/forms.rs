//! Form validation for patient and encounter entry.
//!
//! Forms arrive from the webview as plain string fields; validation turns
//! them into the typed payloads the API client sends.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{EncounterPayload, PatientPayload};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be a date in YYYY-MM-DD format")]
    InvalidDate(&'static str),
}

/// Patient entry form. Only the name fields are required; everything else
/// may be filled in later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientForm {
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub phone: String,
    pub notes: String,
}

impl PatientForm {
    pub fn validate(&self) -> Result<PatientPayload, FormError> {
        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            return Err(FormError::Required("first name"));
        }
        let last_name = self.last_name.trim();
        if last_name.is_empty() {
            return Err(FormError::Required("last name"));
        }

        let birth_date = match self.birth_date.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| FormError::InvalidDate("birth date"))?,
            ),
        };

        Ok(PatientPayload {
            national_id: self.national_id.trim().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            birth_date,
            phone: self.phone.trim().to_string(),
            notes: self.notes.trim().to_string(),
        })
    }
}

/// Encounter entry form. Every field is optional; an all-blank encounter is
/// still a valid record of a visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterForm {
    pub chief_complaint: String,
    pub hpi: String,
    pub exam: String,
    pub diagnosis: String,
    pub plan: String,
    pub va_od: String,
    pub va_os: String,
    pub iop_od: String,
    pub iop_os: String,
}

impl EncounterForm {
    pub fn validate(&self) -> Result<EncounterPayload, FormError> {
        Ok(EncounterPayload {
            chief_complaint: self.chief_complaint.trim().to_string(),
            hpi: self.hpi.trim().to_string(),
            exam: self.exam.trim().to_string(),
            diagnosis: self.diagnosis.trim().to_string(),
            plan: self.plan.trim().to_string(),
            va_od: self.va_od.trim().to_string(),
            va_os: self.va_os.trim().to_string(),
            iop_od: self.iop_od.trim().to_string(),
            iop_os: self.iop_os.trim().to_string(),
        })
    }
}

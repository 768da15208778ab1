//! Wire types for the clinic backend REST API.
//!
//! All entities are owned by the backend; the structs here are disposable,
//! re-fetchable copies. Datetimes travel as strings because the backend mixes
//! offset-aware values (created by clients) with naive values (read back from
//! its database); [`parse_wire_datetime`] accepts both.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Access/refresh token pair returned by `/auth/login` and `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

/// Current user as served by `/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    #[serde(default)]
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Label for the identity document, with a placeholder when none is on
    /// file. Views render optional blanks through these helpers instead of
    /// showing empty strings.
    pub fn national_id_label(&self) -> String {
        if self.national_id.trim().is_empty() {
            "no ID on file".to_string()
        } else {
            self.national_id.clone()
        }
    }

    /// Whole years of age as of `today`, when a birth date is known.
    pub fn age_years(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date.and_then(|birth| today.years_since(birth))
    }
}

/// Body for `POST /patients` and `PATCH /patients/{id}`. The backend treats
/// missing strings as empty, so the client always sends the full field set,
/// the way the original form submits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientPayload {
    #[serde(default)]
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

/// One clinical visit. Immutable once created in this client; the backend
/// serves them newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: i64,
    pub patient_id: i64,
    pub created_at: String,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub hpi: String,
    #[serde(default)]
    pub exam: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub va_od: String,
    #[serde(default)]
    pub va_os: String,
    #[serde(default)]
    pub iop_od: String,
    #[serde(default)]
    pub iop_os: String,
}

impl Encounter {
    pub fn created_at_local(&self) -> Option<NaiveDateTime> {
        parse_wire_datetime(&self.created_at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterPayload {
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub hpi: String,
    #[serde(default)]
    pub exam: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub va_od: String,
    #[serde(default)]
    pub va_os: String,
    #[serde(default)]
    pub iop_od: String,
    #[serde(default)]
    pub iop_os: String,
}

/// Calendar appointment as served by `/appointments`. `start_at`/`end_at`
/// stay serialized here; the scheduler maps them into in-memory
/// [`crate::scheduler::Event`] values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub title: String,
    pub specialist: String,
    pub location: String,
    pub start_at: String,
    pub end_at: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub online: bool,
}

/// Body for appointment create and update. Updates send the full field set,
/// matching what the original editor submits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPayload {
    pub title: String,
    pub specialist: String,
    pub location: String,
    pub start_at: String,
    pub end_at: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub online: bool,
}

/// Parse a backend datetime string into local wall-clock time.
///
/// Offset-aware strings are converted to the local zone; naive strings are
/// taken as-is, which is how the original client displayed them.
pub fn parse_wire_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Serialize local wall-clock time for the wire, offset included.
pub fn to_wire_datetime(naive: NaiveDateTime) -> String {
    match Local.from_local_datetime(&naive).single() {
        Some(dt) => dt.to_rfc3339(),
        // Skipped or ambiguous local times around DST shifts fall back to the
        // bare naive form, which the backend accepts.
        None => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

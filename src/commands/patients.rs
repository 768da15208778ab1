//! Patient commands: search, create, detail, update.

use serde::Serialize;
use tauri::State;
use tracing::error;

use super::AppState;
use crate::forms::PatientForm;
use crate::models::Patient;

/// Patient row as the list screen renders it.
#[derive(Debug, Serialize)]
pub struct PatientRow {
    #[serde(flatten)]
    pub patient: Patient,
    pub full_name: String,
    pub national_id_label: String,
    pub age_years: Option<u32>,
}

impl PatientRow {
    fn from(patient: Patient) -> Self {
        Self {
            full_name: patient.full_name(),
            national_id_label: patient.national_id_label(),
            age_years: patient.age_years(chrono::Local::now().date_naive()),
            patient,
        }
    }
}

fn rows(patients: &[Patient]) -> Vec<PatientRow> {
    patients.iter().cloned().map(PatientRow::from).collect()
}

#[tauri::command]
pub async fn list_patients(
    state: State<'_, AppState>,
    query: Option<String>,
) -> Result<Vec<PatientRow>, String> {
    let patients = state
        .session
        .api()
        .list_patients(query.as_deref())
        .await
        .map_err(|e| {
            error!("Patient search failed: {}", e);
            e.to_string()
        })?;
    let mut list = state.patient_list.lock().await;
    list.set_patients(patients);
    Ok(rows(list.patients()))
}

/// Create a patient and return the updated list with the new record on top.
#[tauri::command]
pub async fn create_patient(
    state: State<'_, AppState>,
    form: PatientForm,
) -> Result<Vec<PatientRow>, String> {
    let payload = form.validate().map_err(|e| e.to_string())?;
    let patient = state
        .session
        .api()
        .create_patient(&payload)
        .await
        .map_err(|e| {
            error!("Patient creation failed: {}", e);
            e.to_string()
        })?;
    let mut list = state.patient_list.lock().await;
    list.prepend(patient);
    Ok(rows(list.patients()))
}

#[tauri::command]
pub async fn get_patient(state: State<'_, AppState>, id: i64) -> Result<PatientRow, String> {
    let patient = state.session.api().get_patient(id).await.map_err(|e| {
        error!("Patient {} load failed: {}", id, e);
        e.to_string()
    })?;
    Ok(PatientRow::from(patient))
}

#[tauri::command]
pub async fn update_patient(
    state: State<'_, AppState>,
    id: i64,
    form: PatientForm,
) -> Result<PatientRow, String> {
    let payload = form.validate().map_err(|e| e.to_string())?;
    let patient = state
        .session
        .api()
        .update_patient(id, &payload)
        .await
        .map_err(|e| {
            error!("Patient {} update failed: {}", id, e);
            e.to_string()
        })?;
    state.patient_list.lock().await.replace(patient.clone());
    Ok(PatientRow::from(patient))
}

//! Encounter commands for the patient detail screen.

use serde::Serialize;
use tauri::State;
use tracing::error;

use super::AppState;
use crate::forms::EncounterForm;
use crate::models::Encounter;

/// Encounter as the visit history renders it, with the creation timestamp
/// already formatted for display.
#[derive(Debug, Serialize)]
pub struct EncounterRow {
    #[serde(flatten)]
    pub encounter: Encounter,
    pub created_at_label: String,
}

impl EncounterRow {
    fn from(encounter: Encounter) -> Self {
        let created_at_label = encounter
            .created_at_local()
            .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| encounter.created_at.clone());
        Self {
            created_at_label,
            encounter,
        }
    }
}

/// Visit history, newest first as the backend serves it.
#[tauri::command]
pub async fn list_encounters(
    state: State<'_, AppState>,
    patient_id: i64,
) -> Result<Vec<EncounterRow>, String> {
    let encounters = state
        .session
        .api()
        .list_encounters(patient_id)
        .await
        .map_err(|e| {
            error!("Encounter list for patient {} failed: {}", patient_id, e);
            e.to_string()
        })?;
    Ok(encounters.into_iter().map(EncounterRow::from).collect())
}

#[tauri::command]
pub async fn create_encounter(
    state: State<'_, AppState>,
    patient_id: i64,
    form: EncounterForm,
) -> Result<EncounterRow, String> {
    let payload = form.validate().map_err(|e| e.to_string())?;
    let encounter = state
        .session
        .api()
        .create_encounter(patient_id, &payload)
        .await
        .map_err(|e| {
            error!("Encounter creation for patient {} failed: {}", patient_id, e);
            e.to_string()
        })?;
    Ok(EncounterRow::from(encounter))
}

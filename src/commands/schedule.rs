//! Scheduler commands: week loading and navigation, the editor, and quick
//! patient creation from the calendar.

use chrono::{Local, NaiveDate};
use tauri::State;
use tracing::{error, warn};

use super::AppState;
use crate::forms::PatientForm;
use crate::models::to_wire_datetime;
use crate::scheduler::{DraftPatch, Event, SchedulerSnapshot, SchedulerView};

/// Fetch the visible week's appointments into the view. A failed load keeps
/// the screen usable: the grid empties and the error banner carries the
/// message.
async fn reload(state: &State<'_, AppState>, view: &mut SchedulerView) {
    let (start, end) = view.week_range();
    let result = state
        .session
        .api()
        .list_appointments(&to_wire_datetime(start), &to_wire_datetime(end))
        .await;
    match result {
        Ok(appointments) => {
            let events: Vec<Event> = appointments
                .iter()
                .filter_map(|a| {
                    let event = Event::from_appointment(a);
                    if event.is_none() {
                        warn!("Skipping appointment {} with unparseable datetimes", a.id);
                    }
                    event
                })
                .collect();
            view.set_events(events);
        }
        Err(e) => {
            error!("Week load failed: {}", e);
            view.set_load_error(e.to_string());
        }
    }
}

#[tauri::command]
pub async fn load_week(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    reload(&state, &mut view).await;
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn previous_week(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.previous_week();
    reload(&state, &mut view).await;
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn next_week(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.next_week();
    reload(&state, &mut view).await;
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn current_week(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.current_week(Local::now().date_naive());
    reload(&state, &mut view).await;
    Ok(view.snapshot())
}

/// Grid cell click: opens the editor on the cell's event or a fresh draft.
#[tauri::command]
pub async fn click_cell(
    state: State<'_, AppState>,
    day: NaiveDate,
    hour: u32,
) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.open_cell(day, hour);
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn new_draft(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.open_blank(Local::now().date_naive());
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn update_draft(
    state: State<'_, AppState>,
    patch: DraftPatch,
) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.update_draft(patch);
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn set_duration(
    state: State<'_, AppState>,
    minutes: i64,
) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.set_duration(minutes);
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn close_editor(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.close_editor();
    Ok(view.snapshot())
}

/// Persist the open draft: update when it carries an id, create otherwise,
/// then fold the backend's answer into the grid.
#[tauri::command]
pub async fn save_appointment(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    let (id, payload) = view.draft_payload()?;
    let saved = match id {
        Some(id) => state.session.api().update_appointment(id, &payload).await,
        None => state.session.api().create_appointment(&payload).await,
    }
    .map_err(|e| {
        error!("Appointment save failed: {}", e);
        e.to_string()
    })?;
    let event = Event::from_appointment(&saved)
        .ok_or_else(|| "backend returned unreadable appointment datetimes".to_string())?;
    view.apply_saved(event);
    Ok(view.snapshot())
}

/// Delete an appointment. The webview asks the user first; by the time this
/// runs that confirmation already happened.
#[tauri::command]
pub async fn cancel_appointment(
    state: State<'_, AppState>,
    id: i64,
) -> Result<SchedulerSnapshot, String> {
    state.session.api().delete_appointment(id).await.map_err(|e| {
        error!("Appointment {} cancellation failed: {}", id, e);
        e.to_string()
    })?;
    let mut view = state.scheduler.lock().await;
    view.remove_event(id);
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn open_patient_modal(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.open_patient_modal();
    Ok(view.snapshot())
}

#[tauri::command]
pub async fn close_patient_modal(state: State<'_, AppState>) -> Result<SchedulerSnapshot, String> {
    let mut view = state.scheduler.lock().await;
    view.close_patient_modal();
    Ok(view.snapshot())
}

/// Create a patient from the calendar modal and link them to the open draft.
/// A blank draft title picks up the patient's full name.
#[tauri::command]
pub async fn quick_create_patient(
    state: State<'_, AppState>,
    form: PatientForm,
) -> Result<SchedulerSnapshot, String> {
    let payload = form.validate().map_err(|e| e.to_string())?;
    let patient = state
        .session
        .api()
        .create_patient(&payload)
        .await
        .map_err(|e| {
            error!("Quick patient creation failed: {}", e);
            e.to_string()
        })?;
    let mut view = state.scheduler.lock().await;
    view.seed_patient(patient.id, &patient.full_name());
    Ok(view.snapshot())
}

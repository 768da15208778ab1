//! Session commands: bootstrap, login, logout, and the route guard.

use tauri::State;
use tracing::error;

use super::AppState;
use crate::guard::{self, GuardDecision};
use crate::session::AuthPhase;

/// Restore a stored session on startup. Always resolves to a settled phase.
#[tauri::command]
pub async fn session_bootstrap(state: State<'_, AppState>) -> Result<AuthPhase, String> {
    Ok(state.session.bootstrap().await)
}

#[tauri::command]
pub async fn session_status(state: State<'_, AppState>) -> Result<AuthPhase, String> {
    Ok(state.session.phase().await)
}

#[tauri::command]
pub async fn guard_decision(state: State<'_, AppState>) -> Result<GuardDecision, String> {
    Ok(guard::for_phase(&state.session.phase().await))
}

#[tauri::command]
pub async fn login(
    state: State<'_, AppState>,
    email: String,
    password: String,
) -> Result<AuthPhase, String> {
    state.session.login(&email, &password).await.map_err(|e| {
        error!("Login failed: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub async fn logout(state: State<'_, AppState>) -> Result<AuthPhase, String> {
    Ok(state.session.logout().await)
}

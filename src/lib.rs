mod api;
mod commands;
mod config;
mod forms;
mod guard;
mod models;
mod patients;
mod scheduler;
mod session;
mod token_store;

#[cfg(test)]
mod testutil;

use tauri::Manager;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ApiClient;
use commands::AppState;
use session::SessionController;
use token_store::TokenStore;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("OftaDesk starting...");

    let config = config::Config::load_or_default();
    info!("Backend: {}", config.api_url);

    let store = match TokenStore::from_config_dir() {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Cannot resolve the config directory: {}", e);
            std::process::exit(1);
        }
    };
    let api = match ApiClient::new(&config.api_url, store) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!("Cannot start with backend URL '{}': {}", config.api_url, e);
            std::process::exit(1);
        }
    };

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            // A second launch focuses the running window instead.
            if let Some(window) = app.get_webview_window("main") {
                let _ = window.set_focus();
            }
        }))
        .setup(move |app| {
            app.manage(AppState::new(SessionController::new(api)));
            info!("App setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::session_bootstrap,
            commands::session_status,
            commands::guard_decision,
            commands::login,
            commands::logout,
            commands::list_patients,
            commands::create_patient,
            commands::get_patient,
            commands::update_patient,
            commands::list_encounters,
            commands::create_encounter,
            commands::load_week,
            commands::previous_week,
            commands::next_week,
            commands::current_week,
            commands::click_cell,
            commands::new_draft,
            commands::update_draft,
            commands::set_duration,
            commands::close_editor,
            commands::save_appointment,
            commands::cancel_appointment,
            commands::open_patient_modal,
            commands::close_patient_modal,
            commands::quick_create_patient,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

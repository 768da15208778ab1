//! IPC commands exposed to the webview.
//!
//! One file per screen area. Every command returns `Result<T, String>`; the
//! string is the message the UI shows, already normalized by the API layer.

pub mod auth;
pub mod encounters;
pub mod patients;
pub mod schedule;

use tokio::sync::Mutex;

use crate::patients::PatientListView;
use crate::scheduler::SchedulerView;
use crate::session::SessionController;

pub use auth::*;
pub use encounters::*;
pub use patients::*;
pub use schedule::*;

pub struct AppState {
    pub session: SessionController,
    pub scheduler: Mutex<SchedulerView>,
    pub patient_list: Mutex<PatientListView>,
}

impl AppState {
    pub fn new(session: SessionController) -> Self {
        Self {
            session,
            scheduler: Mutex::new(SchedulerView::today()),
            patient_list: Mutex::new(PatientListView::new()),
        }
    }
}

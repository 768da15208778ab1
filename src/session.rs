//! Session lifecycle.
//!
//! The controller owns the auth phase the UI renders from. Transitions are
//! driven by three entry points: `bootstrap` on startup, `login` from the
//! sign-in form, and `logout`. Every transition is logged.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::User;

/// Auth phase as seen by the UI. Serialized with a tag so the webview can
/// switch on `phase` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum AuthPhase {
    /// Before bootstrap has run.
    Unknown,
    /// A login or bootstrap round-trip is in flight.
    Loading,
    Authenticated { user: User },
    Anonymous,
}

impl AuthPhase {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthPhase::Authenticated { user } => Some(user),
            _ => None,
        }
    }
}

pub struct SessionController {
    api: ApiClient,
    phase: RwLock<AuthPhase>,
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            phase: RwLock::new(AuthPhase::Unknown),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn phase(&self) -> AuthPhase {
        self.phase.read().await.clone()
    }

    async fn set_phase(&self, next: AuthPhase) {
        let mut guard = self.phase.write().await;
        info!(from = ?*guard, to = ?next, "Session phase transition");
        *guard = next;
    }

    /// Startup restore. With no stored tokens the session is anonymous
    /// without touching the network; otherwise `/me` decides whether the
    /// stored pair is still good.
    pub async fn bootstrap(&self) -> AuthPhase {
        if !self.api.store().has() {
            self.set_phase(AuthPhase::Anonymous).await;
            return self.phase().await;
        }
        self.set_phase(AuthPhase::Loading).await;
        match self.api.me().await {
            Ok(user) => {
                info!("Session restored for {}", user.email);
                self.set_phase(AuthPhase::Authenticated { user }).await;
            }
            Err(e) => {
                warn!("Stored session could not be restored: {}", e);
                self.api.store().clear();
                self.set_phase(AuthPhase::Anonymous).await;
            }
        }
        self.phase().await
    }

    /// Sign in: exchange credentials, persist the pair, then load the
    /// profile. A failed attempt lands back in `Anonymous` with the error
    /// message; previously stored tokens are left alone.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPhase, ApiError> {
        self.set_phase(AuthPhase::Loading).await;
        let result = self.login_inner(email, password).await;
        match &result {
            Ok(user) => {
                info!("Signed in as {}", user.email);
                self.set_phase(AuthPhase::Authenticated {
                    user: user.clone(),
                })
                .await;
            }
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                self.set_phase(AuthPhase::Anonymous).await;
            }
        }
        result?;
        Ok(self.phase().await)
    }

    async fn login_inner(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let tokens = self.api.login(email, password).await?;
        self.api
            .store()
            .save(&tokens)
            .map_err(|e| ApiError::TokenStore(e.to_string()))?;
        self.api.me().await
    }

    /// Drop the session locally. The backend has no revocation endpoint, so
    /// this is purely client-side.
    pub async fn logout(&self) -> AuthPhase {
        self.api.store().clear();
        info!("Signed out");
        self.set_phase(AuthPhase::Anonymous).await;
        self.phase().await
    }
}

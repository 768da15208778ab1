//! Typed HTTP client for the clinic backend.
//!
//! Every authenticated request goes through [`ApiClient::request`]: bearer
//! header from the token store, one transparent refresh-and-retry on a 401,
//! and error bodies normalized into a single human-readable message.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{
    Appointment, AppointmentPayload, Encounter, EncounterPayload, Patient, PatientPayload, Tokens,
    User,
};
use crate::token_store::TokenStore;

/// HTTP client timeout for backend requests
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    /// A 401 that the one-shot refresh could not recover. The caller routes
    /// the user back to the login view.
    #[error("session expired, sign in again")]
    SessionExpired,

    /// Non-success response, message normalized from the error body.
    #[error("{0}")]
    Backend(String),

    /// 404, kept separate so views can render an inline not-found state.
    #[error("{0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not persist session tokens: {0}")]
    TokenStore(String),

    #[error("invalid backend URL: {0}")]
    Url(String),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: &str, store: TokenStore) -> Result<Self, ApiError> {
        let cleaned_url = base_url.trim_end_matches('/');

        let parsed = url::Url::parse(cleaned_url)
            .map_err(|e| ApiError::Url(format!("'{}': {}", cleaned_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Url(format!(
                "URL must use http or https scheme, got: {}",
                parsed.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: cleaned_url.to_string(),
            store,
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =====================
    // Auth endpoints
    // =====================

    /// `POST /auth/login`. No bearer header, no refresh; a non-success
    /// response fails with the raw server text. Tokens are returned, not
    /// persisted — that is the session controller's call.
    pub async fn login(&self, email: &str, password: &str) -> Result<Tokens, ApiError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                "could not sign in".to_string()
            } else {
                text.trim().to_string()
            };
            return Err(ApiError::Backend(message));
        }
        Ok(response.json().await?)
    }

    /// `POST /auth/refresh?refresh_token=`. Persists the returned pair on
    /// success. Fails if no refresh token is stored or the endpoint says no.
    pub async fn refresh(&self) -> Result<Tokens, ApiError> {
        let stored = self
            .store
            .get()
            .ok_or_else(|| ApiError::Backend("no refresh token stored".to_string()))?;

        let url = format!(
            "{}/auth/refresh?refresh_token={}",
            self.base_url,
            urlencoding::encode(&stored.refresh_token)
        );
        let response = self.http.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Backend(
                "could not refresh the session".to_string(),
            ));
        }
        let fresh: Tokens = response.json().await?;
        self.store
            .save(&fresh)
            .map_err(|e| ApiError::TokenStore(e.to_string()))?;
        info!("Session tokens refreshed");
        Ok(fresh)
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.expect_json(Method::GET, "/me", None::<&()>).await
    }

    // =====================
    // Patients
    // =====================

    pub async fn list_patients(&self, query: Option<&str>) -> Result<Vec<Patient>, ApiError> {
        let path = match query {
            Some(q) if !q.trim().is_empty() => {
                format!("/patients?q={}", urlencoding::encode(q.trim()))
            }
            _ => "/patients".to_string(),
        };
        self.expect_json(Method::GET, &path, None::<&()>).await
    }

    pub async fn create_patient(&self, payload: &PatientPayload) -> Result<Patient, ApiError> {
        self.expect_json(Method::POST, "/patients", Some(payload))
            .await
    }

    pub async fn get_patient(&self, id: i64) -> Result<Patient, ApiError> {
        self.expect_json(Method::GET, &format!("/patients/{}", id), None::<&()>)
            .await
    }

    pub async fn update_patient(
        &self,
        id: i64,
        payload: &PatientPayload,
    ) -> Result<Patient, ApiError> {
        self.expect_json(Method::PATCH, &format!("/patients/{}", id), Some(payload))
            .await
    }

    // =====================
    // Encounters
    // =====================

    pub async fn list_encounters(&self, patient_id: i64) -> Result<Vec<Encounter>, ApiError> {
        self.expect_json(
            Method::GET,
            &format!("/patients/{}/encounters", patient_id),
            None::<&()>,
        )
        .await
    }

    pub async fn create_encounter(
        &self,
        patient_id: i64,
        payload: &EncounterPayload,
    ) -> Result<Encounter, ApiError> {
        self.expect_json(
            Method::POST,
            &format!("/patients/{}/encounters", patient_id),
            Some(payload),
        )
        .await
    }

    // =====================
    // Appointments
    // =====================

    /// Range query; `start`/`end` are wire datetime strings.
    pub async fn list_appointments(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<Appointment>, ApiError> {
        let path = format!(
            "/appointments?start={}&end={}",
            urlencoding::encode(start),
            urlencoding::encode(end)
        );
        self.expect_json(Method::GET, &path, None::<&()>).await
    }

    pub async fn create_appointment(
        &self,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ApiError> {
        self.expect_json(Method::POST, "/appointments", Some(payload))
            .await
    }

    pub async fn update_appointment(
        &self,
        id: i64,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ApiError> {
        self.expect_json(
            Method::PATCH,
            &format!("/appointments/{}", id),
            Some(payload),
        )
        .await
    }

    pub async fn delete_appointment(&self, id: i64) -> Result<(), ApiError> {
        self.request::<serde_json::Value, ()>(
            Method::DELETE,
            &format!("/appointments/{}", id),
            None,
        )
        .await?;
        Ok(())
    }

    // =====================
    // Core request path
    // =====================

    /// Authenticated request with the single refresh-and-retry on 401.
    /// `204 No Content` resolves to `None`; other successes parse as JSON.
    pub async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiError> {
        let body = match body {
            Some(value) => Some(serde_json::to_value(value)?),
            None => None,
        };

        let mut response = self.send(method.clone(), path, body.as_ref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            match self.refresh().await {
                Ok(_) => {
                    // Headers are rebuilt from the store, which now holds the
                    // fresh access token. One retry; a second 401 falls
                    // through to the ordinary error path below.
                    response = self.send(method, path, body.as_ref()).await?;
                }
                Err(e) => {
                    warn!("Token refresh failed, dropping session: {}", e);
                    self.store.clear();
                    return Err(ApiError::SessionExpired);
                }
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            return Err(if status == StatusCode::NOT_FOUND {
                ApiError::NotFound(message)
            } else {
                ApiError::Backend(message)
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// Like [`request`](Self::request) but treats an empty success body as an
    /// error, for endpoints that always return a resource.
    async fn expect_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        self.request(method, path, body)
            .await?
            .ok_or_else(|| ApiError::Backend("empty response from backend".to_string()))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(json) = body {
            // .json() also sets the JSON content type.
            request = request.json(json);
        }
        if let Some(tokens) = self.store.get() {
            request = request.bearer_auth(&tokens.access_token);
        }
        request.send().await
    }
}

/// Normalize an error body into one message: `detail` (first element's `msg`
/// when it is a validation array), then `message`, then raw text, then the
/// status line.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail") {
            if let Some(items) = detail.as_array() {
                if let Some(msg) = items
                    .first()
                    .and_then(|item| item.get("msg"))
                    .and_then(|msg| msg.as_str())
                {
                    return msg.to_string();
                }
                return status_line(status);
            }
            if let Some(text) = detail.as_str() {
                return text.to_string();
            }
        }
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status_line(status)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

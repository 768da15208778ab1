//! In-process clinic backend for tests.
//!
//! Spins up a small axum server on a random port with the same routes and
//! error bodies as the real backend, plus switches to force token expiry and
//! refresh failure, and counters to assert on retry behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;

use crate::models::{
    parse_wire_datetime, Appointment, AppointmentPayload, Encounter, EncounterPayload, Patient,
    PatientPayload, Tokens, User,
};

pub const VALID_EMAIL: &str = "dr.martinez@clinic.test";
pub const VALID_PASSWORD: &str = "retina123";

#[derive(Default)]
pub struct BackendState {
    /// Monotonic token generation. Access token `access-N` is valid only
    /// while N matches, so bumping it expires the outstanding one.
    pub generation: AtomicI64,
    /// Reject every bearer token, even freshly rotated ones.
    pub reject_all_access: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub patients: Mutex<HashMap<i64, Patient>>,
    pub encounters: Mutex<Vec<Encounter>>,
    pub appointments: Mutex<HashMap<i64, Appointment>>,
    pub next_id: AtomicI64,
}

impl BackendState {
    fn access_token(&self) -> String {
        format!("access-{}", self.generation.load(Ordering::SeqCst))
    }

    fn refresh_token(&self) -> String {
        format!("refresh-{}", self.generation.load(Ordering::SeqCst))
    }

    fn tokens(&self) -> Tokens {
        Tokens {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
            token_type: "bearer".to_string(),
        }
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let denied = || {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Could not validate credentials" })),
            )
                .into_response()
        };
        let header = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(denied)?;
        let bearer = header.strip_prefix("Bearer ").ok_or_else(denied)?;
        if self.reject_all_access.load(Ordering::SeqCst) || bearer != self.access_token() {
            return Err(denied());
        }
        Ok(())
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState {
            next_id: AtomicI64::new(0),
            ..Default::default()
        });

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/me", get(me))
            .route("/patients", get(list_patients).post(create_patient))
            .route("/patients/:id", get(get_patient).patch(update_patient))
            .route(
                "/patients/:id/encounters",
                get(list_encounters).post(create_encounter),
            )
            .route("/appointments", get(list_appointments).post(create_appointment))
            .route(
                "/appointments/:id",
                patch(update_appointment).delete(delete_appointment),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock backend");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// The pair the backend currently accepts.
    pub fn current_tokens(&self) -> Tokens {
        self.state.tokens()
    }

    /// Invalidate the outstanding access token; the refresh token stays
    /// valid, so the one-shot refresh recovers.
    pub fn expire_access(&self) {
        // Rotating the access part alone: bump generation, then the refresh
        // handler accepts the previous refresh token too.
        self.state.generation.fetch_add(1, Ordering::SeqCst);
    }
}

type SharedState = Arc<BackendState>;

async fn login(
    State(state): State<SharedState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let email = body.get("email").and_then(|v| v.as_str()).unwrap_or("");
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or("");
    if email != VALID_EMAIL || password != VALID_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid credentials" })),
        )
            .into_response();
    }
    Json(state.tokens()).into_response()
}

#[derive(serde::Deserialize)]
struct RefreshQuery {
    refresh_token: String,
}

async fn refresh(
    State(state): State<SharedState>,
    Query(query): Query<RefreshQuery>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid refresh token" })),
        )
            .into_response();
    }
    let generation = state.generation.load(Ordering::SeqCst);
    let acceptable = [
        format!("refresh-{}", generation),
        format!("refresh-{}", generation - 1),
    ];
    if !acceptable.contains(&query.refresh_token) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid refresh token" })),
        )
            .into_response();
    }
    Json(state.tokens()).into_response()
}

async fn me(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    Json(User {
        id: 1,
        email: VALID_EMAIL.to_string(),
        full_name: "Marcelo Martinez".to_string(),
        role: "admin".to_string(),
        is_active: true,
    })
    .into_response()
}

#[derive(serde::Deserialize)]
struct PatientQuery {
    q: Option<String>,
}

async fn list_patients(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<PatientQuery>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let needle = query.q.unwrap_or_default().to_lowercase();
    let mut patients: Vec<Patient> = state
        .patients
        .lock()
        .unwrap()
        .values()
        .filter(|p| {
            needle.is_empty()
                || p.first_name.to_lowercase().contains(&needle)
                || p.last_name.to_lowercase().contains(&needle)
                || p.national_id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();
    patients.sort_by(|a, b| {
        (a.last_name.to_lowercase(), a.first_name.to_lowercase())
            .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
    });
    Json(patients).into_response()
}

async fn create_patient(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<PatientPayload>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let patient = Patient {
        id: state.alloc_id(),
        national_id: payload.national_id,
        first_name: payload.first_name,
        last_name: payload.last_name,
        birth_date: payload.birth_date,
        phone: payload.phone,
        notes: payload.notes,
    };
    state
        .patients
        .lock()
        .unwrap()
        .insert(patient.id, patient.clone());
    (StatusCode::CREATED, Json(patient)).into_response()
}

async fn get_patient(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    match state.patients.lock().unwrap().get(&id) {
        Some(patient) => Json(patient.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Patient not found" })),
        )
            .into_response(),
    }
}

async fn update_patient(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<PatientPayload>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let mut patients = state.patients.lock().unwrap();
    match patients.get_mut(&id) {
        Some(patient) => {
            patient.national_id = payload.national_id;
            patient.first_name = payload.first_name;
            patient.last_name = payload.last_name;
            patient.birth_date = payload.birth_date;
            patient.phone = payload.phone;
            patient.notes = payload.notes;
            Json(patient.clone()).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Patient not found" })),
        )
            .into_response(),
    }
}

async fn list_encounters(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(patient_id): Path<i64>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let mut encounters: Vec<Encounter> = state
        .encounters
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.patient_id == patient_id)
        .cloned()
        .collect();
    // Newest first.
    encounters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(encounters).into_response()
}

async fn create_encounter(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(patient_id): Path<i64>,
    Json(payload): Json<EncounterPayload>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    if !state.patients.lock().unwrap().contains_key(&patient_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Patient not found" })),
        )
            .into_response();
    }
    let encounter = Encounter {
        id: state.alloc_id(),
        patient_id,
        created_at: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        chief_complaint: payload.chief_complaint,
        hpi: payload.hpi,
        exam: payload.exam,
        diagnosis: payload.diagnosis,
        plan: payload.plan,
        va_od: payload.va_od,
        va_os: payload.va_os,
        iop_od: payload.iop_od,
        iop_os: payload.iop_os,
    };
    state.encounters.lock().unwrap().push(encounter.clone());
    (StatusCode::CREATED, Json(encounter)).into_response()
}

#[derive(serde::Deserialize)]
struct RangeQuery {
    start: String,
    end: String,
}

async fn list_appointments(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let (Some(start), Some(end)) = (
        parse_wire_datetime(&query.start),
        parse_wire_datetime(&query.end),
    ) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["query", "start"], "msg": "invalid datetime" }] })),
        )
            .into_response();
    };
    let mut appointments: Vec<Appointment> = state
        .appointments
        .lock()
        .unwrap()
        .values()
        .filter(|a| {
            parse_wire_datetime(&a.start_at)
                .map(|at| at >= start && at < end)
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    appointments.sort_by(|a, b| a.start_at.cmp(&b.start_at));
    Json(appointments).into_response()
}

async fn create_appointment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<AppointmentPayload>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let appointment = appointment_from_payload(state.alloc_id(), payload);
    state
        .appointments
        .lock()
        .unwrap()
        .insert(appointment.id, appointment.clone());
    (StatusCode::CREATED, Json(appointment)).into_response()
}

async fn update_appointment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<AppointmentPayload>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let mut appointments = state.appointments.lock().unwrap();
    if !appointments.contains_key(&id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Appointment not found" })),
        )
            .into_response();
    }
    let appointment = appointment_from_payload(id, payload);
    appointments.insert(id, appointment.clone());
    Json(appointment).into_response()
}

async fn delete_appointment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    match state.appointments.lock().unwrap().remove(&id) {
        Some(_) => Json(json!({ "ok": true })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Appointment not found" })),
        )
            .into_response(),
    }
}

fn appointment_from_payload(id: i64, payload: AppointmentPayload) -> Appointment {
    Appointment {
        id,
        title: payload.title,
        specialist: payload.specialist,
        location: payload.location,
        start_at: payload.start_at,
        end_at: payload.end_at,
        status: payload.status,
        kind: payload.kind,
        channel: payload.channel,
        tags: payload.tags,
        notes: payload.notes,
        patient_id: payload.patient_id,
        online: payload.online,
    }
}

pub fn sample_appointment_payload(start_at: &str, end_at: &str) -> AppointmentPayload {
    AppointmentPayload {
        title: "Ana Suarez".to_string(),
        specialist: "Marcelo Martinez".to_string(),
        location: "Consultorio 1".to_string(),
        start_at: start_at.to_string(),
        end_at: end_at.to_string(),
        status: "Confirmado".to_string(),
        kind: "Primera cita".to_string(),
        channel: "Cita Online".to_string(),
        tags: vec!["Prioridad".to_string()],
        notes: String::new(),
        patient_id: None,
        online: false,
    }
}

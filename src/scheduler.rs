//! Weekly scheduler grid state machine.
//!
//! `SchedulerView` holds everything the calendar screen renders from: the
//! Monday-anchored week, the loaded events, the editor draft, and the modal
//! flags. The commands layer mutates it and ships a [`SchedulerSnapshot`] to
//! the webview after each change.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::{parse_wire_datetime, to_wire_datetime, Appointment, AppointmentPayload};

pub const SPECIALISTS: &[&str] = &["Marcelo Martinez", "Administrador"];
pub const LOCATIONS: &[&str] = &["Consultorio 1", "Consultorio 2"];
/// Duration chips offered in the editor, in minutes.
pub const DURATIONS_MIN: &[i64] = &[5, 10, 15, 20, 30, 40, 45, 50, 60, 90, 120];
pub const STATUSES: &[&str] = &[
    "Se requiere confirmación",
    "Confirmado",
    "Ausencia del paciente",
];
pub const VISIT_TYPES: &[&str] = &["Primera cita", "Visita de control"];
pub const CHANNELS: &[&str] = &[
    "Cita Online",
    "Redes sociales",
    "Búsqueda en Google",
    "Paciente de paso",
    "Derivación médica",
    "Recomendación",
];
pub const TAG_OPTIONS: &[&str] = &["Consulta", "Familia referida", "Prioridad"];

/// First and last-exclusive grid hours. Rows run 08:00 through 17:00.
pub const DAY_START_HOUR: u32 = 8;
pub const DAY_END_HOUR: u32 = 18;

pub const DEFAULT_DURATION_MIN: i64 = 30;

/// One calendar entry in local wall-clock time. `id` is `None` while the
/// entry is still an unsaved draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    pub title: String,
    pub specialist: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub patient_id: Option<i64>,
    pub online: bool,
}

impl Event {
    /// Map a wire appointment into the grid. Entries whose datetimes do not
    /// parse are dropped by the caller rather than rendered at a bogus slot.
    pub fn from_appointment(appointment: &Appointment) -> Option<Self> {
        let start = parse_wire_datetime(&appointment.start_at)?;
        let end = parse_wire_datetime(&appointment.end_at)?;
        Some(Self {
            id: Some(appointment.id),
            title: appointment.title.clone(),
            specialist: appointment.specialist.clone(),
            location: appointment.location.clone(),
            start,
            end,
            status: appointment.status.clone(),
            kind: appointment.kind.clone(),
            channel: appointment.channel.clone(),
            tags: appointment.tags.clone(),
            notes: appointment.notes.clone(),
            patient_id: appointment.patient_id,
            online: appointment.online,
        })
    }

    pub fn to_payload(&self) -> AppointmentPayload {
        AppointmentPayload {
            title: self.title.clone(),
            specialist: self.specialist.clone(),
            location: self.location.clone(),
            start_at: to_wire_datetime(self.start),
            end_at: to_wire_datetime(self.end),
            status: self.status.clone(),
            kind: self.kind.clone(),
            channel: self.channel.clone(),
            tags: self.tags.clone(),
            notes: self.notes.clone(),
            patient_id: self.patient_id,
            online: self.online,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether a duration chip should render active. Exact equality only: a
    /// hand-edited 25' entry lights no chip.
    pub fn duration_matches(&self, minutes: i64) -> bool {
        self.duration() == Duration::minutes(minutes)
    }
}

/// The editor draft is just an event that may not be saved yet.
pub type Draft = Event;

/// Monday of the week containing `date`. Sundays map back six days.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
}

/// Fresh draft at 09:00 today with the default duration and the first
/// specialist/location options preselected.
pub fn default_draft(today: NaiveDate) -> Draft {
    draft_at(at_hour(today, 9))
}

fn draft_at(start: NaiveDateTime) -> Draft {
    // Status, visit type and channel start unset; the user picks them in the
    // editor.
    Draft {
        id: None,
        title: String::new(),
        specialist: SPECIALISTS[0].to_string(),
        location: LOCATIONS[0].to_string(),
        start,
        end: start + Duration::minutes(DEFAULT_DURATION_MIN),
        status: String::new(),
        kind: String::new(),
        channel: String::new(),
        tags: Vec::new(),
        notes: String::new(),
        patient_id: None,
        online: false,
    }
}

/// Per-field draft edits shipped from the editor form. Only the fields
/// present in the message change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub specialist: Option<String>,
    pub location: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub channel: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub patient_id: Option<Option<i64>>,
    pub online: Option<bool>,
}

/// Everything the calendar screen renders, in one message.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub week_start: NaiveDate,
    pub week_days: Vec<NaiveDate>,
    pub hours: Vec<u32>,
    pub events: Vec<Event>,
    pub draft: Option<Draft>,
    pub editor_open: bool,
    pub patient_modal_open: bool,
    pub load_error: Option<String>,
    pub durations_min: Vec<i64>,
    pub specialists: Vec<String>,
    pub locations: Vec<String>,
    pub statuses: Vec<String>,
    pub visit_types: Vec<String>,
    pub channels: Vec<String>,
    pub tag_options: Vec<String>,
}

#[derive(Debug)]
pub struct SchedulerView {
    week_start: NaiveDate,
    events: Vec<Event>,
    draft: Option<Draft>,
    editor_open: bool,
    patient_modal_open: bool,
    load_error: Option<String>,
}

impl SchedulerView {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            week_start: start_of_week(today),
            events: Vec::new(),
            draft: None,
            editor_open: false,
            patient_modal_open: false,
            load_error: None,
        }
    }

    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    // =====================
    // Week navigation
    // =====================

    pub fn previous_week(&mut self) {
        self.week_start -= Duration::days(7);
    }

    pub fn next_week(&mut self) {
        self.week_start += Duration::days(7);
    }

    pub fn current_week(&mut self, today: NaiveDate) {
        self.week_start = start_of_week(today);
    }

    /// Half-open range covering the visible week, for the backend query.
    pub fn week_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        let start = at_hour(self.week_start, 0);
        (start, start + Duration::days(7))
    }

    pub fn week_days(&self) -> Vec<NaiveDate> {
        (0..7).map(|i| self.week_start + Duration::days(i)).collect()
    }

    // =====================
    // Events
    // =====================

    pub fn set_events(&mut self, events: Vec<Event>) {
        self.events = events;
        self.load_error = None;
    }

    pub fn set_load_error(&mut self, message: String) {
        self.events.clear();
        self.load_error = Some(message);
    }

    /// The event rendered in a grid cell: first loaded event starting on
    /// that day within that hour. Overlaps beyond the first are not drawn.
    pub fn event_at(&self, day: NaiveDate, hour: u32) -> Option<&Event> {
        self.events
            .iter()
            .find(|e| e.start.date() == day && e.start.hour() == hour)
    }

    // =====================
    // Editor
    // =====================

    /// Grid cell click. An occupied cell opens its event for editing; an
    /// empty one seeds a draft at that day and hour.
    pub fn open_cell(&mut self, day: NaiveDate, hour: u32) {
        self.draft = Some(match self.event_at(day, hour) {
            Some(event) => event.clone(),
            None => draft_at(at_hour(day, hour)),
        });
        self.editor_open = true;
    }

    /// "New appointment" button: today at 09:00.
    pub fn open_blank(&mut self, today: NaiveDate) {
        self.draft = Some(default_draft(today));
        self.editor_open = true;
    }

    pub fn close_editor(&mut self) {
        self.editor_open = false;
        self.draft = None;
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Apply form edits to the open draft. Moving the start keeps the
    /// current duration.
    pub fn update_draft(&mut self, patch: DraftPatch) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        if let Some(start) = patch.start {
            let duration = draft.duration();
            draft.start = start;
            draft.end = start + duration;
        }
        if let Some(title) = patch.title {
            draft.title = title;
        }
        if let Some(specialist) = patch.specialist {
            draft.specialist = specialist;
        }
        if let Some(location) = patch.location {
            draft.location = location;
        }
        if let Some(status) = patch.status {
            draft.status = status;
        }
        if let Some(kind) = patch.kind {
            draft.kind = kind;
        }
        if let Some(channel) = patch.channel {
            draft.channel = channel;
        }
        if let Some(tags) = patch.tags {
            draft.tags = tags;
        }
        if let Some(notes) = patch.notes {
            draft.notes = notes;
        }
        if let Some(patient_id) = patch.patient_id {
            draft.patient_id = patient_id;
        }
        if let Some(online) = patch.online {
            draft.online = online;
        }
    }

    /// Duration chip click: move the end, keep the start.
    pub fn set_duration(&mut self, minutes: i64) {
        if let Some(draft) = self.draft.as_mut() {
            draft.end = draft.start + Duration::minutes(minutes);
        }
    }

    /// Payload for the save call, or the validation message to show.
    pub fn draft_payload(&self) -> Result<(Option<i64>, AppointmentPayload), String> {
        let draft = self.draft.as_ref().ok_or("no appointment open")?;
        if draft.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        Ok((draft.id, draft.to_payload()))
    }

    /// Fold the backend's save response back into the grid: replace the
    /// matching event by id, or append for a newly created one. Closes the
    /// editor either way.
    pub fn apply_saved(&mut self, saved: Event) {
        match saved
            .id
            .and_then(|id| self.events.iter().position(|e| e.id == Some(id)))
        {
            Some(index) => self.events[index] = saved,
            None => self.events.push(saved),
        }
        self.close_editor();
    }

    /// Drop a cancelled appointment from the grid after the backend delete.
    pub fn remove_event(&mut self, id: i64) {
        self.events.retain(|e| e.id != Some(id));
        self.close_editor();
    }

    // =====================
    // Quick patient creation
    // =====================

    pub fn open_patient_modal(&mut self) {
        self.patient_modal_open = true;
    }

    pub fn close_patient_modal(&mut self) {
        self.patient_modal_open = false;
    }

    /// After quick-creating a patient, link them to the draft and take their
    /// full name as the title, replacing whatever was typed.
    pub fn seed_patient(&mut self, id: i64, full_name: &str) {
        self.patient_modal_open = false;
        if let Some(draft) = self.draft.as_mut() {
            draft.patient_id = Some(id);
            draft.title = full_name.to_string();
        }
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            week_start: self.week_start,
            week_days: self.week_days(),
            hours: (DAY_START_HOUR..DAY_END_HOUR).collect(),
            events: self.events.clone(),
            draft: self.draft.clone(),
            editor_open: self.editor_open,
            patient_modal_open: self.patient_modal_open,
            load_error: self.load_error.clone(),
            durations_min: DURATIONS_MIN.to_vec(),
            specialists: SPECIALISTS.iter().map(|s| s.to_string()).collect(),
            locations: LOCATIONS.iter().map(|s| s.to_string()).collect(),
            statuses: STATUSES.iter().map(|s| s.to_string()).collect(),
            visit_types: VISIT_TYPES.iter().map(|s| s.to_string()).collect(),
            channels: CHANNELS.iter().map(|s| s.to_string()).collect(),
            tag_options: TAG_OPTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

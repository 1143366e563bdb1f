use crate::{
    domain::entity::{Entity, EntityKind, Staged},
    events::{EntityChange, StoreEvent},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Status of a workshop appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Cancelled appointments no longer hold their time window
    pub fn blocks_time(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "Scheduled"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "confirmed" => Ok(Self::Confirmed),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!(
                "Invalid status '{}'. Valid statuses: scheduled, confirmed, in-progress, completed, cancelled",
                s
            )),
        }
    }
}

/// A booked workshop slot for one mechanic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub mechanic: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields supplied when booking; id and timestamps are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub mechanic: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub client_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub service_id: Option<String>,
    pub notes: Option<String>,
    pub column_id: Option<Uuid>,
}

impl NewAppointment {
    pub fn new(mechanic: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            mechanic: mechanic.into(),
            start_time,
            end_time,
            status: AppointmentStatus::Scheduled,
            client_id: None,
            vehicle_id: None,
            service_id: None,
            notes: None,
            column_id: None,
        }
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }

    pub fn with_service(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn in_column(mut self, column_id: Uuid) -> Self {
        self.column_id = Some(column_id);
        self
    }
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentPatch {
    pub mechanic: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub client_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub service_id: Option<String>,
    pub notes: Option<String>,
    pub column_id: Option<Uuid>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn times(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    /// Touches the time window or the mechanic, so it needs a conflict check
    pub fn affects_schedule(&self) -> bool {
        self.mechanic.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
            || self.status.is_some()
    }
}

impl Entity for Appointment {
    type Draft = NewAppointment;
    type Patch = AppointmentPatch;

    const KIND: EntityKind = EntityKind::Appointment;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: NewAppointment) -> Self {
        Self {
            id,
            mechanic: draft.mechanic,
            start_time: draft.start_time,
            end_time: draft.end_time,
            status: draft.status,
            client_id: draft.client_id,
            vehicle_id: draft.vehicle_id,
            service_id: draft.service_id,
            notes: draft.notes,
            column_id: draft.column_id,
            created_at,
            updated_at: None,
        }
    }

    fn apply_patch(&mut self, patch: AppointmentPatch, now: DateTime<Utc>) {
        if let Some(mechanic) = patch.mechanic {
            self.mechanic = mechanic;
        }
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.client_id.is_some() {
            self.client_id = patch.client_id;
        }
        if patch.vehicle_id.is_some() {
            self.vehicle_id = patch.vehicle_id;
        }
        if patch.service_id.is_some() {
            self.service_id = patch.service_id;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }
        if patch.column_id.is_some() {
            self.column_id = patch.column_id;
        }
        self.updated_at = Some(now);
    }

    fn into_event(change: EntityChange<Self>) -> StoreEvent {
        StoreEvent::Appointment(change)
    }

    fn from_event(event: &StoreEvent) -> Option<&EntityChange<Self>> {
        match event {
            StoreEvent::Appointment(change) => Some(change),
            _ => None,
        }
    }
}

impl Staged for Appointment {
    fn column_id(&self) -> Option<Uuid> {
        self.column_id
    }

    fn set_column_id(&mut self, column_id: Uuid, now: DateTime<Utc>) {
        self.column_id = Some(column_id);
        self.updated_at = Some(now);
    }
}

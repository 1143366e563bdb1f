use crate::{
    domain::entity::{Entity, EntityKind, Staged},
    events::{EntityChange, StoreEvent},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prospective customer tracked on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    pub column_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vehicle: Option<String>,
    pub column_id: Uuid,
}

impl NewLead {
    pub fn new(name: impl Into<String>, column_id: Uuid) -> Self {
        Self {
            name: name.into(),
            phone: None,
            email: None,
            vehicle: None,
            column_id,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vehicle: Option<String>,
    pub column_id: Option<Uuid>,
}

impl Entity for Lead {
    type Draft = NewLead;
    type Patch = LeadPatch;

    const KIND: EntityKind = EntityKind::Lead;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: NewLead) -> Self {
        Self {
            id,
            name: draft.name,
            phone: draft.phone,
            email: draft.email,
            vehicle: draft.vehicle,
            column_id: draft.column_id,
            created_at,
            updated_at: None,
        }
    }

    fn apply_patch(&mut self, patch: LeadPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if patch.phone.is_some() {
            self.phone = patch.phone;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.vehicle.is_some() {
            self.vehicle = patch.vehicle;
        }
        if let Some(column_id) = patch.column_id {
            self.column_id = column_id;
        }
        self.updated_at = Some(now);
    }

    fn into_event(change: EntityChange<Self>) -> StoreEvent {
        StoreEvent::Lead(change)
    }

    fn from_event(event: &StoreEvent) -> Option<&EntityChange<Self>> {
        match event {
            StoreEvent::Lead(change) => Some(change),
            _ => None,
        }
    }
}

impl Staged for Lead {
    fn column_id(&self) -> Option<Uuid> {
        Some(self.column_id)
    }

    fn set_column_id(&mut self, column_id: Uuid, now: DateTime<Utc>) {
        self.column_id = column_id;
        self.updated_at = Some(now);
    }
}

//! Change events emitted by entity stores.
//!
//! Every mutation produces one [`StoreEvent`]: a closed set of variants, one
//! per entity kind, each carrying a typed [`EntityChange`]. The event is
//! published on its kind-specific [`Topic`] (e.g. `appointments:created`) and
//! then on the global `storage:updated` topic.

pub mod bus;

pub use bus::{EventBus, Handler, Subscription, SubscriptionGuard};

use crate::domain::{Appointment, BoardColumn, Entity, EntityKind, Lead};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreAction {
    Created,
    Updated,
    Deleted,
    Imported,
    Cleared,
}

impl StoreAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Imported => "imported",
            Self::Cleared => "cleared",
        }
    }
}

impl fmt::Display for StoreAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one entity kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "item", rename_all = "lowercase")]
pub enum EntityChange<T> {
    Created(T),
    Updated(T),
    /// Carries the record as it was before removal
    Deleted(T),
    Imported { count: usize },
    Cleared,
}

impl<T> EntityChange<T> {
    pub fn action(&self) -> StoreAction {
        match self {
            Self::Created(_) => StoreAction::Created,
            Self::Updated(_) => StoreAction::Updated,
            Self::Deleted(_) => StoreAction::Deleted,
            Self::Imported { .. } => StoreAction::Imported,
            Self::Cleared => StoreAction::Cleared,
        }
    }

    pub fn item(&self) -> Option<&T> {
        match self {
            Self::Created(item) | Self::Updated(item) | Self::Deleted(item) => Some(item),
            Self::Imported { .. } | Self::Cleared => None,
        }
    }
}

/// Tagged union of every change the stores can emit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entity_kind", content = "change", rename_all = "snake_case")]
pub enum StoreEvent {
    Appointment(EntityChange<Appointment>),
    BoardColumn(EntityChange<BoardColumn>),
    Lead(EntityChange<Lead>),
}

impl StoreEvent {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Appointment(_) => EntityKind::Appointment,
            Self::BoardColumn(_) => EntityKind::BoardColumn,
            Self::Lead(_) => EntityKind::Lead,
        }
    }

    pub fn action(&self) -> StoreAction {
        match self {
            Self::Appointment(change) => change.action(),
            Self::BoardColumn(change) => change.action(),
            Self::Lead(change) => change.action(),
        }
    }

    /// Id of the affected record, if the change concerns a single record
    pub fn entity_id(&self) -> Option<Uuid> {
        match self {
            Self::Appointment(change) => change.item().map(Entity::id),
            Self::BoardColumn(change) => change.item().map(Entity::id),
            Self::Lead(change) => change.item().map(Entity::id),
        }
    }

    /// Kind-specific topic of this event
    pub fn topic(&self) -> Topic {
        Topic::Entity(self.kind(), self.action())
    }
}

/// Subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Entity(EntityKind, StoreAction),
    /// Receives every store event regardless of kind
    StorageUpdated,
}

impl Topic {
    pub fn of<T: Entity>(action: StoreAction) -> Self {
        Self::Entity(T::KIND, action)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(kind, action) => write!(f, "{}:{}", kind.storage_name(), action),
            Self::StorageUpdated => write!(f, "storage:updated"),
        }
    }
}

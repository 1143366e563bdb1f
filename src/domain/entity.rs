use crate::events::{EntityChange, StoreEvent};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical type of a stored record. Each kind has its own durable key and
/// topic namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Appointment,
    BoardColumn,
    Lead,
}

impl EntityKind {
    /// Name used for durable keys and topic prefixes
    pub fn storage_name(&self) -> &'static str {
        match self {
            Self::Appointment => "appointments",
            Self::BoardColumn => "columns",
            Self::Lead => "leads",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Appointment => write!(f, "appointment"),
            Self::BoardColumn => write!(f, "column"),
            Self::Lead => write!(f, "lead"),
        }
    }
}

/// A record managed by an [`EntityStore`](crate::store::EntityStore).
///
/// `Draft` is what callers supply to `add` (no id, no timestamps) and `Patch`
/// is the partial update merged by `update`. The event conversions tie each
/// kind to its variant of [`StoreEvent`].
pub trait Entity:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Draft: Send;
    type Patch: Send;

    const KIND: EntityKind;

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: Self::Draft) -> Self;

    /// Merges the patch and stamps `updated_at`
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    fn into_event(change: EntityChange<Self>) -> StoreEvent;

    fn from_event(event: &StoreEvent) -> Option<&EntityChange<Self>>;
}

/// Entities that sit in a board column
pub trait Staged: Entity {
    fn column_id(&self) -> Option<Uuid>;

    fn set_column_id(&mut self, column_id: Uuid, now: DateTime<Utc>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(EntityKind::Appointment.storage_name(), "appointments");
        assert_eq!(EntityKind::BoardColumn.storage_name(), "columns");
        assert_eq!(EntityKind::Lead.to_string(), "lead");
    }
}

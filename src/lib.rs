//! # Shopfloor Core
//!
//! Data and scheduling core for workshop dashboards.
//!
//! This crate provides durable per-kind entity stores that publish typed
//! change events, appointment scheduling with per-mechanic conflict checks
//! and slot generation, and an ordered stage board for the sales pipeline,
//! without any dependency on a specific UI or storage backend.

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod registry;
pub mod scheduling;
pub mod stages;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::{BusinessHours, ShopConfig};
pub use domain::{
    appointment::{Appointment, AppointmentPatch, AppointmentStatus, NewAppointment},
    board::{BoardColumn, ColumnPatch, NewColumn},
    entity::{Entity, EntityKind, Staged},
    lead::{Lead, LeadPatch, NewLead},
};
pub use error::{Result, ShopError};
pub use events::{
    EntityChange, EventBus, StoreAction, StoreEvent, Subscription, SubscriptionGuard, Topic,
};
pub use registry::StoreRegistry;
pub use scheduling::{AppointmentBook, Candidate, TimeRange, TimeSlot};
pub use stages::StageBoard;
pub use storage::DurableMedium;
pub use store::{ColumnDependents, EntityStore, WriteGuard};

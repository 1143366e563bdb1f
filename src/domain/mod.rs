pub mod appointment;
pub mod board;
pub mod entity;
pub mod lead;
pub mod sorting;

pub use appointment::{Appointment, AppointmentPatch, AppointmentStatus, NewAppointment};
pub use board::{BoardColumn, ColumnPatch, NewColumn};
pub use entity::{Entity, EntityKind, Staged};
pub use lead::{Lead, LeadPatch, NewLead};
pub use sorting::{sort_appointments, SortField, SortOrder};

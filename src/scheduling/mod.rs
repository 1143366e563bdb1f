//! Appointment scheduling.
//!
//! `interval` and `slots` are pure functions over a slice of appointments:
//! half-open overlap tests, conflict detection per mechanic, slot
//! enumeration within business hours. `book` wires them in front of the
//! appointment store so conflicting writes are rejected before they happen.

pub mod book;
pub mod interval;
pub mod slots;

pub use book::AppointmentBook;
pub use interval::{find_conflicts, has_conflict, Candidate, TimeRange};
pub use slots::{appointments_on_day, days_with_appointments, generate_slots, TimeSlot};

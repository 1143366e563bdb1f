use crate::{
    config::BusinessHours,
    domain::{Appointment, AppointmentPatch, AppointmentStatus, Entity, NewAppointment},
    error::{Result, ShopError},
    scheduling::{
        interval::{find_conflicts, has_conflict, Candidate, TimeRange},
        slots::{appointments_on_day, days_with_appointments, generate_slots, TimeSlot},
    },
    store::EntityStore,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::{collections::BTreeSet, sync::Arc};
use uuid::Uuid;

/// Appointment writes gated by the conflict check.
///
/// Every booking or reschedule is validated and checked against the current
/// set before anything is written; a rejected request leaves the store
/// untouched. The check and the write run under the appointment store's own
/// write lock, so they are atomic for every book built over the same store.
pub struct AppointmentBook {
    store: Arc<EntityStore<Appointment>>,
    hours: BusinessHours,
}

impl AppointmentBook {
    pub fn new(store: Arc<EntityStore<Appointment>>, hours: BusinessHours) -> Self {
        Self { store, hours }
    }

    pub fn store(&self) -> &Arc<EntityStore<Appointment>> {
        &self.store
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    pub async fn book(&self, draft: NewAppointment) -> Result<Appointment> {
        validate_window(&draft.mechanic, draft.start_time, draft.end_time)?;

        let appointment = self
            .store
            .modify(move |items, now| {
                if draft.status.blocks_time() {
                    reject_conflicts(&Candidate::from(&draft), items.as_slice(), None)?;
                }
                let appointment = Appointment::from_draft(Uuid::new_v4(), now, draft);
                items.push(appointment.clone());
                Ok(appointment)
            })
            .await?;

        tracing::info!(
            id = %appointment.id,
            mechanic = %appointment.mechanic,
            start = %appointment.start_time,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Applies `patch`, re-checking conflicts against every other
    /// appointment when the time window, mechanic or status change
    pub async fn reschedule(&self, id: Uuid, patch: AppointmentPatch) -> Result<Appointment> {
        self.store
            .modify(move |items, now| {
                let index = items
                    .iter()
                    .position(|appointment| appointment.id == id)
                    .ok_or_else(|| ShopError::not_found(Appointment::KIND.to_string(), id))?;

                let affects_schedule = patch.affects_schedule();
                let mut merged = items[index].clone();
                merged.apply_patch(patch, now);
                validate_window(&merged.mechanic, merged.start_time, merged.end_time)?;

                if affects_schedule && merged.status.blocks_time() {
                    reject_conflicts(&Candidate::from(&merged), items.as_slice(), Some(id))?;
                }

                items[index] = merged.clone();
                Ok(merged)
            })
            .await
    }

    /// Status change; moving a cancelled appointment back to an active
    /// status re-checks its window
    pub async fn set_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment> {
        self.reschedule(id, AppointmentPatch::status(status)).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Appointment> {
        self.set_status(id, AppointmentStatus::Cancelled).await
    }

    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        self.store.remove(id).await
    }

    /// Conflict check against the current set without writing anything
    pub async fn check(&self, candidate: &Candidate, exclude_id: Option<Uuid>) -> Result<bool> {
        let existing = self.store.get_all().await?;
        Ok(has_conflict(candidate, &existing, exclude_id))
    }

    pub async fn available_slots(&self, day: NaiveDate, mechanic: Option<&str>) -> Result<Vec<TimeSlot>> {
        let existing = self.store.get_all().await?;
        generate_slots(day, &self.hours, &existing, mechanic)
    }

    pub async fn days_with_appointments(
        &self,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>> {
        let existing = self.store.get_all().await?;
        days_with_appointments(range_start, range_end, &existing, &self.hours)
    }

    pub async fn appointments_on(&self, day: NaiveDate) -> Result<Vec<Appointment>> {
        let existing = self.store.get_all().await?;
        appointments_on_day(day, &existing, &self.hours)
    }

    pub async fn for_mechanic(&self, mechanic: &str) -> Result<Vec<Appointment>> {
        self.store
            .query(|appointment| appointment.mechanic == mechanic)
            .await
    }
}

fn validate_window(mechanic: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if mechanic.trim().is_empty() {
        return Err(ShopError::IncompleteAppointment("mechanic".to_string()));
    }
    TimeRange::new(start, end)?;
    Ok(())
}

fn reject_conflicts(candidate: &Candidate, existing: &[Appointment], exclude_id: Option<Uuid>) -> Result<()> {
    if let Some(conflict) = find_conflicts(candidate, existing, exclude_id).next() {
        tracing::debug!(
            mechanic = ?candidate.mechanic,
            conflicting_id = %conflict.id,
            "rejecting overlapping appointment"
        );
        return Err(ShopError::TimeConflict {
            mechanic: conflict.mechanic.clone(),
            start: conflict.start_time.to_rfc3339(),
            end: conflict.end_time.to_rfc3339(),
            conflicting_id: conflict.id.to_string(),
        });
    }
    Ok(())
}

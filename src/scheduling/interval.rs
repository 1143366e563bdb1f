use crate::{
    domain::{Appointment, NewAppointment},
    error::{Result, ShopError},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Fails with `InvalidTimeRange` unless `end` is strictly after `start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(ShopError::InvalidTimeRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Back-to-back ranges (one ends where the other starts) do not overlap
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// The parts of a prospective appointment the conflict check looks at.
/// Any missing field makes the candidate incomplete, and incomplete
/// candidates never conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub mechanic: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn new(mechanic: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            mechanic: Some(mechanic.into()),
            start_time: Some(start_time),
            end_time: Some(end_time),
        }
    }

    fn complete(&self) -> Option<(&str, TimeRange)> {
        let mechanic = self.mechanic.as_deref().filter(|m| !m.is_empty())?;
        let start = self.start_time?;
        let end = self.end_time?;
        Some((mechanic, TimeRange { start, end }))
    }
}

impl From<&Appointment> for Candidate {
    fn from(appointment: &Appointment) -> Self {
        Self::new(
            appointment.mechanic.clone(),
            appointment.start_time,
            appointment.end_time,
        )
    }
}

impl From<&NewAppointment> for Candidate {
    fn from(draft: &NewAppointment) -> Self {
        Self::new(draft.mechanic.clone(), draft.start_time, draft.end_time)
    }
}

/// Existing appointments that block `candidate`.
///
/// An appointment blocks when the mechanic name matches exactly
/// (case-sensitive), it is not cancelled, its id is not `exclude_id`, and
/// the two half-open intervals overlap.
pub fn find_conflicts<'a>(
    candidate: &'a Candidate,
    existing: &'a [Appointment],
    exclude_id: Option<Uuid>,
) -> impl Iterator<Item = &'a Appointment> + 'a {
    let complete = candidate.complete();
    existing.iter().filter(move |appointment| {
        let Some((mechanic, range)) = complete else {
            return false;
        };
        appointment.mechanic == mechanic
            && appointment.status.blocks_time()
            && Some(appointment.id) != exclude_id
            && range.overlaps(&TimeRange {
                start: appointment.start_time,
                end: appointment.end_time,
            })
    })
}

pub fn has_conflict(
    candidate: &Candidate,
    existing: &[Appointment],
    exclude_id: Option<Uuid>,
) -> bool {
    find_conflicts(candidate, existing, exclude_id).next().is_some()
}

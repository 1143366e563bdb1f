use crate::domain::appointment::{Appointment, AppointmentStatus};
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for ordering agenda listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Start,
    End,
    Mechanic,
    Status,
    Created,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(SortField::Start),
            "end" => Ok(SortField::End),
            "mechanic" => Ok(SortField::Mechanic),
            "status" => Ok(SortField::Status),
            "created" => Ok(SortField::Created),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: start, end, mechanic, status, created",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

/// Sorts appointments in place.
///
/// Ties on the chosen field are broken by start time and then id, so the
/// result is the same for any input permutation.
///
/// # Examples
/// ```
/// use chrono::{Duration, Utc};
/// use shopfloor_core::domain::sorting::{sort_appointments, SortField, SortOrder};
/// use shopfloor_core::domain::{Appointment, Entity, NewAppointment};
/// use uuid::Uuid;
///
/// let now = Utc::now();
/// let late = Appointment::from_draft(
///     Uuid::new_v4(),
///     now,
///     NewAppointment::new("Ana", now + Duration::hours(3), now + Duration::hours(4)),
/// );
/// let early = Appointment::from_draft(
///     Uuid::new_v4(),
///     now,
///     NewAppointment::new("Ana", now, now + Duration::hours(1)),
/// );
/// let mut agenda = vec![late, early.clone()];
///
/// sort_appointments(&mut agenda, SortField::Start, SortOrder::Ascending);
/// assert_eq!(agenda[0].id, early.id);
/// ```
pub fn sort_appointments(appointments: &mut [Appointment], field: SortField, order: SortOrder) {
    appointments.sort_by(|a, b| {
        let cmp = match field {
            SortField::Start => a.start_time.cmp(&b.start_time),
            SortField::End => a.end_time.cmp(&b.end_time),
            SortField::Mechanic => a.mechanic.to_lowercase().cmp(&b.mechanic.to_lowercase()),
            SortField::Status => compare_status(&a.status, &b.status),
            SortField::Created => a.created_at.cmp(&b.created_at),
        }
        .then_with(|| a.start_time.cmp(&b.start_time))
        .then_with(|| a.id.cmp(&b.id));

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Status order follows the workshop flow:
/// Scheduled → Confirmed → InProgress → Completed → Cancelled
fn compare_status(a: &AppointmentStatus, b: &AppointmentStatus) -> Ordering {
    fn status_order(s: &AppointmentStatus) -> u8 {
        match s {
            AppointmentStatus::Scheduled => 0,
            AppointmentStatus::Confirmed => 1,
            AppointmentStatus::InProgress => 2,
            AppointmentStatus::Completed => 3,
            AppointmentStatus::Cancelled => 4,
        }
    }
    status_order(a).cmp(&status_order(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{appointment::NewAppointment, entity::Entity};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn appointment(mechanic: &str, start_offset_hours: i64, status: AppointmentStatus) -> Appointment {
        let base = Utc::now();
        let start = base + Duration::hours(start_offset_hours);
        Appointment::from_draft(
            Uuid::new_v4(),
            base,
            NewAppointment::new(mechanic, start, start + Duration::minutes(30)).with_status(status),
        )
    }

    #[test]
    fn test_sort_by_start_descending() {
        let mut agenda = vec![
            appointment("Ana", 1, AppointmentStatus::Scheduled),
            appointment("Ana", 3, AppointmentStatus::Scheduled),
            appointment("Ana", 2, AppointmentStatus::Scheduled),
        ];
        let latest = agenda[1].id;

        sort_appointments(&mut agenda, SortField::Start, SortOrder::Descending);

        assert_eq!(agenda[0].id, latest);
        assert!(agenda[1].start_time > agenda[2].start_time);
    }

    #[test]
    fn test_sort_by_mechanic_case_insensitive() {
        let mut agenda = vec![
            appointment("carlos", 1, AppointmentStatus::Scheduled),
            appointment("Ana", 2, AppointmentStatus::Scheduled),
            appointment("BEA", 3, AppointmentStatus::Scheduled),
        ];

        sort_appointments(&mut agenda, SortField::Mechanic, SortOrder::Ascending);

        let names: Vec<&str> = agenda.iter().map(|a| a.mechanic.as_str()).collect();
        assert_eq!(names, vec!["Ana", "BEA", "carlos"]);
    }

    #[test]
    fn test_sort_by_status_workflow_order() {
        let mut agenda = vec![
            appointment("Ana", 1, AppointmentStatus::Cancelled),
            appointment("Ana", 2, AppointmentStatus::InProgress),
            appointment("Ana", 3, AppointmentStatus::Scheduled),
        ];

        sort_appointments(&mut agenda, SortField::Status, SortOrder::Ascending);

        assert_eq!(agenda[0].status, AppointmentStatus::Scheduled);
        assert_eq!(agenda[1].status, AppointmentStatus::InProgress);
        assert_eq!(agenda[2].status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn test_compare_status_ordering() {
        assert_eq!(
            compare_status(&AppointmentStatus::Scheduled, &AppointmentStatus::Confirmed),
            Ordering::Less
        );
        assert_eq!(
            compare_status(&AppointmentStatus::Cancelled, &AppointmentStatus::Completed),
            Ordering::Greater
        );
        assert_eq!(
            compare_status(&AppointmentStatus::InProgress, &AppointmentStatus::InProgress),
            Ordering::Equal
        );
    }

    #[test]
    fn test_parse_sort_options() {
        assert_eq!("START".parse::<SortField>().unwrap(), SortField::Start);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("ac-count".parse::<SortField>().is_err());
    }
}

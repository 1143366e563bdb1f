use crate::{
    config::BusinessHours,
    domain::Appointment,
    error::Result,
    scheduling::interval::{has_conflict, Candidate},
};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::BTreeSet;

/// One bookable window of a day view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub time: NaiveTime,
    /// "HH:MM" on the shop's wall clock
    pub label: String,
    pub available: bool,
}

/// Enumerates every `interval_minutes`-aligned slot from opening time up to
/// (not including) closing time on `day`.
///
/// A slot is unavailable when `[slot, slot + interval)` conflicts with an
/// existing appointment of `mechanic`. With no mechanic the candidate is
/// incomplete, so every slot comes back available.
pub fn generate_slots(
    day: NaiveDate,
    hours: &BusinessHours,
    existing: &[Appointment],
    mechanic: Option<&str>,
) -> Result<Vec<TimeSlot>> {
    hours.validate()?;

    let interval = hours.interval_minutes;
    let mut slots = Vec::new();
    let mut minute = hours.start_hour * 60;
    let close = hours.end_hour * 60;

    while minute < close {
        let Some(time) = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0) else {
            break;
        };
        let start = hours.instant_at(day, time)?;
        let candidate = Candidate {
            mechanic: mechanic.map(str::to_string),
            start_time: Some(start),
            end_time: Some(start + Duration::minutes(i64::from(interval))),
        };

        slots.push(TimeSlot {
            time,
            label: time.format("%H:%M").to_string(),
            available: !has_conflict(&candidate, existing, None),
        });
        minute += interval;
    }

    Ok(slots)
}

/// Dates in `[range_start, range_end]` (inclusive, shop wall clock) on which
/// at least one appointment starts, whatever its status.
pub fn days_with_appointments(
    range_start: NaiveDate,
    range_end: NaiveDate,
    appointments: &[Appointment],
    hours: &BusinessHours,
) -> Result<BTreeSet<NaiveDate>> {
    let mut days = BTreeSet::new();
    if range_end < range_start {
        return Ok(days);
    }
    for appointment in appointments {
        let day = hours.local_date(appointment.start_time)?;
        if range_start <= day && day <= range_end {
            days.insert(day);
        }
    }
    Ok(days)
}

/// Appointments starting on `day`, ordered by start time
pub fn appointments_on_day(
    day: NaiveDate,
    appointments: &[Appointment],
    hours: &BusinessHours,
) -> Result<Vec<Appointment>> {
    let mut on_day = Vec::new();
    for appointment in appointments {
        if hours.local_date(appointment.start_time)? == day {
            on_day.push(appointment.clone());
        }
    }
    on_day.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
    Ok(on_day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AppointmentStatus, Entity, NewAppointment};
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn at(d: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&d.and_hms_opt(hour, minute, 0).unwrap())
    }

    fn booked(mechanic: &str, start: DateTime<Utc>, end: DateTime<Utc>, status: AppointmentStatus) -> Appointment {
        Appointment::from_draft(
            Uuid::new_v4(),
            Utc::now(),
            NewAppointment::new(mechanic, start, end).with_status(status),
        )
    }

    fn unavailable(slots: &[TimeSlot]) -> Vec<&str> {
        slots
            .iter()
            .filter(|s| !s.available)
            .map(|s| s.label.as_str())
            .collect()
    }

    #[test]
    fn test_reference_day_marks_booked_hour() {
        let existing = vec![booked(
            "Carlos",
            at(day(), 9, 0),
            at(day(), 10, 0),
            AppointmentStatus::Scheduled,
        )];

        let slots = generate_slots(day(), &BusinessHours::default(), &existing, Some("Carlos")).unwrap();

        assert_eq!(slots.len(), 20);
        assert_eq!(slots[0].label, "08:00");
        assert_eq!(slots.last().unwrap().label, "17:30");
        assert_eq!(unavailable(&slots), vec!["09:00", "09:30"]);
        for label in ["08:00", "08:30", "10:00", "10:30"] {
            assert!(slots.iter().any(|s| s.label == label && s.available));
        }
    }

    #[test]
    fn test_other_mechanic_sees_free_day() {
        let existing = vec![booked(
            "Carlos",
            at(day(), 9, 0),
            at(day(), 10, 0),
            AppointmentStatus::Scheduled,
        )];

        let slots = generate_slots(day(), &BusinessHours::default(), &existing, Some("Ana")).unwrap();
        assert!(slots.iter().all(|s| s.available));

        let unassigned = generate_slots(day(), &BusinessHours::default(), &existing, None).unwrap();
        assert!(unassigned.iter().all(|s| s.available));
    }

    #[test]
    fn test_partial_overlap_blocks_slot() {
        let existing = vec![booked(
            "Ana",
            at(day(), 11, 15),
            at(day(), 11, 45),
            AppointmentStatus::Confirmed,
        )];

        let slots = generate_slots(day(), &BusinessHours::default(), &existing, Some("Ana")).unwrap();
        assert_eq!(unavailable(&slots), vec!["11:00", "11:30"]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let existing = vec![
            booked("Ana", at(day(), 9, 0), at(day(), 10, 0), AppointmentStatus::Scheduled),
            booked("Ana", at(day(), 13, 0), at(day(), 14, 30), AppointmentStatus::Cancelled),
        ];
        let hours = BusinessHours::new(7, 19, 15);

        let first = generate_slots(day(), &hours, &existing, Some("Ana")).unwrap();
        let second = generate_slots(day(), &hours, &existing, Some("Ana")).unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.len(), 48);
    }

    #[test]
    fn test_uneven_interval_stops_before_close() {
        let slots = generate_slots(day(), &BusinessHours::new(8, 10, 45), &[], None).unwrap();
        let labels: Vec<&str> = slots.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["08:00", "08:45", "09:30"]);
    }

    #[test]
    fn test_offset_shifts_slot_instants() {
        // Shop runs at UTC-3: 09:00 local is 12:00 UTC
        let hours = BusinessHours::default().with_utc_offset(-180);
        let existing = vec![booked(
            "Carlos",
            at(day(), 12, 0),
            at(day(), 13, 0),
            AppointmentStatus::Scheduled,
        )];

        let slots = generate_slots(day(), &hours, &existing, Some("Carlos")).unwrap();
        assert_eq!(unavailable(&slots), vec!["09:00", "09:30"]);
    }

    #[test]
    fn test_invalid_hours_are_rejected() {
        assert!(generate_slots(day(), &BusinessHours::new(8, 18, 0), &[], None).is_err());
        assert!(generate_slots(day(), &BusinessHours::new(8, 18, u32::MAX), &[], None).is_err());
    }

    #[test]
    fn test_interval_spanning_the_whole_day() {
        let slots = generate_slots(day(), &BusinessHours::new(8, 18, 600), &[], None).unwrap();
        let labels: Vec<&str> = slots.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["08:00"]);
    }

    #[test]
    fn test_days_with_appointments() {
        let may_6 = day();
        let may_8 = NaiveDate::from_ymd_opt(2024, 5, 8).unwrap();
        let june_1 = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let appointments = vec![
            booked("Ana", at(may_6, 9, 0), at(may_6, 10, 0), AppointmentStatus::Scheduled),
            booked("Bea", at(may_6, 15, 0), at(may_6, 16, 0), AppointmentStatus::Scheduled),
            booked("Ana", at(may_8, 9, 0), at(may_8, 10, 0), AppointmentStatus::Cancelled),
            booked("Ana", at(june_1, 9, 0), at(june_1, 10, 0), AppointmentStatus::Scheduled),
        ];

        let days = days_with_appointments(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            &appointments,
            &BusinessHours::default(),
        )
        .unwrap();

        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![may_6, may_8]);
    }

    #[test]
    fn test_days_with_appointments_empty_range() {
        let appointments = vec![booked(
            "Ana",
            at(day(), 9, 0),
            at(day(), 10, 0),
            AppointmentStatus::Scheduled,
        )];
        let before = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let days = days_with_appointments(day(), before, &appointments, &BusinessHours::default()).unwrap();
        assert!(days.is_empty());
    }

    #[test]
    fn test_appointments_on_day_sorted() {
        let next = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let late = booked("Ana", at(day(), 16, 0), at(day(), 17, 0), AppointmentStatus::Scheduled);
        let early = booked("Bea", at(day(), 8, 0), at(day(), 9, 0), AppointmentStatus::Scheduled);
        let other_day = booked("Ana", at(next, 8, 0), at(next, 9, 0), AppointmentStatus::Scheduled);

        let on_day = appointments_on_day(
            day(),
            &[late.clone(), other_day, early.clone()],
            &BusinessHours::default(),
        )
        .unwrap();

        assert_eq!(on_day, vec![early, late]);
    }
}

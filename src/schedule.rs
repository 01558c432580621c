//! Nurse schedule: the two-week calendar, today's agenda on the home
//! screen, and visit history.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::api::{ApiError, NursingBackend};
use crate::models::{Appointment, AppointmentStatus};

/// Days after today covered by the schedule calendar.
pub const SCHEDULE_WINDOW_DAYS: u64 = 14;
/// Days after today covered by the home agenda.
pub const HOME_WINDOW_DAYS: u64 = 1;

/// Statuses a nurse sees on the schedule and home screens. `waiting` is
/// not assigned yet and `changed` has moved to another slot.
pub const VISIBLE_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Confirmed,
    AppointmentStatus::Upcoming,
    AppointmentStatus::Success,
];

pub fn is_visible(appointment: &Appointment) -> bool {
    VISIBLE_STATUSES.contains(&appointment.status)
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    fn starting(today: NaiveDate, days: u64) -> Self {
        Self {
            from: today,
            to: today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.from..=self.to).contains(&date)
    }
}

pub fn schedule_window(today: NaiveDate) -> DateWindow {
    DateWindow::starting(today, SCHEDULE_WINDOW_DAYS)
}

pub fn home_window(today: NaiveDate) -> DateWindow {
    DateWindow::starting(today, HOME_WINDOW_DAYS)
}

/// Visible appointments grouped by visit date, each day sorted by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleBook {
    days: BTreeMap<NaiveDate, Vec<Appointment>>,
}

impl ScheduleBook {
    pub fn new(appointments: impl IntoIterator<Item = Appointment>) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<Appointment>> = BTreeMap::new();
        for appointment in appointments.into_iter().filter(is_visible) {
            days.entry(appointment.scheduled_date())
                .or_default()
                .push(appointment);
        }
        for entries in days.values_mut() {
            entries.sort_by_key(|a| a.scheduled_at);
        }
        Self { days }
    }

    pub fn for_date(&self, date: NaiveDate) -> &[Appointment] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dates that have at least one visit, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn find(&self, appointment_id: &str) -> Option<&Appointment> {
        self.days
            .values()
            .flat_map(|entries| entries.iter())
            .find(|a| a.id == appointment_id)
    }
}

fn agenda_priority(status: AppointmentStatus) -> u8 {
    match status {
        AppointmentStatus::Confirmed => 1,
        AppointmentStatus::Upcoming => 2,
        AppointmentStatus::Success => 3,
        _ => u8::MAX,
    }
}

/// Home screen list: visible visits, confirmed first, then in-progress,
/// then finished; ties broken by time.
pub fn home_agenda(appointments: Vec<Appointment>) -> Vec<Appointment> {
    let mut agenda: Vec<Appointment> = appointments.into_iter().filter(is_visible).collect();
    agenda.sort_by_key(|a| (agenda_priority(a.status), a.scheduled_at));
    agenda
}

/// History, optionally narrowed to one day, newest first.
pub fn history_on(appointments: Vec<Appointment>, date: Option<NaiveDate>) -> Vec<Appointment> {
    let mut history: Vec<Appointment> = appointments
        .into_iter()
        .filter(|a| date.map_or(true, |d| a.scheduled_date() == d))
        .collect();
    history.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
    history
}

pub fn fetch_schedule(
    backend: &dyn NursingBackend,
    nurse_id: &str,
    today: NaiveDate,
) -> Result<ScheduleBook, ApiError> {
    let window = schedule_window(today);
    let appointments = backend.list_appointments(nurse_id, window.from, window.to)?;
    let book = ScheduleBook::new(appointments);
    tracing::debug!(nurse = nurse_id, visits = book.len(), days = book.dates().len(), "Schedule loaded");
    Ok(book)
}

pub fn fetch_home_agenda(
    backend: &dyn NursingBackend,
    nurse_id: &str,
    today: NaiveDate,
) -> Result<Vec<Appointment>, ApiError> {
    let window = home_window(today);
    let appointments = backend.list_appointments(nurse_id, window.from, window.to)?;
    Ok(home_agenda(appointments))
}

pub fn fetch_history(
    backend: &dyn NursingBackend,
    nurse_id: &str,
    date: Option<NaiveDate>,
) -> Result<Vec<Appointment>, ApiError> {
    Ok(history_on(backend.appointment_history(nurse_id)?, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::test_support::{appointment_at, at, NURSE_ID};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn windows_are_inclusive() {
        let w = schedule_window(day(1));
        assert_eq!(w.to, day(15));
        assert!(w.contains(day(1)) && w.contains(day(15)));
        assert!(!w.contains(day(16)));
        assert_eq!(home_window(day(1)).to, day(2));
    }

    #[test]
    fn book_groups_by_day_and_hides_waiting_and_changed() {
        let book = ScheduleBook::new(vec![
            appointment_at("late", AppointmentStatus::Confirmed, true, at(2025, 3, 8, 15, 0)),
            appointment_at("early", AppointmentStatus::Upcoming, true, at(2025, 3, 8, 7, 30)),
            appointment_at("next", AppointmentStatus::Success, true, at(2025, 3, 9, 9, 0)),
            appointment_at("wait", AppointmentStatus::Waiting, true, at(2025, 3, 8, 9, 0)),
            appointment_at("moved", AppointmentStatus::Changed, true, at(2025, 3, 8, 10, 0)),
        ]);

        assert_eq!(book.dates(), vec![day(8), day(9)]);
        let ids: Vec<_> = book.for_date(day(8)).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert!(book.for_date(day(10)).is_empty());
        assert!(book.find("wait").is_none());
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn home_agenda_orders_by_status_then_time() {
        let agenda = home_agenda(vec![
            appointment_at("done", AppointmentStatus::Success, true, at(2025, 3, 8, 7, 0)),
            appointment_at("going", AppointmentStatus::Upcoming, true, at(2025, 3, 8, 8, 0)),
            appointment_at("c2", AppointmentStatus::Confirmed, true, at(2025, 3, 8, 14, 0)),
            appointment_at("c1", AppointmentStatus::Confirmed, false, at(2025, 3, 8, 9, 0)),
            appointment_at("wait", AppointmentStatus::Waiting, true, at(2025, 3, 8, 6, 0)),
        ]);
        let ids: Vec<_> = agenda.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "going", "done"]);
    }

    #[test]
    fn history_filters_single_day() {
        let all = vec![
            appointment_at("a", AppointmentStatus::Success, true, at(2025, 3, 1, 8, 0)),
            appointment_at("b", AppointmentStatus::Success, true, at(2025, 3, 2, 8, 0)),
        ];
        assert_eq!(history_on(all.clone(), Some(day(2))).len(), 1);
        let ids: Vec<_> = history_on(all, None).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn fetch_schedule_queries_two_week_window() {
        let backend = MockBackend::new()
            .with_appointment(appointment_at("in", AppointmentStatus::Confirmed, true, at(2025, 3, 14, 8, 0)))
            .with_appointment(appointment_at("out", AppointmentStatus::Confirmed, true, at(2025, 3, 30, 8, 0)));

        let book = fetch_schedule(&backend, NURSE_ID, day(1)).unwrap();
        assert!(book.find("in").is_some());
        assert!(book.find("out").is_none());
        assert_eq!(backend.calls(), vec![format!("list_appointments:{NURSE_ID}")]);
    }
}

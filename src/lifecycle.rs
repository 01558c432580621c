//! Appointment status lifecycle as seen from the nurse's side.
//!
//! `waiting -> confirmed -> upcoming -> success`, with `changed` as a
//! server-only side exit. The client drives exactly one transition
//! (`confirmed -> upcoming`, starting the trip); every other move is
//! observed on refresh.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiError, NursingBackend};
use crate::geo::Coordinate;
use crate::models::{Appointment, AppointmentStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Cannot {action} an appointment that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: AppointmentStatus,
    },

    #[error("Appointment {0} is not paid yet")]
    PaymentRequired(String),

    #[error("Current location is required to start the trip")]
    LocationUnavailable,

    #[error("Could not start the trip: {0}")]
    TripStart(#[source] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    ViewRoute,
    StartTrip,
    OpenChecklist,
    SubmitReport,
    ViewFeedback,
    ViewReport,
}

/// Actions the detail screen offers for the appointment's current state.
pub fn available_actions(appointment: &Appointment) -> Vec<AppointmentAction> {
    use AppointmentAction::*;
    match appointment.status {
        AppointmentStatus::Waiting | AppointmentStatus::Changed => vec![],
        AppointmentStatus::Confirmed if appointment.is_paid() => vec![ViewRoute, StartTrip],
        AppointmentStatus::Confirmed => vec![ViewRoute],
        AppointmentStatus::Upcoming => vec![ViewRoute, OpenChecklist, SubmitReport],
        AppointmentStatus::Success => vec![ViewFeedback, ViewReport],
    }
}

/// `confirmed -> upcoming`. The local status only moves once the backend
/// accepts; on failure it stays `confirmed`.
pub fn start_trip(
    appointment: &mut Appointment,
    current_location: Option<Coordinate>,
    backend: &dyn NursingBackend,
) -> Result<(), LifecycleError> {
    if appointment.status != AppointmentStatus::Confirmed {
        tracing::debug!(appointment = %appointment.id, status = %appointment.status, "Start trip refused");
        return Err(LifecycleError::InvalidTransition {
            action: "start",
            status: appointment.status,
        });
    }
    if !appointment.is_paid() {
        return Err(LifecycleError::PaymentRequired(appointment.id.clone()));
    }
    if current_location.is_none() {
        return Err(LifecycleError::LocationUnavailable);
    }

    backend
        .start_appointment(&appointment.id)
        .map_err(LifecycleError::TripStart)?;
    appointment.status = AppointmentStatus::Upcoming;
    tracing::info!(appointment = %appointment.id, "Trip started");
    Ok(())
}

/// What a refresh revealed about an appointment's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusChange {
    Unchanged,
    Advanced {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    /// Moved to `changed` by staff.
    Rescheduled { from: AppointmentStatus },
    /// Went backwards on the server. Adopted anyway.
    Regressed {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

/// Adopt the server's view of an appointment.
pub fn apply_refresh(appointment: &mut Appointment, fetched: Appointment) -> StatusChange {
    let from = appointment.status;
    let to = fetched.status;
    let change = match (from.rank(), to.rank()) {
        _ if from == to => StatusChange::Unchanged,
        (_, None) => StatusChange::Rescheduled { from },
        (Some(a), Some(b)) if b > a => StatusChange::Advanced { from, to },
        _ => StatusChange::Regressed { from, to },
    };

    match change {
        StatusChange::Regressed { .. } => {
            tracing::warn!(appointment = %appointment.id, %from, %to, "Server moved appointment backwards");
        }
        StatusChange::Unchanged => {}
        _ => tracing::info!(appointment = %appointment.id, %from, %to, "Appointment status changed"),
    }
    *appointment = fetched;
    change
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::test_support::appointment;

    fn here() -> Option<Coordinate> {
        Coordinate::new(10.78, 106.69).ok()
    }

    #[test]
    fn start_trip_moves_confirmed_to_upcoming() {
        let mut appt = appointment("a1", AppointmentStatus::Confirmed, true);
        let backend = MockBackend::new().with_appointment(appt.clone());

        start_trip(&mut appt, here(), &backend).unwrap();

        assert_eq!(appt.status, AppointmentStatus::Upcoming);
        assert_eq!(backend.calls(), vec!["start_appointment:a1"]);
    }

    #[test]
    fn backend_failure_keeps_confirmed() {
        let mut appt = appointment("a1", AppointmentStatus::Confirmed, true);
        let backend = MockBackend::new().with_appointment(appt.clone());
        backend.fail_next("start_appointment", ApiError::Timeout(15));

        let err = start_trip(&mut appt, here(), &backend).unwrap_err();

        assert_eq!(err, LifecycleError::TripStart(ApiError::Timeout(15)));
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn start_trip_preconditions() {
        let backend = MockBackend::new();

        let mut unpaid = appointment("a1", AppointmentStatus::Confirmed, false);
        assert_eq!(
            start_trip(&mut unpaid, here(), &backend),
            Err(LifecycleError::PaymentRequired("a1".into()))
        );

        let mut no_gps = appointment("a2", AppointmentStatus::Confirmed, true);
        assert_eq!(
            start_trip(&mut no_gps, None, &backend),
            Err(LifecycleError::LocationUnavailable)
        );

        for status in [
            AppointmentStatus::Waiting,
            AppointmentStatus::Upcoming,
            AppointmentStatus::Success,
            AppointmentStatus::Changed,
        ] {
            let mut appt = appointment("a3", status, true);
            assert!(matches!(
                start_trip(&mut appt, here(), &backend),
                Err(LifecycleError::InvalidTransition { .. })
            ));
            assert_eq!(appt.status, status);
        }
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn actions_per_status() {
        use AppointmentAction::*;
        let cases = [
            (AppointmentStatus::Waiting, true, vec![]),
            (AppointmentStatus::Confirmed, true, vec![ViewRoute, StartTrip]),
            (AppointmentStatus::Confirmed, false, vec![ViewRoute]),
            (AppointmentStatus::Upcoming, true, vec![ViewRoute, OpenChecklist, SubmitReport]),
            (AppointmentStatus::Success, true, vec![ViewFeedback, ViewReport]),
            (AppointmentStatus::Changed, true, vec![]),
        ];
        for (status, paid, expected) in cases {
            assert_eq!(available_actions(&appointment("a", status, paid)), expected, "{status}");
        }
    }

    #[test]
    fn refresh_classifies_changes() {
        let mut appt = appointment("a1", AppointmentStatus::Upcoming, true);

        let change = apply_refresh(&mut appt, appointment("a1", AppointmentStatus::Success, true));
        assert_eq!(
            change,
            StatusChange::Advanced { from: AppointmentStatus::Upcoming, to: AppointmentStatus::Success }
        );
        assert_eq!(appt.status, AppointmentStatus::Success);

        let change = apply_refresh(&mut appt, appointment("a1", AppointmentStatus::Success, true));
        assert_eq!(change, StatusChange::Unchanged);

        let change = apply_refresh(&mut appt, appointment("a1", AppointmentStatus::Confirmed, true));
        assert!(matches!(change, StatusChange::Regressed { .. }));
        assert_eq!(appt.status, AppointmentStatus::Confirmed);

        let change = apply_refresh(&mut appt, appointment("a1", AppointmentStatus::Changed, true));
        assert_eq!(change, StatusChange::Rescheduled { from: AppointmentStatus::Confirmed });
    }
}

//! Transport-agnostic application state.
//!
//! `CoreState` is the single shared state behind the IPC commands. It
//! owns the backend client, the signed-in session and the one close-out
//! screen that may be open at a time. Backend calls are made without
//! holding any lock; results for a close-out screen that was closed or
//! replaced in the meantime are applied to whichever screen now shows the
//! same task, and rebuilt screens keep calls still in flight as pending.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{ApiError, HttpBackend, NursingBackend};
use crate::closeout::{CloseoutView, GateError, VisitCloseout};
use crate::config::{self, AppConfig, ConfigError};
use crate::db::DatabaseError;
use crate::directions::GoongDirections;
use crate::feedback::{self, FeedbackSummary, RatingFilter};
use crate::geo::{self, Coordinate, DirectionsProvider, GeoError, RouteSummary};
use crate::lifecycle::{self, LifecycleError, StatusChange};
use crate::models::{AccountInfo, Appointment, AppointmentStatus, Feedback, NurseProfile, PatientSummary};
use crate::schedule::{self, ScheduleBook};
use crate::session::{self, LoginForm, Session, SessionError, SessionStore};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Internal lock error")]
    LockPoisoned,

    #[error("The visit screen was closed")]
    ScreenClosed,

    #[error("Appointment {0} not found")]
    AppointmentNotFound(String),

    #[error("Visit tasks are not available while the appointment is {0}")]
    VisitNotActive(AppointmentStatus),

    #[error("Patient location is unknown")]
    PatientLocationUnknown,

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Close-out view plus what a refresh revealed.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshedCloseout {
    pub closeout: CloseoutView,
    pub change: StatusChange,
}

// ═══════════════════════════════════════════════════════════
// Close-out slot
// ═══════════════════════════════════════════════════════════

/// The open close-out screen plus the backend calls that outlive it.
#[derive(Default)]
struct CloseoutSlot {
    screen: Option<VisitCloseout>,
    /// Task ids whose `mark_task_done` call has not returned.
    confirming: HashSet<String>,
    /// Report id whose submission has not returned.
    submitting: Option<String>,
}

impl CloseoutSlot {
    fn screen_mut(&mut self, screen: Uuid) -> Result<&mut VisitCloseout, CoreError> {
        self.screen
            .as_mut()
            .filter(|c| c.screen() == screen)
            .ok_or(CoreError::ScreenClosed)
    }

    /// Show a freshly fetched screen, carrying over calls still in flight.
    fn install(&mut self, mut closeout: VisitCloseout) -> CloseoutView {
        closeout.checklist_mut().resume_confirming(&self.confirming);
        if let Some(report_id) = &self.submitting {
            closeout.report_parts().1.resume_submitting(report_id);
        }
        let view = closeout.view();
        self.screen = Some(closeout);
        view
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    backend: Arc<dyn NursingBackend>,
    directions: Arc<dyn DirectionsProvider>,
    session: RwLock<Option<Session>>,
    /// The open close-out screen, if any. Opening another replaces it.
    closeout: Mutex<CloseoutSlot>,
    store_path: PathBuf,
}

impl CoreState {
    /// Production wiring: HTTP backend, Goong directions, on-disk session.
    pub fn new(config: AppConfig) -> Result<Self, CoreError> {
        let backend = Arc::new(HttpBackend::new(&config.api)?);
        let directions = Arc::new(GoongDirections::new(&config.maps, config.api.timeout_secs)?);
        Ok(Self::with_parts(config, backend, directions, config::session_db_path()))
    }

    pub fn with_parts(
        config: AppConfig,
        backend: Arc<dyn NursingBackend>,
        directions: Arc<dyn DirectionsProvider>,
        store_path: PathBuf,
    ) -> Self {
        Self {
            config,
            backend,
            directions,
            session: RwLock::new(None),
            closeout: Mutex::new(CloseoutSlot::default()),
            store_path,
        }
    }

    pub fn backend(&self) -> &dyn NursingBackend {
        self.backend.as_ref()
    }

    fn open_store(&self) -> Result<SessionStore, CoreError> {
        Ok(SessionStore::open(&self.store_path)?)
    }

    fn lock_closeout(&self) -> Result<MutexGuard<'_, CloseoutSlot>, CoreError> {
        self.closeout.lock().map_err(|_| CoreError::LockPoisoned)
    }

    // ── Session ─────────────────────────────────────────────

    pub fn login(&self, form: &LoginForm) -> Result<AccountInfo, CoreError> {
        let store = self.open_store()?;
        let mut session = session::login(self.backend(), &store, form)?;
        session.profile = self.fetch_profile_quietly();
        let account = session.account.clone();
        self.replace_session(Some(session))?;
        Ok(account)
    }

    /// Resume the stored session on launch.
    pub fn restore(&self) -> Result<Option<AccountInfo>, CoreError> {
        let store = self.open_store()?;
        let Some(mut session) = session::restore(self.backend(), &store)? else {
            return Ok(None);
        };
        session.profile = self.fetch_profile_quietly();
        let account = session.account.clone();
        self.replace_session(Some(session))?;
        Ok(Some(account))
    }

    pub fn logout(&self) -> Result<(), CoreError> {
        let store = self.open_store()?;
        session::logout(self.backend(), &store)?;
        self.replace_session(None)
    }

    fn replace_session(&self, session: Option<Session>) -> Result<(), CoreError> {
        self.lock_closeout()?.screen = None;
        *self.session.write().map_err(|_| CoreError::LockPoisoned)? = session;
        Ok(())
    }

    fn fetch_profile_quietly(&self) -> Option<NurseProfile> {
        match self.backend.nurse_profile() {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Nurse profile unavailable");
                None
            }
        }
    }

    pub fn current_session(&self) -> Result<Session, CoreError> {
        self.session
            .read()
            .map_err(|_| CoreError::LockPoisoned)?
            .clone()
            .ok_or(CoreError::NotSignedIn)
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.read().map(|s| s.is_some()).unwrap_or(false)
    }

    fn nurse_id(&self) -> Result<String, CoreError> {
        Ok(self.current_session()?.nurse_id().to_string())
    }

    pub fn profile(&self) -> Result<NurseProfile, CoreError> {
        if let Some(profile) = self.current_session()?.profile {
            return Ok(profile);
        }
        let profile = self.backend.nurse_profile()?;
        if let Some(session) = self
            .session
            .write()
            .map_err(|_| CoreError::LockPoisoned)?
            .as_mut()
        {
            session.profile = Some(profile.clone());
        }
        Ok(profile)
    }

    // ── Schedule ────────────────────────────────────────────

    pub fn schedule(&self, today: NaiveDate) -> Result<ScheduleBook, CoreError> {
        let nurse_id = self.nurse_id()?;
        Ok(schedule::fetch_schedule(self.backend(), &nurse_id, today)?)
    }

    pub fn home_agenda(&self, today: NaiveDate) -> Result<Vec<Appointment>, CoreError> {
        let nurse_id = self.nurse_id()?;
        Ok(schedule::fetch_home_agenda(self.backend(), &nurse_id, today)?)
    }

    pub fn history(&self, date: Option<NaiveDate>) -> Result<Vec<Appointment>, CoreError> {
        let nurse_id = self.nurse_id()?;
        Ok(schedule::fetch_history(self.backend(), &nurse_id, date)?)
    }

    fn fetch_appointment(&self, appointment_id: &str) -> Result<Appointment, CoreError> {
        self.backend
            .appointment(appointment_id)?
            .ok_or_else(|| CoreError::AppointmentNotFound(appointment_id.to_string()))
    }

    pub fn appointment(&self, appointment_id: &str) -> Result<Appointment, CoreError> {
        self.nurse_id()?;
        self.fetch_appointment(appointment_id)
    }

    pub fn patient(&self, patient_id: &str) -> Result<PatientSummary, CoreError> {
        self.nurse_id()?;
        Ok(self.backend.patient(patient_id)?)
    }

    // ── Trip ────────────────────────────────────────────────

    pub fn start_trip(
        &self,
        appointment_id: &str,
        current_location: Option<Coordinate>,
    ) -> Result<Appointment, CoreError> {
        self.nurse_id()?;
        let mut appointment = self.fetch_appointment(appointment_id)?;
        lifecycle::start_trip(&mut appointment, current_location, self.backend())?;
        Ok(appointment)
    }

    pub fn route_to(&self, appointment_id: &str, origin: Coordinate) -> Result<RouteSummary, CoreError> {
        self.nurse_id()?;
        let appointment = self.fetch_appointment(appointment_id)?;
        let destination = appointment.location.ok_or(CoreError::PatientLocationUnknown)?;
        Ok(geo::plan_route(self.directions.as_ref(), origin, destination))
    }

    // ── Close-out ───────────────────────────────────────────

    /// Open the close-out screen for an appointment, replacing any other.
    pub fn open_closeout(&self, appointment_id: &str) -> Result<CloseoutView, CoreError> {
        self.nurse_id()?;
        let appointment = self.fetch_appointment(appointment_id)?;
        if !matches!(
            appointment.status,
            AppointmentStatus::Upcoming | AppointmentStatus::Success
        ) {
            return Err(CoreError::VisitNotActive(appointment.status));
        }
        let closeout = VisitCloseout::open(self.backend(), appointment)?;
        Ok(self.lock_closeout()?.install(closeout))
    }

    pub fn closeout_view(&self, screen: Uuid) -> Result<CloseoutView, CoreError> {
        Ok(self.lock_closeout()?.screen_mut(screen)?.view())
    }

    /// Closing an already-closed screen is a no-op.
    pub fn close_closeout(&self, screen: Uuid) -> Result<(), CoreError> {
        let mut slot = self.lock_closeout()?;
        if slot.screen.as_ref().is_some_and(|c| c.screen() == screen) {
            slot.screen = None;
            tracing::debug!(%screen, "Close-out closed");
        }
        Ok(())
    }

    /// Confirm one task with the backend. The checklist lock is released
    /// during the call, so other reads and toggles see the task as
    /// confirming, including on a screen rebuilt before the call returns.
    pub fn complete_task(&self, screen: Uuid, index: usize) -> Result<CloseoutView, CoreError> {
        let confirmation = {
            let mut slot = self.lock_closeout()?;
            let closeout = slot.screen_mut(screen)?;
            if !closeout.is_active() {
                return Err(CoreError::VisitNotActive(closeout.appointment().status));
            }
            let confirmation = closeout.checklist_mut().begin_complete(index)?;
            slot.confirming.insert(confirmation.task_id().to_string());
            confirmation
        };

        let result = self.backend.mark_task_done(confirmation.task_id());

        let mut slot = self.lock_closeout()?;
        slot.confirming.remove(confirmation.task_id());
        match slot.screen.as_mut() {
            Some(closeout) if closeout.screen() == screen => {
                closeout.checklist_mut().finish_complete(confirmation, result)?;
                Ok(closeout.view())
            }
            Some(closeout) => {
                if let Err(e) = closeout.checklist_mut().settle(confirmation.task_id(), result) {
                    tracing::debug!(%screen, task_id = confirmation.task_id(), error = %e, "Confirmation not applied to rebuilt screen");
                }
                Err(CoreError::ScreenClosed)
            }
            None => {
                tracing::info!(%screen, task_id = confirmation.task_id(), "Dropping confirmation for closed screen");
                Err(CoreError::ScreenClosed)
            }
        }
    }

    pub fn uncomplete_task(&self, screen: Uuid, index: usize) -> Result<CloseoutView, CoreError> {
        let mut slot = self.lock_closeout()?;
        let closeout = slot.screen_mut(screen)?;
        closeout.uncomplete_task(index)?;
        Ok(closeout.view())
    }

    pub fn submit_report(&self, screen: Uuid, text: &str) -> Result<CloseoutView, CoreError> {
        let submission = {
            let mut slot = self.lock_closeout()?;
            let closeout = slot.screen_mut(screen)?;
            if !closeout.is_active() {
                return Err(CoreError::VisitNotActive(closeout.appointment().status));
            }
            let (checklist, report) = closeout.report_parts();
            let submission = report.begin_submit(checklist, text)?;
            slot.submitting = Some(submission.report_id().to_string());
            submission
        };

        let result = self
            .backend
            .submit_medical_report(submission.report_id(), submission.text());

        let mut slot = self.lock_closeout()?;
        slot.submitting = None;
        match slot.screen.as_mut() {
            Some(closeout) if closeout.screen() == screen => {
                closeout.report_parts().1.finish_submit(submission, result)?;
                Ok(closeout.view())
            }
            Some(closeout) => {
                let report_id = submission.report_id().to_string();
                let text = submission.text().to_string();
                if let Err(e) = closeout.report_parts().1.settle(&report_id, text, result) {
                    tracing::debug!(%screen, %report_id, error = %e, "Submission not applied to rebuilt screen");
                }
                Err(CoreError::ScreenClosed)
            }
            None => {
                tracing::info!(%screen, report_id = submission.report_id(), "Dropping submission result for closed screen");
                Err(CoreError::ScreenClosed)
            }
        }
    }

    /// Re-read the appointment and its tasks from the backend. The screen
    /// gets a new token; calls still in flight stay pending on it.
    pub fn refresh_closeout(&self, screen: Uuid) -> Result<RefreshedCloseout, CoreError> {
        let mut appointment = self.lock_closeout()?.screen_mut(screen)?.appointment().clone();
        let fetched = self.fetch_appointment(&appointment.id)?;
        let change = lifecycle::apply_refresh(&mut appointment, fetched);
        let fresh = VisitCloseout::open(self.backend(), appointment)?;

        let mut slot = self.lock_closeout()?;
        slot.screen_mut(screen)?;
        let view = slot.install(fresh);
        Ok(RefreshedCloseout { closeout: view, change })
    }

    // ── Feedback ────────────────────────────────────────────

    pub fn appointment_feedback(&self, appointment_id: &str) -> Result<Option<Feedback>, CoreError> {
        self.nurse_id()?;
        let appointment = self.fetch_appointment(appointment_id)?;
        if appointment.status != AppointmentStatus::Success {
            return Ok(None);
        }
        let Some(record) = self.backend.medical_report(appointment_id)? else {
            return Ok(None);
        };
        Ok(feedback::feedback_for(&appointment, &record.id, self.backend())?)
    }

    pub fn nurse_feedback(&self, by: RatingFilter) -> Result<FeedbackSummary, CoreError> {
        let nurse_id = self.nurse_id()?;
        Ok(feedback::nurse_feedback_summary(self.backend(), &nurse_id, by)?)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::api::MockBackend;
    use crate::closeout::{ReportPhase, TaskProgress};
    use crate::geo::Route;
    use crate::models::{ReportStatus, TaskStatus};
    use crate::test_support::{appointment, detail, nurse_account, report, task, PACKAGE_ID};

    struct NoDirections;

    impl DirectionsProvider for NoDirections {
        fn directions(&self, _origin: Coordinate, _destination: Coordinate) -> Result<Route, GeoError> {
            Err(GeoError::NoRoute)
        }
    }

    struct Fixture {
        state: Arc<CoreState>,
        backend: Arc<MockBackend>,
        _dir: tempfile::TempDir,
    }

    fn fixture(status: AppointmentStatus) -> Fixture {
        let backend = Arc::new(
            MockBackend::new()
                .with_account(nurse_account(), "secret", "tok")
                .with_appointment(appointment("a1", status, true))
                .with_detail(
                    PACKAGE_ID,
                    detail(
                        PACKAGE_ID,
                        vec![task("t1", 1, TaskStatus::NotDone), task("t2", 2, TaskStatus::NotDone)],
                    ),
                )
                .with_report("a1", report("mr-1", None, ReportStatus::Pending)),
        );
        let dir = tempfile::tempdir().unwrap();
        let dyn_backend: Arc<dyn NursingBackend> = backend.clone();
        let state = CoreState::with_parts(
            AppConfig::default(),
            dyn_backend,
            Arc::new(NoDirections),
            dir.path().join("session.db"),
        );
        state.login(&LoginForm::new("0901234567", "secret")).unwrap();
        Fixture {
            state: Arc::new(state),
            backend,
            _dir: dir,
        }
    }

    #[test]
    fn signed_out_state_refuses_work() {
        let f = fixture(AppointmentStatus::Upcoming);
        f.state.logout().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        assert!(matches!(f.state.schedule(today), Err(CoreError::NotSignedIn)));
        assert!(matches!(f.state.open_closeout("a1"), Err(CoreError::NotSignedIn)));
    }

    #[test]
    fn restore_picks_up_stored_session() {
        let f = fixture(AppointmentStatus::Upcoming);
        let again = CoreState::with_parts(
            AppConfig::default(),
            f.backend.clone(),
            Arc::new(NoDirections),
            f.state.store_path.clone(),
        );
        let account = again.restore().unwrap().unwrap();
        assert_eq!(account.id, "nurse-1");
        assert!(again.is_signed_in());
    }

    #[test]
    fn trip_to_report_happy_path() {
        let f = fixture(AppointmentStatus::Confirmed);
        assert!(matches!(
            f.state.open_closeout("a1"),
            Err(CoreError::VisitNotActive(AppointmentStatus::Confirmed))
        ));

        let here = Coordinate::new(10.8, 106.7).ok();
        let appt = f.state.start_trip("a1", here).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Upcoming);

        let view = f.state.open_closeout("a1").unwrap();
        f.state.complete_task(view.screen, 0).unwrap();
        f.state.complete_task(view.screen, 1).unwrap();
        let view = f.state.submit_report(view.screen, "Dressing changed.").unwrap();

        assert_eq!(view.report_phase, ReportPhase::Submitted);
        let stored = f.backend.stored_report("a1").unwrap();
        assert_eq!(stored.nursing_report.as_deref(), Some("Dressing changed."));
    }

    #[test]
    fn in_flight_confirmation_blocks_toggles() {
        let f = fixture(AppointmentStatus::Upcoming);
        let screen = f.state.open_closeout("a1").unwrap().screen;
        let hold = f.backend.hold_confirmations();

        let worker = {
            let state = f.state.clone();
            thread::spawn(move || state.complete_task(screen, 0))
        };
        assert_eq!(hold.entered.recv().unwrap(), "t1");

        let view = f.state.closeout_view(screen).unwrap();
        assert_eq!(view.tasks[0].progress, TaskProgress::Confirming);
        assert!(!view.tasks[0].can_toggle);
        assert!(matches!(
            f.state.complete_task(screen, 0),
            Err(CoreError::Gate(GateError::ConfirmationPending(0)))
        ));
        assert!(matches!(
            f.state.uncomplete_task(screen, 0),
            Err(CoreError::Gate(GateError::ConfirmationPending(0)))
        ));

        hold.release.send(()).unwrap();
        let view = worker.join().unwrap().unwrap();
        assert_eq!(view.tasks[0].progress, TaskProgress::Done);
        assert_eq!(f.backend.call_count("mark_task_done"), 1);
    }

    #[test]
    fn refresh_keeps_in_flight_confirmation_pending() {
        let f = fixture(AppointmentStatus::Upcoming);
        let screen = f.state.open_closeout("a1").unwrap().screen;
        let hold = f.backend.hold_confirmations();

        let worker = {
            let state = f.state.clone();
            thread::spawn(move || state.complete_task(screen, 0))
        };
        assert_eq!(hold.entered.recv().unwrap(), "t1");

        let refreshed = f.state.refresh_closeout(screen).unwrap().closeout;
        assert_ne!(refreshed.screen, screen);
        assert_eq!(refreshed.tasks[0].progress, TaskProgress::Confirming);
        assert!(!refreshed.tasks[0].can_toggle);
        assert!(matches!(
            f.state.complete_task(refreshed.screen, 0),
            Err(CoreError::Gate(GateError::ConfirmationPending(0)))
        ));
        assert_eq!(f.backend.call_count("mark_task_done"), 1);

        hold.release.send(()).unwrap();
        assert!(matches!(worker.join().unwrap(), Err(CoreError::ScreenClosed)));
        let view = f.state.closeout_view(refreshed.screen).unwrap();
        assert_eq!(view.tasks[0].progress, TaskProgress::Done);
        assert!(view.tasks[1].can_toggle);
    }

    #[test]
    fn reopen_keeps_in_flight_confirmation_pending() {
        let f = fixture(AppointmentStatus::Upcoming);
        let screen = f.state.open_closeout("a1").unwrap().screen;
        let hold = f.backend.hold_confirmations();

        let worker = {
            let state = f.state.clone();
            thread::spawn(move || state.complete_task(screen, 0))
        };
        hold.entered.recv().unwrap();
        f.state.close_closeout(screen).unwrap();

        let reopened = f.state.open_closeout("a1").unwrap();
        assert_eq!(reopened.tasks[0].progress, TaskProgress::Confirming);
        assert!(matches!(
            f.state.uncomplete_task(reopened.screen, 0),
            Err(CoreError::Gate(GateError::ConfirmationPending(0)))
        ));

        hold.release.send(()).unwrap();
        assert!(matches!(worker.join().unwrap(), Err(CoreError::ScreenClosed)));
        let view = f.state.closeout_view(reopened.screen).unwrap();
        assert_eq!(view.tasks[0].progress, TaskProgress::Done);
        assert_eq!(f.backend.call_count("mark_task_done"), 1);
    }

    #[test]
    fn refresh_keeps_in_flight_submission_pending() {
        let f = fixture(AppointmentStatus::Upcoming);
        let screen = f.state.open_closeout("a1").unwrap().screen;
        f.state.complete_task(screen, 0).unwrap();
        f.state.complete_task(screen, 1).unwrap();
        let hold = f.backend.hold_confirmations();

        let worker = {
            let state = f.state.clone();
            thread::spawn(move || state.submit_report(screen, "Vitals stable."))
        };
        assert_eq!(hold.entered.recv().unwrap(), "mr-1");

        let refreshed = f.state.refresh_closeout(screen).unwrap().closeout;
        assert_eq!(refreshed.report_phase, ReportPhase::Open);
        assert!(refreshed.report_submitting);
        assert!(matches!(
            f.state.submit_report(refreshed.screen, "Vitals stable."),
            Err(CoreError::Gate(GateError::SubmissionPending))
        ));

        hold.release.send(()).unwrap();
        assert!(matches!(worker.join().unwrap(), Err(CoreError::ScreenClosed)));
        let view = f.state.closeout_view(refreshed.screen).unwrap();
        assert_eq!(view.report_phase, ReportPhase::Submitted);
        assert!(!view.report_submitting);
        assert_eq!(f.backend.call_count("submit_medical_report"), 1);
    }

    #[test]
    fn confirmation_after_close_is_dropped() {
        let f = fixture(AppointmentStatus::Upcoming);
        let screen = f.state.open_closeout("a1").unwrap().screen;
        let hold = f.backend.hold_confirmations();

        let worker = {
            let state = f.state.clone();
            thread::spawn(move || state.complete_task(screen, 0))
        };
        hold.entered.recv().unwrap();
        f.state.close_closeout(screen).unwrap();
        hold.release.send(()).unwrap();

        assert!(matches!(worker.join().unwrap(), Err(CoreError::ScreenClosed)));
        assert!(matches!(f.state.closeout_view(screen), Err(CoreError::ScreenClosed)));

        // The backend did record it; a fresh screen shows the task done.
        drop(hold);
        let reopened = f.state.open_closeout("a1").unwrap();
        assert_ne!(reopened.screen, screen);
        assert_eq!(reopened.tasks[0].progress, TaskProgress::Done);
    }

    #[test]
    fn refresh_observes_server_completion() {
        let f = fixture(AppointmentStatus::Upcoming);
        let screen = f.state.open_closeout("a1").unwrap().screen;
        f.backend.mark_task_done("t1").unwrap();

        let refreshed = f.state.refresh_closeout(screen).unwrap();
        assert_eq!(refreshed.change, StatusChange::Unchanged);
        assert_eq!(refreshed.closeout.done, 1);
        assert!(matches!(f.state.closeout_view(screen), Err(CoreError::ScreenClosed)));
        assert!(f.state.closeout_view(refreshed.closeout.screen).is_ok());
    }

    #[test]
    fn route_falls_back_to_straight_line() {
        let f = fixture(AppointmentStatus::Confirmed);
        let origin = Coordinate::new(10.80, 106.70).unwrap();
        let summary = f.state.route_to("a1", origin).unwrap();
        assert_eq!(summary.source, geo::DistanceSource::StraightLine);
        assert!(summary.path.is_empty());
        assert!(summary.distance_km > 0.0);
    }

    #[test]
    fn feedback_hidden_until_success() {
        let f = fixture(AppointmentStatus::Upcoming);
        assert_eq!(f.state.appointment_feedback("a1").unwrap(), None);
        assert_eq!(f.backend.call_count("feedback"), 0);
    }
}

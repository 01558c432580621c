//! Visit close-out: the screen where a nurse works through the package's
//! tasks and then files the nursing report.
//!
//! `VisitCloseout` owns one appointment's checklist and report gate. It is
//! identified by a screen token so that a confirmation arriving after the
//! screen was closed or reopened can be recognised and dropped.

pub mod checklist;
pub mod report;

pub use checklist::{ChecklistItem, Confirmation, TaskChecklist, TaskProgress};
pub use report::{can_submit, validate_report_text, ReportGate, ReportPhase, Submission, MAX_REPORT_CHARS};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{ApiError, NursingBackend};
use crate::lifecycle::{available_actions, AppointmentAction};
use crate::models::{Appointment, AppointmentDetail, AppointmentStatus, MedicalReport, ServicePackage};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    #[error("Task {} must be done first", .blocking + 1)]
    SequenceViolation { index: usize, blocking: usize },

    #[error("Task {} is confirmed and cannot be undone", .0 + 1)]
    LockedTask(usize),

    #[error("Task {} is still being confirmed", .0 + 1)]
    ConfirmationPending(usize),

    #[error("Task {} is already done", .0 + 1)]
    AlreadyCompleted(usize),

    #[error("No task at position {0}")]
    TaskNotFound(usize),

    #[error("Result for {0} arrived after the checklist changed")]
    StaleConfirmation(String),

    #[error("All tasks must be done before the report can be submitted")]
    GateClosed,

    #[error("Report text is empty")]
    EmptyReport,

    #[error("Report is too long ({len} characters, at most {max})")]
    ReportTooLong { len: usize, max: usize },

    #[error("No medical record exists for this appointment yet")]
    ReportUnavailable,

    #[error("Report was already submitted")]
    AlreadySubmitted,

    #[error("Report submission is already in progress")]
    SubmissionPending,

    #[error(transparent)]
    Backend(#[from] ApiError),
}

/// One open close-out screen.
#[derive(Debug, Clone)]
pub struct VisitCloseout {
    screen: Uuid,
    appointment: Appointment,
    package: ServicePackage,
    checklist: TaskChecklist,
    report: ReportGate,
}

impl VisitCloseout {
    /// Fetch the package detail and the medical record for the visit.
    pub fn open(backend: &dyn NursingBackend, appointment: Appointment) -> Result<Self, ApiError> {
        let detail = backend.appointment_detail(&appointment.package_id, appointment.scheduled_date())?;
        let record = backend.medical_report(&appointment.id)?;
        tracing::debug!(
            appointment = %appointment.id,
            tasks = detail.tasks.len(),
            has_report = record.is_some(),
            "Close-out opened"
        );
        Ok(Self::from_parts(appointment, detail, record))
    }

    pub fn from_parts(
        appointment: Appointment,
        detail: AppointmentDetail,
        record: Option<MedicalReport>,
    ) -> Self {
        Self {
            screen: Uuid::new_v4(),
            appointment,
            package: detail.package,
            checklist: TaskChecklist::new(detail.tasks),
            report: ReportGate::new(record),
        }
    }

    pub fn screen(&self) -> Uuid {
        self.screen
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn checklist(&self) -> &TaskChecklist {
        &self.checklist
    }

    pub fn checklist_mut(&mut self) -> &mut TaskChecklist {
        &mut self.checklist
    }

    pub fn report(&self) -> &ReportGate {
        &self.report
    }

    /// Checklist and report gate borrowed together for a submission.
    pub fn report_parts(&mut self) -> (&TaskChecklist, &mut ReportGate) {
        (&self.checklist, &mut self.report)
    }

    /// Tasks and report are only actionable while the visit is under way.
    pub fn is_active(&self) -> bool {
        self.appointment.status == AppointmentStatus::Upcoming
    }

    pub fn complete_task(&mut self, index: usize, backend: &dyn NursingBackend) -> Result<(), GateError> {
        self.checklist.attempt_complete(index, backend)
    }

    pub fn uncomplete_task(&mut self, index: usize) -> Result<(), GateError> {
        self.checklist.attempt_uncomplete(index)
    }

    pub fn submit_report(&mut self, text: &str, backend: &dyn NursingBackend) -> Result<(), GateError> {
        self.report.submit(&self.checklist, text, backend)
    }

    pub fn view(&self) -> CloseoutView {
        let tasks = self
            .checklist
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| TaskView {
                index,
                id: item.task.id.clone(),
                name: item.task.name.clone(),
                order: item.task.order,
                est_duration_minutes: item.task.est_duration_minutes,
                unit: item.task.unit.clone(),
                total_unit: item.task.total_unit,
                client_note: item.task.client_note.clone(),
                staff_advice: item.task.staff_advice.clone(),
                progress: item.progress,
                can_toggle: self.checklist.can_toggle(index),
            })
            .collect();

        CloseoutView {
            screen: self.screen,
            appointment_id: self.appointment.id.clone(),
            status: self.appointment.status,
            package_name: self.package.name.clone(),
            tasks,
            done: self.checklist.done_count(),
            total: self.checklist.len(),
            can_submit: can_submit(&self.checklist),
            report_phase: self.report.phase(),
            report_submitting: self.report.is_submitting(),
            nursing_report: self
                .report
                .record()
                .and_then(|r| r.nursing_report.clone()),
            actions: available_actions(&self.appointment),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub order: i32,
    pub est_duration_minutes: u32,
    pub unit: String,
    pub total_unit: u32,
    pub client_note: Option<String>,
    pub staff_advice: Option<String>,
    pub progress: TaskProgress,
    pub can_toggle: bool,
}

/// Everything the close-out screen renders.
#[derive(Debug, Clone, Serialize)]
pub struct CloseoutView {
    pub screen: Uuid,
    pub appointment_id: String,
    pub status: AppointmentStatus,
    pub package_name: String,
    pub tasks: Vec<TaskView>,
    pub done: usize,
    pub total: usize,
    pub can_submit: bool,
    pub report_phase: ReportPhase,
    pub report_submitting: bool,
    pub nursing_report: Option<String>,
    pub actions: Vec<AppointmentAction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::models::{ReportStatus, TaskStatus};
    use crate::test_support::{appointment, detail, report, task, PACKAGE_ID};

    fn backend() -> MockBackend {
        let appt = appointment("a1", AppointmentStatus::Upcoming, true);
        MockBackend::new()
            .with_appointment(appt)
            .with_detail(
                PACKAGE_ID,
                detail(
                    PACKAGE_ID,
                    vec![task("t2", 2, TaskStatus::NotDone), task("t1", 1, TaskStatus::NotDone)],
                ),
            )
            .with_report("a1", report("mr-1", None, ReportStatus::Pending))
    }

    #[test]
    fn full_visit_close_out() {
        let backend = backend();
        let appt = appointment("a1", AppointmentStatus::Upcoming, true);
        let mut closeout = VisitCloseout::open(&backend, appt).unwrap();

        let view = closeout.view();
        assert_eq!(view.total, 2);
        assert_eq!(view.tasks[0].id, "t1");
        assert!(view.tasks[0].can_toggle);
        assert!(!view.tasks[1].can_toggle);
        assert!(!view.can_submit);

        assert_eq!(
            closeout.submit_report("early", &backend),
            Err(GateError::GateClosed)
        );
        closeout.complete_task(0, &backend).unwrap();
        closeout.complete_task(1, &backend).unwrap();
        closeout.submit_report("Blood pressure 120/80.", &backend).unwrap();

        let view = closeout.view();
        assert!(view.can_submit);
        assert_eq!(view.report_phase, ReportPhase::Submitted);
        assert_eq!(view.nursing_report.as_deref(), Some("Blood pressure 120/80."));
    }

    #[test]
    fn open_surfaces_backend_failure() {
        let backend = backend();
        backend.fail_next("medical_report", ApiError::Unauthorized);
        let appt = appointment("a1", AppointmentStatus::Upcoming, true);
        assert_eq!(
            VisitCloseout::open(&backend, appt).unwrap_err(),
            ApiError::Unauthorized
        );
    }

    #[test]
    fn each_open_gets_a_new_screen() {
        let backend = backend();
        let appt = appointment("a1", AppointmentStatus::Upcoming, true);
        let first = VisitCloseout::open(&backend, appt.clone()).unwrap();
        let second = VisitCloseout::open(&backend, appt).unwrap();
        assert_ne!(first.screen(), second.screen());
    }

    #[test]
    fn gate_messages_are_one_based() {
        assert_eq!(
            GateError::SequenceViolation { index: 2, blocking: 0 }.to_string(),
            "Task 1 must be done first"
        );
        assert_eq!(
            GateError::LockedTask(1).to_string(),
            "Task 2 is confirmed and cannot be undone"
        );
    }
}

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{ApiError, LoginGrant, NursingBackend};
use crate::models::{
    AccountInfo, Appointment, AppointmentDetail, AppointmentStatus, Feedback, MedicalReport,
    NurseProfile, PatientSummary, TaskStatus,
};

#[derive(Default)]
struct MockState {
    account: Option<(AccountInfo, String, String)>,
    profile: Option<NurseProfile>,
    appointments: Vec<Appointment>,
    details: HashMap<String, AppointmentDetail>,
    reports: HashMap<String, MedicalReport>,
    feedback: HashMap<String, Feedback>,
    patients: HashMap<String, PatientSummary>,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
    calls: Vec<String>,
    token: Option<String>,
}

/// Channels handed to a test that wants a confirmation call to stay
/// in flight until it says so.
pub struct ConfirmationHold {
    /// Receives the task or report id once a held call is entered.
    pub entered: Receiver<String>,
    /// Send `()` to let the held call finish.
    pub release: Sender<()>,
}

/// In-memory backend. Writes mutate the stored data the way the real
/// backend would, so a re-fetch observes them.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    hold: Mutex<Option<(Sender<String>, Receiver<()>)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account: AccountInfo, password: &str, token: &str) -> Self {
        self.with_state(|s| s.account = Some((account, password.to_string(), token.to_string())))
    }

    pub fn with_profile(self, profile: NurseProfile) -> Self {
        self.with_state(|s| s.profile = Some(profile))
    }

    pub fn with_appointment(self, appointment: Appointment) -> Self {
        self.with_state(|s| s.appointments.push(appointment))
    }

    /// Detail keyed by package id.
    pub fn with_detail(self, package_id: &str, detail: AppointmentDetail) -> Self {
        self.with_state(|s| {
            s.details.insert(package_id.to_string(), detail);
        })
    }

    /// Report keyed by appointment id.
    pub fn with_report(self, appointment_id: &str, report: MedicalReport) -> Self {
        self.with_state(|s| {
            s.reports.insert(appointment_id.to_string(), report);
        })
    }

    pub fn with_feedback(self, medical_record_id: &str, feedback: Feedback) -> Self {
        self.with_state(|s| {
            s.feedback.insert(medical_record_id.to_string(), feedback);
        })
    }

    pub fn with_patient(self, patient: PatientSummary) -> Self {
        self.with_state(|s| {
            s.patients.insert(patient.id.clone(), patient);
        })
    }

    fn with_state(self, f: impl FnOnce(&mut MockState)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
        self
    }

    /// Queue a failure for the next call to `method` (e.g. "mark_task_done").
    pub fn fail_next(&self, method: &'static str, error: ApiError) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.entry(method).or_default().push_back(error);
        }
    }

    /// Hold every `mark_task_done` and `submit_medical_report` call until
    /// released through the returned channels.
    pub fn hold_confirmations(&self) -> ConfirmationHold {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        if let Ok(mut hold) = self.hold.lock() {
            *hold = Some((entered_tx, release_rx));
        }
        ConfirmationHold {
            entered: entered_rx,
            release: release_tx,
        }
    }

    /// Calls made so far, as `"method:arg"`.
    pub fn calls(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self, method: &str) -> usize {
        let prefix = format!("{method}:");
        self.calls().iter().filter(|c| c.starts_with(&prefix)).count()
    }

    pub fn current_token(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.token.clone())
    }

    pub fn stored_report(&self, appointment_id: &str) -> Option<MedicalReport> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.reports.get(appointment_id).cloned())
    }

    fn enter(&self, method: &'static str, arg: &str) -> Result<std::sync::MutexGuard<'_, MockState>, ApiError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ApiError::HttpClient("mock state poisoned".into()))?;
        state.calls.push(format!("{method}:{arg}"));
        if let Some(err) = state.failures.get_mut(method).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }

    fn wait_for_release(&self, id: &str) {
        if let Ok(hold) = self.hold.lock() {
            if let Some((entered, release)) = hold.as_ref() {
                let _ = entered.send(id.to_string());
                let _ = release.recv();
            }
        }
    }
}

impl NursingBackend for MockBackend {
    fn authorize(&self, access_token: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.token = access_token.map(str::to_string);
        }
    }

    fn login(&self, phone_number: &str, password: &str) -> Result<LoginGrant, ApiError> {
        let state = self.enter("login", phone_number)?;
        match state.account.as_ref() {
            Some((account, expected, token))
                if account.phone_number == phone_number && expected == password =>
            {
                Ok(LoginGrant {
                    account: account.clone(),
                    access_token: token.clone(),
                })
            }
            _ => Err(ApiError::Rejected {
                status: 401,
                reason: "Wrong phone number or password".into(),
            }),
        }
    }

    fn nurse_profile(&self) -> Result<NurseProfile, ApiError> {
        let state = self.enter("nurse_profile", "me")?;
        state.profile.clone().ok_or(ApiError::Unauthorized)
    }

    fn list_appointments(
        &self,
        nurse_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, ApiError> {
        let state = self.enter("list_appointments", nurse_id)?;
        Ok(state
            .appointments
            .iter()
            .filter(|a| a.nurse_id == nurse_id)
            .filter(|a| (from..=to).contains(&a.scheduled_date()))
            .cloned()
            .collect())
    }

    fn appointment_history(&self, nurse_id: &str) -> Result<Vec<Appointment>, ApiError> {
        let state = self.enter("appointment_history", nurse_id)?;
        Ok(state
            .appointments
            .iter()
            .filter(|a| a.nurse_id == nurse_id)
            .cloned()
            .collect())
    }

    fn appointment(&self, appointment_id: &str) -> Result<Option<Appointment>, ApiError> {
        let state = self.enter("appointment", appointment_id)?;
        Ok(state.appointments.iter().find(|a| a.id == appointment_id).cloned())
    }

    fn appointment_detail(
        &self,
        package_id: &str,
        _date: NaiveDate,
    ) -> Result<AppointmentDetail, ApiError> {
        let state = self.enter("appointment_detail", package_id)?;
        state.details.get(package_id).cloned().ok_or(ApiError::Rejected {
            status: 404,
            reason: format!("package {package_id} not found"),
        })
    }

    fn start_appointment(&self, appointment_id: &str) -> Result<(), ApiError> {
        let mut state = self.enter("start_appointment", appointment_id)?;
        let appt = state
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or(ApiError::Rejected {
                status: 404,
                reason: "appointment not found".into(),
            })?;
        appt.status = AppointmentStatus::Upcoming;
        Ok(())
    }

    fn mark_task_done(&self, task_id: &str) -> Result<(), ApiError> {
        {
            // Record the call (and any queued failure) before parking.
            let _state = self.enter("mark_task_done", task_id)?;
        }
        self.wait_for_release(task_id);

        let mut state = self
            .state
            .lock()
            .map_err(|_| ApiError::HttpClient("mock state poisoned".into()))?;
        let task = state
            .details
            .values_mut()
            .flat_map(|d| d.tasks.iter_mut())
            .find(|t| t.id == task_id)
            .ok_or(ApiError::Rejected {
                status: 404,
                reason: format!("task {task_id} not found"),
            })?;
        task.status = TaskStatus::Done;
        Ok(())
    }

    fn medical_report(&self, appointment_id: &str) -> Result<Option<MedicalReport>, ApiError> {
        let state = self.enter("medical_report", appointment_id)?;
        Ok(state.reports.get(appointment_id).cloned())
    }

    fn submit_medical_report(&self, report_id: &str, text: &str) -> Result<(), ApiError> {
        {
            let _state = self.enter("submit_medical_report", report_id)?;
        }
        self.wait_for_release(report_id);

        let mut state = self
            .state
            .lock()
            .map_err(|_| ApiError::HttpClient("mock state poisoned".into()))?;
        let report = state
            .reports
            .values_mut()
            .find(|r| r.id == report_id)
            .ok_or(ApiError::Rejected {
                status: 404,
                reason: "medical record not found".into(),
            })?;
        report.nursing_report = Some(text.to_string());
        Ok(())
    }

    fn feedback(&self, medical_record_id: &str) -> Result<Option<Feedback>, ApiError> {
        let state = self.enter("feedback", medical_record_id)?;
        Ok(state.feedback.get(medical_record_id).cloned())
    }

    fn nurse_feedback(&self, nurse_id: &str) -> Result<Vec<Feedback>, ApiError> {
        let state = self.enter("nurse_feedback", nurse_id)?;
        let mut all: Vec<Feedback> = state.feedback.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn patient(&self, patient_id: &str) -> Result<PatientSummary, ApiError> {
        let state = self.enter("patient", patient_id)?;
        state.patients.get(patient_id).cloned().ok_or(ApiError::Rejected {
            status: 404,
            reason: "patient not found".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{appointment, detail, task};

    #[test]
    fn queued_failure_is_returned_once() {
        let mock = MockBackend::new()
            .with_detail("pkg-1", detail("pkg-1", vec![task("t1", 1, TaskStatus::NotDone)]));
        mock.fail_next("mark_task_done", ApiError::Timeout(15));

        assert_eq!(mock.mark_task_done("t1"), Err(ApiError::Timeout(15)));
        assert!(mock.mark_task_done("t1").is_ok());
        assert_eq!(mock.call_count("mark_task_done"), 2);
    }

    #[test]
    fn start_appointment_moves_to_upcoming() {
        let mock = MockBackend::new().with_appointment(appointment("a1", AppointmentStatus::Confirmed, true));
        mock.start_appointment("a1").unwrap();
        let stored = mock.appointment("a1").unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Upcoming);
    }

    #[test]
    fn marking_done_is_visible_on_refetch() {
        let mock = MockBackend::new()
            .with_detail("pkg-1", detail("pkg-1", vec![task("t1", 1, TaskStatus::NotDone)]));
        mock.mark_task_done("t1").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let refreshed = mock.appointment_detail("pkg-1", date).unwrap();
        assert_eq!(refreshed.tasks[0].status, TaskStatus::Done);
    }

    #[test]
    fn authorize_records_token() {
        let mock = MockBackend::new();
        mock.authorize(Some("tok"));
        assert_eq!(mock.current_token().as_deref(), Some("tok"));
        mock.authorize(None);
        assert!(mock.current_token().is_none());
    }
}

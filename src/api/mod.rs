//! Care platform backend boundary.
//!
//! `NursingBackend` is the seam every screen talks through. `HttpBackend`
//! speaks the platform's REST API; `MockBackend` is an in-memory stand-in
//! used by tests.

pub mod http;
pub mod mock;
pub mod types;

pub use http::HttpBackend;
pub use mock::{ConfirmationHold, MockBackend};

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    AccountInfo, Appointment, AppointmentDetail, Feedback, MedicalReport, NurseProfile,
    PatientSummary,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Backend is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Backend rejected request (status {status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Unexpected payload: {0}")]
    Mapping(String),
}

impl ApiError {
    /// Transport-level failure: the request may never have reached the
    /// backend, so repeating it is safe for idempotent calls.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Connection(_) | ApiError::Timeout(_) | ApiError::HttpClient(_)
        )
    }
}

/// Successful login: account plus bearer token.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub account: AccountInfo,
    pub access_token: String,
}

/// Blocking client for the care platform.
///
/// Implementations must be shareable across threads; IPC commands call
/// them from blocking worker threads.
pub trait NursingBackend: Send + Sync {
    /// Attach (or drop) the bearer token used for later calls.
    fn authorize(&self, _access_token: Option<&str>) {}

    fn login(&self, phone_number: &str, password: &str) -> Result<LoginGrant, ApiError>;

    fn nurse_profile(&self) -> Result<NurseProfile, ApiError>;

    /// Appointments assigned to `nurse_id` with `est-date` in `[from, to]`.
    fn list_appointments(
        &self,
        nurse_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, ApiError>;

    fn appointment_history(&self, nurse_id: &str) -> Result<Vec<Appointment>, ApiError>;

    fn appointment(&self, appointment_id: &str) -> Result<Option<Appointment>, ApiError>;

    /// Package and raw tasks for one visit day, tasks ordered.
    fn appointment_detail(
        &self,
        package_id: &str,
        date: NaiveDate,
    ) -> Result<AppointmentDetail, ApiError>;

    /// confirmed -> upcoming.
    fn start_appointment(&self, appointment_id: &str) -> Result<(), ApiError>;

    /// Server-side completion of one task. Idempotent on the backend.
    fn mark_task_done(&self, task_id: &str) -> Result<(), ApiError>;

    /// `None` when no record exists yet.
    fn medical_report(&self, appointment_id: &str) -> Result<Option<MedicalReport>, ApiError>;

    fn submit_medical_report(&self, report_id: &str, text: &str) -> Result<(), ApiError>;

    fn feedback(&self, medical_record_id: &str) -> Result<Option<Feedback>, ApiError>;

    fn nurse_feedback(&self, nurse_id: &str) -> Result<Vec<Feedback>, ApiError>;

    fn patient(&self, patient_id: &str) -> Result<PatientSummary, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        assert!(ApiError::Connection("http://x".into()).is_transient());
        assert!(ApiError::Timeout(15).is_transient());
        assert!(ApiError::HttpClient("reset".into()).is_transient());
    }

    #[test]
    fn backend_answers_are_not_transient() {
        assert!(!ApiError::Unauthorized.is_transient());
        assert!(!ApiError::Rejected { status: 409, reason: "already done".into() }.is_transient());
        assert!(!ApiError::ResponseParsing("eof".into()).is_transient());
    }
}

//! Nursing report submission, gated on a fully completed checklist.

use serde::{Deserialize, Serialize};

use super::checklist::TaskChecklist;
use super::GateError;
use crate::api::{ApiError, NursingBackend};
use crate::models::{MedicalReport, ReportStatus};

/// Longest report the client will send, in characters.
pub const MAX_REPORT_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPhase {
    /// No medical record exists for the visit yet.
    Unavailable,
    Open,
    Submitted,
    /// Staff confirmed the report.
    Approved,
}

/// Report gate: opens only when every task is done.
pub fn can_submit(checklist: &TaskChecklist) -> bool {
    checklist.all_done()
}

/// Trimmed report text, or why it cannot be sent.
pub fn validate_report_text(text: &str) -> Result<&str, GateError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GateError::EmptyReport);
    }
    let len = trimmed.chars().count();
    if len > MAX_REPORT_CHARS {
        return Err(GateError::ReportTooLong {
            len,
            max: MAX_REPORT_CHARS,
        });
    }
    Ok(trimmed)
}

/// Ticket for an in-flight submission.
#[derive(Debug)]
#[must_use = "an unfinished submission keeps the report locked"]
pub struct Submission {
    report_id: String,
    text: String,
}

impl Submission {
    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportGate {
    record: Option<MedicalReport>,
    submitting: bool,
}

impl ReportGate {
    pub fn new(record: Option<MedicalReport>) -> Self {
        Self {
            record,
            submitting: false,
        }
    }

    pub fn record(&self) -> Option<&MedicalReport> {
        self.record.as_ref()
    }

    pub fn phase(&self) -> ReportPhase {
        match &self.record {
            None => ReportPhase::Unavailable,
            Some(r) if r.status == ReportStatus::Done => ReportPhase::Approved,
            Some(r) if r.is_submitted() => ReportPhase::Submitted,
            Some(_) => ReportPhase::Open,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Run every client-side check and lock the report for sending.
    pub fn begin_submit(
        &mut self,
        checklist: &TaskChecklist,
        text: &str,
    ) -> Result<Submission, GateError> {
        if !can_submit(checklist) {
            tracing::debug!(
                done = checklist.done_count(),
                total = checklist.len(),
                "Report submission refused, checklist incomplete"
            );
            return Err(GateError::GateClosed);
        }
        if self.submitting {
            return Err(GateError::SubmissionPending);
        }
        let report_id = match self.phase() {
            ReportPhase::Unavailable => return Err(GateError::ReportUnavailable),
            ReportPhase::Submitted | ReportPhase::Approved => {
                return Err(GateError::AlreadySubmitted)
            }
            ReportPhase::Open => self
                .record
                .as_ref()
                .map(|r| r.id.clone())
                .ok_or(GateError::ReportUnavailable)?,
        };
        let text = validate_report_text(text)?.to_string();

        self.submitting = true;
        Ok(Submission { report_id, text })
    }

    pub fn finish_submit(
        &mut self,
        submission: Submission,
        result: Result<(), ApiError>,
    ) -> Result<(), GateError> {
        let Submission { report_id, text } = submission;
        self.settle(&report_id, text, result)
    }

    /// Mark a submission still out from an earlier copy of this gate as
    /// pending here too. Ignored once the report is no longer open.
    pub fn resume_submitting(&mut self, report_id: &str) {
        if self.phase() == ReportPhase::Open && self.record.as_ref().is_some_and(|r| r.id == report_id) {
            self.submitting = true;
        }
    }

    /// Apply a backend answer by report id, for a gate rebuilt while the
    /// call was out.
    pub fn settle(
        &mut self,
        report_id: &str,
        text: String,
        result: Result<(), ApiError>,
    ) -> Result<(), GateError> {
        let record = match self.record.as_mut() {
            Some(r) if self.submitting && r.id == report_id => r,
            _ => return Err(GateError::StaleConfirmation(report_id.to_string())),
        };
        self.submitting = false;

        match result {
            Ok(()) => {
                record.nursing_report = Some(text);
                tracing::info!(report_id = %record.id, "Nursing report submitted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%report_id, error = %e, "Nursing report submission failed");
                Err(GateError::Backend(e))
            }
        }
    }

    /// Single-caller form of [`begin_submit`](Self::begin_submit) and
    /// [`finish_submit`](Self::finish_submit).
    pub fn submit(
        &mut self,
        checklist: &TaskChecklist,
        text: &str,
        backend: &dyn NursingBackend,
    ) -> Result<(), GateError> {
        let submission = self.begin_submit(checklist, text)?;
        let result = backend.submit_medical_report(submission.report_id(), submission.text());
        self.finish_submit(submission, result)
    }
}

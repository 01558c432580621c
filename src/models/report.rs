use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::ReportStatus;
use crate::api::types::{parse_timestamp, FeedbackRecord, MedicalReportRecord};
use crate::api::ApiError;

/// The nurse's closing note for an appointment, reviewed by staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalReport {
    pub id: String,
    pub package_id: String,
    pub patient_id: String,
    pub nursing_report: Option<String>,
    pub staff_confirmation: Option<String>,
    pub status: ReportStatus,
    pub created_at: Option<NaiveDateTime>,
}

impl MedicalReport {
    /// A non-empty nursing report means the nurse already submitted.
    pub fn is_submitted(&self) -> bool {
        self.nursing_report
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

impl TryFrom<MedicalReportRecord> for MedicalReport {
    type Error = ApiError;

    fn try_from(record: MedicalReportRecord) -> Result<Self, Self::Error> {
        let status = record.status.trim().parse::<ReportStatus>().map_err(|e| {
            ApiError::Mapping(format!("medical record {}: {e}", record.id))
        })?;
        Ok(MedicalReport {
            created_at: record.created_at.as_deref().and_then(parse_timestamp),
            id: record.id,
            package_id: record.svc_package_id.unwrap_or_default(),
            patient_id: record.patient_id.unwrap_or_default(),
            nursing_report: record.nursing_report.filter(|s| !s.trim().is_empty()),
            staff_confirmation: record.staff_confirmation.filter(|s| !s.trim().is_empty()),
            status,
        })
    }
}

/// Patient star rating and comment for a completed visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub medical_record_id: Option<String>,
    pub rating: u8,
    pub comment: String,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<FeedbackRecord> for Feedback {
    type Error = ApiError;

    fn try_from(record: FeedbackRecord) -> Result<Self, Self::Error> {
        if !(1..=5).contains(&record.star) {
            return Err(ApiError::Mapping(format!(
                "feedback {}: rating {} outside 1..=5",
                record.id, record.star
            )));
        }
        Ok(Feedback {
            created_at: record.created_at.as_deref().and_then(parse_timestamp),
            id: record.id,
            medical_record_id: record.medical_record_id,
            rating: record.star,
            comment: record.content.unwrap_or_default(),
        })
    }
}

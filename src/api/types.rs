//! Wire records for the care platform REST backend.
//!
//! The backend speaks JSON with hyphenated keys and wraps every payload in
//! `{ "status": <code>, "data": ... }`. These records mirror that schema
//! one-to-one; the domain types in `crate::models` are built from them by
//! pure mapping functions so naming quirks stay on this side of the line.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Envelopes
// ═══════════════════════════════════════════════════════════

/// `{ "status": 200, "data": T }`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<u16>,
    pub data: T,
}

/// Same envelope where `data` may be null or missing (nothing stored yet).
#[derive(Debug, Deserialize)]
pub struct OptionalEnvelope<T> {
    #[serde(default)]
    pub status: Option<u16>,
    // Missing reads as `None`; `serde(default)` would demand `T: Default`.
    pub data: Option<T>,
}

/// `{ "status": 200, "message": "..." }` returned by write calls.
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body. `reason_field` carries the user-facing reason.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub reason_field: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    /// Most specific reason the backend gave, if any.
    pub fn reason(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(|e| e.reason_field.clone().or_else(|| e.message.clone()))
            .or_else(|| self.message.clone())
            .filter(|r| !r.trim().is_empty())
    }
}

// ═══════════════════════════════════════════════════════════
// Auth
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginBody<'a> {
    pub phone_number: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginData {
    pub account_info: AccountRecord,
    pub token: TokenRecord,
}

#[derive(Debug, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccountRecord {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Nurse / patient
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NurseProfileRecord {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub nurse_id: Option<String>,
    #[serde(default)]
    pub nurse_picture: Option<String>,
    #[serde(default)]
    pub nurse_name: Option<String>,
    #[serde(default)]
    pub gender: Option<bool>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub current_work_place: Option<String>,
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default)]
    pub slogan: Option<String>,
    #[serde(default)]
    pub rate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatientRecord {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Appointments
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppointmentRecord {
    pub id: String,
    #[serde(default)]
    pub service_id: String,
    pub cuspackage_id: String,
    #[serde(default)]
    pub nursing_id: Option<String>,
    pub patient_id: String,
    #[serde(default)]
    pub patient_address: Option<String>,
    #[serde(default)]
    pub patient_lat_lng: Option<String>,
    pub est_date: String,
    #[serde(default)]
    pub act_date: Option<String>,
    pub status: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub total_est_duration: u32,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub total_fee: i64,
    #[serde(default)]
    pub paid_amount: i64,
    #[serde(default)]
    pub unpaid_amount: i64,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskRecord {
    pub id: String,
    pub task_order: i32,
    pub name: String,
    #[serde(default)]
    pub client_note: Option<String>,
    #[serde(default)]
    pub staff_advice: Option<String>,
    #[serde(default)]
    pub est_duration: u32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub total_unit: u32,
    pub status: String,
    #[serde(default)]
    pub est_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentDetailRecord {
    pub package: PackageRecord,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

// ═══════════════════════════════════════════════════════════
// Medical record / feedback
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MedicalReportRecord {
    pub id: String,
    #[serde(default)]
    pub svc_package_id: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub nursing_report: Option<String>,
    #[serde(default)]
    pub staff_confirmation: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmitReportBody<'a> {
    pub nursing_report: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeedbackRecord {
    pub id: String,
    #[serde(default)]
    pub medical_record_id: Option<String>,
    pub star: u8,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Timestamps
// ═══════════════════════════════════════════════════════════

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse a backend timestamp as wall-clock time.
///
/// Accepts RFC 3339 (offset dropped, wall clock kept), naive date-times and
/// bare dates (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Date format used in query strings (`est-date`, `est-date-from`, ...).
pub fn query_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

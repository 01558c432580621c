use chrono::NaiveDate;
use serde::Serialize;

use super::today_or;
use crate::leave::{LeaveRequest, LeaveSummary, LeaveType};
use crate::session::FieldError;

#[derive(Debug, Serialize)]
pub struct LeaveTypeOption {
    pub value: LeaveType,
    pub label: &'static str,
}

#[tauri::command]
pub fn get_leave_types() -> Vec<LeaveTypeOption> {
    LeaveType::ALL
        .iter()
        .map(|t| LeaveTypeOption { value: *t, label: t.label() })
        .collect()
}

/// Check a leave request against today's date. Errors come back per field
/// so the form can mark the inputs.
#[tauri::command]
pub fn check_leave_request(
    request: LeaveRequest,
    today: Option<NaiveDate>,
) -> Result<LeaveSummary, Vec<FieldError>> {
    request.check(today_or(today))
}

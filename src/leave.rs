//! Leave requests.
//!
//! The nurse picks a leave type, a date range and a reason. Requests must
//! be filed at least [`LEAD_DAYS`] days ahead. Validation is local; the
//! checked request is handed back with its inclusive length in days.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::FieldError;

/// Minimum days between today and the first day of leave.
pub const LEAD_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Remote,
}

impl LeaveType {
    pub const ALL: [LeaveType; 4] = [Self::Annual, Self::Sick, Self::Personal, Self::Remote];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Annual => "Annual leave",
            Self::Sick => "Sick leave",
            Self::Personal => "Personal leave",
            Self::Remote => "Remote work",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    #[serde(default)]
    pub leave_type: Option<LeaveType>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub reason: String,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSummary {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub duration_days: u32,
}

/// Earliest date a request filed on `today` may start.
pub fn earliest_start(today: NaiveDate) -> NaiveDate {
    today + Duration::days(LEAD_DAYS)
}

impl LeaveRequest {
    /// Days covered, both ends included. `None` until both dates are set
    /// and in order.
    pub fn duration_days(&self) -> Option<u32> {
        let (start, end) = (self.start_date?, self.end_date?);
        u32::try_from((end - start).num_days() + 1).ok().filter(|d| *d > 0)
    }

    /// Every field-level problem, in form order.
    pub fn validate(&self, today: NaiveDate) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.leave_type.is_none() {
            errors.push(FieldError {
                field: "leaveType",
                message: "Leave type is required",
            });
        }
        if self.reason.trim().is_empty() {
            errors.push(FieldError {
                field: "reason",
                message: "Reason is required",
            });
        }

        match self.start_date {
            None => errors.push(FieldError {
                field: "startDate",
                message: "Start date is required",
            }),
            Some(start) if start < today => errors.push(FieldError {
                field: "startDate",
                message: "Start date cannot be in the past",
            }),
            Some(start) if start < earliest_start(today) => errors.push(FieldError {
                field: "startDate",
                message: "Leave must be requested at least 3 days ahead",
            }),
            Some(_) => {}
        }

        match (self.start_date, self.end_date) {
            (_, None) => errors.push(FieldError {
                field: "endDate",
                message: "End date is required",
            }),
            (_, Some(end)) if end < today => errors.push(FieldError {
                field: "endDate",
                message: "End date cannot be in the past",
            }),
            (Some(start), Some(end)) if end < start => errors.push(FieldError {
                field: "endDate",
                message: "End date must not be before the start date",
            }),
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and summarise in one step.
    pub fn check(&self, today: NaiveDate) -> Result<LeaveSummary, Vec<FieldError>> {
        self.validate(today)?;
        match (self.leave_type, self.start_date, self.end_date, self.duration_days()) {
            (Some(leave_type), Some(start_date), Some(end_date), Some(duration_days)) => {
                tracing::info!(
                    leave_type = leave_type.label(),
                    %start_date,
                    %end_date,
                    duration_days,
                    "Leave request checked"
                );
                Ok(LeaveSummary {
                    leave_type,
                    start_date,
                    end_date,
                    reason: self.reason.trim().to_string(),
                    duration_days,
                })
            }
            _ => Err(vec![FieldError {
                field: "endDate",
                message: "End date must not be before the start date",
            }]),
        }
    }
}

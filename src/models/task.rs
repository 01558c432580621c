use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::TaskStatus;
use crate::api::types::{parse_timestamp, TaskRecord};
use crate::api::ApiError;

/// One billable unit of nursing work inside an appointment's package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Fixed position deciding completion order (`task-order`).
    pub order: i32,
    pub est_duration_minutes: u32,
    pub unit: String,
    pub total_unit: u32,
    pub client_note: Option<String>,
    pub staff_advice: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub status: TaskStatus,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

fn non_blank(raw: &Option<String>) -> Option<String> {
    raw.as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl TaskRecord {
    fn to_task(&self) -> Result<Task, ApiError> {
        let scheduled_at = match self.est_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                ApiError::Mapping(format!("task {}: unreadable est-date '{raw}'", self.id))
            })?),
            None => None,
        };

        Ok(Task {
            id: self.id.clone(),
            name: self.name.clone(),
            order: self.task_order,
            est_duration_minutes: self.est_duration,
            unit: self.unit.clone().unwrap_or_default(),
            total_unit: self.total_unit,
            client_note: non_blank(&self.client_note),
            staff_advice: non_blank(&self.staff_advice),
            scheduled_at,
            status: TaskStatus::from_wire(&self.status),
        })
    }
}

/// Build the ordered task sequence from raw backend records.
///
/// Sorted ascending by `task-order`; the input is left untouched. Two
/// records sharing an ordinal would make the completion order ambiguous,
/// so they are rejected.
pub fn map_tasks(records: &[TaskRecord]) -> Result<Vec<Task>, ApiError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.task_order) {
            return Err(ApiError::Mapping(format!(
                "duplicate task-order {} (task {})",
                record.task_order, record.id
            )));
        }
    }

    let mut tasks = records
        .iter()
        .map(TaskRecord::to_task)
        .collect::<Result<Vec<_>, _>>()?;
    tasks.sort_by_key(|t| t.order);
    Ok(tasks)
}

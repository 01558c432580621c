//! Ordered completion of an appointment's tasks.
//!
//! A task may be marked done only when every task before it is done. The
//! mark only sticks once the backend confirms it; after that the task is
//! locked. While a confirmation is in flight the task cannot be toggled.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::GateError;
use crate::api::{ApiError, NursingBackend};
use crate::models::{Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskProgress {
    NotDone,
    /// Confirmation call outstanding; toggle disabled.
    Confirming,
    /// Confirmed by the backend (or already done when fetched). Locked.
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistItem {
    pub task: Task,
    pub progress: TaskProgress,
}

/// Ticket for one in-flight confirmation. Hand it back to
/// [`TaskChecklist::finish_complete`] with the backend's answer.
#[derive(Debug)]
#[must_use = "an unfinished confirmation leaves the task disabled"]
pub struct Confirmation {
    index: usize,
    task_id: String,
}

impl Confirmation {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChecklist {
    items: Vec<ChecklistItem>,
}

impl TaskChecklist {
    /// Build from mapped tasks. Sorting again keeps the order invariant even
    /// for callers that skipped the mapper.
    pub fn new(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| t.order);
        let items = tasks
            .into_iter()
            .map(|task| {
                let progress = match task.status {
                    TaskStatus::Done => TaskProgress::Done,
                    TaskStatus::NotDone => TaskProgress::NotDone,
                };
                ChecklistItem { task, progress }
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn progress(&self, index: usize) -> Option<TaskProgress> {
        self.items.get(index).map(|item| item.progress)
    }

    pub fn done_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.progress == TaskProgress::Done)
            .count()
    }

    /// Non-empty and every task confirmed.
    pub fn all_done(&self) -> bool {
        !self.items.is_empty() && self.done_count() == self.items.len()
    }

    /// First task before `index` that is not done yet.
    fn blocking_before(&self, index: usize) -> Option<usize> {
        self.items[..index.min(self.items.len())]
            .iter()
            .position(|item| item.progress != TaskProgress::Done)
    }

    /// Whether the toggle for `index` should be enabled.
    pub fn can_toggle(&self, index: usize) -> bool {
        self.progress(index) == Some(TaskProgress::NotDone) && self.blocking_before(index).is_none()
    }

    /// The one task that can be completed next, if any.
    pub fn next_actionable(&self) -> Option<usize> {
        let index = self
            .items
            .iter()
            .position(|item| item.progress != TaskProgress::Done)?;
        (self.items[index].progress == TaskProgress::NotDone).then_some(index)
    }

    /// Check the gate and mark the task as confirming.
    pub fn begin_complete(&mut self, index: usize) -> Result<Confirmation, GateError> {
        let progress = self.progress(index).ok_or(GateError::TaskNotFound(index))?;
        match progress {
            TaskProgress::Done => return Err(GateError::AlreadyCompleted(index)),
            TaskProgress::Confirming => return Err(GateError::ConfirmationPending(index)),
            TaskProgress::NotDone => {}
        }
        if let Some(blocking) = self.blocking_before(index) {
            tracing::debug!(index, blocking, "Out-of-order completion refused");
            return Err(GateError::SequenceViolation { index, blocking });
        }

        let item = &mut self.items[index];
        item.progress = TaskProgress::Confirming;
        tracing::debug!(index, task_id = %item.task.id, "Task confirmation started");
        Ok(Confirmation {
            index,
            task_id: item.task.id.clone(),
        })
    }

    /// Apply the backend's answer. Success locks the task; failure puts it
    /// back to not done so the nurse can retry.
    pub fn finish_complete(
        &mut self,
        confirmation: Confirmation,
        result: Result<(), ApiError>,
    ) -> Result<(), GateError> {
        let Confirmation { index, task_id } = confirmation;
        match self.items.get(index) {
            Some(item) if item.task.id == task_id && item.progress == TaskProgress::Confirming => {
                self.apply(index, result)
            }
            _ => {
                tracing::debug!(index, %task_id, "Discarding stale confirmation");
                Err(GateError::StaleConfirmation(task_id))
            }
        }
    }

    /// Carry confirmations still out from an earlier copy of this checklist.
    /// Matching tasks the backend has not yet recorded as done read as
    /// confirming again.
    pub fn resume_confirming(&mut self, task_ids: &HashSet<String>) {
        for item in &mut self.items {
            if item.progress == TaskProgress::NotDone && task_ids.contains(&item.task.id) {
                item.progress = TaskProgress::Confirming;
            }
        }
    }

    /// Apply a backend answer by task id, for a checklist rebuilt while the
    /// call was out.
    pub fn settle(&mut self, task_id: &str, result: Result<(), ApiError>) -> Result<(), GateError> {
        let index = self
            .items
            .iter()
            .position(|i| i.task.id == task_id && i.progress == TaskProgress::Confirming)
            .ok_or_else(|| GateError::StaleConfirmation(task_id.to_string()))?;
        self.apply(index, result)
    }

    fn apply(&mut self, index: usize, result: Result<(), ApiError>) -> Result<(), GateError> {
        let item = &mut self.items[index];
        let task_id = item.task.id.clone();
        match result {
            Ok(()) => {
                item.progress = TaskProgress::Done;
                item.task.status = TaskStatus::Done;
                tracing::info!(index, %task_id, "Task confirmed done");
                Ok(())
            }
            Err(e) => {
                item.progress = TaskProgress::NotDone;
                tracing::warn!(index, %task_id, error = %e, "Task confirmation failed");
                Err(GateError::Backend(e))
            }
        }
    }

    /// Single-caller form: gate, confirm with the backend, apply.
    pub fn attempt_complete(
        &mut self,
        index: usize,
        backend: &dyn NursingBackend,
    ) -> Result<(), GateError> {
        let confirmation = self.begin_complete(index)?;
        let result = backend.mark_task_done(confirmation.task_id());
        self.finish_complete(confirmation, result)
    }

    /// Undo a completion. Confirmed tasks are locked; a task whose
    /// confirmation is in flight cannot be touched; a task that was never
    /// completed has nothing to undo.
    pub fn attempt_uncomplete(&mut self, index: usize) -> Result<(), GateError> {
        match self.progress(index).ok_or(GateError::TaskNotFound(index))? {
            TaskProgress::Done => Err(GateError::LockedTask(index)),
            TaskProgress::Confirming => Err(GateError::ConfirmationPending(index)),
            TaskProgress::NotDone => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::test_support::{detail, task, PACKAGE_ID};

    fn two_open_tasks() -> Vec<Task> {
        vec![task("t1", 1, TaskStatus::NotDone), task("t2", 2, TaskStatus::NotDone)]
    }

    fn backend_for(tasks: &[Task]) -> MockBackend {
        MockBackend::new().with_detail(PACKAGE_ID, detail(PACKAGE_ID, tasks.to_vec()))
    }

    #[test]
    fn out_of_order_completion_is_refused_without_server_call() {
        let tasks = two_open_tasks();
        let backend = backend_for(&tasks);
        let mut checklist = TaskChecklist::new(tasks);
        let before = checklist.clone();

        let err = checklist.attempt_complete(1, &backend).unwrap_err();

        assert_eq!(err, GateError::SequenceViolation { index: 1, blocking: 0 });
        assert_eq!(checklist, before);
        assert_eq!(backend.call_count("mark_task_done"), 0);
    }

    #[test]
    fn completing_in_order_locks_and_unlocks_next() {
        let tasks = two_open_tasks();
        let backend = backend_for(&tasks);
        let mut checklist = TaskChecklist::new(tasks);

        checklist.attempt_complete(0, &backend).unwrap();
        assert_eq!(checklist.progress(0), Some(TaskProgress::Done));
        assert_eq!(checklist.attempt_uncomplete(0), Err(GateError::LockedTask(0)));

        assert!(checklist.can_toggle(1));
        checklist.attempt_complete(1, &backend).unwrap();
        assert!(checklist.all_done());
        assert_eq!(backend.calls(), vec!["mark_task_done:t1", "mark_task_done:t2"]);
    }

    #[test]
    fn server_failure_leaves_task_open_and_retry_works() {
        let tasks = two_open_tasks();
        let backend = backend_for(&tasks);
        backend.fail_next("mark_task_done", ApiError::Connection("http://care".into()));
        let mut checklist = TaskChecklist::new(tasks);

        let err = checklist.attempt_complete(0, &backend).unwrap_err();
        assert!(matches!(err, GateError::Backend(ApiError::Connection(_))));
        assert_eq!(checklist.progress(0), Some(TaskProgress::NotDone));
        assert_eq!(checklist.attempt_uncomplete(0), Ok(()));

        checklist.attempt_complete(0, &backend).unwrap();
        assert_eq!(checklist.progress(0), Some(TaskProgress::Done));
    }

    #[test]
    fn completion_only_succeeds_when_all_predecessors_done() {
        // Every prefix/index combination of a five-task list.
        for done_prefix in 0..=5usize {
            for index in 0..5usize {
                let tasks: Vec<Task> = (0..5)
                    .map(|i| {
                        let status = if i < done_prefix { TaskStatus::Done } else { TaskStatus::NotDone };
                        task(&format!("t{i}"), i as i32 + 1, status)
                    })
                    .collect();
                let backend = backend_for(&tasks);
                let mut checklist = TaskChecklist::new(tasks);
                let result = checklist.attempt_complete(index, &backend);

                if index < done_prefix {
                    assert_eq!(result, Err(GateError::AlreadyCompleted(index)));
                } else if index == done_prefix {
                    assert_eq!(result, Ok(()), "prefix {done_prefix} index {index}");
                } else {
                    assert_eq!(
                        result,
                        Err(GateError::SequenceViolation { index, blocking: done_prefix })
                    );
                }
            }
        }
    }

    #[test]
    fn in_flight_task_cannot_be_toggled() {
        let mut checklist = TaskChecklist::new(two_open_tasks());
        let confirmation = checklist.begin_complete(0).unwrap();

        assert_eq!(checklist.begin_complete(0).unwrap_err(), GateError::ConfirmationPending(0));
        assert_eq!(checklist.attempt_uncomplete(0), Err(GateError::ConfirmationPending(0)));
        assert!(!checklist.can_toggle(0));
        // A confirming predecessor still blocks the next task.
        assert_eq!(
            checklist.begin_complete(1).unwrap_err(),
            GateError::SequenceViolation { index: 1, blocking: 0 }
        );
        assert_eq!(checklist.next_actionable(), None);

        checklist.finish_complete(confirmation, Ok(())).unwrap();
        assert_eq!(checklist.next_actionable(), Some(1));
    }

    #[test]
    fn stale_confirmation_is_discarded() {
        let mut checklist = TaskChecklist::new(two_open_tasks());
        let confirmation = checklist.begin_complete(0).unwrap();

        // Checklist rebuilt from a re-fetch while the call was out.
        checklist = TaskChecklist::new(vec![task("other", 1, TaskStatus::NotDone)]);
        let err = checklist.finish_complete(confirmation, Ok(())).unwrap_err();
        assert_eq!(err, GateError::StaleConfirmation("t1".into()));
        assert_eq!(checklist.progress(0), Some(TaskProgress::NotDone));
    }

    #[test]
    fn rebuilt_checklist_keeps_outstanding_confirmation() {
        let mut first = TaskChecklist::new(two_open_tasks());
        let confirmation = first.begin_complete(0).unwrap();
        let outstanding: HashSet<String> = [confirmation.task_id().to_string()].into();

        let mut rebuilt = TaskChecklist::new(two_open_tasks());
        rebuilt.resume_confirming(&outstanding);
        assert_eq!(rebuilt.progress(0), Some(TaskProgress::Confirming));
        assert_eq!(rebuilt.begin_complete(0).unwrap_err(), GateError::ConfirmationPending(0));
        assert_eq!(rebuilt.attempt_uncomplete(0), Err(GateError::ConfirmationPending(0)));

        rebuilt.settle(confirmation.task_id(), Ok(())).unwrap();
        assert_eq!(rebuilt.progress(0), Some(TaskProgress::Done));
        assert_eq!(rebuilt.items()[0].task.status, TaskStatus::Done);
        assert_eq!(rebuilt.next_actionable(), Some(1));
    }

    #[test]
    fn resume_leaves_server_confirmed_tasks_done() {
        let outstanding: HashSet<String> = ["t1".to_string()].into();
        let mut rebuilt = TaskChecklist::new(vec![
            task("t1", 1, TaskStatus::Done),
            task("t2", 2, TaskStatus::NotDone),
        ]);
        rebuilt.resume_confirming(&outstanding);
        assert_eq!(rebuilt.progress(0), Some(TaskProgress::Done));
        assert_eq!(rebuilt.settle("t1", Ok(())), Err(GateError::StaleConfirmation("t1".into())));
    }

    #[test]
    fn settle_failure_reopens_task() {
        let outstanding: HashSet<String> = ["t1".to_string()].into();
        let mut rebuilt = TaskChecklist::new(two_open_tasks());
        rebuilt.resume_confirming(&outstanding);

        let err = rebuilt.settle("t1", Err(ApiError::Timeout(30))).unwrap_err();
        assert_eq!(err, GateError::Backend(ApiError::Timeout(30)));
        assert_eq!(rebuilt.progress(0), Some(TaskProgress::NotDone));
        assert!(rebuilt.can_toggle(0));
    }

    #[test]
    fn tasks_done_on_arrival_are_locked() {
        let mut checklist = TaskChecklist::new(vec![
            task("t1", 1, TaskStatus::Done),
            task("t2", 2, TaskStatus::NotDone),
        ]);
        assert_eq!(checklist.attempt_uncomplete(0), Err(GateError::LockedTask(0)));
        assert!(checklist.can_toggle(1));
    }

    #[test]
    fn unknown_index_is_reported() {
        let mut checklist = TaskChecklist::new(two_open_tasks());
        assert_eq!(checklist.begin_complete(7).unwrap_err(), GateError::TaskNotFound(7));
        assert_eq!(checklist.attempt_uncomplete(7), Err(GateError::TaskNotFound(7)));
    }

    #[test]
    fn empty_checklist_is_never_all_done() {
        let checklist = TaskChecklist::new(vec![]);
        assert!(!checklist.all_done());
        assert_eq!(checklist.next_actionable(), None);
    }

    #[test]
    fn new_sorts_by_order() {
        let checklist = TaskChecklist::new(vec![
            task("b", 2, TaskStatus::NotDone),
            task("a", 1, TaskStatus::NotDone),
        ]);
        assert_eq!(checklist.items()[0].task.id, "a");
    }
}

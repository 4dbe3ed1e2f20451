// src/dag/state.rs

//! Pure scheduling rules, shared by every store backend and the runner.

use crate::model::Task;
use crate::types::{TaskStatus, WorkflowStatus};

/// Whether `task` may be picked up now.
///
/// `dependency` is the task referenced by `task.depends_on`, if it could be
/// loaded. A dependency that no longer resolves is treated as unsatisfied.
pub fn is_eligible(task: &Task, dependency: Option<&Task>) -> bool {
    if task.status != TaskStatus::Queued {
        return false;
    }
    match task.depends_on {
        None => true,
        Some(dep_id) => dependency
            .filter(|d| d.task_id == dep_id)
            .is_some_and(|d| d.status == TaskStatus::Completed),
    }
}

/// The status a workflow should move to given its tasks, or `None` when it
/// should stay where it is.
///
/// - any task `Failed` -> `Failed`
/// - every task `Completed` -> `Completed`
/// - anything started -> `InProgress`
///
/// Only forward transitions are returned.
pub fn reconcile_workflow_status(
    current: WorkflowStatus,
    tasks: &[Task],
) -> Option<WorkflowStatus> {
    if tasks.is_empty() {
        return None;
    }

    let next = if tasks.iter().any(|t| t.status == TaskStatus::Failed) {
        WorkflowStatus::Failed
    } else if tasks.iter().all(|t| t.status == TaskStatus::Completed) {
        WorkflowStatus::Completed
    } else if tasks.iter().any(|t| t.status != TaskStatus::Queued) {
        WorkflowStatus::InProgress
    } else {
        return None;
    };

    current.can_transition_to(next).then_some(next)
}

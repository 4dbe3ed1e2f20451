// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single task.
///
/// Transitions only move forward: `Queued -> Running -> {Completed, Failed}`.
/// A task never re-enters `Queued` once it has left it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Queued, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

/// Lifecycle of a workflow.
///
/// `Initial -> InProgress -> {Completed, Failed}`; `Initial` may also jump
/// straight to a terminal state when the whole graph settles in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Initial,
    InProgress,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 4] = [
        WorkflowStatus::Initial,
        WorkflowStatus::InProgress,
        WorkflowStatus::Completed,
        WorkflowStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Initial => "initial",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            WorkflowStatus::Initial => 0,
            WorkflowStatus::InProgress => 1,
            WorkflowStatus::Completed | WorkflowStatus::Failed => 2,
        }
    }

    /// Forward-only check. Terminal states never change.
    pub fn can_transition_to(&self, next: WorkflowStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "initial" => Ok(WorkflowStatus::Initial),
            "in_progress" => Ok(WorkflowStatus::InProgress),
            "completed" => Ok(WorkflowStatus::Completed),
            "failed" => Ok(WorkflowStatus::Failed),
            other => Err(format!("invalid workflow status: {other}")),
        }
    }
}

/// Which persistence backend the service uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite database file (`[store].path`).
    #[default]
    Sqlite,
    /// Process-local maps; lost on restart.
    Memory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_only_moves_forward() {
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));

        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Queued));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn workflow_terminal_states_are_final() {
        assert!(WorkflowStatus::Initial.can_transition_to(WorkflowStatus::InProgress));
        assert!(WorkflowStatus::InProgress.can_transition_to(WorkflowStatus::Completed));
        assert!(WorkflowStatus::Initial.can_transition_to(WorkflowStatus::Failed));

        assert!(!WorkflowStatus::InProgress.can_transition_to(WorkflowStatus::Initial));
        assert!(!WorkflowStatus::Completed.can_transition_to(WorkflowStatus::Failed));
        assert!(!WorkflowStatus::Failed.can_transition_to(WorkflowStatus::Completed));
    }

    #[test]
    fn store_backend_defaults_to_sqlite() {
        assert_eq!(StoreBackend::default(), StoreBackend::Sqlite);
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        for s in ["queued", "running", "completed", "failed"] {
            assert_eq!(TaskStatus::from_str(s).unwrap().as_str(), s);
        }
        assert_eq!(
            WorkflowStatus::from_str("in_progress").unwrap(),
            WorkflowStatus::InProgress
        );
        assert!(TaskStatus::from_str("paused").is_err());
    }
}

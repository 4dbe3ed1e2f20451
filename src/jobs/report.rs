// src/jobs/report.rs

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::errors::JobError;
use crate::jobs::{Job, JobResult};
use crate::model::{LoadedTask, Task};
use crate::store::SharedStore;
use crate::types::TaskStatus;

const FAILED_MARKER: &str = "Task failed";

/// One line of the report per task of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutput {
    pub task_id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub output: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Task> for TaskOutput {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.task_id.to_string(),
            task_type: task.task_type.clone(),
            output: task.progress.clone(),
            status: task.status,
            error: (task.status == TaskStatus::Failed).then(|| FAILED_MARKER.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub workflow_id: String,
    pub client_id: String,
    pub tasks: Vec<TaskOutput>,
    pub final_report: String,
    pub timestamp: String,
}

/// Aggregates every task of the owning workflow into a [`Report`].
#[derive(Debug, Clone)]
pub struct ReportGenerationJob {
    store: SharedStore,
}

impl ReportGenerationJob {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Job for ReportGenerationJob {
    async fn run(&self, task: &LoadedTask) -> JobResult {
        let workflow_id = task.workflow.workflow_id;
        let tasks = self.store.tasks_for_workflow(workflow_id).await?;

        let outputs: Vec<TaskOutput> = tasks.iter().map(TaskOutput::from).collect();
        let report = Report {
            workflow_id: workflow_id.to_string(),
            client_id: task.task.client_id.clone(),
            final_report: render_final_report(&outputs),
            tasks: outputs,
            timestamp: Utc::now().to_rfc3339(),
        };

        info!(%workflow_id, tasks = report.tasks.len(), "generated workflow report");
        serde_json::to_value(&report).map_err(|e| JobError::Failed(e.to_string()))
    }
}

/// Human-readable summary.
///
/// "Total" counts every task of the workflow, including ones that have not
/// finished (the report task itself is usually still running).
pub fn render_final_report(outputs: &[TaskOutput]) -> String {
    let successful: Vec<&TaskOutput> = outputs
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .collect();
    let failed: Vec<&TaskOutput> = outputs
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .collect();

    let mut report = String::from("Workflow Report\n");
    let _ = writeln!(report, "Total Tasks: {}", outputs.len());
    let _ = writeln!(report, "Successful Tasks: {}", successful.len());
    let _ = writeln!(report, "Failed Tasks: {}\n", failed.len());

    if !successful.is_empty() {
        report.push_str("Successful Task Results:\n");
        for t in &successful {
            let output = serde_json::to_string(&t.output).unwrap_or_else(|_| "null".to_string());
            let _ = writeln!(report, "- {}: {}", t.task_type, output);
        }
    }

    if !failed.is_empty() {
        report.push_str("\nFailed Tasks:\n");
        for t in &failed {
            let _ = writeln!(
                report,
                "- {}: {}",
                t.task_type,
                t.error.as_deref().unwrap_or(FAILED_MARKER)
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Workflow;
    use crate::store::{MemoryStore, Store};

    fn output(task_type: &str, status: TaskStatus, progress: Option<&str>) -> TaskOutput {
        TaskOutput {
            task_id: uuid::Uuid::new_v4().to_string(),
            task_type: task_type.to_string(),
            output: progress.map(str::to_string),
            status,
            error: (status == TaskStatus::Failed).then(|| FAILED_MARKER.to_string()),
        }
    }

    #[test]
    fn counts_add_up_and_failures_are_marked() {
        let text = render_final_report(&[
            output("polygonArea", TaskStatus::Completed, Some("1000000")),
            output("analysis", TaskStatus::Completed, Some("{}")),
            output("notification", TaskStatus::Failed, None),
        ]);

        assert!(text.starts_with("Workflow Report\n"));
        assert!(text.contains("Total Tasks: 3\n"));
        assert!(text.contains("Successful Tasks: 2\n"));
        assert!(text.contains("Failed Tasks: 1\n\n"));
        assert!(text.contains("- polygonArea: \"1000000\"\n"));
        assert!(text.contains("\nFailed Tasks:\n- notification: Task failed\n"));
    }

    #[test]
    fn empty_workflow_has_only_the_header() {
        let text = render_final_report(&[]);
        assert_eq!(
            text,
            "Workflow Report\nTotal Tasks: 0\nSuccessful Tasks: 0\nFailed Tasks: 0\n\n"
        );
    }

    #[tokio::test]
    async fn report_reads_sibling_tasks_in_step_order() {
        let store = Arc::new(MemoryStore::new());
        let wf: Workflow = store.create_workflow("client-1").await.unwrap();
        let report_task = Task::new_queued(&wf, "reportGeneration", 2, "{}");
        let area_task = Task::new_queued(&wf, "polygonArea", 1, "{}");
        store
            .insert_tasks(&[report_task.clone(), area_task.clone()])
            .await
            .unwrap();

        let job = ReportGenerationJob::new(store.clone());
        let value = job
            .run(&LoadedTask::new(report_task, wf.clone()))
            .await
            .unwrap();

        assert_eq!(value["workflowId"], wf.workflow_id.to_string());
        assert_eq!(value["clientId"], "client-1");
        assert_eq!(value["tasks"][0]["type"], "polygonArea");
        assert_eq!(value["tasks"][1]["type"], "reportGeneration");
        assert!(value["tasks"][0].get("error").is_none());
        assert!(
            value["finalReport"]
                .as_str()
                .unwrap()
                .contains("Total Tasks: 2")
        );
    }
}

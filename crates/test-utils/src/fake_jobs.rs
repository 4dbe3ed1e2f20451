use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use geoflow::errors::JobError;
use geoflow::jobs::{Job, JobResult};
use geoflow::model::LoadedTask;
use serde_json::{Value, json};
use uuid::Uuid;

/// A fake job that:
/// - records which tasks it ran, in order
/// - returns a fixed output (default: `{"ranBy": "<task type>"}`).
#[derive(Clone, Default)]
pub struct RecordingJob {
    executed: Arc<Mutex<Vec<Uuid>>>,
    output: Option<Value>,
}

impl RecordingJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(output: Value) -> Self {
        Self {
            output: Some(output),
            ..Self::default()
        }
    }

    pub fn executed(&self) -> Vec<Uuid> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Job for RecordingJob {
    async fn run(&self, task: &LoadedTask) -> JobResult {
        self.executed.lock().unwrap().push(task.task_id());
        tracing::debug!(task_id = %task.task_id(), "recording job ran");
        // Give other workers a chance to interleave.
        tokio::task::yield_now().await;
        Ok(self
            .output
            .clone()
            .unwrap_or_else(|| json!({ "ranBy": task.task.task_type })))
    }
}

/// Always fails with `JobError::Failed`.
#[derive(Clone)]
pub struct FailingJob {
    message: String,
}

impl FailingJob {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Job for FailingJob {
    async fn run(&self, _task: &LoadedTask) -> JobResult {
        Err(JobError::Failed(self.message.clone()))
    }
}

/// Sleeps before succeeding; pair with a runner timeout.
#[derive(Clone)]
pub struct SlowJob {
    delay: Duration,
}

impl SlowJob {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Job for SlowJob {
    async fn run(&self, _task: &LoadedTask) -> JobResult {
        tokio::time::sleep(self.delay).await;
        Ok(json!("slow"))
    }
}

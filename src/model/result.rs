// src/model/result.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A job's serialized output, keyed by the task that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub result_id: Uuid,
    pub task_id: Uuid,
    /// JSON text of the job output.
    pub data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn new(task_id: Uuid, data: Option<String>) -> Self {
        Self {
            result_id: Uuid::new_v4(),
            task_id,
            data,
            created_at: Utc::now(),
        }
    }
}

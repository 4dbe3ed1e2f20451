// src/model/workflow.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::WorkflowStatus;

/// A set of interdependent tasks submitted together for one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub workflow_id: Uuid,
    pub client_id: String,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// A fresh workflow in `Initial` state with a generated id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            workflow_id: Uuid::new_v4(),
            client_id: client_id.into(),
            status: WorkflowStatus::Initial,
            created_at: Utc::now(),
        }
    }
}

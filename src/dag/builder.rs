// src/dag/builder.rs

use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use crate::dag::graph::StepGraph;
use crate::definition::{WorkflowDefinition, load_and_validate, parse_definition};
use crate::errors::Result;
use crate::model::{Task, Workflow};
use crate::store::SharedStore;

/// Materializes workflow definitions into persisted workflows and tasks.
///
/// Creation happens in two passes:
/// 1. one `Queued` task per step, all inserted as a batch;
/// 2. `dependsOn` references are resolved to the generated task ids and
///    saved in a second write.
///
/// A failure between the two passes is returned as-is; rows already written
/// are left behind.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    store: SharedStore,
}

impl WorkflowBuilder {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create_workflow(
        &self,
        def: &WorkflowDefinition,
        client_id: &str,
        payload: &str,
    ) -> Result<Workflow> {
        let workflow = self.store.create_workflow(client_id).await?;
        info!(
            workflow_id = %workflow.workflow_id,
            client_id,
            definition = def.name(),
            steps = def.steps().len(),
            "creating workflow"
        );

        // First pass: nodes.
        let tasks: Vec<Task> = def
            .steps()
            .iter()
            .map(|step| Task::new_queued(&workflow, &step.task_type, step.step_number, payload))
            .collect();
        self.store.insert_tasks(&tasks).await?;

        // Second pass: edges.
        let graph = StepGraph::from_definition(def);
        let links: Vec<(Uuid, Option<Uuid>)> = graph
            .edges()
            .map(|(dep_idx, idx)| (tasks[idx].task_id, Some(tasks[dep_idx].task_id)))
            .collect();

        for &(task_id, depends_on) in &links {
            debug!(%task_id, ?depends_on, "wiring task dependency");
        }
        if !links.is_empty() {
            self.store.save_task_dependencies(&links).await?;
        }

        Ok(workflow)
    }

    /// Load a YAML definition from disk, then create the workflow.
    pub async fn create_workflow_from_path(
        &self,
        path: impl AsRef<Path>,
        client_id: &str,
        payload: &str,
    ) -> Result<Workflow> {
        let def = load_and_validate(path)?;
        self.create_workflow(&def, client_id, payload).await
    }

    pub async fn create_workflow_from_str(
        &self,
        yaml: &str,
        client_id: &str,
        payload: &str,
    ) -> Result<Workflow> {
        let def = parse_definition(yaml)?;
        self.create_workflow(&def, client_id, payload).await
    }
}

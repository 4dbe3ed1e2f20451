// src/store/memory.rs

//! Process-local [`Store`] backed by hash maps behind one mutex.
//!
//! Holding a single lock for every operation makes each call atomic, which
//! is what the claim and terminal writes rely on.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::dag::state::is_eligible;
use crate::model::{LoadedTask, ResultRecord, Task, Workflow};
use crate::store::{Store, StoreError, StoreResult};
use crate::types::{TaskStatus, WorkflowStatus};

#[derive(Debug, Default)]
struct MemoryState {
    workflows: HashMap<Uuid, Workflow>,
    tasks: HashMap<Uuid, Task>,
    /// Task ids in insertion order.
    task_order: Vec<Uuid>,
    /// Results keyed by the task that produced them.
    results: HashMap<Uuid, ResultRecord>,
}

impl MemoryState {
    fn task_mut(&mut self, task_id: Uuid) -> StoreResult<&mut Task> {
        self.tasks
            .get_mut(&task_id)
            .ok_or(StoreError::TaskNotFound(task_id))
    }

    /// Move a task from `expected` to `next`, or report what it actually is.
    fn transition(
        &mut self,
        task_id: Uuid,
        expected: TaskStatus,
        next: TaskStatus,
    ) -> StoreResult<&mut Task> {
        let task = self.task_mut(task_id)?;
        if task.status != expected {
            return Err(StoreError::StatusConflict {
                task_id,
                expected,
                actual: task.status,
            });
        }
        task.status = next;
        Ok(task)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Message("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_workflow(&self, client_id: &str) -> StoreResult<Workflow> {
        let workflow = Workflow::new(client_id);
        self.lock()?
            .workflows
            .insert(workflow.workflow_id, workflow.clone());
        Ok(workflow)
    }

    async fn get_workflow(&self, workflow_id: Uuid) -> StoreResult<Option<Workflow>> {
        Ok(self.lock()?.workflows.get(&workflow_id).cloned())
    }

    async fn advance_workflow_status(
        &self,
        workflow_id: Uuid,
        status: WorkflowStatus,
    ) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let workflow = state
            .workflows
            .get_mut(&workflow_id)
            .ok_or(StoreError::WorkflowNotFound(workflow_id))?;
        if !workflow.status.can_transition_to(status) {
            return Ok(false);
        }
        workflow.status = status;
        Ok(true)
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        let mut state = self.lock()?;
        for task in tasks {
            if !state.workflows.contains_key(&task.workflow_id) {
                return Err(StoreError::WorkflowNotFound(task.workflow_id));
            }
        }
        for task in tasks {
            if state.tasks.insert(task.task_id, task.clone()).is_none() {
                state.task_order.push(task.task_id);
            }
        }
        Ok(())
    }

    async fn save_task_dependencies(&self, links: &[(Uuid, Option<Uuid>)]) -> StoreResult<()> {
        let mut state = self.lock()?;

        // Validate everything first so a bad link writes nothing.
        for &(task_id, depends_on) in links {
            let task = state
                .tasks
                .get(&task_id)
                .ok_or(StoreError::TaskNotFound(task_id))?;
            if let Some(dep_id) = depends_on {
                let same_workflow = state
                    .tasks
                    .get(&dep_id)
                    .is_some_and(|dep| dep.workflow_id == task.workflow_id);
                if !same_workflow {
                    return Err(StoreError::InvalidDependency {
                        task_id,
                        depends_on: dep_id,
                    });
                }
            }
        }

        for &(task_id, depends_on) in links {
            state.task_mut(task_id)?.depends_on = depends_on;
        }
        Ok(())
    }

    async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.lock()?.tasks.get(&task_id).cloned())
    }

    async fn tasks_for_workflow(&self, workflow_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.lock()?;
        // task_order is insertion order, and sort_by_key is stable.
        let mut tasks: Vec<Task> = state
            .task_order
            .iter()
            .filter_map(|id| state.tasks.get(id))
            .filter(|t| t.workflow_id == workflow_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.step_number);
        Ok(tasks)
    }

    async fn find_eligible(&self, limit: usize, exclude: &[Uuid]) -> StoreResult<Vec<LoadedTask>> {
        let exclude: HashSet<&Uuid> = exclude.iter().collect();
        let state = self.lock()?;
        let mut found = Vec::new();

        for id in &state.task_order {
            if found.len() >= limit {
                break;
            }
            if exclude.contains(id) {
                continue;
            }
            let Some(task) = state.tasks.get(id) else {
                continue;
            };
            let dependency = task.depends_on.and_then(|dep| state.tasks.get(&dep));
            if !is_eligible(task, dependency) {
                continue;
            }
            let workflow = state
                .workflows
                .get(&task.workflow_id)
                .ok_or(StoreError::WorkflowNotFound(task.workflow_id))?;
            found.push(LoadedTask::new(task.clone(), workflow.clone()));
        }

        Ok(found)
    }

    async fn claim_task(&self, task_id: Uuid) -> StoreResult<Option<Task>> {
        let mut state = self.lock()?;
        match state.transition(task_id, TaskStatus::Queued, TaskStatus::Running) {
            Ok(task) => Ok(Some(task.clone())),
            Err(StoreError::StatusConflict { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn complete_task(
        &self,
        task_id: Uuid,
        progress: Option<String>,
        result: ResultRecord,
    ) -> StoreResult<Task> {
        let mut state = self.lock()?;
        let task = state.transition(task_id, TaskStatus::Running, TaskStatus::Completed)?;
        task.progress = progress;
        task.result_id = Some(result.result_id);
        let task = task.clone();
        state.results.insert(task_id, result);
        Ok(task)
    }

    async fn fail_task(&self, task_id: Uuid) -> StoreResult<Task> {
        let mut state = self.lock()?;
        let task = state.transition(task_id, TaskStatus::Running, TaskStatus::Failed)?;
        task.progress = None;
        Ok(task.clone())
    }

    async fn get_result_for_task(&self, task_id: Uuid) -> StoreResult<Option<ResultRecord>> {
        Ok(self.lock()?.results.get(&task_id).cloned())
    }
}

// src/engine/worker.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::wait::IdleWait;
use crate::errors::{GeoflowError, Result};
use crate::exec::TaskRunner;
use crate::store::SharedStore;
use crate::types::TaskStatus;

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Wait between polls that found nothing to do.
    pub poll_interval: Duration,
    /// Name used in log fields.
    pub worker_id: String,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            worker_id: "worker-1".to_string(),
        }
    }
}

/// What a single [`Worker::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The task ran and completed.
    Ran(Uuid),
    /// The task ran and failed, or its outcome could not be persisted.
    Failed(Uuid),
    /// No job is registered for the task's type; it stays `Queued` and this
    /// worker will not pick it again.
    Skipped(Uuid),
    /// Another worker claimed the task first.
    ClaimLost(Uuid),
    /// No eligible task.
    Idle,
}

/// Scheduling loop: find an eligible task, run it, repeat.
///
/// Tasks are run one at a time. Several workers, in this process or in
/// others sharing the database, may poll the same store; the store's atomic
/// claim makes sure each task runs once.
pub struct Worker {
    store: SharedStore,
    runner: TaskRunner,
    options: WorkerOptions,
    wait: Arc<dyn IdleWait>,
    /// Still-queued tasks this worker cannot run (unknown task type).
    skipped: HashSet<Uuid>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("options", &self.options)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

impl Worker {
    pub fn new(
        store: SharedStore,
        runner: TaskRunner,
        options: WorkerOptions,
        wait: Arc<dyn IdleWait>,
    ) -> Self {
        Self {
            store,
            runner,
            options,
            wait,
            skipped: HashSet::new(),
        }
    }

    /// Run until `cancel` fires.
    ///
    /// Cancellation is observed between tasks and while idling; a job that
    /// is already running is allowed to finish so its task does not stay
    /// `Running`.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let worker = self.options.worker_id.clone();
        info!(%worker, poll_interval = ?self.options.poll_interval, "worker started");

        while !cancel.is_cancelled() {
            let outcome = match self.tick().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(%worker, error = %e, "polling for eligible tasks failed");
                    TickOutcome::Idle
                }
            };

            if outcome != TickOutcome::Idle {
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.wait.wait(self.options.poll_interval) => {}
            }
        }

        info!(%worker, "worker stopped");
    }

    /// Tick until no eligible task remains. Returns how many tasks ran.
    pub async fn run_until_idle(&mut self) -> Result<usize> {
        let mut ran = 0;
        loop {
            match self.tick().await? {
                TickOutcome::Idle => return Ok(ran),
                TickOutcome::Ran(_) | TickOutcome::Failed(_) => ran += 1,
                TickOutcome::Skipped(_) | TickOutcome::ClaimLost(_) => {}
            }
        }
    }

    /// Pick the first eligible task and hand it to the runner.
    ///
    /// Only store errors while polling are returned; everything the runner
    /// reports is logged and folded into the [`TickOutcome`].
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let exclude: Vec<Uuid> = self.skipped.iter().copied().collect();
        let Some(task) = self
            .store
            .find_eligible(1, &exclude)
            .await?
            .into_iter()
            .next()
        else {
            self.prune_skipped().await?;
            debug!(worker = %self.options.worker_id, skipped = self.skipped.len(), "no eligible task");
            return Ok(TickOutcome::Idle);
        };
        let worker = &self.options.worker_id;

        let task_id = task.task_id();
        debug!(%worker, %task_id, task_type = %task.task.task_type, "found eligible task");

        let outcome = match self.runner.run(task).await {
            Ok(_) => TickOutcome::Ran(task_id),
            Err(GeoflowError::UnknownTaskType(task_type)) => {
                warn!(%worker, %task_id, %task_type, "no job registered; leaving task queued");
                self.skipped.insert(task_id);
                TickOutcome::Skipped(task_id)
            }
            Err(GeoflowError::ClaimLost(_) | GeoflowError::TaskNotQueued { .. }) => {
                debug!(%worker, %task_id, "task taken by another worker");
                TickOutcome::ClaimLost(task_id)
            }
            Err(e) => {
                error!(%worker, %task_id, error = %e, "task execution failed");
                TickOutcome::Failed(task_id)
            }
        };
        Ok(outcome)
    }

    /// Forget skipped tasks that left `Queued` (another worker ran them) or
    /// no longer exist.
    async fn prune_skipped(&mut self) -> Result<()> {
        let mut gone = Vec::new();
        for &task_id in &self.skipped {
            let still_queued = self
                .store
                .get_task(task_id)
                .await?
                .is_some_and(|t| t.status == TaskStatus::Queued);
            if !still_queued {
                gone.push(task_id);
            }
        }
        for task_id in gone {
            self.skipped.remove(&task_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TokioSleep;
    use crate::jobs::{JobDeps, JobRegistry, NotificationJob};
    use crate::model::Task;
    use crate::store::MemoryStore;

    fn worker(store: &SharedStore, registry: JobRegistry) -> Worker {
        let runner = TaskRunner::new(store.clone(), registry);
        Worker::new(store.clone(), runner, WorkerOptions::default(), Arc::new(TokioSleep))
    }

    #[tokio::test]
    async fn skipped_tasks_run_elsewhere_are_forgotten() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let wf = store.create_workflow("c").await.unwrap();
        let task = Task::new_queued(&wf, "notification", 1, "{}");
        store.insert_tasks(&[task.clone()]).await.unwrap();

        let mut bare = worker(&store, JobRegistry::new(JobDeps::new(store.clone())));
        assert_eq!(bare.tick().await.unwrap(), TickOutcome::Skipped(task.task_id));
        assert_eq!(bare.tick().await.unwrap(), TickOutcome::Idle);
        assert!(bare.skipped.contains(&task.task_id));

        let mut registry = JobRegistry::new(JobDeps::new(store.clone()));
        registry.register("notification", |_| Box::new(NotificationJob));
        let mut capable = worker(&store, registry);
        assert_eq!(capable.tick().await.unwrap(), TickOutcome::Ran(task.task_id));

        assert_eq!(bare.tick().await.unwrap(), TickOutcome::Idle);
        assert!(bare.skipped.is_empty());
    }

    #[tokio::test]
    async fn skipping_the_same_task_twice_keeps_one_entry() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let wf = store.create_workflow("c").await.unwrap();
        let task = Task::new_queued(&wf, "mystery", 1, "{}");
        store.insert_tasks(&[task.clone()]).await.unwrap();

        let mut bare = worker(&store, JobRegistry::new(JobDeps::new(store.clone())));
        bare.tick().await.unwrap();
        bare.skipped.insert(task.task_id);
        assert_eq!(bare.skipped.len(), 1);
        assert_eq!(bare.tick().await.unwrap(), TickOutcome::Idle);
        assert_eq!(bare.skipped.len(), 1, "still queued, so still skipped");
    }
}

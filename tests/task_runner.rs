// tests/task_runner.rs

use std::time::Duration;

use geoflow::dag::WorkflowBuilder;
use geoflow::errors::{GeoflowError, JobError};
use geoflow::exec::TaskRunner;
use geoflow::jobs::{JobDeps, JobRegistry};
use geoflow::model::{LoadedTask, Workflow};
use geoflow::store::SharedStore;
use geoflow::types::{TaskStatus, WorkflowStatus};
use geoflow_test_utils::{
    DefinitionBuilder, FailingJob, RecordingJob, SlowJob, init_tracing, memory_store,
};
use serde_json::json;

async fn single_task(store: &SharedStore, task_type: &str) -> (Workflow, LoadedTask) {
    let def = DefinitionBuilder::new("w").root(task_type, 1).build();
    let wf = WorkflowBuilder::new(store.clone())
        .create_workflow(&def, "client", "{}")
        .await
        .unwrap();
    let loaded = store.find_eligible(1, &[]).await.unwrap().remove(0);
    (wf, loaded)
}

fn registry_with(store: &SharedStore) -> JobRegistry {
    let mut registry = JobRegistry::new(JobDeps::new(store.clone()));
    registry.register("record", |_| Box::new(RecordingJob::with_output(json!({"n": 1}))));
    registry.register("text", |_| Box::new(RecordingJob::with_output(json!("done"))));
    registry.register("nothing", |_| Box::new(RecordingJob::with_output(serde_json::Value::Null)));
    registry.register("fail", |_| Box::new(FailingJob::new("boom")));
    registry.register("slow", |_| Box::new(SlowJob::new(Duration::from_secs(30))));
    registry
}

#[tokio::test]
async fn successful_job_stores_progress_and_result() {
    init_tracing();
    let store = memory_store();
    let (wf, loaded) = single_task(&store, "record").await;
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    let task = runner.run(loaded).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress.as_deref(), Some("{\"n\":1}"));

    let result = store.get_result_for_task(task.task_id).await.unwrap().unwrap();
    assert_eq!(task.result_id, Some(result.result_id));
    assert_eq!(result.data.as_deref(), Some("{\"n\":1}"));

    let wf = store.get_workflow(wf.workflow_id).await.unwrap().unwrap();
    assert_eq!(wf.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn string_output_is_stored_verbatim() {
    let store = memory_store();
    let (_, loaded) = single_task(&store, "text").await;
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    let task = runner.run(loaded).await.unwrap();
    assert_eq!(task.progress.as_deref(), Some("done"));
}

#[tokio::test]
async fn null_output_stores_no_progress() {
    let store = memory_store();
    let (_, loaded) = single_task(&store, "nothing").await;
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    let task = runner.run(loaded).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.progress.is_none());
    let result = store.get_result_for_task(task.task_id).await.unwrap().unwrap();
    assert!(result.data.is_none());
}

#[tokio::test]
async fn failing_job_marks_task_and_workflow_failed() {
    let store = memory_store();
    let (wf, loaded) = single_task(&store, "fail").await;
    let task_id = loaded.task_id();
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    match runner.run(loaded).await {
        Err(GeoflowError::JobExecution { task_id: id, source }) => {
            assert_eq!(id, task_id);
            assert!(matches!(source, JobError::Failed(ref m) if m == "boom"));
        }
        other => panic!("Expected JobExecution, got: {other:?}"),
    }

    let task = store.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.progress.is_none());
    assert!(store.get_result_for_task(task_id).await.unwrap().is_none());

    let wf = store.get_workflow(wf.workflow_id).await.unwrap().unwrap();
    assert_eq!(wf.status, WorkflowStatus::Failed);
}

#[tokio::test]
async fn unknown_task_type_leaves_task_queued() {
    let store = memory_store();
    let (wf, loaded) = single_task(&store, "mystery").await;
    let task_id = loaded.task_id();
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    let err = runner.run(loaded).await.unwrap_err();
    assert!(matches!(err, GeoflowError::UnknownTaskType(ref t) if t == "mystery"));

    let task = store.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Queued);
    let wf = store.get_workflow(wf.workflow_id).await.unwrap().unwrap();
    assert_eq!(wf.status, WorkflowStatus::Initial);
}

#[tokio::test]
async fn rerunning_a_finished_task_is_rejected() {
    let store = memory_store();
    let (_, loaded) = single_task(&store, "record").await;
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    let done = runner.run(loaded.clone()).await.unwrap();
    let stale = LoadedTask::new(done.clone(), loaded.workflow.clone());
    match runner.run(stale).await {
        Err(GeoflowError::TaskNotQueued { task_id, status }) => {
            assert_eq!(task_id, done.task_id);
            assert_eq!(status, TaskStatus::Completed);
        }
        other => panic!("Expected TaskNotQueued, got: {other:?}"),
    }
}

#[tokio::test]
async fn stale_queued_snapshot_loses_the_claim() {
    let store = memory_store();
    let (_, loaded) = single_task(&store, "record").await;
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    runner.run(loaded.clone()).await.unwrap();
    let err = runner.run(loaded).await.unwrap_err();
    assert!(matches!(err, GeoflowError::ClaimLost(_)), "got {err:?}");
}

#[tokio::test]
async fn job_timeout_fails_the_task() {
    let store = memory_store();
    let (_, loaded) = single_task(&store, "slow").await;
    let task_id = loaded.task_id();
    let runner = TaskRunner::new(store.clone(), registry_with(&store))
        .with_job_timeout(Some(Duration::from_millis(20)));

    let err = runner.run(loaded).await.unwrap_err();
    match err {
        GeoflowError::JobExecution { source: JobError::Timeout(limit), .. } => {
            assert_eq!(limit, Duration::from_millis(20));
        }
        other => panic!("Expected a timeout, got: {other:?}"),
    }
    let task = store.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
}

#[tokio::test]
async fn workflow_is_in_progress_while_tasks_remain() {
    let store = memory_store();
    let def = DefinitionBuilder::new("w")
        .root("record", 1)
        .after("record", 2, 1)
        .build();
    let wf = WorkflowBuilder::new(store.clone())
        .create_workflow(&def, "client", "{}")
        .await
        .unwrap();
    let runner = TaskRunner::new(store.clone(), registry_with(&store));

    let first = store.find_eligible(10, &[]).await.unwrap();
    assert_eq!(first.len(), 1, "only the root is eligible");
    runner.run(first.into_iter().next().unwrap()).await.unwrap();

    let status = store.get_workflow(wf.workflow_id).await.unwrap().unwrap().status;
    assert_eq!(status, WorkflowStatus::InProgress);

    let second = store.find_eligible(10, &[]).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].task.step_number, 2);
    runner.run(second.into_iter().next().unwrap()).await.unwrap();

    let status = store.get_workflow(wf.workflow_id).await.unwrap().unwrap().status;
    assert_eq!(status, WorkflowStatus::Completed);
}

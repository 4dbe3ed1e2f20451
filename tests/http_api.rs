// tests/http_api.rs

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use geoflow::definition::parse_definition;
use geoflow::exec::TaskRunner;
use geoflow::http::{AppState, build_router};
use geoflow::jobs::{JobDeps, JobRegistry};
use geoflow::store::SharedStore;
use geoflow_test_utils::fixtures::square_feature;
use geoflow_test_utils::memory_store;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt;
use uuid::Uuid;

const DEFINITION: &str = r#"
name: http_test
steps:
  - taskType: polygonArea
    stepNumber: 1
  - taskType: reportGeneration
    stepNumber: 2
    dependsOn: 1
"#;

fn app(store: &SharedStore) -> Router {
    let def = parse_definition(DEFINITION).expect("definition");
    build_router(AppState::new(store.clone(), def))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("route response");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("route body")
        .to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("route request")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("route request")
}

async fn create(store: &SharedStore) -> Uuid {
    let (status, body) = send(
        app(store),
        post_json(
            "/analysis",
            &json!({ "clientId": "client-http", "geoJson": square_feature() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(
        body["message"],
        "Workflow created and tasks queued from YAML definition."
    );
    body["workflowId"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let store = memory_store();
    let (status, body) = send(app(&store), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn post_creates_queued_workflow() {
    let store = memory_store();
    let workflow_id = create(&store).await;

    let (status, body) = send(app(&store), get(&format!("/analysis/{workflow_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflowId"], workflow_id.to_string());
    assert_eq!(body["status"], "initial");

    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["type"], "polygonArea");
    assert_eq!(tasks[0]["status"], "queued");
    assert_eq!(tasks[1]["type"], "reportGeneration");

    let stored = store.tasks_for_workflow(workflow_id).await.unwrap();
    let geo: Value = serde_json::from_str(&stored[0].geo_json).unwrap();
    assert_eq!(geo, square_feature());
    assert_eq!(stored[0].client_id, "client-http");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let store = memory_store();
    let (status, _) = send(app(&store), post_json("/analysis", &json!({ "geoJson": {} }))).await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn unknown_workflow_is_not_found() {
    let store = memory_store();
    let (status, body) = send(app(&store), get(&format!("/analysis/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Workflow not found");

    let (status, _) = send(app(&store), get("/analysis/not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_result_is_served_once_completed() {
    let store = memory_store();
    let workflow_id = create(&store).await;
    let task_id = store.tasks_for_workflow(workflow_id).await.unwrap()[0].task_id;
    let uri = format!("/analysis/{workflow_id}/tasks/{task_id}/result");

    let (status, body) = send(app(&store), get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Result not found");

    let registry = JobRegistry::with_defaults(JobDeps::new(store.clone()));
    let runner = TaskRunner::new(store.clone(), registry);
    let loaded = store.find_eligible(1, &[]).await.unwrap().remove(0);
    runner.run(loaded).await.unwrap();

    let (status, body) = send(app(&store), get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["taskId"], task_id.to_string());
    assert!(body["data"].as_f64().unwrap() > 900_000.0);

    let (status, body) = send(app(&store), get(&format!("/analysis/{workflow_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["tasks"][0]["status"], "completed");
}

#[tokio::test]
async fn result_of_another_workflows_task_is_not_found() {
    let store = memory_store();
    let first = create(&store).await;
    let second = create(&store).await;
    let task_id = store.tasks_for_workflow(first).await.unwrap()[0].task_id;

    let registry = JobRegistry::with_defaults(JobDeps::new(store.clone()));
    let runner = TaskRunner::new(store.clone(), registry);
    let loaded = store.get_task(task_id).await.unwrap().unwrap();
    let workflow = store.get_workflow(first).await.unwrap().unwrap();
    runner
        .run(geoflow::model::LoadedTask::new(loaded, workflow))
        .await
        .unwrap();

    let (status, _) = send(
        app(&store),
        get(&format!("/analysis/{second}/tasks/{task_id}/result")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

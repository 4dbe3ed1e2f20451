// src/http/handlers.rs

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::http::AppState;
use crate::model::Task;
use crate::types::{TaskStatus, WorkflowStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisRequest {
    pub client_id: String,
    pub geo_json: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisResponse {
    pub workflow_id: Uuid,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub task_id: Uuid,
    #[serde(rename = "type")]
    pub task_type: String,
    pub status: TaskStatus,
    pub progress: Option<String>,
    pub result_id: Option<Uuid>,
}

impl From<Task> for TaskSummary {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.task_id,
            task_type: task.task_type,
            status: task.status,
            progress: task.progress,
            result_id: task.result_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatusResponse {
    pub workflow_id: Uuid,
    pub status: WorkflowStatus,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResultResponse {
    pub task_id: Uuid,
    pub data: Value,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: &'static str,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: &'static str,
}

impl HttpError {
    fn not_found(message: &'static str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }

    fn internal(message: &'static str, err: impl std::fmt::Display) -> Self {
        error!(error = %err, "{message}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

pub async fn healthz() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn create_analysis(
    State(state): State<AppState>,
    Json(req): Json<CreateAnalysisRequest>,
) -> Result<(StatusCode, Json<CreateAnalysisResponse>), HttpError> {
    let payload = req.geo_json.to_string();
    let workflow = state
        .builder
        .create_workflow(&state.definition, &req.client_id, &payload)
        .await
        .map_err(|e| HttpError::internal("Failed to create workflow", e))?;

    info!(workflow_id = %workflow.workflow_id, client_id = %req.client_id, "workflow accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(CreateAnalysisResponse {
            workflow_id: workflow.workflow_id,
            message: "Workflow created and tasks queued from YAML definition.",
        }),
    ))
}

pub async fn workflow_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<WorkflowStatusResponse>, HttpError> {
    const NOT_FOUND: &str = "Workflow not found";
    let workflow_id = Uuid::parse_str(&workflow_id).map_err(|_| HttpError::not_found(NOT_FOUND))?;

    let workflow = state
        .store
        .get_workflow(workflow_id)
        .await
        .map_err(|e| HttpError::internal("Failed to fetch workflow", e))?
        .ok_or_else(|| HttpError::not_found(NOT_FOUND))?;
    let tasks = state
        .store
        .tasks_for_workflow(workflow_id)
        .await
        .map_err(|e| HttpError::internal("Failed to fetch workflow", e))?;

    Ok(Json(WorkflowStatusResponse {
        workflow_id: workflow.workflow_id,
        status: workflow.status,
        tasks: tasks.into_iter().map(TaskSummary::from).collect(),
    }))
}

pub async fn task_result(
    State(state): State<AppState>,
    Path((workflow_id, task_id)): Path<(String, String)>,
) -> Result<Json<TaskResultResponse>, HttpError> {
    const NOT_FOUND: &str = "Result not found";
    let (Ok(workflow_id), Ok(task_id)) = (Uuid::parse_str(&workflow_id), Uuid::parse_str(&task_id))
    else {
        return Err(HttpError::not_found(NOT_FOUND));
    };
    debug!(%workflow_id, %task_id, "fetching task result");

    let fetch_failed = |e| HttpError::internal("Failed to fetch result", e);

    let belongs = state
        .store
        .get_task(task_id)
        .await
        .map_err(fetch_failed)?
        .is_some_and(|t| t.workflow_id == workflow_id);
    if !belongs {
        return Err(HttpError::not_found(NOT_FOUND));
    }

    let result = state
        .store
        .get_result_for_task(task_id)
        .await
        .map_err(fetch_failed)?
        .ok_or_else(|| HttpError::not_found(NOT_FOUND))?;

    Ok(Json(TaskResultResponse {
        task_id: result.task_id,
        data: parse_data(result.data.as_deref()),
    }))
}

/// Stored data is JSON text, except plain-string outputs which are kept
/// verbatim.
fn parse_data(data: Option<&str>) -> Value {
    match data {
        None => Value::Null,
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
    }
}

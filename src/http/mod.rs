// src/http/mod.rs

//! HTTP boundary.
//!
//! Routes:
//! - `POST /analysis`: create a workflow for `{clientId, geoJson}`.
//! - `GET /analysis/{workflow_id}`: workflow status and task summaries.
//! - `GET /analysis/{workflow_id}/tasks/{task_id}/result`: a task's stored
//!   result.
//! - `GET /healthz`
//!
//! Internal failures become a `5xx` with a generic message; details only go
//! to the log.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dag::WorkflowBuilder;
use crate::definition::WorkflowDefinition;
use crate::errors::Result;
use crate::store::SharedStore;

pub mod handlers;

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub builder: WorkflowBuilder,
    /// Definition every new workflow is built from.
    pub definition: Arc<WorkflowDefinition>,
}

impl AppState {
    pub fn new(store: SharedStore, definition: WorkflowDefinition) -> Self {
        Self {
            builder: WorkflowBuilder::new(store.clone()),
            store,
            definition: Arc::new(definition),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/analysis", post(handlers::create_analysis))
        .route("/analysis/{workflow_id}", get(handlers::workflow_status))
        .route(
            "/analysis/{workflow_id}/tasks/{task_id}/result",
            get(handlers::task_result),
        )
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "http server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("http server stopped");
    Ok(())
}

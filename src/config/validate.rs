// src/config/validate.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{
    ConfigFile, HttpConfig, RawConfigFile, StoreConfig, WorkerConfig, WorkflowConfig,
};
use crate::errors::{GeoflowError, Result};
use crate::types::StoreBackend;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GeoflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        Ok(ConfigFile {
            worker: validate_worker(&raw)?,
            store: validate_store(&raw)?,
            http: validate_http(&raw)?,
            workflow: validate_workflow(&raw)?,
        })
    }
}

fn validate_worker(cfg: &RawConfigFile) -> Result<WorkerConfig> {
    let worker = &cfg.worker;
    if worker.poll_interval_ms == 0 {
        return Err(GeoflowError::ConfigError(
            "[worker].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if worker.worker_id.trim().is_empty() {
        return Err(GeoflowError::ConfigError(
            "[worker].worker_id must not be empty".to_string(),
        ));
    }

    Ok(WorkerConfig {
        poll_interval: Duration::from_millis(worker.poll_interval_ms),
        job_timeout: (worker.job_timeout_secs > 0)
            .then(|| Duration::from_secs(worker.job_timeout_secs)),
        worker_id: worker.worker_id.clone(),
    })
}

fn validate_store(cfg: &RawConfigFile) -> Result<StoreConfig> {
    let store = &cfg.store;
    if store.backend == StoreBackend::Sqlite && store.path.trim().is_empty() {
        return Err(GeoflowError::ConfigError(
            "[store].path is required for the sqlite backend".to_string(),
        ));
    }
    Ok(StoreConfig {
        backend: store.backend,
        path: PathBuf::from(&store.path),
    })
}

fn validate_http(cfg: &RawConfigFile) -> Result<HttpConfig> {
    let bind: SocketAddr = cfg.http.bind.parse().map_err(|e| {
        GeoflowError::ConfigError(format!(
            "[http].bind '{}' is not a socket address: {e}",
            cfg.http.bind
        ))
    })?;
    Ok(HttpConfig {
        enabled: cfg.http.enabled,
        bind,
    })
}

fn validate_workflow(cfg: &RawConfigFile) -> Result<WorkflowConfig> {
    if cfg.workflow.definition.trim().is_empty() {
        return Err(GeoflowError::ConfigError(
            "[workflow].definition must not be empty".to_string(),
        ));
    }
    Ok(WorkflowConfig {
        definition: PathBuf::from(&cfg.workflow.definition),
    })
}

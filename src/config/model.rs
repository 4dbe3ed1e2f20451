// src/config/model.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::StoreBackend;

/// Service configuration as read from a TOML file.
///
/// ```toml
/// [worker]
/// poll_interval_ms = 5000
/// job_timeout_secs = 300
/// worker_id = "worker-1"
///
/// [store]
/// backend = "sqlite"
/// path = "geoflow.db"
///
/// [http]
/// enabled = true
/// bind = "127.0.0.1:3000"
///
/// [workflow]
/// definition = "workflows/example_workflow.yml"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub worker: RawWorkerSection,

    #[serde(default)]
    pub store: RawStoreSection,

    #[serde(default)]
    pub http: RawHttpSection,

    #[serde(default)]
    pub workflow: RawWorkflowSection,
}

/// `[worker]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkerSection {
    /// Idle wait between polls that found no eligible task.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-job timeout in seconds; `0` disables it.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    #[serde(default = "default_worker_id")]
    pub worker_id: String,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_job_timeout_secs() -> u64 {
    300
}

fn default_worker_id() -> String {
    "worker-1".to_string()
}

impl Default for RawWorkerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            job_timeout_secs: default_job_timeout_secs(),
            worker_id: default_worker_id(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStoreSection {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database file, relative to the config file.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "geoflow.db".to_string()
}

impl Default for RawStoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// `[http]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHttpSection {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,

    #[serde(default = "default_http_bind")]
    pub bind: String,
}

fn default_http_enabled() -> bool {
    true
}

fn default_http_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for RawHttpSection {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind: default_http_bind(),
        }
    }
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowSection {
    /// YAML definition used for new workflows, relative to the config file.
    #[serde(default = "default_definition")]
    pub definition: String,
}

fn default_definition() -> String {
    "workflows/example_workflow.yml".to_string()
}

impl Default for RawWorkflowSection {
    fn default() -> Self {
        Self {
            definition: default_definition(),
        }
    }
}

/// Validated configuration.
///
/// Built through [`TryFrom<RawConfigFile>`]; paths are still as written in
/// the file until [`ConfigFile::resolve_paths`] is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub worker: WorkerConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub job_timeout: Option<Duration>,
    pub worker_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub definition: PathBuf,
}

impl ConfigFile {
    /// Make relative file paths relative to `base` (the config file's
    /// directory).
    pub fn resolve_paths(mut self, base: &std::path::Path) -> Self {
        if self.store.path.is_relative() {
            self.store.path = base.join(&self.store.path);
        }
        if self.workflow.definition.is_relative() {
            self.workflow.definition = base.join(&self.workflow.definition);
        }
        self
    }
}

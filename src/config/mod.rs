// src/config/mod.rs

//! Service configuration (`Geoflow.toml`).
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into typed settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config, default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, HttpConfig, RawConfigFile, StoreConfig, WorkerConfig, WorkflowConfig,
};

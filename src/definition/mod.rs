// src/definition/mod.rs

//! Declarative workflow definitions.
//!
//! Responsibilities:
//! - [`model`]: serde types for the YAML document (`name` + ordered `steps`).
//! - [`loader`]: read a definition from disk or from a string.
//! - [`validate`]: turn a [`RawWorkflowDefinition`] into a checked
//!   [`WorkflowDefinition`] (step numbers, `dependsOn` parsing, cycles).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_definition};
pub use model::{RawWorkflowDefinition, RawWorkflowStep, StepRef, WorkflowDefinition, WorkflowStep};

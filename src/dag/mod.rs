// src/dag/mod.rs

//! Task graph construction and scheduling rules.
//!
//! - [`graph`] resolves a definition's `dependsOn` references into edges
//!   between steps.
//! - [`builder`] materializes a definition into a persisted workflow and its
//!   tasks (two passes: create nodes, then wire edges).
//! - [`state`] holds the pure rules: which task is eligible to run, and what
//!   a workflow's status should be given its tasks.

pub mod builder;
pub mod graph;
pub mod state;

pub use builder::WorkflowBuilder;
pub use graph::StepGraph;
pub use state::{is_eligible, reconcile_workflow_status};

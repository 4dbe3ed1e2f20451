// src/exec/mod.rs

//! Task execution.
//!
//! [`TaskRunner`] takes one eligible task, claims it, dispatches it to the
//! job registered for its type and persists the outcome. Picking *which*
//! task to run is the scheduling loop's business (see `engine`).

pub mod task_runner;

pub use task_runner::TaskRunner;

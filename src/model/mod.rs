// src/model/mod.rs

//! Persisted records: workflows, their tasks, and stored job results.

pub mod result;
pub mod task;
pub mod workflow;

pub use result::ResultRecord;
pub use task::{LoadedTask, Task};
pub use workflow::Workflow;

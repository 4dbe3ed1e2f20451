// src/engine/mod.rs

//! The scheduling loop.
//!
//! - [`worker`] polls the store for eligible tasks and runs them one at a
//!   time through the task runner, until cancelled.
//! - [`wait`] abstracts the idle wait between empty polls so tests can drive
//!   the loop without real timers.

pub mod wait;
pub mod worker;

pub use wait::{IdleWait, TokioSleep};
pub use worker::{TickOutcome, Worker, WorkerOptions};

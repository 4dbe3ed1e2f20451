// src/engine/wait.rs

use std::time::Duration;

use async_trait::async_trait;

/// How the scheduling loop idles between empty polls.
///
/// Production uses [`TokioSleep`]; tests swap in waits that return at once
/// so loops can be driven without wall-clock delays.
#[async_trait]
pub trait IdleWait: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl IdleWait for TokioSleep {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

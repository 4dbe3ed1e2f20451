use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geoflow::engine::IdleWait;
use tokio_util::sync::CancellationToken;

/// Idle wait that only yields to the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWait;

#[async_trait]
impl IdleWait for NoWait {
    async fn wait(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

/// Cancels `token` on the n-th idle wait, so a worker loop stops after a
/// bounded number of empty polls.
#[derive(Debug)]
pub struct CancelAfterWaits {
    remaining: AtomicUsize,
    token: CancellationToken,
    waits: AtomicUsize,
}

impl CancelAfterWaits {
    pub fn new(waits: usize, token: CancellationToken) -> Self {
        Self {
            remaining: AtomicUsize::new(waits),
            token,
            waits: AtomicUsize::new(0),
        }
    }

    /// How many times the loop idled.
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdleWait for CancelAfterWaits {
    async fn wait(&self, _duration: Duration) {
        self.waits.fetch_add(1, Ordering::SeqCst);
        let left = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        if left <= 1 {
            self.token.cancel();
        }
        tokio::task::yield_now().await;
    }
}

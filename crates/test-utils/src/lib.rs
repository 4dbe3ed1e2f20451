pub mod builders;
pub mod fake_jobs;
pub mod fixtures;
pub mod wait;

use std::sync::{Arc, Once};

use geoflow::store::{MemoryStore, SharedStore, SqliteStore};
use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{DefinitionBuilder, StepBuilder};
pub use fake_jobs::{FailingJob, RecordingJob, SlowJob};
pub use wait::{CancelAfterWaits, NoWait};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

pub fn memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

/// SQLite store in `dir`; keep the `TempDir` alive for the test's duration.
pub fn sqlite_store(dir: &std::path::Path) -> SharedStore {
    Arc::new(SqliteStore::open(dir.join("geoflow.db")).expect("open sqlite store"))
}

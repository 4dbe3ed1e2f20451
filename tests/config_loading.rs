// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use geoflow::config::{default_config, load_and_validate};
use geoflow::errors::GeoflowError;
use geoflow::types::StoreBackend;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("Geoflow.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{contents}").unwrap();
    path
}

#[test]
fn relative_paths_resolve_against_config_directory() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[worker]
poll_interval_ms = 250
job_timeout_secs = 30

[store]
backend = "sqlite"
path = "data/geoflow.db"

[workflow]
definition = "workflows/example_workflow.yml"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.worker.poll_interval, Duration::from_millis(250));
    assert_eq!(cfg.worker.job_timeout, Some(Duration::from_secs(30)));
    assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    assert_eq!(cfg.store.path, dir.path().join("data/geoflow.db"));
    assert_eq!(
        cfg.workflow.definition,
        dir.path().join("workflows/example_workflow.yml")
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[worker]\npoll_interval_ms = 10\n\n[scheduler]\nthreads = 4\n");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, GeoflowError::TomlError(_)), "got {err:?}");
}

#[test]
fn defaults_are_valid() {
    let cfg = default_config().unwrap();
    assert_eq!(cfg.worker.poll_interval, Duration::from_secs(5));
    assert_eq!(cfg.worker.job_timeout, Some(Duration::from_secs(300)));
    assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
}

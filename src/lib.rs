// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod model;
pub mod store;
pub mod types;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::dag::{StepGraph, WorkflowBuilder};
use crate::definition::WorkflowDefinition;
use crate::engine::{TokioSleep, Worker, WorkerOptions};
use crate::exec::TaskRunner;
use crate::http::AppState;
use crate::jobs::{JobDeps, JobRegistry};
use crate::store::SharedStore;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config and workflow definition loading
/// - the store backend
/// - job registry, task runner and worker loop
/// - (optional) HTTP server
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;
    let definition = definition::load_and_validate(&cfg.workflow.definition).with_context(|| {
        format!(
            "loading workflow definition {}",
            cfg.workflow.definition.display()
        )
    })?;
    if args.dry_run {
        // Only consulted for registered task types; nothing is written.
        let registry = JobRegistry::with_defaults(JobDeps::new(Arc::new(
            store::MemoryStore::new(),
        )));
        print_dry_run(&cfg, &definition, &registry);
        return Ok(());
    }

    let store = store::open(&cfg.store)
        .with_context(|| format!("opening {:?} store", cfg.store.backend))?;

    if let (Some(payload_file), Some(client_id)) = (&args.submit, &args.client_id) {
        return submit(&store, &definition, payload_file, client_id).await;
    }

    let registry = JobRegistry::with_defaults(JobDeps::new(store.clone()));
    let runner = TaskRunner::new(store.clone(), registry).with_job_timeout(cfg.worker.job_timeout);
    let options = WorkerOptions {
        poll_interval: cfg.worker.poll_interval,
        worker_id: cfg.worker.worker_id.clone(),
    };
    let mut worker = Worker::new(store.clone(), runner, options, Arc::new(TokioSleep));

    if args.once {
        let ran = worker.run_until_idle().await?;
        info!(tasks = ran, "no eligible tasks left; exiting");
        return Ok(());
    }

    let cancel = CancellationToken::new();

    // Ctrl-C -> graceful shutdown.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        });
    }

    let http_handle = if cfg.http.enabled {
        let listener = TcpListener::bind(cfg.http.bind)
            .await
            .with_context(|| format!("binding http listener on {}", cfg.http.bind))?;
        let state = AppState::new(store.clone(), definition);
        Some(tokio::spawn(http::serve(listener, state, cancel.clone())))
    } else {
        None
    };

    worker.run(cancel.clone()).await;

    if let Some(handle) = http_handle {
        cancel.cancel();
        handle.await.context("http server task panicked")??;
    }
    Ok(())
}

/// `--config` if given; otherwise `Geoflow.toml` if present, else defaults.
fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    if let Some(path) = &args.config {
        return config::load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        return config::load_and_validate(&default_path)
            .with_context(|| format!("loading config {}", default_path.display()));
    }

    debug!(path = %default_path.display(), "no config file; using defaults");
    Ok(config::default_config()?)
}

async fn submit(
    store: &SharedStore,
    definition: &WorkflowDefinition,
    payload_file: &Path,
    client_id: &str,
) -> Result<()> {
    let contents = fs::read_to_string(payload_file)
        .with_context(|| format!("reading payload {}", payload_file.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("payload {} is not valid JSON", payload_file.display()))?;

    let builder = WorkflowBuilder::new(store.clone());
    let workflow = builder
        .create_workflow(definition, client_id, &payload.to_string())
        .await?;

    println!("{}", workflow.workflow_id);
    Ok(())
}

/// Print the settings and the task graph the definition would produce.
fn print_dry_run(cfg: &ConfigFile, def: &WorkflowDefinition, registry: &JobRegistry) {
    println!("geoflow dry-run");
    println!(
        "  worker.poll_interval = {:?}, worker.job_timeout = {:?}",
        cfg.worker.poll_interval, cfg.worker.job_timeout
    );
    println!(
        "  store = {:?} ({})",
        cfg.store.backend,
        cfg.store.path.display()
    );
    if cfg.http.enabled {
        println!("  http = {}", cfg.http.bind);
    } else {
        println!("  http = disabled");
    }
    println!();
    print!("{}", render_plan(def, registry));

    debug!("dry-run complete (no execution)");
}

/// The task graph as text: every step with its predecessor and the steps
/// waiting on it, then the steps that start immediately.
fn render_plan(def: &WorkflowDefinition, registry: &JobRegistry) -> String {
    let steps = def.steps();
    let graph = StepGraph::from_definition(def);
    let label = |idx: usize| format!("step {} ({})", steps[idx].step_number, steps[idx].task_type);

    let mut out = format!("workflow '{}' ({} steps):\n", def.name(), steps.len());
    for (idx, step) in steps.iter().enumerate() {
        out.push_str(&format!("  - {}\n", label(idx)));
        if let Some(dep_idx) = graph.dependency_of(idx) {
            out.push_str(&format!("      after: {}\n", label(dep_idx)));
        } else if let Some(missing) = step.depends_on {
            out.push_str(&format!("      after: step {missing} (not in definition, ignored)\n"));
        }
        let dependents = graph.dependents_of(idx);
        if !dependents.is_empty() {
            let names: Vec<String> = dependents.iter().map(|&d| label(d)).collect();
            out.push_str(&format!("      unblocks: {}\n", names.join(", ")));
        }
        if !registry.contains(&step.task_type) {
            warn!(task_type = %step.task_type, "no job registered for task type");
            out.push_str(&format!("      warning: no job registered for '{}'\n", step.task_type));
        }
    }

    let roots: Vec<String> = graph.roots().map(label).collect();
    out.push_str(&format!("starts with: {}\n", roots.join(", ")));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::parse_definition;

    #[test]
    fn plan_lists_roots_and_dependents() {
        let def = parse_definition(
            r#"
name: example_workflow
steps:
  - taskType: analysis
    stepNumber: 1
  - taskType: polygonArea
    stepNumber: 2
  - taskType: notification
    stepNumber: 3
    dependsOn: 2
  - taskType: mystery
    stepNumber: 4
    dependsOn: 9
"#,
        )
        .unwrap();
        let registry = JobRegistry::with_defaults(JobDeps::new(Arc::new(store::MemoryStore::new())));

        let plan = render_plan(&def, &registry);
        assert!(plan.starts_with("workflow 'example_workflow' (4 steps):\n"));
        assert!(plan.contains("  - step 2 (polygonArea)\n      unblocks: step 3 (notification)\n"));
        assert!(plan.contains("      after: step 2 (polygonArea)\n"));
        assert!(plan.contains("after: step 9 (not in definition, ignored)"));
        assert!(plan.contains("warning: no job registered for 'mystery'"));
        assert!(plan.ends_with(
            "starts with: step 1 (analysis), step 2 (polygonArea), step 4 (mystery)\n"
        ));
    }
}

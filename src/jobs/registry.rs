// src/jobs/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{GeoflowError, Result};
use crate::jobs::{AnalysisJob, Job, JobDeps, NotificationJob, PolygonAreaJob, ReportGenerationJob};

/// Builds a job, optionally using the shared collaborators.
pub type JobFactory = Arc<dyn Fn(&JobDeps) -> Box<dyn Job> + Send + Sync>;

/// Task type -> job factory.
///
/// Jobs are constructed on every [`JobRegistry::resolve`] call, so they can
/// be stateless and cheap.
#[derive(Clone)]
pub struct JobRegistry {
    deps: JobDeps,
    factories: HashMap<String, JobFactory>,
}

impl JobRegistry {
    /// An empty registry.
    pub fn new(deps: JobDeps) -> Self {
        Self {
            deps,
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in task types:
    /// `analysis`, `notification`, `polygonArea`, `reportGeneration`.
    pub fn with_defaults(deps: JobDeps) -> Self {
        let mut registry = Self::new(deps);
        registry.register("analysis", |_| Box::new(AnalysisJob));
        registry.register("notification", |_| Box::new(NotificationJob));
        registry.register("polygonArea", |_| Box::new(PolygonAreaJob));
        registry.register("reportGeneration", |deps| {
            Box::new(ReportGenerationJob::new(deps.store.clone()))
        });
        registry
    }

    /// Add a factory, replacing any existing one for `task_type`.
    pub fn register<F>(&mut self, task_type: impl Into<String>, factory: F)
    where
        F: Fn(&JobDeps) -> Box<dyn Job> + Send + Sync + 'static,
    {
        self.factories.insert(task_type.into(), Arc::new(factory));
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.factories.contains_key(task_type)
    }

    pub fn resolve(&self, task_type: &str) -> Result<Box<dyn Job>> {
        let factory = self
            .factories
            .get(task_type)
            .ok_or_else(|| GeoflowError::UnknownTaskType(task_type.to_string()))?;
        Ok(factory(&self.deps))
    }

    /// Registered task types, sorted.
    pub fn task_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("task_types", &self.task_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> JobRegistry {
        JobRegistry::with_defaults(JobDeps::new(Arc::new(MemoryStore::new())))
    }

    #[test]
    fn defaults_cover_builtin_task_types() {
        assert_eq!(
            registry().task_types(),
            vec!["analysis", "notification", "polygonArea", "reportGeneration"]
        );
    }

    #[test]
    fn unknown_task_type_is_reported_by_name() {
        match registry().resolve("POLYGON_AREA") {
            Err(GeoflowError::UnknownTaskType(t)) => assert_eq!(t, "POLYGON_AREA"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("task types are case-sensitive"),
        }
    }

    #[test]
    fn register_replaces_existing_factory() {
        let mut registry = registry();
        registry.register("notification", |_| Box::new(AnalysisJob));
        assert!(registry.contains("notification"));
        assert_eq!(registry.task_types().len(), 4);
    }
}

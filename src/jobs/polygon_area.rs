// src/jobs/polygon_area.rs

use async_trait::async_trait;
use serde_json::{Number, Value};
use tracing::{debug, info};

use crate::errors::JobError;
use crate::jobs::geometry::Polygon;
use crate::jobs::{Job, JobResult};
use crate::model::LoadedTask;

/// Area of the task's polygon in square meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonAreaJob;

#[async_trait]
impl Job for PolygonAreaJob {
    async fn run(&self, task: &LoadedTask) -> JobResult {
        debug!(task_id = %task.task_id(), "calculating polygon area");

        let polygon = Polygon::parse(&task.task.geo_json)?;
        let area = polygon.area();
        let number = Number::from_f64(area)
            .ok_or_else(|| JobError::Failed(format!("area is not a finite number: {area}")))?;

        info!(task_id = %task.task_id(), area_m2 = area, "calculated polygon area");
        Ok(Value::Number(number))
    }
}

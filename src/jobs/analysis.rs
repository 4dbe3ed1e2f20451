// src/jobs/analysis.rs

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::jobs::geometry::Polygon;
use crate::jobs::{Job, JobResult};
use crate::model::LoadedTask;

/// Descriptive summary of the task's polygon: vertex count, bounding box
/// (`[min_lon, min_lat, max_lon, max_lat]`) and vertex centroid.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisJob;

#[async_trait]
impl Job for AnalysisJob {
    async fn run(&self, task: &LoadedTask) -> JobResult {
        let polygon = Polygon::parse(&task.task.geo_json)?;
        let vertices = polygon.vertices();

        let mut bbox = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        let (mut sum_lon, mut sum_lat) = (0.0, 0.0);
        for &[lon, lat] in vertices {
            bbox[0] = bbox[0].min(lon);
            bbox[1] = bbox[1].min(lat);
            bbox[2] = bbox[2].max(lon);
            bbox[3] = bbox[3].max(lat);
            sum_lon += lon;
            sum_lat += lat;
        }
        let count = vertices.len() as f64;

        info!(
            task_id = %task.task_id(),
            vertices = vertices.len(),
            "analysed polygon"
        );

        Ok(json!({
            "vertexCount": vertices.len(),
            "holes": polygon.holes().len(),
            "bbox": bbox,
            "centroid": [sum_lon / count, sum_lat / count],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, Workflow};

    #[tokio::test]
    async fn summarises_square() {
        let wf = Workflow::new("c");
        let task = Task::new_queued(
            &wf,
            "analysis",
            1,
            r#"{"type":"Polygon","coordinates":[[[0,0],[0,2],[2,2],[2,0],[0,0]]]}"#,
        );
        let out = AnalysisJob.run(&LoadedTask::new(task, wf)).await.unwrap();

        assert_eq!(out["vertexCount"], 4);
        assert_eq!(out["bbox"], json!([0.0, 0.0, 2.0, 2.0]));
        assert_eq!(out["centroid"], json!([1.0, 1.0]));
    }
}

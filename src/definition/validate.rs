// src/definition/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::dag::StepGraph;
use crate::definition::model::{RawWorkflowDefinition, WorkflowDefinition, WorkflowStep};
use crate::errors::{GeoflowError, Result};

impl TryFrom<RawWorkflowDefinition> for WorkflowDefinition {
    type Error = GeoflowError;

    fn try_from(raw: RawWorkflowDefinition) -> std::result::Result<Self, Self::Error> {
        ensure_has_steps(&raw)?;
        let steps = validate_steps(&raw)?;
        validate_dependency_graph(&steps)?;
        Ok(WorkflowDefinition::new_unchecked(raw.name, steps))
    }
}

fn ensure_has_steps(raw: &RawWorkflowDefinition) -> Result<()> {
    if raw.steps.is_empty() {
        return Err(GeoflowError::DefinitionParse(
            "workflow definition must contain at least one step".to_string(),
        ));
    }
    Ok(())
}

fn validate_steps(raw: &RawWorkflowDefinition) -> Result<Vec<WorkflowStep>> {
    let mut steps = Vec::with_capacity(raw.steps.len());

    for (idx, step) in raw.steps.iter().enumerate() {
        if step.task_type.trim().is_empty() {
            return Err(GeoflowError::DefinitionParse(format!(
                "step #{idx} has an empty taskType"
            )));
        }
        if step.step_number == 0 {
            return Err(GeoflowError::DefinitionParse(format!(
                "step '{}' has stepNumber 0; step numbers start at 1",
                step.task_type
            )));
        }

        let depends_on = match &step.depends_on {
            None => None,
            Some(reference) => Some(reference.step_number().ok_or_else(|| {
                GeoflowError::DefinitionParse(format!(
                    "step {} ('{}') has a non-numeric dependsOn: {:?}",
                    step.step_number, step.task_type, reference
                ))
            })?),
        };

        steps.push(WorkflowStep {
            task_type: step.task_type.clone(),
            step_number: step.step_number,
            depends_on,
        });
    }

    Ok(steps)
}

/// Reject dependency cycles.
///
/// Edges are resolved exactly the way the builder resolves them (see
/// [`StepGraph`]), so a duplicated step number cannot fake a cycle.
fn validate_dependency_graph(steps: &[WorkflowStep]) -> Result<()> {
    let steps_graph = StepGraph::from_steps(steps);

    for &idx in steps_graph.dangling() {
        let step = &steps[idx];
        warn!(
            step = step.step_number,
            task_type = %step.task_type,
            depends_on = ?step.depends_on,
            "dependsOn names a step that is not in the definition; ignoring"
        );
    }

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for idx in 0..steps.len() {
        graph.add_node(idx);
    }
    for (dep_idx, idx) in steps_graph.edges() {
        graph.add_edge(dep_idx, idx, ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let step = &steps[cycle.node_id()];
            Err(GeoflowError::DagCycle(format!(
                "cycle detected in step dependencies involving step {} ('{}')",
                step.step_number, step.task_type
            )))
        }
    }
}

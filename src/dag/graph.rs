// src/dag/graph.rs

use std::collections::HashMap;

use crate::definition::{WorkflowDefinition, WorkflowStep};

/// Internal node: the resolved predecessor and the direct dependents.
#[derive(Debug, Clone, Default)]
struct StepNode {
    dependency: Option<usize>,
    dependents: Vec<usize>,
}

/// Dependency edges between the steps of one definition, keyed by the
/// step's position in the definition.
///
/// A `dependsOn` binds to the *last* step carrying that step number. A
/// reference to a step number that does not exist resolves to nothing and
/// is recorded in [`StepGraph::dangling`].
#[derive(Debug, Clone)]
pub struct StepGraph {
    nodes: Vec<StepNode>,
    dangling: Vec<usize>,
}

impl StepGraph {
    pub fn from_definition(def: &WorkflowDefinition) -> Self {
        Self::from_steps(def.steps())
    }

    pub fn from_steps(steps: &[WorkflowStep]) -> Self {
        let last_index_by_number: HashMap<u32, usize> = steps
            .iter()
            .enumerate()
            .map(|(idx, step)| (step.step_number, idx))
            .collect();

        let mut nodes = vec![StepNode::default(); steps.len()];
        let mut dangling = Vec::new();

        // First pass: resolve each step's predecessor.
        for (idx, step) in steps.iter().enumerate() {
            if let Some(number) = step.depends_on {
                match last_index_by_number.get(&number) {
                    Some(&dep_idx) => nodes[idx].dependency = Some(dep_idx),
                    None => dangling.push(idx),
                }
            }
        }

        // Second pass: populate dependents from the resolved predecessors.
        for idx in 0..nodes.len() {
            if let Some(dep_idx) = nodes[idx].dependency {
                nodes[dep_idx].dependents.push(idx);
            }
        }

        Self { nodes, dangling }
    }

    /// Index of the step that `idx` waits for, if any.
    pub fn dependency_of(&self, idx: usize) -> Option<usize> {
        self.nodes.get(idx).and_then(|n| n.dependency)
    }

    /// Steps that wait for `idx`.
    pub fn dependents_of(&self, idx: usize) -> &[usize] {
        self.nodes
            .get(idx)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Steps with no resolved dependency.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&idx| self.nodes[idx].dependency.is_none())
    }

    /// `(dependency, dependent)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, n)| n.dependency.map(|dep| (dep, idx)))
    }

    /// Steps whose `dependsOn` named a step number absent from the definition.
    pub fn dangling(&self) -> &[usize] {
        &self.dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(task_type: &str, step_number: u32, depends_on: Option<u32>) -> WorkflowStep {
        WorkflowStep {
            task_type: task_type.to_string(),
            step_number,
            depends_on,
        }
    }

    #[test]
    fn chain_resolves_edges_and_dependents() {
        let steps = vec![
            step("polygonArea", 1, None),
            step("notification", 2, Some(1)),
            step("reportGeneration", 3, Some(2)),
        ];
        let graph = StepGraph::from_steps(&steps);

        assert_eq!(graph.dependency_of(0), None);
        assert_eq!(graph.dependency_of(1), Some(0));
        assert_eq!(graph.dependency_of(2), Some(1));
        assert_eq!(graph.dependents_of(0), &[1]);
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![0]);
        assert_eq!(graph.edges().collect::<Vec<_>>(), vec![(0, 1), (1, 2)]);
        assert!(graph.dangling().is_empty());
    }

    #[test]
    fn duplicate_step_numbers_bind_to_the_last_one() {
        let steps = vec![
            step("analysis", 1, None),
            step("polygonArea", 1, None),
            step("reportGeneration", 2, Some(1)),
        ];
        let graph = StepGraph::from_steps(&steps);
        assert_eq!(graph.dependency_of(2), Some(1));
    }

    #[test]
    fn missing_dependency_is_dangling_and_a_root() {
        let steps = vec![step("polygonArea", 1, Some(9))];
        let graph = StepGraph::from_steps(&steps);
        assert_eq!(graph.dependency_of(0), None);
        assert_eq!(graph.dangling(), &[0]);
        assert_eq!(graph.roots().count(), 1);
    }
}

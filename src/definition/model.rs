// src/definition/model.rs

use serde::Deserialize;

/// Workflow definition as read from YAML, before validation.
///
/// ```yaml
/// name: example_workflow
/// steps:
///   - taskType: polygonArea
///     stepNumber: 1
///   - taskType: reportGeneration
///     stepNumber: 2
///     dependsOn: 1
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub steps: Vec<RawWorkflowStep>,
}

/// One entry of `steps`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkflowStep {
    pub task_type: String,

    pub step_number: u32,

    /// Step number of the predecessor. Older definitions quote it
    /// (`dependsOn: "1"`), so both spellings are accepted.
    #[serde(default)]
    pub depends_on: Option<StepRef>,
}

/// A reference to another step by its step number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepRef {
    Number(u32),
    Text(String),
}

impl StepRef {
    /// The referenced step number, if this reference is numeric.
    pub fn step_number(&self) -> Option<u32> {
        match self {
            StepRef::Number(n) => Some(*n),
            StepRef::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A validated step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStep {
    pub task_type: String,
    pub step_number: u32,
    pub depends_on: Option<u32>,
}

/// A validated workflow definition.
///
/// Only constructed through [`TryFrom<RawWorkflowDefinition>`], so holders
/// can rely on: at least one step, positive step numbers, numeric
/// `dependsOn` values, and an acyclic dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefinition {
    name: String,
    steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    pub(crate) fn new_unchecked(name: String, steps: Vec<WorkflowStep>) -> Self {
        Self { name, steps }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in definition order.
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }
}

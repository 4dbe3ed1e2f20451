use geoflow::definition::{RawWorkflowDefinition, RawWorkflowStep, StepRef, WorkflowDefinition};
use geoflow::errors::Result;

/// Builder for `WorkflowDefinition` to simplify test setup.
pub struct DefinitionBuilder {
    raw: RawWorkflowDefinition,
}

impl DefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            raw: RawWorkflowDefinition {
                name: name.to_string(),
                steps: Vec::new(),
            },
        }
    }

    pub fn step(mut self, step: StepBuilder) -> Self {
        self.raw.steps.push(step.build());
        self
    }

    /// Shorthand for a step without dependency.
    pub fn root(self, task_type: &str, step_number: u32) -> Self {
        self.step(StepBuilder::new(task_type, step_number))
    }

    /// Shorthand for a step depending on `depends_on`.
    pub fn after(self, task_type: &str, step_number: u32, depends_on: u32) -> Self {
        self.step(StepBuilder::new(task_type, step_number).depends_on(depends_on))
    }

    pub fn try_build(self) -> Result<WorkflowDefinition> {
        WorkflowDefinition::try_from(self.raw)
    }

    pub fn build(self) -> WorkflowDefinition {
        self.try_build()
            .expect("Failed to build valid definition from builder")
    }

    /// YAML text equivalent to the builder's contents.
    pub fn to_yaml(&self) -> String {
        let mut out = format!("name: {}\nsteps:\n", self.raw.name);
        for step in &self.raw.steps {
            out.push_str(&format!(
                "  - taskType: {}\n    stepNumber: {}\n",
                step.task_type, step.step_number
            ));
            match &step.depends_on {
                Some(StepRef::Number(n)) => out.push_str(&format!("    dependsOn: {n}\n")),
                Some(StepRef::Text(s)) => out.push_str(&format!("    dependsOn: \"{s}\"\n")),
                None => {}
            }
        }
        out
    }
}

/// Builder for one `RawWorkflowStep`.
pub struct StepBuilder {
    step: RawWorkflowStep,
}

impl StepBuilder {
    pub fn new(task_type: &str, step_number: u32) -> Self {
        Self {
            step: RawWorkflowStep {
                task_type: task_type.to_string(),
                step_number,
                depends_on: None,
            },
        }
    }

    pub fn depends_on(mut self, step_number: u32) -> Self {
        self.step.depends_on = Some(StepRef::Number(step_number));
        self
    }

    /// Dependency written as a quoted string, as older definitions do.
    pub fn depends_on_text(mut self, text: &str) -> Self {
        self.step.depends_on = Some(StepRef::Text(text.to_string()));
        self
    }

    pub fn build(self) -> RawWorkflowStep {
        self.step
    }
}

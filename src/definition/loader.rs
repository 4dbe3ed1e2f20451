// src/definition/loader.rs

use std::fs;
use std::path::Path;

use crate::definition::model::{RawWorkflowDefinition, WorkflowDefinition};
use crate::errors::{GeoflowError, Result};

/// Read a YAML definition from disk without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkflowDefinition> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_raw(&contents)
}

/// Deserialize a YAML definition without semantic validation.
pub fn parse_raw(contents: &str) -> Result<RawWorkflowDefinition> {
    serde_yaml::from_str(contents)
        .map_err(|e| GeoflowError::DefinitionParse(format!("malformed YAML: {e}")))
}

/// Parse and validate a YAML definition held in memory.
pub fn parse_definition(contents: &str) -> Result<WorkflowDefinition> {
    WorkflowDefinition::try_from(parse_raw(contents)?)
}

/// Read, parse and validate a YAML definition file.
///
/// This is the entry point used by the workflow builder and the HTTP layer.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let raw = load_from_path(path)?;
    WorkflowDefinition::try_from(raw)
}

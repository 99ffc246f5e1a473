//! Assembly graph - parts, steps and the planned step order

use crate::error::{Error, Result};
use crate::step::AssemblyStep;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// A physical part in the assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Part identifier
    pub id: String,
    /// Source CAD file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cad_file: Option<String>,
    /// Tessellated mesh for the viewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_file: Option<String>,
    /// Planner-provided grasp candidates, passed through untouched
    #[serde(default)]
    pub grasp_points: Vec<serde_json::Value>,
}

impl Part {
    /// Create a part with no geometry attached
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cad_file: None,
            mesh_file: None,
            grasp_points: Vec::new(),
        }
    }
}

/// Complete assembly description
///
/// `step_order` is the planner's topological ordering. Execution follows it
/// verbatim; step `dependencies` are never re-checked at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyGraph {
    /// Assembly identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Parts keyed by id
    #[serde(default)]
    pub parts: HashMap<String, Part>,
    /// Steps keyed by id
    #[serde(default)]
    pub steps: HashMap<String, AssemblyStep>,
    /// Execution order of step ids
    #[serde(default)]
    pub step_order: Vec<String>,
}

impl AssemblyGraph {
    /// Create an empty graph
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parts: HashMap::new(),
            steps: HashMap::new(),
            step_order: Vec::new(),
        }
    }

    /// Append a step to the end of the order
    #[must_use]
    pub fn with_step(mut self, step: AssemblyStep) -> Self {
        self.step_order.push(step.id.clone());
        self.steps.insert(step.id.clone(), step);
        self
    }

    /// Register a part
    #[must_use]
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.insert(part.id.clone(), part);
        self
    }

    /// Parse and validate a graph from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let graph: Self = serde_json::from_str(json)?;
        graph.validate()?;
        debug!(
            assembly_id = %graph.id,
            steps = graph.step_order.len(),
            parts = graph.parts.len(),
            "Loaded assembly graph"
        );
        Ok(graph)
    }

    /// Read, parse and validate a graph file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Write the graph as pretty JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check that `step_order` is a non-empty permutation of the step ids
    pub fn validate(&self) -> Result<()> {
        if self.step_order.is_empty() {
            return Err(Error::EmptyStepOrder(self.id.clone()));
        }

        for (key, step) in &self.steps {
            if key != &step.id {
                return Err(Error::MismatchedStepId {
                    key: key.clone(),
                    id: step.id.clone(),
                });
            }
        }

        let mut seen = HashSet::with_capacity(self.step_order.len());
        for id in &self.step_order {
            if !self.steps.contains_key(id) {
                return Err(Error::UnknownStep(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(Error::DuplicateStep(id.clone()));
            }
        }

        if let Some(missing) = self.steps.keys().find(|id| !seen.contains(id.as_str())) {
            return Err(Error::UnscheduledStep(missing.clone()));
        }

        Ok(())
    }

    /// Look up a step by id
    #[must_use]
    pub fn step(&self, id: &str) -> Option<&AssemblyStep> {
        self.steps.get(id)
    }

    /// Steps in execution order, skipping ids without a definition
    pub fn ordered_steps(&self) -> impl Iterator<Item = &AssemblyStep> {
        self.step_order.iter().filter_map(|id| self.steps.get(id))
    }
}

#[cfg(test)]
mod tests;

//! Workflow document types.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{WorkflowError, WorkflowResult};

/// A parsed workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Document schema version.
    #[serde(default)]
    pub version: String,
    /// Free-form metadata attached by the server.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// The steps to run.
    pub steps: Vec<Step>,
}

/// A single workflow step: a shell command with dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique step name.
    pub name: String,
    /// Shell command to run.
    pub command: String,
    /// Names of steps that must finish before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Per-step timeout in seconds. Falls back to the runner default.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Whether dependents still run when this step fails.
    #[serde(default)]
    pub continue_on_fail: bool,
}

impl Workflow {
    /// Parses a workflow from a raw JSON document and validates its step
    /// graph.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the document does not parse, has no
    /// steps, repeats a step name, references an unknown dependency or
    /// contains a cycle.
    pub fn from_value(value: serde_json::Value) -> WorkflowResult<Self> {
        let workflow: Self = serde_json::from_value(value)?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Validates the step graph.
    ///
    /// # Errors
    ///
    /// See [`Workflow::from_value`].
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.steps.is_empty() {
            return Err(WorkflowError::Empty);
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(WorkflowError::DuplicateStep(step.name.clone()));
            }
        }

        for step in &self.steps {
            for dep in &step.depends_on {
                if !names.contains(dep.as_str()) {
                    return Err(WorkflowError::UnknownDependency {
                        step: step.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        self.check_acyclic()
    }

    /// Kahn's algorithm; any node left with indegree > 0 sits on a cycle.
    fn check_acyclic(&self) -> WorkflowResult<()> {
        let mut indegree: HashMap<&str, usize> = self
            .steps
            .iter()
            .map(|s| (s.name.as_str(), s.depends_on.len()))
            .collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for step in &self.steps {
            for dep in &step.depends_on {
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(step.name.as_str());
            }
        }

        let mut ready: Vec<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        let mut visited = 0;
        while let Some(name) = ready.pop() {
            visited += 1;
            if let Some(deps) = dependents.get(name) {
                for dependent in deps {
                    if let Some(d) = indegree.get_mut(dependent) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push(dependent);
                        }
                    }
                }
            }
        }

        if visited == self.steps.len() {
            Ok(())
        } else {
            let stuck = indegree
                .iter()
                .find(|(_, d)| **d > 0)
                .map_or_else(String::new, |(n, _)| (*n).to_string());
            Err(WorkflowError::Cycle(stuck))
        }
    }
}

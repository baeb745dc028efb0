//! Error types for workflow parsing and execution.

use thiserror::Error;

/// Result type alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors raised while parsing or running a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow document could not be parsed.
    #[error("invalid workflow document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The workflow contains no steps.
    #[error("workflow has no steps")]
    Empty,

    /// Two steps share the same name.
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),

    /// A step depends on a step that does not exist.
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency {
        /// The step declaring the dependency.
        step: String,
        /// The name that could not be resolved.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle involving step {0}")]
    Cycle(String),

    /// The run exceeded its overall deadline.
    #[error("workflow exceeded its deadline after {0} steps finished")]
    DeadlineExceeded(usize),

    /// A spawned step task panicked or was cancelled.
    #[error("step task failed: {0}")]
    Join(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = WorkflowError::DuplicateStep("migrate".into());
        assert_eq!(err.to_string(), "duplicate step name: migrate");

        let err = WorkflowError::UnknownDependency {
            step: "deploy".into(),
            dependency: "migrate".into(),
        };
        assert_eq!(err.to_string(), "step deploy depends on unknown step migrate");

        let err = WorkflowError::Cycle("a".into());
        assert_eq!(err.to_string(), "dependency cycle involving step a");
    }
}

//! CLI error types.

use thiserror::Error;

/// Errors surfaced by the toolbelt.
#[derive(Debug, Error)]
pub enum CliError {
    /// A control plane API call failed.
    #[error(transparent)]
    Api(#[from] cumulo_api::ApiError),

    /// A deployment workflow failed to parse or run.
    #[error(transparent)]
    Workflow(#[from] cumulo_workflow::WorkflowError),

    /// Profile or token configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// An argument or argument combination was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A name matched more than one resource.
    #[error("{0} is ambiguous: matches {1}")]
    Ambiguous(String, String),

    /// A named resource could not be resolved.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Resource kind (stack, formation, ...).
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// The user declined a confirmation prompt.
    #[error("aborted")]
    Aborted,

    /// Bundle packing or unpacking failed.
    #[error("bundle error: {0}")]
    Bundle(String),

    /// Output serialization failed.
    #[error("format error: {0}")]
    Format(String),

    /// Stencil rendering reported errors.
    #[error("rendering failed with {0} error(s)")]
    RenderErrors(usize),

    /// A deployment workflow finished with failed steps.
    #[error("deployment failed: {0}")]
    Deploy(String),

    /// A concurrent lookup task panicked or was cancelled.
    #[error("lookup task failed: {0}")]
    Join(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Creates a not found error for a named resource.
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = CliError::Config("no token".into());
        assert_eq!(err.to_string(), "configuration error: no token");

        let err = CliError::not_found("stack", "web");
        assert_eq!(err.to_string(), "stack not found: web");

        let err = CliError::Ambiguous("web".into(), "web-prod, web-staging".into());
        assert_eq!(err.to_string(), "web is ambiguous: matches web-prod, web-staging");
    }

    #[test]
    fn api_errors_pass_through() {
        let err = CliError::from(cumulo_api::ApiError::Timeout("action 1".into()));
        assert_eq!(err.to_string(), "timed out waiting for action 1");
    }
}

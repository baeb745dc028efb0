//! Asynchronous actions queued on the control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An asynchronous action and its progress.
///
/// Lifecycle actions (restart, scale, reboot, ...) return immediately with
/// an action record; callers poll it until `finished_success` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncAction {
    /// Server-side action id.
    pub id: i64,
    /// Action name (service_restart, server_reboot, ...).
    #[serde(default)]
    pub action: String,
    /// When the action was queued.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Whether the action finished, and if so whether it succeeded.
    #[serde(default)]
    pub finished_success: Option<bool>,
    /// Final message reported by the server, when finished.
    #[serde(default)]
    pub finished_message: Option<String>,
}

impl AsyncAction {
    /// Whether the action has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_success.is_some()
    }

    /// Whether the action finished successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.finished_success == Some(true)
    }

    /// The finished message, or a placeholder when the server sent none.
    #[must_use]
    pub fn message(&self) -> &str {
        self.finished_message.as_deref().unwrap_or("no details")
    }
}

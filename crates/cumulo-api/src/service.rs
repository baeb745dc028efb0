//! Container services running on a stack.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A container belonging to a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    /// Unique container identifier.
    pub uid: String,
    /// Name of the server hosting this container.
    #[serde(default)]
    pub server_name: String,
    /// Uid of the server hosting this container.
    #[serde(default)]
    pub server_uid: String,
}

/// A service and its running containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Service name.
    pub name: String,
    /// Running containers for this service.
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Source the service was built from (git, image, ...).
    #[serde(default)]
    pub source_type: Option<String>,
}

impl Service {
    /// Container count per server name, sorted by server name.
    #[must_use]
    pub fn server_container_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for container in &self.containers {
            *counts.entry(container.server_name.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Lifecycle actions that can be invoked on a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAction {
    /// Stop all containers of the service.
    Stop,
    /// Pause all containers of the service.
    Pause,
    /// Resume previously paused containers.
    Resume,
    /// Restart all containers of the service.
    Restart,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Restart => "restart",
        };
        write!(f, "{s}")
    }
}

/// Target container count for a scale request.
///
/// Absolute counts replace the total across the stack; relative counts adjust
/// the current total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Set the total container count to this value.
    Absolute(u32),
    /// Adjust the current total by this delta.
    Relative(i32),
}

impl ScaleTarget {
    /// JSON body fragment for the scale endpoint.
    #[must_use]
    pub fn to_body(self) -> serde_json::Value {
        match self {
            Self::Absolute(count) => serde_json::json!({ "count": count }),
            Self::Relative(delta) => serde_json::json!({ "delta": delta }),
        }
    }
}

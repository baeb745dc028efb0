//! Stacks: deployable applications managed by the control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stack as returned by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    /// Unique stack identifier.
    pub uid: String,
    /// Stack name.
    pub name: String,
    /// Environment (production, staging, ...). Empty for clusters.
    #[serde(default)]
    pub environment: String,
    /// Name of the owning account.
    #[serde(default)]
    pub account_name: String,
    /// Application framework reported by analysis.
    #[serde(default)]
    pub framework: String,
    /// Deployment backend (docker, kubernetes, or empty for classic).
    #[serde(default)]
    pub backend: String,
    /// Numeric status code.
    #[serde(default)]
    pub status: i32,
    /// Whether this stack is itself a cluster.
    #[serde(default)]
    pub is_cluster: bool,
    /// Whether this stack runs inside a cluster.
    #[serde(default)]
    pub is_inside_cluster: bool,
    /// Name of the hosting cluster, when inside one.
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// Public address of the application, when available.
    #[serde(default)]
    pub application_address: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last deploy or configuration change.
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Stack status codes used by the control plane.
mod status {
    pub const QUEUED: i32 = 0;
    pub const DEPLOYED: i32 = 1;
    pub const DEPLOY_FAILED: i32 = 2;
    pub const ANALYZING: i32 = 3;
    pub const ANALYZED: i32 = 4;
    pub const QUEUED_FOR_DEPLOY: i32 = 5;
    pub const DEPLOYING: i32 = 6;
    pub const ANALYSIS_FAILED: i32 = 7;
}

impl Stack {
    /// Human-readable status text.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self.status {
            status::QUEUED => "Pending analysis",
            status::DEPLOYED => "Deployed",
            status::DEPLOY_FAILED => "Deployment failed",
            status::ANALYZING => "Analyzing",
            status::ANALYZED => "Analyzed",
            status::QUEUED_FOR_DEPLOY => "Queued for deployment",
            status::DEPLOYING => "Deploying",
            status::ANALYSIS_FAILED => "Unable to analyze",
            _ => "Unknown",
        }
    }

    /// Whether the stack is currently deploying (or queued to deploy).
    #[must_use]
    pub fn is_deploying(&self) -> bool {
        matches!(self.status, status::QUEUED_FOR_DEPLOY | status::DEPLOYING)
    }

    /// Stack type label derived from cluster membership, framework and
    /// backend.
    #[must_use]
    pub fn stack_type(&self) -> &'static str {
        if self.is_cluster {
            "kubernetes/cluster"
        } else if self.is_inside_cluster {
            "kubernetes/in-cluster"
        } else if self.framework == "skycap" {
            "skycap"
        } else if self.backend == "docker" {
            "docker"
        } else if self.backend == "kubernetes" {
            "kubernetes/standalone"
        } else {
            "ruby/rack"
        }
    }

    /// Environment label for display. Clusters and skycap stacks carry no
    /// meaningful environment.
    #[must_use]
    pub fn display_environment(&self) -> &str {
        if self.is_cluster || self.framework == "skycap" || self.environment.is_empty() {
            "n/a"
        } else {
            &self.environment
        }
    }

    /// The most recent activity time, falling back to creation time.
    #[must_use]
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_activity.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_json(extra: &str) -> String {
        format!(
            r#"{{"uid":"st-1","name":"web","created_at":"2026-01-05T10:00:00Z"{extra}}}"#
        )
    }

    #[test]
    fn stack_type_for_docker_backend() {
        let stack: Stack =
            serde_json::from_str(&stack_json(r#","backend":"docker""#)).expect("valid stack");
        assert_eq!(stack.stack_type(), "docker");
    }

    #[test]
    fn stack_type_for_cluster() {
        let stack: Stack =
            serde_json::from_str(&stack_json(r#","is_cluster":true,"environment":"production""#))
                .expect("valid stack");
        assert_eq!(stack.stack_type(), "kubernetes/cluster");
        assert_eq!(stack.display_environment(), "n/a");
    }

    #[test]
    fn stack_type_for_in_cluster() {
        let stack: Stack = serde_json::from_str(&stack_json(
            r#","is_inside_cluster":true,"cluster_name":"main""#,
        ))
        .expect("valid stack");
        assert_eq!(stack.stack_type(), "kubernetes/in-cluster");
        assert_eq!(stack.cluster_name.as_deref(), Some("main"));
    }

    #[test]
    fn stack_type_defaults_to_rack() {
        let stack: Stack = serde_json::from_str(&stack_json("")).expect("valid stack");
        assert_eq!(stack.stack_type(), "ruby/rack");
    }

    #[test]
    fn status_text_known_and_unknown_codes() {
        let mut stack: Stack = serde_json::from_str(&stack_json("")).expect("valid stack");
        stack.status = 1;
        assert_eq!(stack.status_text(), "Deployed");
        stack.status = 6;
        assert_eq!(stack.status_text(), "Deploying");
        assert!(stack.is_deploying());
        stack.status = 99;
        assert_eq!(stack.status_text(), "Unknown");
    }

    #[test]
    fn activity_falls_back_to_created_at() {
        let stack: Stack = serde_json::from_str(&stack_json("")).expect("valid stack");
        assert_eq!(stack.activity_at(), stack.created_at);

        let stack: Stack = serde_json::from_str(&stack_json(
            r#","last_activity":"2026-02-01T08:30:00Z""#,
        ))
        .expect("valid stack");
        assert_eq!(
            stack.activity_at().to_rfc3339(),
            "2026-02-01T08:30:00+00:00"
        );
    }
}

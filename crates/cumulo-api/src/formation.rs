//! Formations and their template artifacts.
//!
//! A formation groups the stencils, policies, transformations, stencil
//! groups and helm releases that describe how a stack is rendered onto a
//! cluster. Stencils come from base template repositories (BTRs) tracked on
//! the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A formation attached to a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    /// Unique formation identifier.
    pub uid: String,
    /// Formation name.
    pub name: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Stencils, when requested with full details.
    #[serde(default)]
    pub stencils: Vec<Stencil>,
    /// Stencil groups.
    #[serde(default)]
    pub stencil_groups: Vec<StencilGroup>,
    /// Policies.
    #[serde(default)]
    pub policies: Vec<Policy>,
    /// Transformations.
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    /// Helm releases.
    #[serde(default)]
    pub helm_releases: Vec<HelmRelease>,
    /// Base template repositories this formation draws stencils from.
    #[serde(default)]
    pub base_templates: Vec<BaseTemplate>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Formation {
    /// Find the index of a base template by repository and branch.
    #[must_use]
    pub fn base_template_index(&self, repo: &str, branch: &str) -> Option<usize> {
        self.base_templates.iter().position(|bt| {
            bt.git_repo.trim() == repo.trim() && bt.git_branch.trim() == branch.trim()
        })
    }

    /// Find a stencil by its filename.
    #[must_use]
    pub fn stencil_by_filename(&self, filename: &str) -> Option<&Stencil> {
        self.stencils.iter().find(|s| s.filename == filename)
    }
}

/// A stencil: a templated file rendered against a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stencil {
    /// Unique stencil identifier. Empty for stencils not yet uploaded.
    #[serde(default)]
    pub uid: String,
    /// Output filename.
    pub filename: String,
    /// Filename of the template this stencil was created from.
    #[serde(default)]
    pub template_filename: String,
    /// Context the stencil renders in (stack, service, ...).
    #[serde(default)]
    pub context_id: String,
    /// Stencil body. Only present when fetched with full details.
    #[serde(default)]
    pub body: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Render order within the formation.
    #[serde(default)]
    pub sequence: i32,
    /// Path of the stencil in the base template repository.
    #[serde(default)]
    pub gitfile_path: Option<String>,
    /// Whether the stencil body is stored inline rather than in git.
    #[serde(default)]
    pub inline: bool,
    /// Creation time, when known.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time, when known.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sort stencils by their render sequence.
pub fn sort_by_sequence(stencils: &mut [Stencil]) {
    stencils.sort_by_key(|s| s.sequence);
}

/// A stencil group: a named selection of stencils expressed as rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StencilGroup {
    /// Unique group identifier.
    #[serde(default)]
    pub uid: String,
    /// Group name.
    pub name: String,
    /// JSON rules selecting the member stencils.
    #[serde(default)]
    pub rules: String,
}

/// A policy document evaluated during rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy identifier.
    #[serde(default)]
    pub uid: String,
    /// Policy name.
    pub name: String,
    /// Policy body.
    #[serde(default)]
    pub body: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A transformation applied to rendered output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformation {
    /// Unique transformation identifier.
    #[serde(default)]
    pub uid: String,
    /// Transformation name.
    pub name: String,
    /// Transformation body (javascript).
    #[serde(default)]
    pub body: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A helm release managed by the formation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelmRelease {
    /// Unique release identifier.
    #[serde(default)]
    pub uid: String,
    /// Chart name.
    pub chart_name: String,
    /// Chart version.
    #[serde(default)]
    pub version: String,
    /// Chart repository URL.
    #[serde(default)]
    pub repository_url: String,
    /// Display name of the release.
    #[serde(default)]
    pub display_name: String,
    /// Values file body.
    #[serde(default)]
    pub body: String,
}

/// Status codes for base template repositories.
mod btr_status {
    pub const CLONING: i32 = 5;
    pub const AVAILABLE: i32 = 6;
    pub const CLONE_FAILED: i32 = 7;
}

/// A base template repository registered with the organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseTemplate {
    /// Unique repository identifier. Empty before creation.
    #[serde(default)]
    pub uid: String,
    /// Repository name.
    #[serde(default)]
    pub name: String,
    /// Git repository URL.
    #[serde(default)]
    pub git_repo: String,
    /// Git branch tracked.
    #[serde(default)]
    pub git_branch: String,
    /// Numeric status code.
    #[serde(default)]
    pub status_code: i32,
}

impl BaseTemplate {
    /// Whether the repository has been cloned and verified.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status_code == btr_status::AVAILABLE
    }

    /// Whether the server has finished processing the repository, either
    /// successfully or not.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(
            self.status_code,
            btr_status::CLONING | btr_status::AVAILABLE | btr_status::CLONE_FAILED
        )
    }

    /// Whether this repository matches the given repo URL and branch,
    /// ignoring surrounding whitespace.
    #[must_use]
    pub fn matches(&self, repo: &str, branch: &str) -> bool {
        self.git_repo.trim() == repo.trim() && self.git_branch.trim() == branch.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_template_index_trims_whitespace() {
        let formation: Formation = serde_json::from_str(
            r#"{
                "uid": "fm-1",
                "name": "web",
                "created_at": "2026-01-05T10:00:00Z",
                "base_templates": [
                    {"uid": "bt-1", "git_repo": "https://git.test/a.git", "git_branch": "main"},
                    {"uid": "bt-2", "git_repo": "https://git.test/b.git", "git_branch": "main"}
                ]
            }"#,
        )
        .expect("valid formation");

        assert_eq!(
            formation.base_template_index(" https://git.test/b.git ", "main"),
            Some(1)
        );
        assert_eq!(
            formation.base_template_index("https://git.test/c.git", "main"),
            None
        );
    }

    #[test]
    fn stencils_sort_by_sequence() {
        let mut stencils: Vec<Stencil> = serde_json::from_str(
            r#"[
                {"filename": "b.yml", "sequence": 2},
                {"filename": "a.yml", "sequence": 1},
                {"filename": "c.yml", "sequence": 3}
            ]"#,
        )
        .expect("valid stencils");
        sort_by_sequence(&mut stencils);
        let order: Vec<&str> = stencils.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(order, ["a.yml", "b.yml", "c.yml"]);
    }

    #[test]
    fn base_template_status() {
        let bt: BaseTemplate =
            serde_json::from_str(r#"{"uid": "bt-1", "status_code": 6}"#).expect("valid btr");
        assert!(bt.is_available());
        assert!(bt.is_settled());

        let bt: BaseTemplate =
            serde_json::from_str(r#"{"uid": "bt-1", "status_code": 2}"#).expect("valid btr");
        assert!(!bt.is_available());
        assert!(!bt.is_settled());
    }
}

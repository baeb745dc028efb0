//! Formation bundle manifests.
//!
//! A bundle is a portable tar.gz of a formation: the stencil, policy,
//! transformation and helm release bodies as individual files, plus a
//! `manifest.json` described by [`BundleManifest`] tying them together.

use serde::{Deserialize, Serialize};

use crate::formation::Formation;

/// Manifest version written by this toolbelt.
pub const MANIFEST_VERSION: &str = "1";

/// The `manifest.json` at the root of a formation bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Manifest schema version.
    pub version: String,
    /// Formation name.
    pub name: String,
    /// Formation tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Tool that created the bundle.
    #[serde(default)]
    pub created_with: String,
    /// Base template repositories and the stencils drawn from each.
    #[serde(default)]
    pub base_templates: Vec<BundleBaseTemplate>,
    /// Policies, stored under `policies/<uid>.cop`.
    #[serde(default)]
    pub policies: Vec<BundleItem>,
    /// Transformations, stored under `transformations/<uid>.js`.
    #[serde(default)]
    pub transformations: Vec<BundleItem>,
    /// Stencil groups, stored under `stencil_groups/<uid>.json`.
    #[serde(default)]
    pub stencil_groups: Vec<BundleItem>,
    /// Helm releases, values stored under `helm_releases/`.
    #[serde(default)]
    pub helm_releases: Vec<BundleHelmRelease>,
    /// Environment variable files under `configurations/`.
    #[serde(default)]
    pub configurations: Vec<String>,
}

/// A base template repository referenced by a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleBaseTemplate {
    /// Repository name.
    pub name: String,
    /// Git repository URL.
    pub repo: String,
    /// Git branch.
    pub branch: String,
    /// Stencils drawn from this repository.
    #[serde(default)]
    pub stencils: Vec<BundleStencil>,
}

/// A stencil entry in a bundle manifest. The body lives in
/// `stencils/<filename>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleStencil {
    /// Original stencil uid.
    #[serde(default)]
    pub uid: String,
    /// Output filename (also the file name under `stencils/`).
    pub filename: String,
    /// Template the stencil was created from.
    #[serde(default)]
    pub template_filename: String,
    /// Render context.
    #[serde(default)]
    pub context_id: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Render order.
    #[serde(default)]
    pub sequence: i32,
}

/// A policy, transformation or stencil group entry. The body lives in the
/// matching directory, named by uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleItem {
    /// Original uid, used as the body file name.
    pub uid: String,
    /// Item name.
    #[serde(default)]
    pub name: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A helm release entry. Values live in
/// `helm_releases/<chart_name>-values.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleHelmRelease {
    /// Chart name.
    pub chart_name: String,
    /// Display name of the release.
    #[serde(default)]
    pub display_name: String,
    /// Chart version.
    #[serde(default)]
    pub version: String,
    /// Chart repository URL.
    #[serde(default)]
    pub repository_url: String,
    /// Values file name within the bundle.
    #[serde(default)]
    pub values_file: String,
}

impl BundleManifest {
    /// Builds a manifest from a fully fetched formation.
    ///
    /// Stencils are grouped under the base template repository they came
    /// from; stencils whose repository is unknown fall under the first one.
    #[must_use]
    pub fn from_formation(
        formation: &Formation,
        created_with: impl Into<String>,
        configurations: Vec<String>,
    ) -> Self {
        let stencils: Vec<BundleStencil> = formation
            .stencils
            .iter()
            .map(|s| BundleStencil {
                uid: s.uid.clone(),
                filename: s.filename.clone(),
                template_filename: s.template_filename.clone(),
                context_id: s.context_id.clone(),
                tags: s.tags.clone(),
                sequence: s.sequence,
            })
            .collect();

        let base_templates: Vec<BundleBaseTemplate> = formation
            .base_templates
            .iter()
            .enumerate()
            .map(|(idx, bt)| BundleBaseTemplate {
                name: bt.name.clone(),
                repo: bt.git_repo.clone(),
                branch: bt.git_branch.clone(),
                stencils: if idx == 0 { stencils.clone() } else { Vec::new() },
            })
            .collect();

        Self {
            version: MANIFEST_VERSION.to_string(),
            name: formation.name.clone(),
            tags: formation.tags.clone(),
            created_with: created_with.into(),
            base_templates,
            policies: formation
                .policies
                .iter()
                .map(|p| BundleItem {
                    uid: p.uid.clone(),
                    name: p.name.clone(),
                    tags: p.tags.clone(),
                })
                .collect(),
            transformations: formation
                .transformations
                .iter()
                .map(|t| BundleItem {
                    uid: t.uid.clone(),
                    name: t.name.clone(),
                    tags: t.tags.clone(),
                })
                .collect(),
            stencil_groups: formation
                .stencil_groups
                .iter()
                .map(|g| BundleItem {
                    uid: g.uid.clone(),
                    name: g.name.clone(),
                    tags: Vec::new(),
                })
                .collect(),
            helm_releases: formation
                .helm_releases
                .iter()
                .map(|r| BundleHelmRelease {
                    chart_name: r.chart_name.clone(),
                    display_name: r.display_name.clone(),
                    version: r.version.clone(),
                    repository_url: r.repository_url.clone(),
                    values_file: format!("{}-values.yml", r.chart_name),
                })
                .collect(),
            configurations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched_formation() -> Formation {
        serde_json::from_str(
            r#"{
                "uid": "fm-1",
                "name": "web",
                "tags": ["prod"],
                "created_at": "2026-01-05T10:00:00Z",
                "base_templates": [
                    {"uid": "bt-1", "name": "core", "git_repo": "https://git.test/core.git", "git_branch": "main"}
                ],
                "stencils": [
                    {"uid": "st-1", "filename": "svc.yml", "body": "kind: Service", "sequence": 1}
                ],
                "policies": [
                    {"uid": "po-1", "name": "no-root", "body": "deny root"}
                ],
                "helm_releases": [
                    {"chart_name": "redis", "version": "17.0.1", "body": "replicas: 1"}
                ]
            }"#,
        )
        .expect("valid formation")
    }

    #[test]
    fn builds_manifest_from_formation() {
        let formation = fetched_formation();
        let manifest =
            BundleManifest::from_formation(&formation, "cumulo (1.0.0)", vec!["formation-vars".into()]);

        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert_eq!(manifest.name, "web");
        assert_eq!(manifest.created_with, "cumulo (1.0.0)");
        assert_eq!(manifest.base_templates.len(), 1);
        assert_eq!(manifest.base_templates[0].stencils.len(), 1);
        assert_eq!(manifest.base_templates[0].stencils[0].filename, "svc.yml");
        assert_eq!(manifest.policies[0].uid, "po-1");
        assert_eq!(manifest.helm_releases[0].values_file, "redis-values.yml");
        assert_eq!(manifest.configurations, vec!["formation-vars".to_string()]);
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let formation = fetched_formation();
        let manifest = BundleManifest::from_formation(&formation, "cumulo (1.0.0)", Vec::new());
        let json = serde_json::to_string_pretty(&manifest).expect("serializes");
        let parsed: BundleManifest = serde_json::from_str(&json).expect("parses");
        assert_eq!(parsed.name, manifest.name);
        assert_eq!(parsed.base_templates[0].repo, "https://git.test/core.git");
    }
}

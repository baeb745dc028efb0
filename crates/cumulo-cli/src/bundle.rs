//! Formation bundle archives.
//!
//! A bundle file (extension `.formation`) is a gzipped tarball with a
//! single `bundle/` directory at the top:
//!
//! ```text
//! bundle/manifest.json
//! bundle/stencils/<filename>
//! bundle/stencil_groups/<uid>.json
//! bundle/policies/<uid>.cop
//! bundle/transformations/<uid>.js
//! bundle/helm_releases/<chart>-values.yml
//! bundle/configurations/formation-vars
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use cumulo_api::BundleManifest;

use crate::error::CliError;

/// File extension for bundle archives.
pub const BUNDLE_EXTENSION: &str = "formation";

const TOP_DIR: &str = "bundle";
const MANIFEST_FILE: &str = "manifest.json";

/// The full contents of a bundle, manifest plus bodies keyed by their
/// file name inside the archive.
#[derive(Debug, Clone)]
pub struct BundleContents {
    /// The parsed manifest.
    pub manifest: BundleManifest,
    /// Stencil bodies by output filename.
    pub stencils: BTreeMap<String, String>,
    /// Stencil group rule documents by uid.
    pub stencil_groups: BTreeMap<String, String>,
    /// Policy bodies by uid.
    pub policies: BTreeMap<String, String>,
    /// Transformation bodies by uid.
    pub transformations: BTreeMap<String, String>,
    /// Helm values files by file name.
    pub helm_values: BTreeMap<String, String>,
    /// Configuration files by file name.
    pub configurations: BTreeMap<String, String>,
}

impl BundleContents {
    /// Creates empty contents around a manifest.
    #[must_use]
    pub fn new(manifest: BundleManifest) -> Self {
        Self {
            manifest,
            stencils: BTreeMap::new(),
            stencil_groups: BTreeMap::new(),
            policies: BTreeMap::new(),
            transformations: BTreeMap::new(),
            helm_values: BTreeMap::new(),
            configurations: BTreeMap::new(),
        }
    }
}

/// Appends the `.formation` extension when the path has none.
#[must_use]
pub fn with_bundle_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(BUNDLE_EXTENSION)
    }
}

/// Writes a bundle archive to `path`.
///
/// # Errors
///
/// Returns an error if the archive cannot be created or written.
pub fn write_bundle(path: &Path, contents: &BundleContents) -> Result<(), CliError> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = tar::Builder::new(encoder);

    let manifest = serde_json::to_vec_pretty(&contents.manifest)
        .map_err(|e| CliError::Bundle(format!("serializing manifest: {e}")))?;
    append(&mut archive, &format!("{TOP_DIR}/{MANIFEST_FILE}"), &manifest)?;

    for (name, body) in &contents.stencils {
        append(&mut archive, &format!("{TOP_DIR}/stencils/{name}"), body.as_bytes())?;
    }
    for (uid, body) in &contents.stencil_groups {
        append(
            &mut archive,
            &format!("{TOP_DIR}/stencil_groups/{uid}.json"),
            body.as_bytes(),
        )?;
    }
    for (uid, body) in &contents.policies {
        append(&mut archive, &format!("{TOP_DIR}/policies/{uid}.cop"), body.as_bytes())?;
    }
    for (uid, body) in &contents.transformations {
        append(
            &mut archive,
            &format!("{TOP_DIR}/transformations/{uid}.js"),
            body.as_bytes(),
        )?;
    }
    for (name, body) in &contents.helm_values {
        append(&mut archive, &format!("{TOP_DIR}/helm_releases/{name}"), body.as_bytes())?;
    }
    for (name, body) in &contents.configurations {
        append(
            &mut archive,
            &format!("{TOP_DIR}/configurations/{name}"),
            body.as_bytes(),
        )?;
    }

    let encoder = archive
        .into_inner()
        .map_err(|e| CliError::Bundle(format!("finalizing archive: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CliError::Bundle(format!("finalizing archive: {e}")))?;
    Ok(())
}

/// Reads a bundle archive from `path`.
///
/// # Errors
///
/// Returns an error if the archive is unreadable, has no manifest, or
/// contains entries outside the expected layout.
pub fn read_bundle(path: &Path) -> Result<BundleContents, CliError> {
    let file = File::open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut manifest: Option<BundleManifest> = None;
    let mut stencils = BTreeMap::new();
    let mut stencil_groups = BTreeMap::new();
    let mut policies = BTreeMap::new();
    let mut transformations = BTreeMap::new();
    let mut helm_values = BTreeMap::new();
    let mut configurations = BTreeMap::new();

    for entry in archive
        .entries()
        .map_err(|e| CliError::Bundle(format!("reading archive: {e}")))?
    {
        let mut entry = entry.map_err(|e| CliError::Bundle(format!("reading archive: {e}")))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = entry
            .path()
            .map_err(|e| CliError::Bundle(format!("reading archive: {e}")))?
            .into_owned();
        let relative = entry_path
            .strip_prefix(TOP_DIR)
            .map_err(|_| CliError::Bundle(format!("unexpected entry: {}", entry_path.display())))?
            .to_path_buf();

        let mut body = String::new();
        entry
            .read_to_string(&mut body)
            .map_err(|e| CliError::Bundle(format!("reading {}: {e}", entry_path.display())))?;

        let mut components = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned());
        let first = components
            .next()
            .ok_or_else(|| CliError::Bundle(format!("unexpected entry: {}", entry_path.display())))?;

        if first == MANIFEST_FILE {
            manifest = Some(
                serde_json::from_str(&body)
                    .map_err(|e| CliError::Bundle(format!("invalid manifest: {e}")))?,
            );
            continue;
        }

        let name = components
            .next()
            .ok_or_else(|| CliError::Bundle(format!("unexpected entry: {}", entry_path.display())))?;

        match first.as_str() {
            "stencils" => {
                stencils.insert(name, body);
            }
            "stencil_groups" => {
                stencil_groups.insert(strip_suffix(&name, ".json"), body);
            }
            "policies" => {
                policies.insert(strip_suffix(&name, ".cop"), body);
            }
            "transformations" => {
                transformations.insert(strip_suffix(&name, ".js"), body);
            }
            "helm_releases" => {
                helm_values.insert(name, body);
            }
            "configurations" => {
                configurations.insert(name, body);
            }
            _ => {
                return Err(CliError::Bundle(format!(
                    "unexpected entry: {}",
                    entry_path.display()
                )));
            }
        }
    }

    let manifest = manifest.ok_or_else(|| CliError::Bundle("archive has no manifest.json".into()))?;
    Ok(BundleContents {
        manifest,
        stencils,
        stencil_groups,
        policies,
        transformations,
        helm_values,
        configurations,
    })
}

fn append<W: Write>(archive: &mut tar::Builder<W>, path: &str, data: &[u8]) -> Result<(), CliError> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    archive
        .append_data(&mut header, path, data)
        .map_err(|e| CliError::Bundle(format!("writing {path}: {e}")))?;
    Ok(())
}

fn strip_suffix(name: &str, suffix: &str) -> String {
    name.strip_suffix(suffix).unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest() -> BundleManifest {
        serde_json::from_str(
            r#"{
                "version": "1",
                "name": "web",
                "created_with": "cumulo (test)",
                "base_templates": [
                    {"name": "core", "repo": "https://git.test/core.git", "branch": "main",
                     "stencils": [{"filename": "svc.yml", "sequence": 1}]}
                ],
                "policies": [{"uid": "po-1", "name": "no-root"}],
                "configurations": ["formation-vars"]
            }"#,
        )
        .expect("valid manifest")
    }

    #[test]
    fn bundle_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("web.formation");

        let mut contents = BundleContents::new(manifest());
        contents.stencils.insert("svc.yml".into(), "kind: Service".into());
        contents.policies.insert("po-1".into(), "deny root".into());
        contents
            .configurations
            .insert("formation-vars".into(), "FOO=bar\n".into());

        write_bundle(&path, &contents).expect("should write");
        let read = read_bundle(&path).expect("should read");

        assert_eq!(read.manifest.name, "web");
        assert_eq!(read.stencils["svc.yml"], "kind: Service");
        assert_eq!(read.policies["po-1"], "deny root");
        assert_eq!(read.configurations["formation-vars"], "FOO=bar\n");
        assert!(read.transformations.is_empty());
    }

    #[test]
    fn missing_manifest_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("broken.formation");

        let file = File::create(&path).expect("create file");
        let encoder = GzEncoder::new(file, Compression::default());
        let mut archive = tar::Builder::new(encoder);
        append(&mut archive, "bundle/stencils/svc.yml", b"kind: Service").expect("append");
        archive
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip");

        let err = read_bundle(&path).expect_err("no manifest");
        assert!(err.to_string().contains("manifest"));
    }

    #[test]
    fn extension_defaulting() {
        assert_eq!(
            with_bundle_extension(Path::new("web")),
            PathBuf::from("web.formation")
        );
        assert_eq!(
            with_bundle_extension(Path::new("web.tgz")),
            PathBuf::from("web.tgz")
        );
    }
}

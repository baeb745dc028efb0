//! Stack configuration files and their version history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configuration file type available on a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// File kind (service.yml, manifest.yml, ...).
    pub kind: String,
    /// Last update time, when the server reports one.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Comment attached to the current version.
    #[serde(default)]
    pub comments: Option<String>,
}

/// A historical version of a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFileVersion {
    /// Version identifier.
    pub version: String,
    /// When this version was uploaded.
    pub created_at: DateTime<Utc>,
    /// Comment supplied at upload time.
    #[serde(default)]
    pub comments: Option<String>,
}

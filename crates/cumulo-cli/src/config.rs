//! Connection profiles.
//!
//! Profiles live in `~/.cumulo/profiles.json`. Each profile names an API
//! base URL, an optional default organization, and the token file the
//! toolbelt reads the access token from. The `CUMULO_TOKEN` environment
//! variable overrides the token file when set.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// Default API base URL used when a profile does not set one.
pub const DEFAULT_API_URL: &str = "https://app.cumulo.dev/api/v3";

/// Environment variable that overrides the token file.
pub const TOKEN_ENV: &str = "CUMULO_TOKEN";

const PROFILES_FILE: &str = "profiles.json";

/// A single named connection profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default organization name, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            org: None,
        }
    }
}

/// On-disk profile store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStore {
    /// The profile used when `--profile` is not given.
    #[serde(default)]
    pub default_profile: Option<String>,

    /// Profiles by name.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    /// Load the store from a config directory, returning an empty store
    /// when no profiles file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(config_dir: &Path) -> Result<Self, CliError> {
        let path = config_dir.join(PROFILES_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| CliError::Config(format!("invalid profiles file {}: {e}", path.display())))
    }

    /// Persist the store, creating the config directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, config_dir: &Path) -> Result<(), CliError> {
        fs::create_dir_all(config_dir)?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("serializing profiles: {e}")))?;
        fs::write(config_dir.join(PROFILES_FILE), content)?;
        Ok(())
    }

    /// Look up a profile by name. The name `default` resolves to a
    /// built-in profile when none has been created explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile does not exist.
    pub fn get(&self, name: &str) -> Result<Profile, CliError> {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(profile.clone());
        }
        if name == "default" {
            return Ok(Profile::default());
        }
        Err(CliError::Config(format!("no such profile: {name}")))
    }

    /// Add or replace a profile.
    pub fn set(&mut self, name: &str, profile: Profile) {
        self.profiles.insert(name.to_string(), profile);
    }

    /// Mark a profile as the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile does not exist.
    pub fn set_default(&mut self, name: &str) -> Result<(), CliError> {
        if name != "default" && !self.profiles.contains_key(name) {
            return Err(CliError::Config(format!("no such profile: {name}")));
        }
        self.default_profile = Some(name.to_string());
        Ok(())
    }

    /// Remove a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile does not exist.
    pub fn delete(&mut self, name: &str) -> Result<(), CliError> {
        if self.profiles.remove(name).is_none() {
            return Err(CliError::Config(format!("no such profile: {name}")));
        }
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        Ok(())
    }
}

/// Locate the toolbelt config directory, `~/.cumulo`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf, CliError> {
    dirs::home_dir()
        .map(|home| home.join(".cumulo"))
        .ok_or_else(|| CliError::Config("cannot determine home directory".into()))
}

/// Resolve the access token for a profile.
///
/// `CUMULO_TOKEN` wins when set. Otherwise the token is read from
/// `<config_dir>/<profile>.token`.
///
/// # Errors
///
/// Returns an error if no token can be found.
pub fn resolve_token(config_dir: &Path, profile_name: &str) -> Result<String, CliError> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let path = config_dir.join(format!("{profile_name}.token"));
    match fs::read_to_string(&path) {
        Ok(content) => {
            let token = content.trim().to_string();
            if token.is_empty() {
                Err(CliError::Config(format!("token file is empty: {}", path.display())))
            } else {
                Ok(token)
            }
        }
        Err(_) => Err(CliError::Config(format!(
            "no access token: set {TOKEN_ENV} or write the token to {}",
            path.display()
        ))),
    }
}

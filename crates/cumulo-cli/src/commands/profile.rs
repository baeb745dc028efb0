//! Connection profile commands.
//!
//! Profiles are purely local: these commands never talk to the control
//! plane.

use std::io::Write;
use std::path::Path;

use crate::config::{Profile, ProfileStore, DEFAULT_API_URL};
use crate::error::CliError;
use crate::output::{Message, OutputFormat, ProfileList, ProfileRow};

/// Profile command executor.
pub struct ProfileCommand<'a> {
    config_dir: &'a Path,
}

impl<'a> ProfileCommand<'a> {
    /// Create a new profile command operating on a config directory.
    #[must_use]
    pub const fn new(config_dir: &'a Path) -> Self {
        Self { config_dir }
    }

    /// List all profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile store cannot be read.
    pub fn list<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let store = ProfileStore::load(self.config_dir)?;
        let default = store.default_profile.as_deref().unwrap_or("default");

        let mut rows: Vec<ProfileRow> = store
            .profiles
            .iter()
            .map(|(name, profile)| ProfileRow {
                name: name.clone(),
                api_url: profile.api_url.clone(),
                org: profile.org.clone().unwrap_or_default(),
                current: name == default,
            })
            .collect();
        if !store.profiles.contains_key("default") {
            rows.insert(
                0,
                ProfileRow {
                    name: "default".into(),
                    api_url: DEFAULT_API_URL.into(),
                    org: String::new(),
                    current: default == "default",
                },
            );
        }

        format.write(writer, &ProfileList { profiles: rows })
    }

    /// Create or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile store cannot be written.
    pub fn create<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
        api_url: Option<&str>,
        org: Option<&str>,
    ) -> Result<(), CliError> {
        let mut store = ProfileStore::load(self.config_dir)?;
        let profile = Profile {
            api_url: api_url.unwrap_or(DEFAULT_API_URL).to_string(),
            org: org.map(ToString::to_string),
        };
        store.set(name, profile);
        store.save(self.config_dir)?;

        format.write(
            writer,
            &Message::success(format!(
                "Profile {name} saved. Write its token to {}",
                self.config_dir.join(format!("{name}.token")).display()
            )),
        )
    }

    /// Show one profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile does not exist.
    pub fn show<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
    ) -> Result<(), CliError> {
        let store = ProfileStore::load(self.config_dir)?;
        let profile = store.get(name)?;
        let default = store.default_profile.as_deref().unwrap_or("default");

        let list = ProfileList {
            profiles: vec![ProfileRow {
                name: name.to_string(),
                api_url: profile.api_url,
                org: profile.org.unwrap_or_default(),
                current: name == default,
            }],
        };
        format.write(writer, &list)
    }

    /// Make a profile the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile does not exist.
    pub fn set_default<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
    ) -> Result<(), CliError> {
        let mut store = ProfileStore::load(self.config_dir)?;
        store.set_default(name)?;
        store.save(self.config_dir)?;
        format.write(writer, &Message::success(format!("Now using profile {name}")))
    }

    /// Delete a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile does not exist.
    pub fn delete<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        name: &str,
    ) -> Result<(), CliError> {
        let mut store = ProfileStore::load(self.config_dir)?;
        store.delete(name)?;
        store.save(self.config_dir)?;
        format.write(writer, &Message::success(format!("Profile {name} deleted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use tempfile::TempDir;

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&ProfileCommand<'_>, &mut Vec<u8>, &OutputFormat) -> Result<(), CliError>,
    {
        let dir = TempDir::new().expect("tempdir");
        let cmd = ProfileCommand::new(dir.path());
        let format = OutputFormat::new(Format::Table);
        let mut buf = Vec::new();
        f(&cmd, &mut buf, &format).expect("command should succeed");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn list_shows_built_in_default() {
        let output = run(|cmd, buf, format| cmd.list(buf, format));
        assert!(output.contains("default"));
        assert!(output.contains(DEFAULT_API_URL));
    }

    #[test]
    fn create_use_and_delete_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let cmd = ProfileCommand::new(dir.path());
        let format = OutputFormat::new(Format::Table);
        let mut buf = Vec::new();

        cmd.create(&mut buf, &format, "work", Some("https://api.internal/v3"), Some("acme"))
            .expect("create");
        cmd.set_default(&mut buf, &format, "work").expect("use");

        let store = ProfileStore::load(dir.path()).expect("load");
        assert_eq!(store.default_profile.as_deref(), Some("work"));
        let profile = store.get("work").expect("exists");
        assert_eq!(profile.api_url, "https://api.internal/v3");
        assert_eq!(profile.org.as_deref(), Some("acme"));

        cmd.delete(&mut buf, &format, "work").expect("delete");
        let store = ProfileStore::load(dir.path()).expect("load");
        assert!(store.get("work").is_err());
        assert!(store.default_profile.is_none());
    }

    #[test]
    fn delete_missing_profile_fails() {
        let dir = TempDir::new().expect("tempdir");
        let cmd = ProfileCommand::new(dir.path());
        let format = OutputFormat::new(Format::Table);
        let mut buf = Vec::new();
        assert!(cmd.delete(&mut buf, &format, "nope").is_err());
    }
}

//! Environment variable commands.

use std::io::Write;

use cumulo_api::{Client, Stack};

use crate::error::CliError;
use crate::output::{EnvVarList, EnvVarRow, Message, OutputFormat};

/// Environment variable command executor.
pub struct EnvVarCommand<'a> {
    client: &'a Client,
}

impl<'a> EnvVarCommand<'a> {
    /// Create a new environment variable command.
    #[must_use]
    pub const fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List the environment variables of a stack, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
    ) -> Result<(), CliError> {
        let mut vars = self.client.env_vars(&stack.uid).await?;
        vars.sort_by(|a, b| a.key.cmp(&b.key));

        let list = EnvVarList {
            vars: vars
                .iter()
                .map(|v| EnvVarRow {
                    key: v.key.clone(),
                    value: v
                        .value_str()
                        .map_or_else(|| v.value.to_string(), ToString::to_string),
                    readonly: v.readonly,
                })
                .collect(),
        };
        format.write(writer, &list)
    }

    /// Add a new environment variable and wait for it to apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable already exists or applying it
    /// fails.
    pub async fn set<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        key: &str,
        value: &str,
    ) -> Result<(), CliError> {
        let action = self.client.set_env_var(&stack.uid, key, value).await?;
        format.write(writer, &Message::info(format!("Applying {key}...")))?;
        self.client.wait_for_action(&stack.uid, action.id).await?;
        format.write(writer, &Message::success(format!("{key} set on {}", stack.name)))
    }
}

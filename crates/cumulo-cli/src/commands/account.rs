//! Organization account commands.

use std::io::Write;

use cumulo_api::Client;

use crate::error::CliError;
use crate::output::{AccountList, AccountRow, OutputFormat};

/// Account command executor.
pub struct AccountCommand<'a> {
    client: &'a Client,
}

impl<'a> AccountCommand<'a> {
    /// Create a new account command.
    #[must_use]
    pub const fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List the organizations the token has access to.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let accounts = self.client.accounts().await?;
        let list = AccountList {
            accounts: accounts
                .into_iter()
                .map(|a| AccountRow {
                    id: a.id,
                    name: a.name,
                    owner: a.owner.unwrap_or_default(),
                    current: a.current,
                })
                .collect(),
        };
        format.write(writer, &list)
    }
}

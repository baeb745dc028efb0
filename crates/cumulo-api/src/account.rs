//! Organization accounts.

use serde::{Deserialize, Serialize};

/// An organization account the authenticated user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Server-side account id.
    pub id: i64,
    /// Organization name. May be empty for unnamed organizations.
    #[serde(default)]
    pub name: String,
    /// Email of the account owner.
    #[serde(default)]
    pub owner: Option<String>,
    /// Whether this is the user's default organization.
    #[serde(default)]
    pub current: bool,
}

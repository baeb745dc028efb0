//! Servers belonging to a stack.

use serde::{Deserialize, Serialize};

/// A server provisioned for a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Unique server identifier.
    pub uid: String,
    /// Server name.
    pub name: String,
    /// Public address, when assigned.
    #[serde(default)]
    pub address: Option<String>,
    /// Roles this server fulfils (web, docker, kubes, mysql, ...).
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Server {
    /// Whether the server carries the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether the server can host containers.
    #[must_use]
    pub fn hosts_containers(&self) -> bool {
        self.has_role("docker") || self.has_role("kubes")
    }
}

/// Find a server by exact name or address, case-insensitively.
#[must_use]
pub fn find_server<'a>(servers: &'a [Server], name: &str) -> Option<&'a Server> {
    let needle = name.to_lowercase();
    servers.iter().find(|s| {
        s.name.to_lowercase() == needle
            || s.address.as_deref().is_some_and(|a| a.to_lowercase() == needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str, roles: &[&str]) -> Server {
        Server {
            uid: format!("srv-{name}"),
            name: name.into(),
            address: None,
            roles: roles.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn role_checks() {
        let s = server("orca", &["web", "docker"]);
        assert!(s.has_role("docker"));
        assert!(!s.has_role("mysql"));
        assert!(s.hosts_containers());

        let s = server("db", &["mysql"]);
        assert!(!s.hosts_containers());
    }

    #[test]
    fn find_server_is_case_insensitive() {
        let servers = vec![server("Orca", &[]), server("beluga", &[])];
        assert!(find_server(&servers, "orca").is_some());
        assert!(find_server(&servers, "BELUGA").is_some());
        assert!(find_server(&servers, "narwhal").is_none());
    }

    #[test]
    fn find_server_matches_address() {
        let mut s = server("orca", &[]);
        s.address = Some("10.0.0.5".into());
        let servers = vec![s];
        assert!(find_server(&servers, "10.0.0.5").is_some());
    }
}

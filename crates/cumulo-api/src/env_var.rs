//! Stack environment variables.

use serde::{Deserialize, Serialize};

/// An environment variable set on a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub key: String,
    /// Variable value. The server reports non-string values for some
    /// generated variables.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Whether the variable is managed by the server and cannot be changed.
    #[serde(default)]
    pub readonly: bool,
}

impl EnvVar {
    /// The value as a string, when it is one.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Parse `KEY=VALUE` lines into key/value pairs.
///
/// Lines without an `=` are skipped. Values may themselves contain `=`.
#[must_use]
pub fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_lines() {
        let pairs = parse_env_lines("FOO=bar\nDATABASE_URL=postgres://u:p@h/db?a=1\nnot a pair\n");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("FOO".to_string(), "bar".to_string()));
        assert_eq!(pairs[1].1, "postgres://u:p@h/db?a=1");
    }

    #[test]
    fn value_str_for_non_string_values() {
        let var: EnvVar =
            serde_json::from_str(r#"{"key": "PORT", "value": 3000}"#).expect("valid env var");
        assert!(var.value_str().is_none());

        let var: EnvVar = serde_json::from_str(r#"{"key": "RAILS_ENV", "value": "production"}"#)
            .expect("valid env var");
        assert_eq!(var.value_str(), Some("production"));
    }
}

//! Name resolution for stacks and organizations.
//!
//! Stack names given on the command line are matched case-insensitively,
//! exact matches first, then unique prefixes. An optional environment
//! narrows the candidates the same way before the name is matched.

use cumulo_api::{Account, Stack};

use crate::error::CliError;

/// Resolve a stack by name, optionally narrowed by environment.
///
/// Matching is case-insensitive. An exact name match wins outright; when
/// there is none, a unique prefix match is accepted, then a unique
/// substring match.
///
/// # Errors
///
/// Returns [`CliError::NotFound`] when nothing matches and
/// [`CliError::Ambiguous`] when a prefix matches more than one stack.
pub fn resolve_stack<'a>(
    stacks: &'a [Stack],
    name: &str,
    environment: Option<&str>,
) -> Result<&'a Stack, CliError> {
    let candidates: Vec<&Stack> = match environment {
        Some(env) => filter_environment(stacks, env)?,
        None => stacks.iter().collect(),
    };

    let wanted = name.to_lowercase();

    let exact: Vec<&Stack> = candidates
        .iter()
        .filter(|s| s.name.to_lowercase() == wanted)
        .copied()
        .collect();
    match exact.as_slice() {
        [stack] => return Ok(stack),
        [_, ..] => {
            return Err(CliError::Ambiguous(
                name.to_string(),
                describe(&exact),
            ));
        }
        [] => {}
    }

    let prefixed: Vec<&Stack> = candidates
        .iter()
        .filter(|s| s.name.to_lowercase().starts_with(&wanted))
        .copied()
        .collect();
    match prefixed.as_slice() {
        [stack] => return Ok(stack),
        [] => {}
        _ => return Err(CliError::Ambiguous(name.to_string(), describe(&prefixed))),
    }

    let contained: Vec<&Stack> = candidates
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&wanted))
        .copied()
        .collect();
    match contained.as_slice() {
        [stack] => Ok(stack),
        [] => Err(CliError::not_found("stack", name)),
        _ => Err(CliError::Ambiguous(name.to_string(), describe(&contained))),
    }
}

/// Narrow stacks to an environment, exact match first then unique prefix.
fn filter_environment<'a>(stacks: &'a [Stack], environment: &str) -> Result<Vec<&'a Stack>, CliError> {
    let wanted = environment.to_lowercase();

    let exact: Vec<&Stack> = stacks
        .iter()
        .filter(|s| s.environment.to_lowercase() == wanted)
        .collect();
    if !exact.is_empty() {
        return Ok(exact);
    }

    let prefixed: Vec<&Stack> = stacks
        .iter()
        .filter(|s| s.environment.to_lowercase().starts_with(&wanted))
        .collect();
    if prefixed.is_empty() {
        return Err(CliError::not_found("environment", environment));
    }

    let mut envs: Vec<&str> = prefixed.iter().map(|s| s.environment.as_str()).collect();
    envs.sort_unstable();
    envs.dedup();
    if envs.len() > 1 {
        return Err(CliError::Ambiguous(environment.to_string(), envs.join(", ")));
    }
    Ok(prefixed)
}

fn describe(stacks: &[&Stack]) -> String {
    stacks
        .iter()
        .map(|s| format!("{} ({})", s.name, s.environment))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve an organization by name, case-insensitively.
///
/// # Errors
///
/// Returns [`CliError::NotFound`] when no account carries the name.
pub fn resolve_org<'a>(accounts: &'a [Account], name: &str) -> Result<&'a Account, CliError> {
    let wanted = name.to_lowercase();
    accounts
        .iter()
        .find(|a| a.name.to_lowercase() == wanted)
        .ok_or_else(|| CliError::not_found("organization", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stack(name: &str, environment: &str) -> Stack {
        Stack {
            uid: format!("uid-{name}-{environment}"),
            name: name.to_string(),
            environment: environment.to_string(),
            account_name: "acme".into(),
            framework: String::new(),
            backend: String::new(),
            status: 1,
            is_cluster: false,
            is_inside_cluster: false,
            cluster_name: None,
            application_address: None,
            created_at: Utc::now(),
            last_activity: None,
        }
    }

    #[test]
    fn exact_match_wins_over_prefix() {
        let stacks = vec![stack("web", "production"), stack("web-admin", "production")];
        let found = resolve_stack(&stacks, "web", None).expect("exact match");
        assert_eq!(found.name, "web");
    }

    #[test]
    fn unique_prefix_matches() {
        let stacks = vec![stack("billing", "production"), stack("web", "production")];
        let found = resolve_stack(&stacks, "bil", None).expect("prefix match");
        assert_eq!(found.name, "billing");
    }

    #[test]
    fn ambiguous_prefix_is_rejected() {
        let stacks = vec![stack("web-a", "production"), stack("web-b", "production")];
        let err = resolve_stack(&stacks, "web", None).expect_err("ambiguous");
        match err {
            CliError::Ambiguous(name, matches) => {
                assert_eq!(name, "web");
                assert!(matches.contains("web-a"));
                assert!(matches.contains("web-b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unique_substring_matches_last() {
        let stacks = vec![stack("acme-billing", "production"), stack("web", "production")];
        let found = resolve_stack(&stacks, "bill", None).expect("substring match");
        assert_eq!(found.name, "acme-billing");

        let stacks = vec![stack("acme-web", "production"), stack("old-web", "production")];
        let err = resolve_stack(&stacks, "web", None).expect_err("ambiguous substring");
        assert!(matches!(err, CliError::Ambiguous(..)));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let stacks = vec![stack("Web", "Production")];
        let found = resolve_stack(&stacks, "web", Some("production")).expect("should match");
        assert_eq!(found.name, "Web");
    }

    #[test]
    fn environment_narrows_candidates() {
        let stacks = vec![stack("web", "production"), stack("web", "staging")];
        let found = resolve_stack(&stacks, "web", Some("staging")).expect("should match");
        assert_eq!(found.environment, "staging");
    }

    #[test]
    fn environment_prefix_must_be_unique() {
        let stacks = vec![stack("web", "staging"), stack("web", "stress")];
        let err = resolve_stack(&stacks, "web", Some("st")).expect_err("ambiguous env");
        assert!(matches!(err, CliError::Ambiguous(..)));

        let found = resolve_stack(&stacks, "web", Some("sta")).expect("unique env prefix");
        assert_eq!(found.environment, "staging");
    }

    #[test]
    fn missing_stack_and_environment() {
        let stacks = vec![stack("web", "production")];
        assert!(matches!(
            resolve_stack(&stacks, "api", None),
            Err(CliError::NotFound { kind: "stack", .. })
        ));
        assert!(matches!(
            resolve_stack(&stacks, "web", Some("qa")),
            Err(CliError::NotFound { kind: "environment", .. })
        ));
    }

    #[test]
    fn duplicate_exact_names_are_ambiguous() {
        let stacks = vec![stack("web", "production"), stack("web", "staging")];
        let err = resolve_stack(&stacks, "web", None).expect_err("ambiguous");
        assert!(matches!(err, CliError::Ambiguous(..)));
    }

    #[test]
    fn org_resolution() {
        let accounts = vec![
            Account {
                id: 1,
                name: "Acme".into(),
                owner: None,
                current: true,
            },
            Account {
                id: 2,
                name: "Initech".into(),
                owner: Some("bill@initech.test".into()),
                current: false,
            },
        ];
        let org = resolve_org(&accounts, "initech").expect("should resolve");
        assert_eq!(org.id, 2);
        assert!(resolve_org(&accounts, "umbrella").is_err());
    }
}

//! Container service commands.

use std::io::Write;

use cumulo_api::{find_server, Client, ScaleTarget, Service, ServiceAction, Stack};

use crate::error::CliError;
use crate::output::{Message, OutputFormat, ServiceList, ServiceRow};

/// Service command executor.
pub struct ServiceCommand<'a> {
    client: &'a Client,
}

impl<'a> ServiceCommand<'a> {
    /// Create a new service command.
    #[must_use]
    pub const fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List the services of a stack, optionally limited to one server or
    /// one service.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not exist or the listing
    /// fails.
    pub async fn list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        server: Option<&str>,
        service: Option<&str>,
    ) -> Result<(), CliError> {
        let server_uid = self.resolve_server(stack, server).await?;
        let mut services = self.client.services(&stack.uid, server_uid.as_deref()).await?;
        if let Some(name) = service {
            services.retain(|s| s.name.eq_ignore_ascii_case(name));
            if services.is_empty() {
                return Err(CliError::not_found("service", name));
            }
        }
        services.sort_by(|a, b| a.name.cmp(&b.name));

        let list = ServiceList {
            services: services.iter().map(service_row).collect(),
        };
        format.write(writer, &list)
    }

    /// Show one service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service or server does not exist.
    pub async fn info<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        name: &str,
        server: Option<&str>,
    ) -> Result<(), CliError> {
        let server_uid = self.resolve_server(stack, server).await?;
        let service = self.client.service(&stack.uid, name, server_uid.as_deref()).await?;

        let list = ServiceList {
            services: vec![service_row(&service)],
        };
        format.write(writer, &list)
    }

    /// Run a lifecycle action against a service and wait for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails or does not finish in time.
    pub async fn action<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        name: &str,
        action: ServiceAction,
        server: Option<&str>,
    ) -> Result<(), CliError> {
        let server_uid = self.resolve_server(stack, server).await?;
        let queued = self
            .client
            .service_action(&stack.uid, name, action, server_uid.as_deref())
            .await?;

        format.write(writer, &Message::info(format!("Queued {action} of {name}...")))?;
        self.client.wait_for_action(&stack.uid, queued.id).await?;
        format.write(writer, &Message::success(format!("{name}: {action} finished")))
    }

    /// Scale a service to an absolute count or adjust it by a delta.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be parsed or the scaling
    /// action fails.
    pub async fn scale<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        name: &str,
        target: &str,
    ) -> Result<(), CliError> {
        let target = parse_scale_target(target)?;
        let queued = self.client.scale_service(&stack.uid, name, target).await?;

        format.write(writer, &Message::info(format!("Scaling {name}...")))?;
        self.client.wait_for_action(&stack.uid, queued.id).await?;
        format.write(writer, &Message::success(format!("{name} scaled")))
    }

    /// Turn a server name or address into a server uid.
    async fn resolve_server(&self, stack: &Stack, server: Option<&str>) -> Result<Option<String>, CliError> {
        let Some(name) = server else {
            return Ok(None);
        };
        let servers = self.client.servers(&stack.uid).await?;
        let server = find_server(&servers, name).ok_or_else(|| CliError::not_found("server", name))?;
        Ok(Some(server.uid.clone()))
    }
}

fn service_row(service: &Service) -> ServiceRow {
    let servers = service
        .server_container_counts()
        .into_iter()
        .map(|(server, count)| format!("{server} ({count})"))
        .collect::<Vec<_>>()
        .join(", ");
    ServiceRow {
        name: service.name.clone(),
        source_type: service.source_type.clone().unwrap_or_else(|| "n/a".into()),
        containers: service.containers.len(),
        servers,
    }
}

/// Parse a scale target: a bare number sets an absolute count, `[+N]`
/// and `[-N]` adjust the current count.
fn parse_scale_target(target: &str) -> Result<ScaleTarget, CliError> {
    let target = target.trim();

    if let Some(inner) = target.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let delta: i32 = inner
            .parse()
            .map_err(|_| CliError::InvalidArgument(format!("invalid scale delta: {target}")))?;
        if !inner.starts_with('+') && !inner.starts_with('-') {
            return Err(CliError::InvalidArgument(format!(
                "relative scale must be signed, got {target}"
            )));
        }
        return Ok(ScaleTarget::Relative(delta));
    }

    let count: u32 = target
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("invalid scale target: {target}")))?;
    Ok(ScaleTarget::Absolute(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_target() {
        assert_eq!(parse_scale_target("3").expect("parses"), ScaleTarget::Absolute(3));
        assert_eq!(parse_scale_target(" 0 ").expect("parses"), ScaleTarget::Absolute(0));
    }

    #[test]
    fn parses_relative_targets() {
        assert_eq!(parse_scale_target("[+2]").expect("parses"), ScaleTarget::Relative(2));
        assert_eq!(parse_scale_target("[-1]").expect("parses"), ScaleTarget::Relative(-1));
    }

    #[test]
    fn rejects_unsigned_relative_target() {
        assert!(parse_scale_target("[2]").is_err());
    }

    #[test]
    fn rejects_garbage_targets() {
        assert!(parse_scale_target("lots").is_err());
        assert!(parse_scale_target("[+two]").is_err());
        assert!(parse_scale_target("-3").is_err());
    }

    #[test]
    fn service_row_formats_server_counts() {
        let service: Service = serde_json::from_str(
            r#"{
                "name": "web",
                "source_type": "git",
                "containers": [
                    {"uid": "c1", "server_name": "orca", "server_uid": "s1"},
                    {"uid": "c2", "server_name": "orca", "server_uid": "s1"},
                    {"uid": "c3", "server_name": "beluga", "server_uid": "s2"}
                ]
            }"#,
        )
        .expect("valid service");

        let row = service_row(&service);
        assert_eq!(row.containers, 3);
        assert_eq!(row.servers, "beluga (1), orca (2)");
        assert_eq!(row.source_type, "git");
    }

    #[test]
    fn service_row_without_source_type() {
        let service: Service =
            serde_json::from_str(r#"{"name": "web"}"#).expect("valid service");
        let row = service_row(&service);
        assert_eq!(row.source_type, "n/a");
        assert_eq!(row.servers, "");
    }
}

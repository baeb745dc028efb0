//! HTTP client for the control plane REST API.

use std::time::Duration;

use reqwest::{Method, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::account::Account;
use crate::async_action::AsyncAction;
use crate::config_file::{ConfigFile, ConfigFileVersion};
use crate::env_var::EnvVar;
use crate::error::{ApiError, ApiResult};
use crate::formation::{BaseTemplate, Formation, HelmRelease, Policy, Stencil, StencilGroup, Transformation};
use crate::render::Renders;
use crate::server::Server;
use crate::service::{ScaleTarget, Service, ServiceAction};
use crate::snapshot::Snapshot;
use crate::ssl::SslCertificate;
use crate::stack::Stack;

/// Request timeout for individual API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How often an asynchronous action is polled.
const ACTION_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long to poll an asynchronous action before giving up.
const ACTION_POLL_DEADLINE: Duration = Duration::from_secs(600);

/// How often a pending base template repository is re-checked.
const BTR_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// All successful responses arrive wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

/// Error body returned by the server on failed requests.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Body of a configuration file download.
#[derive(Debug, Deserialize)]
struct ConfigFileBody {
    #[serde(default)]
    body: String,
}

/// A deployment workflow document fetched from the server.
///
/// The workflow itself is kept opaque here; `cumulo-workflow` parses and
/// runs it.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowDocument {
    /// The raw workflow definition.
    pub workflow: serde_json::Value,
}

/// Options for queuing a redeployment.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RedeployOptions {
    /// Git reference to deploy instead of the stack's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Restrict the deployment to these services.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    /// Deployment strategy (serial, parallel, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_strategy: Option<String>,
    /// Named deployment profile configured on the stack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_profile: Option<String>,
}

/// A plain ok/message reply used by a few fire-and-forget endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationResponse {
    /// Whether the operation was accepted.
    #[serde(default)]
    pub ok: bool,
    /// Server-provided message.
    #[serde(default)]
    pub message: String,
}

/// Typed client for the control plane API.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
    account_id: Option<i64>,
}

impl Client {
    /// Creates a client for the given API base URL and access token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BaseUrl`] if the URL cannot be parsed and
    /// [`ApiError::Transport`] if the underlying HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> ApiResult<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&trimmed).map_err(|e| ApiError::BaseUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("cumulo/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: trimmed,
            token: token.into(),
            account_id: None,
        })
    }

    /// Scopes subsequent requests to the given organization account.
    #[must_use]
    pub fn with_account(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> ApiResult<T> {
        debug!(%method, path, "api request");
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self
            .http
            .request(method, &url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json");
        if let Some(account_id) = self.account_id {
            req = req.query(&[("account_id", account_id)]);
        }
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ApiError::decode("response body", e))?;
        Ok(envelope.response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        self.request(Method::GET, path, query, None).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> ApiResult<T> {
        self.request(Method::POST, path, &[], Some(&body)).await
    }

    async fn put<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> ApiResult<T> {
        self.request(Method::PUT, path, &[], Some(&body)).await
    }

    // Accounts

    /// Organization accounts the token has access to.
    pub async fn accounts(&self) -> ApiResult<Vec<Account>> {
        self.get("accounts.json", &[]).await
    }

    // Stacks

    /// All stacks visible to the token, optionally filtered by environment
    /// prefix on the server.
    pub async fn stacks(&self, environment: Option<&str>) -> ApiResult<Vec<Stack>> {
        let mut query = Vec::new();
        if let Some(env) = environment {
            query.push(("environment", env.to_string()));
        }
        self.get("stacks.json", &query).await
    }

    /// A single stack by uid.
    pub async fn stack(&self, uid: &str) -> ApiResult<Stack> {
        self.get(&format!("stacks/{uid}.json"), &[]).await
    }

    /// A single stack by exact name, disambiguated by environment when
    /// given.
    pub async fn stack_by_name(&self, name: &str, environment: Option<&str>) -> ApiResult<Stack> {
        let mut query = vec![("name", name.to_string())];
        if let Some(env) = environment {
            query.push(("environment", env.to_string()));
        }
        let stacks: Vec<Stack> = self.get("stacks.json", &query).await?;
        stacks
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("stack", name))
    }

    /// Creates a new stack and returns it in its queued state.
    pub async fn create_stack(
        &self,
        name: &str,
        environment: &str,
        service_yaml: Option<&str>,
        manifest_yaml: Option<&str>,
    ) -> ApiResult<Stack> {
        let body = serde_json::json!({
            "name": name,
            "environment": environment,
            "service_yaml": service_yaml,
            "manifest_yaml": manifest_yaml,
        });
        self.post("stacks.json", body).await
    }

    /// Queues a redeployment of the stack.
    pub async fn redeploy(&self, uid: &str, options: &RedeployOptions) -> ApiResult<OperationResponse> {
        let body = serde_json::to_value(options).map_err(|e| ApiError::decode("redeploy options", e))?;
        self.post(&format!("stacks/{uid}/deployments.json"), body).await
    }

    /// Restarts all components of the stack.
    pub async fn restart(&self, uid: &str) -> ApiResult<OperationResponse> {
        self.post(
            &format!("stacks/{uid}/actions.json"),
            serde_json::json!({"command": "restart"}),
        )
        .await
    }

    /// Clears the stack's code caches.
    pub async fn clear_caches(&self, uid: &str) -> ApiResult<OperationResponse> {
        self.post(
            &format!("stacks/{uid}/actions.json"),
            serde_json::json!({"command": "clear_caches"}),
        )
        .await
    }

    /// Reboots servers of the stack.
    ///
    /// `group` selects which servers (web, db, all, ...) and `strategy`
    /// selects serial or parallel reboots.
    pub async fn reboot(&self, uid: &str, group: &str, strategy: &str) -> ApiResult<OperationResponse> {
        self.post(
            &format!("stacks/{uid}/actions.json"),
            serde_json::json!({"command": "reboot", "group": group, "strategy": strategy}),
        )
        .await
    }

    // Servers

    /// Servers provisioned for the stack.
    pub async fn servers(&self, stack_uid: &str) -> ApiResult<Vec<Server>> {
        self.get(&format!("stacks/{stack_uid}/servers.json"), &[]).await
    }

    // Services

    /// Container services of the stack, optionally limited to one server.
    pub async fn services(&self, stack_uid: &str, server_uid: Option<&str>) -> ApiResult<Vec<Service>> {
        let mut query = Vec::new();
        if let Some(server_uid) = server_uid {
            query.push(("server_uid", server_uid.to_string()));
        }
        self.get(&format!("stacks/{stack_uid}/services.json"), &query).await
    }

    /// A single service by name.
    pub async fn service(
        &self,
        stack_uid: &str,
        name: &str,
        server_uid: Option<&str>,
    ) -> ApiResult<Service> {
        let mut query = Vec::new();
        if let Some(server_uid) = server_uid {
            query.push(("server_uid", server_uid.to_string()));
        }
        self.get(&format!("stacks/{stack_uid}/services/{name}.json"), &query)
            .await
    }

    /// Invokes a lifecycle action on a service and returns the queued
    /// action record.
    pub async fn service_action(
        &self,
        stack_uid: &str,
        name: &str,
        action: ServiceAction,
        server_uid: Option<&str>,
    ) -> ApiResult<AsyncAction> {
        let body = serde_json::json!({
            "service_name": name,
            "command": action,
            "server_uid": server_uid,
        });
        self.post(&format!("stacks/{stack_uid}/services/{name}/actions.json"), body)
            .await
    }

    /// Scales a service to an absolute or relative container count.
    pub async fn scale_service(
        &self,
        stack_uid: &str,
        name: &str,
        target: ScaleTarget,
    ) -> ApiResult<AsyncAction> {
        self.post(
            &format!("stacks/{stack_uid}/services/{name}/scale.json"),
            target.to_body(),
        )
        .await
    }

    // Async actions

    /// Fetches the current state of an asynchronous action.
    pub async fn async_action(&self, stack_uid: &str, id: i64) -> ApiResult<AsyncAction> {
        self.get(&format!("stacks/{stack_uid}/actions/{id}.json"), &[]).await
    }

    /// Polls an asynchronous action until it finishes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ActionFailed`] when the action finishes
    /// unsuccessfully and [`ApiError::Timeout`] when it does not finish
    /// within the polling deadline.
    pub async fn wait_for_action(&self, stack_uid: &str, id: i64) -> ApiResult<AsyncAction> {
        let deadline = tokio::time::Instant::now() + ACTION_POLL_DEADLINE;
        loop {
            let action = self.async_action(stack_uid, id).await?;
            if action.is_finished() {
                if action.succeeded() {
                    return Ok(action);
                }
                return Err(ApiError::ActionFailed {
                    id,
                    message: action.message().to_string(),
                });
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ApiError::Timeout(format!("action {id}")));
            }
            tokio::time::sleep(ACTION_POLL_INTERVAL).await;
        }
    }

    // Environment variables

    /// Environment variables set on the stack.
    pub async fn env_vars(&self, stack_uid: &str) -> ApiResult<Vec<EnvVar>> {
        self.get(&format!("stacks/{stack_uid}/environments.json"), &[]).await
    }

    /// Adds a new environment variable and returns the queued action.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::DuplicateEnvVar`] if a variable with the same
    /// key already exists.
    pub async fn set_env_var(&self, stack_uid: &str, key: &str, value: &str) -> ApiResult<AsyncAction> {
        let body = serde_json::json!({"key": key, "value": value});
        let result: ApiResult<AsyncAction> = self
            .post(&format!("stacks/{stack_uid}/environments.json"), body)
            .await;
        match result {
            Err(ApiError::Api { status: 409, .. }) => Err(ApiError::DuplicateEnvVar(key.to_string())),
            other => other,
        }
    }

    // Snapshots

    /// Snapshots taken of the stack.
    pub async fn snapshots(&self, stack_uid: &str) -> ApiResult<Vec<Snapshot>> {
        self.get(&format!("stacks/{stack_uid}/snapshots.json"), &[]).await
    }

    /// Renders a formation against a snapshot on the server.
    ///
    /// `files` limits the render to the named stencils; empty means all.
    /// `use_latest` renders stencil HEADs instead of the snapshot's gitref.
    pub async fn render_snapshot(
        &self,
        stack_uid: &str,
        snapshot_uid: &str,
        formation_uid: &str,
        files: &[String],
        use_latest: bool,
        filter: Option<&str>,
    ) -> ApiResult<Renders> {
        let body = serde_json::json!({
            "formation_uid": formation_uid,
            "files": files,
            "use_latest": use_latest,
            "filter": filter,
        });
        self.post(
            &format!("stacks/{stack_uid}/snapshots/{snapshot_uid}/renders.json"),
            body,
        )
        .await
    }

    /// Renders a single stencil body against a snapshot, without saving it.
    pub async fn render_stencil(
        &self,
        stack_uid: &str,
        snapshot_uid: &str,
        formation_uid: &str,
        stencil_uid: &str,
        body: &str,
    ) -> ApiResult<Renders> {
        let body = serde_json::json!({
            "formation_uid": formation_uid,
            "stencil_uid": stencil_uid,
            "body": body,
        });
        self.post(
            &format!("stacks/{stack_uid}/snapshots/{snapshot_uid}/renders.json"),
            body,
        )
        .await
    }

    // Formations

    /// Formations of the stack. With `include_artifacts` the server returns
    /// stencil, policy and transformation bodies as well.
    pub async fn formations(&self, stack_uid: &str, include_artifacts: bool) -> ApiResult<Vec<Formation>> {
        let query = [("full", include_artifacts.to_string())];
        self.get(&format!("stacks/{stack_uid}/formations.json"), &query).await
    }

    /// Creates a formation drawing stencils from the given base template
    /// repositories.
    pub async fn create_formation(
        &self,
        stack_uid: &str,
        name: &str,
        base_templates: &[BaseTemplate],
        tags: &[String],
    ) -> ApiResult<Formation> {
        let body = serde_json::json!({
            "name": name,
            "base_templates": base_templates,
            "tags": tags,
        });
        self.post(&format!("stacks/{stack_uid}/formations.json"), body).await
    }

    /// Fetches the deployment workflow for a formation and snapshot.
    pub async fn workflow(
        &self,
        stack_uid: &str,
        formation_uid: &str,
        snapshot_uid: &str,
        use_latest: bool,
    ) -> ApiResult<WorkflowDocument> {
        let query = [
            ("snapshot_uid", snapshot_uid.to_string()),
            ("use_latest", use_latest.to_string()),
        ];
        self.get(
            &format!("stacks/{stack_uid}/formations/{formation_uid}/workflow.json"),
            &query,
        )
        .await
    }

    // Stencils and other formation artifacts

    /// Adds stencils to a formation under the given base template
    /// repository.
    pub async fn add_stencils(
        &self,
        stack_uid: &str,
        formation_uid: &str,
        btr_uid: &str,
        stencils: &[Stencil],
        message: &str,
    ) -> ApiResult<Vec<Stencil>> {
        let body = serde_json::json!({
            "base_template_uid": btr_uid,
            "stencils": stencils,
            "message": message,
        });
        self.post(
            &format!("stacks/{stack_uid}/formations/{formation_uid}/stencils.json"),
            body,
        )
        .await
    }

    /// Commits a new body for an existing stencil.
    pub async fn update_stencil(
        &self,
        stack_uid: &str,
        formation_uid: &str,
        stencil_uid: &str,
        message: &str,
        body: &str,
    ) -> ApiResult<Stencil> {
        let payload = serde_json::json!({"body": body, "message": message});
        self.put(
            &format!("stacks/{stack_uid}/formations/{formation_uid}/stencils/{stencil_uid}.json"),
            payload,
        )
        .await
    }

    /// Adds policies to a formation.
    pub async fn add_policies(
        &self,
        stack_uid: &str,
        formation_uid: &str,
        policies: &[Policy],
        message: &str,
    ) -> ApiResult<Vec<Policy>> {
        let body = serde_json::json!({"policies": policies, "message": message});
        self.post(
            &format!("stacks/{stack_uid}/formations/{formation_uid}/policies.json"),
            body,
        )
        .await
    }

    /// Adds transformations to a formation.
    pub async fn add_transformations(
        &self,
        stack_uid: &str,
        formation_uid: &str,
        transformations: &[Transformation],
        message: &str,
    ) -> ApiResult<Vec<Transformation>> {
        let body = serde_json::json!({"transformations": transformations, "message": message});
        self.post(
            &format!("stacks/{stack_uid}/formations/{formation_uid}/transformations.json"),
            body,
        )
        .await
    }

    /// Adds stencil groups to a formation.
    pub async fn add_stencil_groups(
        &self,
        stack_uid: &str,
        formation_uid: &str,
        groups: &[StencilGroup],
        message: &str,
    ) -> ApiResult<Vec<StencilGroup>> {
        let body = serde_json::json!({"stencil_groups": groups, "message": message});
        self.post(
            &format!("stacks/{stack_uid}/formations/{formation_uid}/stencil_groups.json"),
            body,
        )
        .await
    }

    /// Adds helm releases to a formation.
    pub async fn add_helm_releases(
        &self,
        stack_uid: &str,
        formation_uid: &str,
        releases: &[HelmRelease],
        message: &str,
    ) -> ApiResult<Vec<HelmRelease>> {
        let body = serde_json::json!({"helm_releases": releases, "message": message});
        self.post(
            &format!("stacks/{stack_uid}/formations/{formation_uid}/helm_releases.json"),
            body,
        )
        .await
    }

    // Base template repositories

    /// Base template repositories registered with the organization.
    pub async fn base_templates(&self) -> ApiResult<Vec<BaseTemplate>> {
        self.get("base_templates.json", &[]).await
    }

    /// Registers a new base template repository.
    pub async fn create_base_template(&self, template: &BaseTemplate) -> ApiResult<BaseTemplate> {
        let body = serde_json::to_value(template).map_err(|e| ApiError::decode("base template", e))?;
        self.post("base_templates.json", body).await
    }

    /// Waits until all of the given repositories settle (cloned or failed).
    pub async fn wait_for_base_templates(&self, uids: &[String]) -> ApiResult<()> {
        let deadline = tokio::time::Instant::now() + ACTION_POLL_DEADLINE;
        loop {
            let templates = self.base_templates().await?;
            let pending = templates
                .iter()
                .any(|bt| uids.contains(&bt.uid) && !bt.is_settled());
            if !pending {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ApiError::Timeout("base template verification".into()));
            }
            tokio::time::sleep(BTR_POLL_INTERVAL).await;
        }
    }

    // SSL certificates

    /// SSL certificates attached to the stack.
    pub async fn ssl_certificates(&self, stack_uid: &str) -> ApiResult<Vec<SslCertificate>> {
        self.get(&format!("stacks/{stack_uid}/ssl_certificates.json"), &[]).await
    }

    /// Attaches a new SSL certificate to the stack.
    pub async fn create_ssl_certificate(
        &self,
        stack_uid: &str,
        certificate: &SslCertificate,
    ) -> ApiResult<SslCertificate> {
        let body =
            serde_json::to_value(certificate).map_err(|e| ApiError::decode("ssl certificate", e))?;
        self.post(&format!("stacks/{stack_uid}/ssl_certificates.json"), body).await
    }

    /// Replaces an existing SSL certificate.
    pub async fn update_ssl_certificate(
        &self,
        stack_uid: &str,
        uuid: &str,
        certificate: &SslCertificate,
    ) -> ApiResult<SslCertificate> {
        let body =
            serde_json::to_value(certificate).map_err(|e| ApiError::decode("ssl certificate", e))?;
        self.put(&format!("stacks/{stack_uid}/ssl_certificates/{uuid}.json"), body)
            .await
    }

    // Configuration files

    /// Configuration file types available on the stack.
    pub async fn config_files(&self, stack_uid: &str) -> ApiResult<Vec<ConfigFile>> {
        self.get(&format!("stacks/{stack_uid}/configurations.json"), &[]).await
    }

    /// Version history of a configuration file.
    pub async fn config_file_versions(
        &self,
        stack_uid: &str,
        kind: &str,
    ) -> ApiResult<Vec<ConfigFileVersion>> {
        self.get(
            &format!("stacks/{stack_uid}/configurations/{kind}/versions.json"),
            &[],
        )
        .await
    }

    /// Downloads the body of a configuration file, at a specific version
    /// when given.
    pub async fn download_config_file(
        &self,
        stack_uid: &str,
        kind: &str,
        version: Option<&str>,
    ) -> ApiResult<String> {
        let mut query = Vec::new();
        if let Some(version) = version {
            query.push(("version", version.to_string()));
        }
        let body: ConfigFileBody = self
            .get(&format!("stacks/{stack_uid}/configurations/{kind}.json"), &query)
            .await?;
        Ok(body.body)
    }

    /// Uploads a new version of a configuration file. With `apply` the
    /// server applies it to the stack's servers immediately.
    pub async fn upload_config_file(
        &self,
        stack_uid: &str,
        kind: &str,
        content: &str,
        comments: Option<&str>,
        apply: bool,
    ) -> ApiResult<AsyncAction> {
        let body = serde_json::json!({
            "body": content,
            "comments": comments,
            "apply": apply,
        });
        self.post(&format!("stacks/{stack_uid}/configurations/{kind}.json"), body)
            .await
    }

    /// Applies the current version of a configuration file to the stack's
    /// servers.
    pub async fn apply_config_file(&self, stack_uid: &str, kind: &str) -> ApiResult<AsyncAction> {
        self.post(
            &format!("stacks/{stack_uid}/configurations/{kind}/apply.json"),
            serde_json::json!({}),
        )
        .await
    }
}

fn api_error(status: StatusCode, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let result = Client::new("not a url", "token");
        assert!(matches!(result, Err(ApiError::BaseUrl(_))));
    }

    #[test]
    fn strips_trailing_slash_from_base_url() {
        let client = Client::new("https://api.test/v3/", "token").expect("valid url");
        assert_eq!(client.base_url, "https://api.test/v3");
    }

    #[test]
    fn api_error_prefers_description() {
        let err = api_error(
            StatusCode::CONFLICT,
            r#"{"error": "conflict", "error_description": "variable exists"}"#,
        );
        assert_eq!(err.to_string(), "api error (409): variable exists");
    }

    #[test]
    fn api_error_falls_back_to_status_reason() {
        let err = api_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(err.to_string(), "api error (502): Bad Gateway");
    }

    #[test]
    fn envelope_unwraps_response() {
        let envelope: Envelope<Vec<String>> =
            serde_json::from_str(r#"{"response": ["a", "b"]}"#).expect("valid envelope");
        assert_eq!(envelope.response, vec!["a", "b"]);
    }

    #[test]
    fn redeploy_options_skip_empty_fields() {
        let options = RedeployOptions {
            git_ref: Some("main".into()),
            ..RedeployOptions::default()
        };
        let json = serde_json::to_value(&options).expect("serializes");
        assert_eq!(json["git_ref"], "main");
        assert!(json.get("services").is_none());
        assert!(json.get("deploy_strategy").is_none());
    }
}

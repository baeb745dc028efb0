//! Stack lifecycle commands.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use cumulo_api::{Client, ConfigFile, ConfigFileVersion, SslCertificate, Stack};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cli::{CertTypeArg, CreateStackArgs, RebootArgs, RedeployArgs, SslAddArgs};
use crate::error::CliError;
use crate::output::{CertificateInfo, ConfigFileList, ConfigFileRow, ConfigVersionList, ConfigVersionRow, Message, OutputFormat, StackList, StackRow};
use crate::prompt;

const LISTEN_POLL_INTERVAL: Duration = Duration::from_secs(5);
const LISTEN_DEADLINE: Duration = Duration::from_secs(1800);

/// How many named stacks are looked up at once.
const STACK_LOOKUP_CONCURRENCY: usize = 4;

/// Stack command executor.
pub struct StackCommand<'a> {
    client: &'a Client,
}

impl<'a> StackCommand<'a> {
    /// Create a new stack command.
    #[must_use]
    pub const fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List stacks. Without names the whole listing is shown; with names
    /// each named stack is fetched concurrently and the first failed
    /// lookup wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails or a name does not exist.
    pub async fn list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        names: &[String],
        environment: Option<&str>,
        wide: bool,
    ) -> Result<(), CliError> {
        let selected: Vec<Stack> = if names.is_empty() {
            let stacks = self.client.stacks(None).await?;
            match environment {
                Some(env) => stacks
                    .into_iter()
                    .filter(|s| s.environment.eq_ignore_ascii_case(env))
                    .collect(),
                None => stacks,
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(STACK_LOOKUP_CONCURRENCY));
            let mut lookups: JoinSet<Result<Stack, cumulo_api::ApiError>> = JoinSet::new();
            for name in names {
                let client = self.client.clone();
                let name = name.clone();
                let environment = environment.map(str::to_string);
                let semaphore = Arc::clone(&semaphore);
                lookups.spawn(async move {
                    // The semaphore is never closed, so acquire only fails
                    // when the whole set is being torn down.
                    let _permit = semaphore.acquire_owned().await;
                    client.stack_by_name(&name, environment.as_deref()).await
                });
            }

            let mut found = Vec::new();
            while let Some(joined) = lookups.join_next().await {
                let stack = joined.map_err(|e| CliError::Join(e.to_string()))??;
                found.push(stack);
            }
            dedupe_by_uid(found)
        };

        let list = StackList {
            stacks: stack_rows(&selected),
            wide,
        };
        format.write(writer, &list)
    }

    /// Create a new stack and follow it until the build settles.
    ///
    /// # Errors
    ///
    /// Returns an error if a yaml file cannot be read or the creation
    /// fails.
    pub async fn create<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &CreateStackArgs,
        environment: Option<&str>,
    ) -> Result<(), CliError> {
        let environment = environment.unwrap_or("production");
        let service_yaml = args.service_yaml.as_deref().map(fs::read_to_string).transpose()?;
        let manifest_yaml = args.manifest_yaml.as_deref().map(fs::read_to_string).transpose()?;

        let stack = self
            .client
            .create_stack(&args.name, environment, service_yaml.as_deref(), manifest_yaml.as_deref())
            .await?;

        format.write(
            writer,
            &Message::success(format!("Stack {} ({}) queued for build", stack.name, stack.uid)),
        )?;
        self.listen(writer, format, &stack.uid).await
    }

    /// Queue a redeployment, asking first on production stacks.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Aborted`] when the user declines the prompt.
    pub async fn redeploy<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &RedeployArgs,
    ) -> Result<(), CliError> {
        if stack.environment.eq_ignore_ascii_case("production") && !args.yes {
            let question = format!("Redeploy production stack {}?", stack.name);
            if !prompt::confirm(&question)? {
                return Err(CliError::Aborted);
            }
        }

        let options = cumulo_api::RedeployOptions {
            git_ref: args.git_ref.clone(),
            services: args.services.clone(),
            deploy_strategy: args.deploy_strategy.clone(),
            deployment_profile: args.deployment_profile.clone(),
        };
        let response = self.client.redeploy(&stack.uid, &options).await?;
        format.write(writer, &Message::success(response.message))?;

        if args.listen {
            self.listen(writer, format, &stack.uid).await?;
        }
        Ok(())
    }

    /// Restart all components of the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn restart<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
    ) -> Result<(), CliError> {
        let response = self.client.restart(&stack.uid).await?;
        format.write(writer, &Message::success(response.message))
    }

    /// Reboot servers of the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the group or strategy is invalid, or the API
    /// call fails.
    pub async fn reboot<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &RebootArgs,
    ) -> Result<(), CliError> {
        if !matches!(args.strategy.as_str(), "serial" | "parallel") {
            return Err(CliError::InvalidArgument(format!(
                "strategy must be serial or parallel, got {}",
                args.strategy
            )));
        }
        let response = self.client.reboot(&stack.uid, &args.group, &args.strategy).await?;
        format.write(writer, &Message::success(response.message))
    }

    /// Clear the stack's code caches.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn clear_caches<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
    ) -> Result<(), CliError> {
        let response = self.client.clear_caches(&stack.uid).await?;
        format.write(writer, &Message::success(response.message))
    }

    /// Follow a stack until its current deployment finishes.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Api`] with a timeout when the deployment does
    /// not settle within the listening deadline.
    pub async fn listen<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack_uid: &str,
    ) -> Result<(), CliError> {
        let deadline = tokio::time::Instant::now() + LISTEN_DEADLINE;
        let mut last_status = String::new();

        loop {
            let stack = self.client.stack(stack_uid).await?;
            let status = stack.status_text();
            if status != last_status {
                format.write(writer, &Message::info(format!("{}: {status}", stack.name)))?;
                last_status = status.to_string();
            }
            if !stack.is_deploying() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(cumulo_api::ApiError::Timeout(format!("deployment of {}", stack.name)).into());
            }
            tokio::time::sleep(LISTEN_POLL_INTERVAL).await;
        }
    }

    /// Add or replace the stack's SSL certificate.
    ///
    /// # Errors
    ///
    /// Returns an error when required arguments are missing, a PEM file
    /// cannot be read, or the stack already has a certificate and
    /// `--overwrite` was not given.
    pub async fn ssl_add<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &SslAddArgs,
    ) -> Result<(), CliError> {
        let certificate = certificate_from_args(args)?;

        let existing = self.client.ssl_certificates(&stack.uid).await?;
        let saved = match existing.first() {
            Some(current) if !args.overwrite => {
                return Err(CliError::InvalidArgument(format!(
                    "stack {} already has a certificate for {}; pass --overwrite to replace it",
                    stack.name, current.server_names
                )));
            }
            Some(current) => {
                let uuid = current.uuid.clone().ok_or_else(|| {
                    CliError::InvalidArgument("existing certificate has no uuid".into())
                })?;
                self.client.update_ssl_certificate(&stack.uid, &uuid, &certificate).await?
            }
            None => self.client.create_ssl_certificate(&stack.uid, &certificate).await?,
        };

        let info = CertificateInfo {
            uuid: saved.uuid.unwrap_or_default(),
            cert_type: saved.cert_type.to_string(),
            server_names: saved.server_names,
            status: saved.status.unwrap_or_else(|| "pending".into()),
            expires_at: saved.expires_at,
        };
        format.write(writer, &info)
    }

    /// List all versions of a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn config_versions<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        kind: &str,
    ) -> Result<(), CliError> {
        let versions = self.client.config_file_versions(&stack.uid, kind).await?;
        let list = ConfigVersionList {
            versions: versions.into_iter().map(config_version_row).collect(),
        };
        format.write(writer, &list)
    }

    /// Print or save a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or the local write fails.
    pub async fn config_download<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        kind: &str,
        version: Option<&str>,
        output: Option<&std::path::Path>,
    ) -> Result<(), CliError> {
        let content = self.client.download_config_file(&stack.uid, kind, version).await?;
        match output {
            Some(path) => {
                fs::write(path, &content)?;
                format.write(
                    writer,
                    &Message::success(format!("Saved {kind} to {}", path.display())),
                )
            }
            None => {
                writer.write_all(content.as_bytes())?;
                Ok(())
            }
        }
    }

    /// Upload a configuration file and optionally apply it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the upload fails, or
    /// applying it fails.
    pub async fn config_upload<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        kind: &str,
        source: &std::path::Path,
        comments: Option<&str>,
        apply: bool,
    ) -> Result<(), CliError> {
        let content = fs::read_to_string(source)?;
        let action = self
            .client
            .upload_config_file(&stack.uid, kind, &content, comments, apply)
            .await?;

        if apply {
            format.write(writer, &Message::info(format!("Applying {kind}...")))?;
            self.client.wait_for_action(&stack.uid, action.id).await?;
            format.write(writer, &Message::success(format!("{kind} uploaded and applied")))
        } else {
            format.write(writer, &Message::success(format!("{kind} uploaded")))
        }
    }

    /// List the configuration files available on the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn config_list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
    ) -> Result<(), CliError> {
        let files = self.client.config_files(&stack.uid).await?;
        let list = ConfigFileList {
            files: files.into_iter().map(config_file_row).collect(),
        };
        format.write(writer, &list)
    }

    /// Apply the current version of a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the apply action fails.
    pub async fn config_apply<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        kind: &str,
    ) -> Result<(), CliError> {
        let action = self.client.apply_config_file(&stack.uid, kind).await?;
        format.write(writer, &Message::info(format!("Applying {kind}...")))?;
        self.client.wait_for_action(&stack.uid, action.id).await?;
        format.write(writer, &Message::success(format!("{kind} applied")))
    }
}

/// Drops stacks whose uid was already seen, keeping the first.
fn dedupe_by_uid(stacks: Vec<Stack>) -> Vec<Stack> {
    let mut seen = HashSet::new();
    stacks.into_iter().filter(|s| seen.insert(s.uid.clone())).collect()
}

fn config_version_row(version: ConfigFileVersion) -> ConfigVersionRow {
    ConfigVersionRow {
        version: version.version,
        created_at: version.created_at,
        comments: version.comments.unwrap_or_default(),
    }
}

fn config_file_row(file: ConfigFile) -> ConfigFileRow {
    ConfigFileRow {
        kind: file.kind,
        updated_at: file.updated_at,
        comments: file.comments.unwrap_or_default(),
    }
}

/// Builds table rows from stacks, sorted by account then name.
fn stack_rows(stacks: &[Stack]) -> Vec<StackRow> {
    let mut rows: Vec<StackRow> = stacks
        .iter()
        .map(|s| StackRow {
            account: s.account_name.clone(),
            name: s.name.clone(),
            environment: s.display_environment().to_string(),
            stack_type: s.stack_type().to_string(),
            cluster_name: or_na(s.cluster_name.as_deref()),
            application_address: or_na(s.application_address.as_deref()),
            status: s.status_text().to_string(),
            last_activity: s.activity_at(),
        })
        .collect();
    rows.sort_by(|a, b| (&a.account, &a.name).cmp(&(&b.account, &b.name)));
    rows
}

fn or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "n/a".to_string(),
    }
}

/// Builds a certificate from the command line arguments, reading PEM
/// files for the manual type. Domains are required for lets_encrypt
/// only; manual certificates carry whatever the PEM files cover.
fn certificate_from_args(args: &SslAddArgs) -> Result<SslCertificate, CliError> {
    match args.cert_type {
        CertTypeArg::LetsEncrypt => {
            let domains = args
                .domains
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| {
                    CliError::InvalidArgument("--domains is required for lets_encrypt certificates".into())
                })?;
            Ok(SslCertificate::lets_encrypt(domains))
        }
        CertTypeArg::Manual => {
            let domains = args.domains.as_deref().unwrap_or("");
            let cert_path = args
                .cert
                .as_deref()
                .ok_or_else(|| CliError::InvalidArgument("--cert is required for manual certificates".into()))?;
            let key_path = args
                .key
                .as_deref()
                .ok_or_else(|| CliError::InvalidArgument("--key is required for manual certificates".into()))?;

            let cert = fs::read_to_string(cert_path)?;
            let key = fs::read_to_string(key_path)?;
            let intermediate = args.intermediate.as_deref().map(fs::read_to_string).transpose()?;

            Ok(SslCertificate::manual(domains, cert, key, intermediate))
        }
    }
}

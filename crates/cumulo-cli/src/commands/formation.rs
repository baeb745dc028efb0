//! Formation, stencil and bundle commands.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use cumulo_api::formation::sort_by_sequence;
use cumulo_api::{
    BaseTemplate, BundleManifest, Client, Formation, HelmRelease, Policy, Stack, Stencil,
    StencilGroup, Transformation,
};
use cumulo_workflow::{Runner, RunnerOptions, StepStatus, Workflow};
use tracing::warn;

use crate::bundle::{read_bundle, with_bundle_extension, write_bundle, BundleContents};
use crate::cli::{
    BundleDownloadArgs, BundleUploadArgs, CommitFormationArgs, CreateFormationArgs,
    DeployFormationArgs, FetchFormationArgs, StencilAddArgs, StencilRenderArgs,
};
use crate::commands::snapshot::SnapshotCommand;
use crate::error::CliError;
use crate::output::{FormationList, FormationRow, Message, OutputFormat, StencilList, StencilRow};
use crate::prompt;

const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Formation command executor.
pub struct FormationCommand<'a> {
    client: &'a Client,
}

impl<'a> FormationCommand<'a> {
    /// Create a new formation command.
    #[must_use]
    pub const fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List formations, narrowed to names when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        names: &[String],
    ) -> Result<(), CliError> {
        let mut formations = self.client.formations(&stack.uid, false).await?;
        if !names.is_empty() {
            formations.retain(|f| names.iter().any(|n| f.name.eq_ignore_ascii_case(n)));
        }
        formations.sort_by(|a, b| a.name.cmp(&b.name));

        let list = FormationList {
            formations: formations
                .iter()
                .map(|f| FormationRow {
                    uid: f.uid.clone(),
                    name: f.name.clone(),
                    tags: f.tags.join(","),
                    stencils: f.stencils.len(),
                    policies: f.policies.len(),
                    base_templates: f
                        .base_templates
                        .iter()
                        .map(|bt| bt.git_repo.clone())
                        .collect::<Vec<_>>()
                        .join(","),
                    created_at: f.created_at,
                })
                .collect(),
        };
        format.write(writer, &list)
    }

    /// Create a formation drawing stencils from a base template
    /// repository, registering the repository first when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be cloned or the
    /// creation fails.
    pub async fn create<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &CreateFormationArgs,
    ) -> Result<(), CliError> {
        let template = self
            .ensure_base_template(writer, format, &args.template_repo, &args.template_branch)
            .await?;

        let formation = self
            .client
            .create_formation(&stack.uid, &args.name, &[template], &args.tags)
            .await?;
        format.write(
            writer,
            &Message::success(format!("Formation {} ({}) created", formation.name, formation.uid)),
        )
    }

    /// Download a formation's stencils into a local directory.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Aborted`] when files would be overwritten and
    /// the user declines.
    pub async fn fetch<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &FetchFormationArgs,
    ) -> Result<(), CliError> {
        let formation = self.full_formation(stack, &args.formation).await?;
        let outdir = args
            .outdir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&formation.name));

        let mut stencils = formation.stencils;
        sort_by_sequence(&mut stencils);

        if !args.overwrite {
            let existing: Vec<&str> = stencils
                .iter()
                .filter(|s| outdir.join(&s.filename).exists())
                .map(|s| s.filename.as_str())
                .collect();
            if !existing.is_empty() {
                let question = format!(
                    "{} file(s) already exist in {} ({}). Overwrite?",
                    existing.len(),
                    outdir.display(),
                    existing.join(", ")
                );
                if !prompt::confirm(&question)? {
                    return Err(CliError::Aborted);
                }
            }
        }

        fs::create_dir_all(&outdir)?;
        for stencil in &stencils {
            fs::write(outdir.join(&stencil.filename), &stencil.body)?;
        }

        format.write(
            writer,
            &Message::success(format!(
                "Fetched {} stencil(s) into {}",
                stencils.len(),
                outdir.display()
            )),
        )
    }

    /// Commit locally edited stencil files back to the formation.
    ///
    /// With `--stencil` only that file is committed; otherwise every
    /// stencil found in the directory is considered. Only files whose
    /// content differs from the server-side body are uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error if a stencil update fails or `--stencil` names a
    /// file the formation does not have.
    pub async fn commit<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &CommitFormationArgs,
    ) -> Result<(), CliError> {
        let formation = self.full_formation(stack, &args.formation).await?;

        if let Some(path) = args.stencil.as_deref() {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| CliError::InvalidArgument(format!("invalid file name: {}", path.display())))?;
            let stencil = formation
                .stencil_by_filename(filename)
                .ok_or_else(|| CliError::not_found("stencil", filename))?;
            let local = fs::read_to_string(path)?;
            self.client
                .update_stencil(&stack.uid, &formation.uid, &stencil.uid, &args.message, &local)
                .await?;
            return format.write(
                writer,
                &Message::success(format!("Committed {filename} to {}", formation.name)),
            );
        }

        let dir = args.dir.clone().unwrap_or_else(|| PathBuf::from(&formation.name));

        let mut updated = 0usize;
        for stencil in &formation.stencils {
            let path = dir.join(&stencil.filename);
            if !path.exists() {
                continue;
            }
            let local = fs::read_to_string(&path)?;
            if local == stencil.body {
                continue;
            }
            self.client
                .update_stencil(&stack.uid, &formation.uid, &stencil.uid, &args.message, &local)
                .await?;
            format.write(writer, &Message::info(format!("Updated {}", stencil.filename)))?;
            updated += 1;
        }

        format.write(
            writer,
            &Message::success(format!("Committed {updated} stencil(s) to {}", formation.name)),
        )
    }

    /// Deploy a formation by fetching its workflow and running it
    /// locally.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Deploy`] when any workflow step fails.
    pub async fn deploy<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &DeployFormationArgs,
    ) -> Result<(), CliError> {
        let snapshots = SnapshotCommand::new(self.client);
        let formation = snapshots.resolve_formation(stack, &args.formation).await?;
        let snapshot_uid = args.snapshot.clone().unwrap_or_else(|| "latest".to_string());
        let snapshot = snapshots.resolve_snapshot(stack, &snapshot_uid).await?;

        let document = self
            .client
            .workflow(&stack.uid, &formation.uid, &snapshot.uid, !args.no_latest)
            .await?;
        let workflow = Workflow::from_value(document.workflow)?;

        format.write(
            writer,
            &Message::info(format!(
                "Deploying {} against snapshot {} ({} step(s))",
                formation.name,
                snapshot.uid,
                workflow.steps.len()
            )),
        )?;

        let report = Runner::new(RunnerOptions::default()).run(&workflow).await?;

        for outcome in &report.outcomes {
            let status = match &outcome.status {
                StepStatus::Succeeded => "ok".to_string(),
                StepStatus::Failed { exit_code } => match exit_code {
                    Some(code) => format!("failed (exit {code})"),
                    None => "failed".to_string(),
                },
                StepStatus::TimedOut => "timed out".to_string(),
                StepStatus::Skipped => "skipped".to_string(),
            };
            format.write(writer, &Message::info(format!("{}: {status}", outcome.name)))?;
            if args.debug {
                if !outcome.stdout.is_empty() {
                    writer.write_all(outcome.stdout.as_bytes())?;
                }
                if !outcome.stderr.is_empty() {
                    writer.write_all(outcome.stderr.as_bytes())?;
                }
            }
        }

        let failures = report.failures();
        if failures.is_empty() {
            format.write(writer, &Message::success(format!("{} deployed", formation.name)))
        } else {
            let names: Vec<&str> = failures.iter().map(|o| o.name.as_str()).collect();
            Err(CliError::Deploy(format!("{} step(s) failed: {}", names.len(), names.join(", "))))
        }
    }

    /// Save a formation as a portable bundle file.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle file already exists and
    /// `--overwrite` was not given.
    pub async fn bundle_download<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &BundleDownloadArgs,
    ) -> Result<(), CliError> {
        let formation = self.full_formation(stack, &args.formation).await?;

        let path = args
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&formation.name));
        let path = with_bundle_extension(&path);
        if path.exists() && !args.overwrite {
            return Err(CliError::InvalidArgument(format!(
                "{} already exists; pass --overwrite to replace it",
                path.display()
            )));
        }

        let vars = self.client.env_vars(&stack.uid).await?;
        let formation_vars: String = vars
            .iter()
            .filter(|v| !v.readonly)
            .filter_map(|v| v.value_str().map(|value| format!("{}={value}\n", v.key)))
            .collect();

        let configurations = if formation_vars.is_empty() {
            Vec::new()
        } else {
            vec!["formation-vars".to_string()]
        };
        let manifest = BundleManifest::from_formation(
            &formation,
            concat!("cumulo (", env!("CARGO_PKG_VERSION"), ")"),
            configurations,
        );

        let mut contents = BundleContents::new(manifest);
        for stencil in &formation.stencils {
            contents.stencils.insert(stencil.filename.clone(), stencil.body.clone());
        }
        for group in &formation.stencil_groups {
            contents.stencil_groups.insert(group.uid.clone(), group.rules.clone());
        }
        for policy in &formation.policies {
            contents.policies.insert(policy.uid.clone(), policy.body.clone());
        }
        for transformation in &formation.transformations {
            contents
                .transformations
                .insert(transformation.uid.clone(), transformation.body.clone());
        }
        for release in &formation.helm_releases {
            contents
                .helm_values
                .insert(format!("{}-values.yml", release.chart_name), release.body.clone());
        }
        if !formation_vars.is_empty() {
            contents.configurations.insert("formation-vars".into(), formation_vars);
        }

        write_bundle(&path, &contents)?;
        format.write(
            writer,
            &Message::success(format!("Saved {} to {}", formation.name, path.display())),
        )
    }

    /// Recreate a formation from a bundle file.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced base template repository cannot
    /// be cloned or any artifact upload fails.
    pub async fn bundle_upload<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &BundleUploadArgs,
    ) -> Result<(), CliError> {
        let path = args
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&args.formation));
        let path = with_bundle_extension(&path);
        let contents = read_bundle(&path)?;
        let manifest = &contents.manifest;

        let mut templates = Vec::with_capacity(manifest.base_templates.len());
        for entry in &manifest.base_templates {
            let template = self
                .ensure_base_template(writer, format, &entry.repo, &entry.branch)
                .await?;
            templates.push(template);
        }

        let formation = self
            .client
            .create_formation(&stack.uid, &args.formation, &templates, &manifest.tags)
            .await?;
        format.write(
            writer,
            &Message::info(format!("Formation {} ({}) created", formation.name, formation.uid)),
        )?;

        for (entry, template) in manifest.base_templates.iter().zip(&templates) {
            if entry.stencils.is_empty() {
                continue;
            }
            let stencils = bundle_stencils(entry, &contents.stencils)?;
            self.client
                .add_stencils(&stack.uid, &formation.uid, &template.uid, &stencils, &args.message)
                .await?;
            format.write(
                writer,
                &Message::info(format!("Uploaded {} stencil(s) from {}", stencils.len(), entry.repo)),
            )?;
        }

        if !manifest.policies.is_empty() {
            let policies: Vec<Policy> = manifest
                .policies
                .iter()
                .map(|item| {
                    Ok(Policy {
                        uid: String::new(),
                        name: item.name.clone(),
                        body: bundle_body(&contents.policies, &item.uid, "policy")?,
                        tags: item.tags.clone(),
                    })
                })
                .collect::<Result<_, CliError>>()?;
            self.client
                .add_policies(&stack.uid, &formation.uid, &policies, &args.message)
                .await?;
        }

        if !manifest.transformations.is_empty() {
            let transformations: Vec<Transformation> = manifest
                .transformations
                .iter()
                .map(|item| {
                    Ok(Transformation {
                        uid: String::new(),
                        name: item.name.clone(),
                        body: bundle_body(&contents.transformations, &item.uid, "transformation")?,
                        tags: item.tags.clone(),
                    })
                })
                .collect::<Result<_, CliError>>()?;
            self.client
                .add_transformations(&stack.uid, &formation.uid, &transformations, &args.message)
                .await?;
        }

        if !manifest.stencil_groups.is_empty() {
            let groups: Vec<StencilGroup> = manifest
                .stencil_groups
                .iter()
                .map(|item| {
                    Ok(StencilGroup {
                        uid: String::new(),
                        name: item.name.clone(),
                        rules: bundle_body(&contents.stencil_groups, &item.uid, "stencil group")?,
                    })
                })
                .collect::<Result<_, CliError>>()?;
            self.client
                .add_stencil_groups(&stack.uid, &formation.uid, &groups, &args.message)
                .await?;
        }

        if !manifest.helm_releases.is_empty() {
            let releases: Vec<HelmRelease> = manifest
                .helm_releases
                .iter()
                .map(|entry| {
                    Ok(HelmRelease {
                        uid: String::new(),
                        chart_name: entry.chart_name.clone(),
                        version: entry.version.clone(),
                        repository_url: entry.repository_url.clone(),
                        display_name: entry.display_name.clone(),
                        body: bundle_body(&contents.helm_values, &entry.values_file, "helm values")?,
                    })
                })
                .collect::<Result<_, CliError>>()?;
            self.client
                .add_helm_releases(&stack.uid, &formation.uid, &releases, &args.message)
                .await?;
        }

        for name in &manifest.configurations {
            let Some(content) = contents.configurations.get(name) else {
                continue;
            };
            for (key, value) in cumulo_api::env_var::parse_env_lines(content) {
                match self.client.set_env_var(&stack.uid, &key, &value).await {
                    Ok(action) => {
                        self.client.wait_for_action(&stack.uid, action.id).await?;
                    }
                    Err(cumulo_api::ApiError::DuplicateEnvVar(key)) => {
                        warn!(key = %key, "environment variable already set, skipping");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        format.write(
            writer,
            &Message::success(format!("Restored {} from {}", formation.name, path.display())),
        )
    }

    /// List the stencils of a formation in render order.
    ///
    /// # Errors
    ///
    /// Returns an error if the formation does not exist.
    pub async fn stencils_list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        formation_name: &str,
        wide: bool,
    ) -> Result<(), CliError> {
        let formation = self.full_formation(stack, formation_name).await?;
        let mut stencils = formation.stencils;
        sort_by_sequence(&mut stencils);

        let list = StencilList {
            stencils: stencils
                .iter()
                .map(|s| StencilRow {
                    uid: s.uid.clone(),
                    filename: s.filename.clone(),
                    context: s.context_id.clone(),
                    template: s.template_filename.clone(),
                    tags: s.tags.join(","),
                    sequence: s.sequence,
                })
                .collect(),
            wide,
        };
        format.write(writer, &list)
    }

    /// Print the body of one stencil.
    ///
    /// # Errors
    ///
    /// Returns an error if the stencil does not exist.
    pub async fn stencil_show<W: Write>(
        &self,
        writer: &mut W,
        stack: &Stack,
        formation_name: &str,
        name: &str,
    ) -> Result<(), CliError> {
        let formation = self.full_formation(stack, formation_name).await?;
        let stencil = formation
            .stencil_by_filename(name)
            .ok_or_else(|| CliError::not_found("stencil", name))?;
        writer.write_all(stencil.body.as_bytes())?;
        Ok(())
    }

    /// Render a single stencil against a snapshot, optionally re-rendering
    /// whenever a local file changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the stencil does not exist, `--watch` is given
    /// without `--file`, or a render fails.
    pub async fn stencil_render<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &StencilRenderArgs,
    ) -> Result<(), CliError> {
        if args.watch && args.file.is_none() {
            return Err(CliError::InvalidArgument("--watch requires --file".into()));
        }

        let formation = self.full_formation(stack, &args.formation).await?;
        let stencil = formation
            .stencil_by_filename(&args.name)
            .ok_or_else(|| CliError::not_found("stencil", &args.name))?;
        let snapshot = SnapshotCommand::new(self.client)
            .resolve_snapshot(stack, &args.snapshot)
            .await?;

        let body = match args.file.as_deref() {
            Some(path) => fs::read_to_string(path)?,
            None => stencil.body.clone(),
        };
        self.render_stencil_once(writer, format, stack, &formation, stencil, &snapshot.uid, &body, args)
            .await?;

        if !args.watch {
            return Ok(());
        }

        // Re-render whenever the local file's mtime moves.
        let path = args.file.as_deref().ok_or_else(|| {
            CliError::InvalidArgument("--watch requires --file".into())
        })?;
        let mut last_modified = modified_at(path)?;
        format.write(writer, &Message::info(format!("Watching {}...", path.display())))?;

        loop {
            tokio::time::sleep(WATCH_POLL_INTERVAL).await;
            let modified = modified_at(path)?;
            if modified == last_modified {
                continue;
            }
            last_modified = modified;
            let body = fs::read_to_string(path)?;
            self.render_stencil_once(writer, format, stack, &formation, stencil, &snapshot.uid, &body, args)
                .await?;
        }
    }

    /// Add a stencil to a formation from a local file.
    ///
    /// # Errors
    ///
    /// Returns an error if the formation has no base template repository
    /// or the upload fails.
    pub async fn stencil_add<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &StencilAddArgs,
    ) -> Result<(), CliError> {
        let formation = self.full_formation(stack, &args.formation).await?;
        let template = formation.base_templates.first().ok_or_else(|| {
            CliError::InvalidArgument(format!(
                "formation {} has no base template repository",
                formation.name
            ))
        })?;

        let filename = args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CliError::InvalidArgument(format!("invalid file name: {}", args.file.display())))?
            .to_string();
        let body = fs::read_to_string(&args.file)?;

        let stencil = Stencil {
            uid: String::new(),
            filename: filename.clone(),
            template_filename: args.template.clone(),
            context_id: args.context.clone(),
            body,
            tags: Vec::new(),
            sequence: args.sequence,
            gitfile_path: None,
            inline: true,
            created_at: None,
            updated_at: None,
        };
        self.client
            .add_stencils(&stack.uid, &formation.uid, &template.uid, &[stencil], &args.message)
            .await?;

        format.write(
            writer,
            &Message::success(format!("Added {filename} to {}", formation.name)),
        )
    }

    async fn render_stencil_once<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        formation: &Formation,
        stencil: &Stencil,
        snapshot_uid: &str,
        body: &str,
        args: &StencilRenderArgs,
    ) -> Result<(), CliError> {
        let renders = self
            .client
            .render_stencil(&stack.uid, snapshot_uid, &formation.uid, &stencil.uid, body)
            .await?;

        let rendered = renders
            .stencils
            .first()
            .ok_or_else(|| CliError::not_found("rendered stencil", &args.name))?;

        // Issues go to stderr so piped render output stays clean.
        let mut stderr = std::io::stderr().lock();
        for issue in rendered.errors.iter().chain(&rendered.warnings) {
            writeln!(stderr, "[{}] {}", issue.stencil, issue.text)?;
        }
        drop(stderr);

        match args.output.as_deref() {
            Some(path) => {
                fs::write(path, &rendered.content)?;
                format.write(writer, &Message::success(format!("Saved render to {}", path.display())))
            }
            None => {
                writer.write_all(rendered.content.as_bytes())?;
                if !rendered.content.ends_with('\n') {
                    writeln!(writer)?;
                }
                Ok(())
            }
        }
    }

    /// Fetch a formation with all of its artifacts.
    async fn full_formation(&self, stack: &Stack, name: &str) -> Result<Formation, CliError> {
        let formations = self.client.formations(&stack.uid, true).await?;
        formations
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CliError::not_found("formation", name))
    }

    /// Find an available base template repository for repo and branch, or
    /// register it and wait for the server to clone it.
    async fn ensure_base_template<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        repo: &str,
        branch: &str,
    ) -> Result<BaseTemplate, CliError> {
        let templates = self.client.base_templates().await?;
        if let Some(existing) = templates.iter().find(|bt| bt.matches(repo, branch) && bt.is_available()) {
            return Ok(existing.clone());
        }

        let request = BaseTemplate {
            uid: String::new(),
            name: template_name(repo),
            git_repo: repo.to_string(),
            git_branch: branch.to_string(),
            status_code: 0,
        };
        let created = self.client.create_base_template(&request).await?;
        format.write(
            writer,
            &Message::info(format!("Cloning {repo} ({branch})...")),
        )?;
        self.client.wait_for_base_templates(&[created.uid.clone()]).await?;

        let templates = self.client.base_templates().await?;
        let settled = templates
            .into_iter()
            .find(|bt| bt.uid == created.uid)
            .ok_or_else(|| CliError::not_found("base template", repo))?;
        if !settled.is_available() {
            return Err(CliError::InvalidArgument(format!(
                "base template {repo} ({branch}) could not be cloned"
            )));
        }
        Ok(settled)
    }
}

/// Derive a repository name from its git URL.
fn template_name(repo: &str) -> String {
    let tail = repo
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repo);
    tail.trim_end_matches(".git").to_string()
}

/// Build the stencils for one base template entry, pulling bodies from
/// the bundle contents.
fn bundle_stencils(
    entry: &cumulo_api::BundleBaseTemplate,
    bodies: &BTreeMap<String, String>,
) -> Result<Vec<Stencil>, CliError> {
    entry
        .stencils
        .iter()
        .map(|s| {
            let body = bodies
                .get(&s.filename)
                .ok_or_else(|| CliError::Bundle(format!("bundle is missing stencil body {}", s.filename)))?
                .clone();
            Ok(Stencil {
                uid: String::new(),
                filename: s.filename.clone(),
                template_filename: s.template_filename.clone(),
                context_id: s.context_id.clone(),
                body,
                tags: s.tags.clone(),
                sequence: s.sequence,
                gitfile_path: None,
                inline: true,
                created_at: None,
                updated_at: None,
            })
        })
        .collect()
}

fn bundle_body(bodies: &BTreeMap<String, String>, key: &str, kind: &str) -> Result<String, CliError> {
    bodies
        .get(key)
        .cloned()
        .ok_or_else(|| CliError::Bundle(format!("bundle is missing {kind} {key}")))
}

fn modified_at(path: &Path) -> Result<SystemTime, CliError> {
    Ok(fs::metadata(path)?.modified()?)
}

//! Snapshot commands.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use cumulo_api::{Client, Formation, Renders, Snapshot, Stack};

use crate::cli::RenderArgs;
use crate::error::CliError;
use crate::output::{Message, OutputFormat, SnapshotList, SnapshotRow};
use crate::resolver;

/// Snapshot command executor.
pub struct SnapshotCommand<'a> {
    client: &'a Client,
}

impl<'a> SnapshotCommand<'a> {
    /// Create a new snapshot command.
    #[must_use]
    pub const fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List snapshots, newest first, narrowed to uids when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        uids: &[String],
    ) -> Result<(), CliError> {
        let mut snapshots = self.client.snapshots(&stack.uid).await?;
        cumulo_api::snapshot::sort_newest_first(&mut snapshots);

        if !uids.is_empty() {
            snapshots.retain(|s| uids.contains(&s.uid));
        }

        let list = SnapshotList {
            snapshots: snapshots
                .into_iter()
                .map(|s| SnapshotRow {
                    uid: s.uid,
                    action: s.action,
                    triggered_by: s.triggered_by,
                    triggered_at: s.triggered_at,
                })
                .collect(),
        };
        format.write(writer, &list)
    }

    /// Render a formation against a snapshot.
    ///
    /// Rendered files go to `--outdir` when given, each prefixed with its
    /// render order, or to the writer as one concatenated document.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::RenderErrors`] when the render reports errors
    /// and `--ignore-errors` was not given.
    pub async fn render<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        stack: &Stack,
        args: &RenderArgs,
    ) -> Result<(), CliError> {
        let formation = self.resolve_formation(stack, &args.formation).await?;
        let snapshot = self.resolve_snapshot(stack, &args.snapshot).await?;

        let renders = self
            .client
            .render_snapshot(
                &stack.uid,
                &snapshot.uid,
                &formation.uid,
                &args.files,
                !args.no_latest,
                args.filter.as_deref(),
            )
            .await?;

        // Issues go to stderr so piped render output stays clean.
        check_render_issues(&mut io::stderr().lock(), &renders, args.ignore_errors, args.ignore_warnings)?;

        match args.outdir.as_deref() {
            Some(outdir) => {
                save_renders(outdir, &formation.name, &snapshot.uid, &renders)?;
                format.write(
                    writer,
                    &Message::success(format!(
                        "Rendered {} file(s) into {}",
                        renders.stencils.len(),
                        outdir.display()
                    )),
                )
            }
            None => {
                for stencil in &renders.stencils {
                    writeln!(writer, "---")?;
                    writer.write_all(render_header(&stencil.filename, &formation.name, &snapshot.uid, stencil.sequence).as_bytes())?;
                    writer.write_all(stencil.content.as_bytes())?;
                    if !stencil.content.ends_with('\n') {
                        writeln!(writer)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Resolve a formation by name.
    pub(crate) async fn resolve_formation(&self, stack: &Stack, name: &str) -> Result<Formation, CliError> {
        let formations = self.client.formations(&stack.uid, false).await?;
        formations
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CliError::not_found("formation", name))
    }

    /// Resolve a snapshot uid, where `latest` means the most recent one.
    pub(crate) async fn resolve_snapshot(&self, stack: &Stack, uid: &str) -> Result<Snapshot, CliError> {
        let mut snapshots = self.client.snapshots(&stack.uid).await?;
        if snapshots.is_empty() {
            return Err(CliError::not_found("snapshot", uid));
        }
        cumulo_api::snapshot::sort_newest_first(&mut snapshots);

        if uid.eq_ignore_ascii_case("latest") {
            let latest = snapshots.swap_remove(0);
            return Ok(latest);
        }
        snapshots
            .into_iter()
            .find(|s| s.uid == uid)
            .ok_or_else(|| CliError::not_found("snapshot", uid))
    }
}

/// Aborts on render errors or warnings unless they are ignored, writing
/// the issues to the given sink first.
fn check_render_issues<W: Write>(
    sink: &mut W,
    renders: &Renders,
    ignore_errors: bool,
    ignore_warnings: bool,
) -> Result<(), CliError> {
    let errors = renders.errors();
    if !errors.is_empty() && !ignore_errors {
        for issue in &errors {
            writeln!(sink, "error [{}]: {}", issue.stencil, issue.text)?;
        }
        return Err(CliError::RenderErrors(errors.len()));
    }

    let warnings = renders.warnings();
    if !warnings.is_empty() && !ignore_warnings {
        for issue in &warnings {
            writeln!(sink, "warning [{}]: {}", issue.stencil, issue.text)?;
        }
        return Err(CliError::InvalidArgument(format!(
            "rendering reported {} warning(s); pass --ignore-warnings to continue",
            warnings.len()
        )));
    }
    Ok(())
}

/// Header prepended to each rendered stencil.
fn render_header(filename: &str, formation: &str, snapshot: &str, sequence: i32) -> String {
    format!("# Stencil: {filename}\n# Formation: {formation}\n# Snapshot: {snapshot}\n# Sequence: {sequence}\n")
}

/// Saves rendered stencils into a directory, each file prefixed with its
/// position in the render order.
fn save_renders(outdir: &Path, formation: &str, snapshot: &str, renders: &Renders) -> Result<(), CliError> {
    fs::create_dir_all(outdir)?;
    for (idx, stencil) in renders.stencils.iter().enumerate() {
        let name = format!("{:03}_{}", idx + 1, stencil.filename);
        let mut body = render_header(&stencil.filename, formation, snapshot, stencil.sequence);
        body.push_str(&stencil.content);
        fs::write(outdir.join(name), body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn renders(errors: usize, warnings: usize) -> Renders {
        let errors: Vec<serde_json::Value> = (0..errors)
            .map(|i| serde_json::json!({"text": format!("boom {i}"), "stencil": "svc.yml"}))
            .collect();
        let warnings: Vec<serde_json::Value> = (0..warnings)
            .map(|i| serde_json::json!({"text": format!("hmm {i}"), "stencil": "svc.yml"}))
            .collect();
        serde_json::from_value(serde_json::json!({
            "stencils": [
                {"filename": "svc.yml", "content": "kind: Service\n", "sequence": 10,
                 "errors": errors, "warnings": warnings},
                {"filename": "dep.yml", "content": "kind: Deployment\n", "sequence": 20}
            ]
        }))
        .expect("valid renders")
    }

    #[test]
    fn errors_block_rendering() {
        let mut sink = Vec::new();
        let err = check_render_issues(&mut sink, &renders(2, 0), false, false)
            .expect_err("errors should block");
        assert!(matches!(err, CliError::RenderErrors(2)));

        let output = String::from_utf8(sink).expect("utf8");
        assert!(output.contains("boom 0"));
    }

    #[test]
    fn ignored_issues_write_nothing() {
        let mut sink = Vec::new();
        check_render_issues(&mut sink, &renders(2, 0), true, true).expect("ignored");
        assert!(sink.is_empty());
    }

    #[test]
    fn warnings_block_unless_ignored() {
        let mut sink = Vec::new();
        let err = check_render_issues(&mut sink, &renders(0, 1), false, false)
            .expect_err("warnings should block");
        assert!(err.to_string().contains("--ignore-warnings"));

        check_render_issues(&mut sink, &renders(0, 1), false, true).expect("ignored");
    }

    #[test]
    fn header_format() {
        assert_eq!(
            render_header("svc.yml", "main", "sn-1", 10),
            "# Stencil: svc.yml\n# Formation: main\n# Snapshot: sn-1\n# Sequence: 10\n"
        );
    }

    #[test]
    fn saved_files_are_order_prefixed() {
        let dir = TempDir::new().expect("tempdir");
        save_renders(dir.path(), "main", "sn-1", &renders(0, 0)).expect("should save");

        let first = fs::read_to_string(dir.path().join("001_svc.yml")).expect("first file");
        assert!(first.starts_with("# Stencil: svc.yml\n"));
        assert!(first.contains("kind: Service"));

        let second = fs::read_to_string(dir.path().join("002_dep.yml")).expect("second file");
        assert!(second.contains("# Sequence: 20"));
    }
}

//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// One row of the stack listing.
#[derive(Debug, Clone, Serialize)]
pub struct StackRow {
    /// Owning account name.
    pub account: String,
    /// Stack name.
    pub name: String,
    /// Environment label.
    pub environment: String,
    /// Derived stack type.
    pub stack_type: String,
    /// Hosting cluster name, or n/a.
    pub cluster_name: String,
    /// Public application address, or n/a.
    pub application_address: String,
    /// Status text.
    pub status: String,
    /// Last activity time.
    pub last_activity: DateTime<Utc>,
}

/// Stack listing.
#[derive(Debug, Clone, Serialize)]
pub struct StackList {
    /// Stacks sorted by account, then name.
    pub stacks: Vec<StackRow>,
    /// Whether to show the wide columns.
    #[serde(skip)]
    pub wide: bool,
}

impl TableDisplay for StackList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.stacks.is_empty() {
            writeln!(writer, "No stacks found")?;
            return Ok(());
        }

        if self.wide {
            writeln!(
                writer,
                "{:<20}  {:<24}  {:<12}  {:<22}  {:<16}  {:<28}  {:<22}  {:<20}",
                "ACCOUNT",
                "NAME",
                "ENVIRONMENT",
                "STACK TYPE",
                "CLUSTER",
                "ADDRESS",
                "STATUS",
                "LAST ACTIVITY"
            )?;
        } else {
            writeln!(
                writer,
                "{:<24}  {:<12}  {:<22}  {:<22}  {:<20}",
                "NAME", "ENVIRONMENT", "STACK TYPE", "STATUS", "LAST ACTIVITY"
            )?;
        }

        for stack in &self.stacks {
            if self.wide {
                writeln!(
                    writer,
                    "{:<20}  {:<24}  {:<12}  {:<22}  {:<16}  {:<28}  {:<22}  {:<20}",
                    truncate(&stack.account, 20),
                    truncate(&stack.name, 24),
                    stack.environment,
                    stack.stack_type,
                    truncate(&stack.cluster_name, 16),
                    truncate(&stack.application_address, 28),
                    stack.status,
                    format_time(stack.last_activity)
                )?;
            } else {
                writeln!(
                    writer,
                    "{:<24}  {:<12}  {:<22}  {:<22}  {:<20}",
                    truncate(&stack.name, 24),
                    stack.environment,
                    stack.stack_type,
                    stack.status,
                    format_time(stack.last_activity)
                )?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} stack(s)", self.stacks.len())?;
        Ok(())
    }
}

/// One row of the service listing.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRow {
    /// Service name.
    pub name: String,
    /// Source the service was built from.
    pub source_type: String,
    /// Total running containers.
    pub containers: usize,
    /// Container counts per server, e.g. "orca (2), beluga (1)".
    pub servers: String,
}

/// Service listing.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceList {
    /// Services sorted by name.
    pub services: Vec<ServiceRow>,
}

impl TableDisplay for ServiceList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.services.is_empty() {
            writeln!(writer, "No services found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:<12}  {:>10}  {:<40}",
            "NAME", "SOURCE", "CONTAINERS", "SERVERS"
        )?;
        for service in &self.services {
            writeln!(
                writer,
                "{:<24}  {:<12}  {:>10}  {:<40}",
                truncate(&service.name, 24),
                service.source_type,
                service.containers,
                truncate(&service.servers, 40)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} service(s)", self.services.len())?;
        Ok(())
    }
}

/// One row of the snapshot listing.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    /// Snapshot uid.
    pub uid: String,
    /// What triggered the snapshot.
    pub action: String,
    /// Who or what triggered it.
    pub triggered_by: String,
    /// When it was triggered.
    pub triggered_at: DateTime<Utc>,
}

/// Snapshot listing.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotList {
    /// Snapshots, newest first.
    pub snapshots: Vec<SnapshotRow>,
}

impl TableDisplay for SnapshotList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.snapshots.is_empty() {
            writeln!(writer, "No snapshots found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:<20}  {:<24}  {:<16}",
            "UID", "TRIGGERED AT", "TRIGGERED BY", "ACTION"
        )?;
        for snapshot in &self.snapshots {
            writeln!(
                writer,
                "{:<24}  {:<20}  {:<24}  {:<16}",
                snapshot.uid,
                format_time(snapshot.triggered_at),
                truncate(&snapshot.triggered_by, 24),
                snapshot.action
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} snapshot(s)", self.snapshots.len())?;
        Ok(())
    }
}

/// One row of the formation listing.
#[derive(Debug, Clone, Serialize)]
pub struct FormationRow {
    /// Formation uid.
    pub uid: String,
    /// Formation name.
    pub name: String,
    /// Tags joined with commas.
    pub tags: String,
    /// Stencil count.
    pub stencils: usize,
    /// Policy count.
    pub policies: usize,
    /// Base template repositories joined with commas.
    pub base_templates: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Formation listing.
#[derive(Debug, Clone, Serialize)]
pub struct FormationList {
    /// Formations sorted by name.
    pub formations: Vec<FormationRow>,
}

impl TableDisplay for FormationList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.formations.is_empty() {
            writeln!(writer, "No formations found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:<20}  {:<20}  {:>8}  {:>8}  {:<24}  {:<20}",
            "UID", "NAME", "TAGS", "STENCILS", "POLICIES", "BASE TEMPLATES", "CREATED AT"
        )?;
        for formation in &self.formations {
            writeln!(
                writer,
                "{:<24}  {:<20}  {:<20}  {:>8}  {:>8}  {:<24}  {:<20}",
                formation.uid,
                truncate(&formation.name, 20),
                truncate(&formation.tags, 20),
                formation.stencils,
                formation.policies,
                truncate(&formation.base_templates, 24),
                format_time(formation.created_at)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} formation(s)", self.formations.len())?;
        Ok(())
    }
}

/// One row of the stencil listing.
#[derive(Debug, Clone, Serialize)]
pub struct StencilRow {
    /// Stencil uid.
    pub uid: String,
    /// Output filename.
    pub filename: String,
    /// Render context.
    pub context: String,
    /// Template filename.
    pub template: String,
    /// Tags joined with commas.
    pub tags: String,
    /// Render order.
    pub sequence: i32,
}

/// Stencil listing.
#[derive(Debug, Clone, Serialize)]
pub struct StencilList {
    /// Stencils in render order.
    pub stencils: Vec<StencilRow>,
    /// Whether to show the wide columns.
    #[serde(skip)]
    pub wide: bool,
}

impl TableDisplay for StencilList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.stencils.is_empty() {
            writeln!(writer, "No stencils found")?;
            return Ok(());
        }

        if self.wide {
            writeln!(
                writer,
                "{:<24}  {:<28}  {:<12}  {:<24}  {:<20}  {:>8}",
                "UID", "FILENAME", "CONTEXT", "TEMPLATE", "TAGS", "SEQUENCE"
            )?;
        } else {
            writeln!(writer, "{:<24}  {:<28}  {:<20}  {:>8}", "UID", "FILENAME", "TAGS", "SEQUENCE")?;
        }

        for stencil in &self.stencils {
            if self.wide {
                writeln!(
                    writer,
                    "{:<24}  {:<28}  {:<12}  {:<24}  {:<20}  {:>8}",
                    stencil.uid,
                    truncate(&stencil.filename, 28),
                    stencil.context,
                    truncate(&stencil.template, 24),
                    truncate(&stencil.tags, 20),
                    stencil.sequence
                )?;
            } else {
                writeln!(
                    writer,
                    "{:<24}  {:<28}  {:<20}  {:>8}",
                    stencil.uid,
                    truncate(&stencil.filename, 28),
                    truncate(&stencil.tags, 20),
                    stencil.sequence
                )?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} stencil(s)", self.stencils.len())?;
        Ok(())
    }
}

/// One row of the environment variable listing.
#[derive(Debug, Clone, Serialize)]
pub struct EnvVarRow {
    /// Variable name.
    pub key: String,
    /// Variable value.
    pub value: String,
    /// Whether the variable is server-managed.
    pub readonly: bool,
}

/// Environment variable listing.
#[derive(Debug, Clone, Serialize)]
pub struct EnvVarList {
    /// Variables sorted by key.
    pub vars: Vec<EnvVarRow>,
}

impl TableDisplay for EnvVarList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.vars.is_empty() {
            writeln!(writer, "No environment variables found")?;
            return Ok(());
        }

        writeln!(writer, "{:<32}  {:<44}  {:<8}", "KEY", "VALUE", "READONLY")?;
        for var in &self.vars {
            writeln!(
                writer,
                "{:<32}  {:<44}  {:<8}",
                truncate(&var.key, 32),
                truncate(&var.value, 44),
                if var.readonly { "yes" } else { "no" }
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} variable(s)", self.vars.len())?;
        Ok(())
    }
}

/// One row of the account listing.
#[derive(Debug, Clone, Serialize)]
pub struct AccountRow {
    /// Account id.
    pub id: i64,
    /// Organization name.
    pub name: String,
    /// Owner email.
    pub owner: String,
    /// Whether this is the default organization.
    pub current: bool,
}

/// Account listing.
#[derive(Debug, Clone, Serialize)]
pub struct AccountList {
    /// Accounts as returned by the server.
    pub accounts: Vec<AccountRow>,
}

impl TableDisplay for AccountList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.accounts.is_empty() {
            writeln!(writer, "No organizations found")?;
            return Ok(());
        }

        writeln!(writer, "{:>8}  {:<28}  {:<32}  {:<7}", "ID", "NAME", "OWNER", "CURRENT")?;
        for account in &self.accounts {
            writeln!(
                writer,
                "{:>8}  {:<28}  {:<32}  {:<7}",
                account.id,
                truncate(&account.name, 28),
                truncate(&account.owner, 32),
                if account.current { "*" } else { "" }
            )?;
        }
        Ok(())
    }
}

/// One row of the profile listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRow {
    /// Profile name.
    pub name: String,
    /// API base URL.
    pub api_url: String,
    /// Default organization, when set.
    pub org: String,
    /// Whether this is the default profile.
    pub current: bool,
}

/// Profile listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileList {
    /// Profiles sorted by name.
    pub profiles: Vec<ProfileRow>,
}

impl TableDisplay for ProfileList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{:<16}  {:<40}  {:<20}  {:<7}", "NAME", "API URL", "ORG", "CURRENT")?;
        for profile in &self.profiles {
            writeln!(
                writer,
                "{:<16}  {:<40}  {:<20}  {:<7}",
                truncate(&profile.name, 16),
                truncate(&profile.api_url, 40),
                truncate(&profile.org, 20),
                if profile.current { "*" } else { "" }
            )?;
        }
        Ok(())
    }
}

/// One row of the configuration file listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigFileRow {
    /// File kind.
    pub kind: String,
    /// Last update time, when known.
    pub updated_at: Option<DateTime<Utc>>,
    /// Comment on the current version.
    pub comments: String,
}

/// Configuration file listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigFileList {
    /// Available configuration files.
    pub files: Vec<ConfigFileRow>,
}

impl TableDisplay for ConfigFileList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.files.is_empty() {
            writeln!(writer, "No configuration files found")?;
            return Ok(());
        }

        writeln!(writer, "{:<20}  {:<20}  {:<40}", "TYPE", "UPDATED AT", "COMMENTS")?;
        for file in &self.files {
            let updated = file.updated_at.map_or_else(|| "n/a".to_string(), format_time);
            writeln!(
                writer,
                "{:<20}  {:<20}  {:<40}",
                file.kind,
                updated,
                truncate(&file.comments, 40)
            )?;
        }
        Ok(())
    }
}

/// One row of the configuration version listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigVersionRow {
    /// Version identifier.
    pub version: String,
    /// Upload time.
    pub created_at: DateTime<Utc>,
    /// Comment supplied at upload time.
    pub comments: String,
}

/// Configuration version listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigVersionList {
    /// Versions, newest first.
    pub versions: Vec<ConfigVersionRow>,
}

impl TableDisplay for ConfigVersionList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.versions.is_empty() {
            writeln!(writer, "No versions found")?;
            return Ok(());
        }

        writeln!(writer, "{:<16}  {:<20}  {:<40}", "VERSION", "CREATED AT", "COMMENTS")?;
        for version in &self.versions {
            writeln!(
                writer,
                "{:<16}  {:<20}  {:<40}",
                version.version,
                format_time(version.created_at),
                truncate(&version.comments, 40)
            )?;
        }
        Ok(())
    }
}

/// Details of an SSL certificate after creation or update.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateInfo {
    /// Certificate uuid.
    pub uuid: String,
    /// Provisioning type.
    pub cert_type: String,
    /// Covered domains.
    pub server_names: String,
    /// Server-side status.
    pub status: String,
    /// Expiry time, when known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TableDisplay for CertificateInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Certificate: {}", self.uuid)?;
        writeln!(writer, "  Type:         {}", self.cert_type)?;
        writeln!(writer, "  Domains:      {}", self.server_names)?;
        writeln!(writer, "  Status:       {}", self.status)?;
        if let Some(expires_at) = self.expires_at {
            writeln!(writer, "  Expires At:   {}", format_time(expires_at))?;
        }
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

/// Format a timestamp for table output.
#[must_use]
pub fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Truncate a string to a maximum length.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn when() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("valid time")
    }

    fn stack_row(name: &str) -> StackRow {
        StackRow {
            account: "acme".into(),
            name: name.into(),
            environment: "production".into(),
            stack_type: "docker".into(),
            cluster_name: "n/a".into(),
            application_address: "web.acme.dev".into(),
            status: "Deployed".into(),
            last_activity: when(),
        }
    }

    #[test]
    fn stack_list_table_output() {
        let list = StackList {
            stacks: vec![stack_row("web"), stack_row("api")],
            wide: false,
        };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");

        assert!(output.contains("NAME"));
        assert!(output.contains("web"));
        assert!(output.contains("Deployed"));
        assert!(output.contains("Total: 2 stack(s)"));
        // narrow format hides the account column
        assert!(!output.contains("ACCOUNT"));
    }

    #[test]
    fn stack_list_wide_shows_account_and_address() {
        let list = StackList {
            stacks: vec![stack_row("web")],
            wide: true,
        };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");

        assert!(output.contains("ACCOUNT"));
        assert!(output.contains("acme"));
        assert!(output.contains("web.acme.dev"));
    }

    #[test]
    fn stack_list_empty() {
        let list = StackList {
            stacks: vec![],
            wide: false,
        };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");
        assert!(output.contains("No stacks found"));
    }

    #[test]
    fn stack_list_json_output() {
        let list = StackList {
            stacks: vec![stack_row("web")],
            wide: false,
        };
        let fmt = OutputFormat::new(Format::Json);
        let output = fmt.to_string(&list).expect("should format");
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(parsed["stacks"][0]["name"], "web");
        assert_eq!(parsed["stacks"][0]["status"], "Deployed");
    }

    #[test]
    fn service_list_table_output() {
        let list = ServiceList {
            services: vec![ServiceRow {
                name: "web".into(),
                source_type: "git".into(),
                containers: 3,
                servers: "orca (2), beluga (1)".into(),
            }],
        };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");
        assert!(output.contains("web"));
        assert!(output.contains("orca (2), beluga (1)"));
        assert!(output.contains("Total: 1 service(s)"));
    }

    #[test]
    fn snapshot_list_table_output() {
        let list = SnapshotList {
            snapshots: vec![SnapshotRow {
                uid: "sn-1".into(),
                action: "manual".into(),
                triggered_by: "ops@acme.dev".into(),
                triggered_at: when(),
            }],
        };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");
        assert!(output.contains("sn-1"));
        assert!(output.contains("2026-03-14 09:30:00 UTC"));
    }

    #[test]
    fn env_var_list_marks_readonly() {
        let list = EnvVarList {
            vars: vec![
                EnvVarRow {
                    key: "RAILS_ENV".into(),
                    value: "production".into(),
                    readonly: true,
                },
                EnvVarRow {
                    key: "FOO".into(),
                    value: "bar".into(),
                    readonly: false,
                },
            ],
        };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");
        assert!(output.contains("yes"));
        assert!(output.contains("no"));
    }

    #[test]
    fn certificate_info_table_output() {
        let info = CertificateInfo {
            uuid: "crt-1".into(),
            cert_type: "lets_encrypt".into(),
            server_names: "web.test".into(),
            status: "issued".into(),
            expires_at: Some(when()),
        };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&info).expect("should format");
        assert!(output.contains("Certificate: crt-1"));
        assert!(output.contains("Expires At"));
    }

    #[test]
    fn message_success_and_info() {
        let fmt = OutputFormat::new(Format::Table);

        let output = fmt.to_string(&Message::success("done")).expect("should format");
        assert!(output.contains("✓ done"));

        let output = fmt.to_string(&Message::info("working")).expect("should format");
        assert!(output.contains("working"));
        assert!(!output.contains("✓"));
    }

    #[test]
    fn truncate_behaviour() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello", 3), "hel");
    }

    #[test]
    fn truncate_cuts_on_character_boundaries() {
        assert_eq!(truncate("réplicação-de-produção", 8), "répli...");
        assert_eq!(truncate("日本語のスタック名", 5), "日本...");
        assert_eq!(truncate("überlang", 3), "übe");
    }
}

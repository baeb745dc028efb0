//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Cumulo CLI - toolbelt for the Cumulo control plane.
#[derive(Parser, Debug, Clone)]
#[command(name = "cumulo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Connection profile to use.
    #[arg(long, env = "CUMULO_PROFILE", default_value = "default")]
    pub profile: String,

    /// API base URL, overriding the profile's.
    #[arg(long, env = "CUMULO_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Organization name, when the token has access to more than one.
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Full or partial stack name.
    #[arg(short = 's', long, global = true)]
    pub stack: Option<String>,

    /// Environment of the stack, used to disambiguate stack names.
    #[arg(short = 'e', long, global = true)]
    pub environment: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, global = true, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Stack management commands.
    Stacks {
        /// Stack subcommand to execute.
        #[command(subcommand)]
        command: StackCommands,
    },

    /// Container service commands.
    Services {
        /// Service subcommand to execute.
        #[command(subcommand)]
        command: ServiceCommands,
    },

    /// Snapshot commands.
    Snapshots {
        /// Snapshot subcommand to execute.
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Formation commands.
    Formations {
        /// Formation subcommand to execute.
        #[command(subcommand)]
        command: FormationCommands,
    },

    /// Environment variable commands.
    EnvVars {
        /// Environment variable subcommand to execute.
        #[command(subcommand)]
        command: EnvVarCommands,
    },

    /// Organization account commands.
    Accounts {
        /// Account subcommand to execute.
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Connection profile commands.
    Profiles {
        /// Profile subcommand to execute.
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

/// Stack subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum StackCommands {
    /// List stacks, or look up the named ones.
    List(StackListArgs),

    /// Create a new stack.
    Create(CreateStackArgs),

    /// Queue a redeployment of a stack.
    Redeploy(RedeployArgs),

    /// Restart all components of a stack.
    Restart,

    /// Reboot servers of a stack.
    Reboot(RebootArgs),

    /// Clear the code caches of a stack.
    ClearCaches,

    /// Follow a stack until its current deployment finishes.
    Listen,

    /// SSL certificate commands.
    Ssl {
        /// SSL subcommand to execute.
        #[command(subcommand)]
        command: SslCommands,
    },

    /// Legacy service.yml and manifest.yml management.
    Configure {
        /// Configure subcommand to execute.
        #[command(subcommand)]
        command: ConfigureCommands,
    },

    /// Configuration file management.
    Configuration {
        /// Configuration subcommand to execute.
        #[command(subcommand)]
        command: ConfigurationCommands,
    },
}

/// Arguments for listing stacks.
#[derive(Parser, Debug, Clone)]
pub struct StackListArgs {
    /// Only show these stacks (full or partial names).
    pub names: Vec<String>,

    /// Show account, cluster and address columns as well.
    #[arg(long)]
    pub wide: bool,
}

/// Arguments for creating a stack.
///
/// The environment comes from the global `-e` flag and defaults to
/// production.
#[derive(Parser, Debug, Clone)]
pub struct CreateStackArgs {
    /// Name of the new stack.
    #[arg(long)]
    pub name: String,

    /// Path to a service.yml describing the stack's services.
    #[arg(long)]
    pub service_yaml: Option<PathBuf>,

    /// Path to a manifest.yml describing the stack's infrastructure.
    #[arg(long)]
    pub manifest_yaml: Option<PathBuf>,
}

/// Arguments for redeploying a stack.
#[derive(Parser, Debug, Clone)]
pub struct RedeployArgs {
    /// Git reference (branch, tag or hash) to deploy.
    #[arg(long)]
    pub git_ref: Option<String>,

    /// Only deploy these services. May be repeated.
    #[arg(long = "service")]
    pub services: Vec<String>,

    /// Deployment strategy (serial or parallel).
    #[arg(long)]
    pub deploy_strategy: Option<String>,

    /// Named deployment profile configured on the stack.
    #[arg(long)]
    pub deployment_profile: Option<String>,

    /// Skip the confirmation prompt for production stacks.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Wait and follow the deployment after queuing it.
    #[arg(long)]
    pub listen: bool,
}

/// Arguments for rebooting servers.
#[derive(Parser, Debug, Clone)]
pub struct RebootArgs {
    /// Which servers to reboot (web, db, all, or a role name).
    #[arg(long, default_value = "web")]
    pub group: String,

    /// Reboot one at a time or all at once.
    #[arg(long, default_value = "serial")]
    pub strategy: String,
}

/// SSL subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SslCommands {
    /// Add an SSL certificate to a stack, replacing an existing one with
    /// --overwrite.
    Add(SslAddArgs),
}

/// Arguments for adding an SSL certificate.
#[derive(Parser, Debug, Clone)]
pub struct SslAddArgs {
    /// Type of certificate.
    #[arg(long = "type", value_enum)]
    pub cert_type: CertTypeArg,

    /// Comma separated domain names the certificate covers.
    #[arg(long)]
    pub domains: Option<String>,

    /// PEM certificate file (manual type only).
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// PEM key file (manual type only).
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// PEM intermediate chain file (manual type only).
    #[arg(long)]
    pub intermediate: Option<PathBuf>,

    /// Replace the stack's existing certificate.
    #[arg(long)]
    pub overwrite: bool,
}

/// Certificate type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CertTypeArg {
    /// Issued and renewed automatically.
    LetsEncrypt,
    /// Certificate and key supplied by the user.
    Manual,
}

/// Legacy configure subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigureCommands {
    /// List all versions of a configuration file.
    ListVersions {
        /// File to inspect (service.yml or manifest.yml).
        #[arg(long)]
        file: String,
    },

    /// Download a configuration file.
    Download {
        /// File to download (service.yml or manifest.yml).
        #[arg(long)]
        file: String,

        /// Specific version to download.
        #[arg(short = 'v', long)]
        version: Option<String>,

        /// Save to this path instead of stdout.
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Upload a new version of a configuration file.
    Upload {
        /// Path of the file to upload.
        path: PathBuf,

        /// Target file (service.yml or manifest.yml).
        #[arg(long)]
        file: String,

        /// Comment recorded with this version.
        #[arg(long)]
        comments: Option<String>,
    },
}

/// Configuration file subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigurationCommands {
    /// List configuration file types available on the stack.
    List,

    /// Print or save the content of a configuration file.
    Download {
        /// Configuration type (see list).
        #[arg(short = 't', long = "type")]
        kind: String,

        /// Save to this path instead of stdout.
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Upload a configuration file, applying it unless told otherwise.
    Upload {
        /// Configuration type (see list).
        #[arg(short = 't', long = "type")]
        kind: String,

        /// Source file to upload.
        #[arg(long)]
        source: PathBuf,

        /// Message recorded with this version.
        #[arg(long)]
        commit_message: Option<String>,

        /// Do not apply the change to the stack's servers.
        #[arg(long)]
        no_apply: bool,
    },

    /// Apply the current configuration to the stack's servers.
    Apply {
        /// Configuration type (see list).
        #[arg(short = 't', long = "type")]
        kind: String,
    },
}

/// Service subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ServiceCommands {
    /// List the services of a stack.
    List(ServiceListArgs),

    /// Show details of one service.
    Info {
        /// Service name.
        name: String,

        /// Limit to one server (name or address).
        #[arg(long)]
        server: Option<String>,
    },

    /// Stop all containers of a service.
    Stop(ServiceActionArgs),

    /// Pause all containers of a service.
    Pause(ServiceActionArgs),

    /// Resume the paused containers of a service.
    Resume(ServiceActionArgs),

    /// Restart all containers of a service.
    Restart(ServiceActionArgs),

    /// Scale a service to an absolute count, or adjust it with [+N] or
    /// [-N].
    Scale {
        /// Service name.
        name: String,

        /// Target count: "3", "[+2]" or "[-1]".
        target: String,
    },
}

/// Arguments for listing services.
#[derive(Parser, Debug, Clone)]
pub struct ServiceListArgs {
    /// Limit to one server (name or address).
    #[arg(long)]
    pub server: Option<String>,

    /// Limit to one service.
    #[arg(long)]
    pub service: Option<String>,
}

/// Arguments shared by the service lifecycle actions.
#[derive(Parser, Debug, Clone)]
pub struct ServiceActionArgs {
    /// Service name.
    pub name: String,

    /// Limit the action to one server (name or address).
    #[arg(long)]
    pub server: Option<String>,
}

/// Snapshot subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SnapshotCommands {
    /// List the snapshots of a stack, newest first.
    List {
        /// Only show these snapshot uids.
        uids: Vec<String>,
    },

    /// Render a formation against a snapshot.
    Render(RenderArgs),
}

/// Arguments for rendering a snapshot.
#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    /// Snapshot uid, or "latest" for the most recent one.
    #[arg(long, default_value = "latest")]
    pub snapshot: String,

    /// Name of the formation to render.
    #[arg(long)]
    pub formation: String,

    /// Only render these files. May be repeated; empty means all.
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Render the stencil versions captured by the snapshot instead of
    /// their HEADs.
    #[arg(long)]
    pub no_latest: bool,

    /// Save rendered files to this directory instead of stdout.
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Render whatever is possible even when errors are reported.
    #[arg(long)]
    pub ignore_errors: bool,

    /// Render even when warnings are reported.
    #[arg(long)]
    pub ignore_warnings: bool,

    /// Formation filter to apply during the render.
    #[arg(long)]
    pub filter: Option<String>,
}

/// Formation subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum FormationCommands {
    /// List the formations of a stack.
    List {
        /// Only show these formations.
        names: Vec<String>,
    },

    /// Create a new formation.
    Create(CreateFormationArgs),

    /// Download a formation's stencils into a local directory.
    Fetch(FetchFormationArgs),

    /// Commit locally edited stencil files back to a formation.
    Commit(CommitFormationArgs),

    /// Deploy a formation by running its workflow.
    Deploy(DeployFormationArgs),

    /// Formation bundle commands.
    Bundle {
        /// Bundle subcommand to execute.
        #[command(subcommand)]
        command: BundleCommands,
    },

    /// Stencil commands.
    Stencils {
        /// Stencil subcommand to execute.
        #[command(subcommand)]
        command: StencilCommands,
    },
}

/// Arguments for creating a formation.
#[derive(Parser, Debug, Clone)]
pub struct CreateFormationArgs {
    /// Formation name.
    #[arg(long)]
    pub name: String,

    /// Git URL of the base template repository.
    #[arg(long)]
    pub template_repo: String,

    /// Branch of the base template repository.
    #[arg(long, default_value = "main")]
    pub template_branch: String,

    /// Tags for the new formation. May be repeated.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

/// Arguments for fetching a formation's stencils.
#[derive(Parser, Debug, Clone)]
pub struct FetchFormationArgs {
    /// Name of the formation to fetch.
    #[arg(long)]
    pub formation: String,

    /// Directory to save stencils in. Defaults to the formation name.
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Overwrite existing files without asking.
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments for committing stencil edits.
#[derive(Parser, Debug, Clone)]
pub struct CommitFormationArgs {
    /// Name of the formation to commit to.
    #[arg(long)]
    pub formation: String,

    /// Directory containing the edited stencils. Defaults to the
    /// formation name.
    #[arg(long, conflicts_with = "stencil")]
    pub dir: Option<PathBuf>,

    /// Commit a single stencil file instead of a directory.
    #[arg(long)]
    pub stencil: Option<PathBuf>,

    /// Commit message.
    #[arg(long)]
    pub message: String,
}

/// Arguments for deploying a formation.
#[derive(Parser, Debug, Clone)]
pub struct DeployFormationArgs {
    /// Name of the formation to deploy.
    #[arg(long)]
    pub formation: String,

    /// Snapshot uid to deploy against. Defaults to the latest snapshot.
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Use the stencil versions captured by the snapshot instead of their
    /// HEADs.
    #[arg(long)]
    pub no_latest: bool,

    /// Print the output of every workflow step.
    #[arg(long)]
    pub debug: bool,
}

/// Bundle subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum BundleCommands {
    /// Save a formation as a portable bundle file.
    Download(BundleDownloadArgs),

    /// Recreate a formation from a bundle file.
    Upload(BundleUploadArgs),
}

/// Arguments for downloading a bundle.
#[derive(Parser, Debug, Clone)]
pub struct BundleDownloadArgs {
    /// Name of the formation to bundle.
    #[arg(long)]
    pub formation: String,

    /// Bundle file path. Defaults to <formation>.formation.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Overwrite the bundle file if it exists.
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments for uploading a bundle.
#[derive(Parser, Debug, Clone)]
pub struct BundleUploadArgs {
    /// Name of the formation to create.
    #[arg(long)]
    pub formation: String,

    /// Bundle file path. Defaults to <formation>.formation.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Commit message for the uploaded artifacts.
    #[arg(long)]
    pub message: String,
}

/// Stencil subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum StencilCommands {
    /// List the stencils of a formation.
    List {
        /// Name of the formation.
        #[arg(long)]
        formation: String,

        /// Show context, template and git columns as well.
        #[arg(long)]
        wide: bool,
    },

    /// Print the body of a stencil.
    Show {
        /// Name of the formation.
        #[arg(long)]
        formation: String,

        /// Stencil filename.
        name: String,
    },

    /// Render a single stencil against a snapshot.
    Render(StencilRenderArgs),

    /// Add a stencil to a formation from a local file.
    Add(StencilAddArgs),
}

/// Arguments for rendering one stencil.
#[derive(Parser, Debug, Clone)]
pub struct StencilRenderArgs {
    /// Name of the formation.
    #[arg(long)]
    pub formation: String,

    /// Stencil filename to render.
    pub name: String,

    /// Snapshot uid, or "latest" for the most recent one.
    #[arg(long, default_value = "latest")]
    pub snapshot: String,

    /// Save rendered output to this path instead of stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Re-render whenever the local stencil file changes.
    #[arg(long)]
    pub watch: bool,

    /// Local file to render instead of the server-side body.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Arguments for adding a stencil.
#[derive(Parser, Debug, Clone)]
pub struct StencilAddArgs {
    /// Name of the formation.
    #[arg(long)]
    pub formation: String,

    /// Local file containing the stencil body.
    #[arg(long)]
    pub file: PathBuf,

    /// Template filename in the base template repository.
    #[arg(long)]
    pub template: String,

    /// Render context of the stencil.
    #[arg(long, default_value = "stack")]
    pub context: String,

    /// Render order within the formation.
    #[arg(long, default_value_t = 100)]
    pub sequence: i32,

    /// Commit message.
    #[arg(long)]
    pub message: String,
}

/// Environment variable subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum EnvVarCommands {
    /// List the environment variables of a stack.
    List,

    /// Add a new environment variable and wait for it to apply.
    Set {
        /// Variable name.
        key: String,

        /// Variable value.
        value: String,
    },
}

/// Account subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommands {
    /// List the organizations the token has access to.
    List,
}

/// Profile subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommands {
    /// List connection profiles.
    List,

    /// Create a new connection profile.
    Create {
        /// Profile name.
        name: String,

        /// API base URL for this profile.
        #[arg(long = "url")]
        api_url: Option<String>,

        /// Default organization for this profile.
        #[arg(long = "default-org")]
        org: Option<String>,
    },

    /// Show one profile.
    Show {
        /// Profile name.
        name: String,
    },

    /// Make a profile the default.
    Use {
        /// Profile name.
        name: String,
    },

    /// Delete a profile.
    Delete {
        /// Profile name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_help_does_not_panic() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_stacks_list() {
        let cli = Cli::parse_from(["cumulo", "stacks", "list"]);
        match cli.command {
            Commands::Stacks {
                command: StackCommands::List(args),
            } => {
                assert!(args.names.is_empty());
                assert!(!args.wide);
            }
            _ => panic!("expected stacks list command"),
        }
        assert_eq!(cli.profile, "default");
        assert_eq!(cli.format, Format::Table);
    }

    #[test]
    fn parse_stacks_list_with_names_and_environment() {
        let cli = Cli::parse_from(["cumulo", "stacks", "list", "-e", "staging", "web", "api"]);
        assert_eq!(cli.environment.as_deref(), Some("staging"));
        match cli.command {
            Commands::Stacks {
                command: StackCommands::List(args),
            } => assert_eq!(args.names, vec!["web", "api"]),
            _ => panic!("expected stacks list command"),
        }
    }

    #[test]
    fn parse_global_stack_flag_after_subcommand() {
        let cli = Cli::parse_from(["cumulo", "services", "list", "-s", "mystack"]);
        assert_eq!(cli.stack.as_deref(), Some("mystack"));
    }

    #[test]
    fn parse_json_format_flag() {
        let cli = Cli::parse_from(["cumulo", "--format", "json", "accounts", "list"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn parse_redeploy_with_services_and_git_ref() {
        let cli = Cli::parse_from([
            "cumulo",
            "stacks",
            "redeploy",
            "-s",
            "web",
            "--git-ref",
            "release-5",
            "--service",
            "api",
            "--service",
            "worker",
            "-y",
        ]);
        match cli.command {
            Commands::Stacks {
                command: StackCommands::Redeploy(args),
            } => {
                assert_eq!(args.git_ref.as_deref(), Some("release-5"));
                assert_eq!(args.services, vec!["api", "worker"]);
                assert!(args.yes);
                assert!(!args.listen);
            }
            _ => panic!("expected redeploy command"),
        }
    }

    #[test]
    fn parse_reboot_defaults() {
        let cli = Cli::parse_from(["cumulo", "stacks", "reboot", "-s", "web"]);
        match cli.command {
            Commands::Stacks {
                command: StackCommands::Reboot(args),
            } => {
                assert_eq!(args.group, "web");
                assert_eq!(args.strategy, "serial");
            }
            _ => panic!("expected reboot command"),
        }
    }

    #[test]
    fn parse_ssl_add_lets_encrypt() {
        let cli = Cli::parse_from([
            "cumulo",
            "stacks",
            "ssl",
            "add",
            "-s",
            "web",
            "--type",
            "lets-encrypt",
            "--domains",
            "web.test,api.test",
        ]);
        match cli.command {
            Commands::Stacks {
                command: StackCommands::Ssl {
                    command: SslCommands::Add(args),
                },
            } => {
                assert_eq!(args.cert_type, CertTypeArg::LetsEncrypt);
                assert_eq!(args.domains.as_deref(), Some("web.test,api.test"));
                assert!(!args.overwrite);
            }
            _ => panic!("expected ssl add command"),
        }
    }

    #[test]
    fn parse_service_scale() {
        let cli = Cli::parse_from(["cumulo", "services", "scale", "web", "[+2]", "-s", "mystack"]);
        match cli.command {
            Commands::Services {
                command: ServiceCommands::Scale { name, target },
            } => {
                assert_eq!(name, "web");
                assert_eq!(target, "[+2]");
            }
            _ => panic!("expected scale command"),
        }
    }

    #[test]
    fn parse_snapshot_render_defaults() {
        let cli = Cli::parse_from([
            "cumulo",
            "snapshots",
            "render",
            "-s",
            "web",
            "--formation",
            "main",
        ]);
        match cli.command {
            Commands::Snapshots {
                command: SnapshotCommands::Render(args),
            } => {
                assert_eq!(args.snapshot, "latest");
                assert_eq!(args.formation, "main");
                assert!(!args.no_latest);
                assert!(args.files.is_empty());
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn parse_formation_deploy() {
        let cli = Cli::parse_from([
            "cumulo",
            "formations",
            "deploy",
            "-s",
            "web",
            "--formation",
            "main",
            "--debug",
        ]);
        match cli.command {
            Commands::Formations {
                command: FormationCommands::Deploy(args),
            } => {
                assert_eq!(args.formation, "main");
                assert!(args.snapshot.is_none());
                assert!(args.debug);
            }
            _ => panic!("expected deploy command"),
        }
    }

    #[test]
    fn parse_bundle_download_and_upload() {
        let cli = Cli::parse_from([
            "cumulo",
            "formations",
            "bundle",
            "download",
            "-s",
            "web",
            "--formation",
            "main",
            "--overwrite",
        ]);
        match cli.command {
            Commands::Formations {
                command:
                    FormationCommands::Bundle {
                        command: BundleCommands::Download(args),
                    },
            } => {
                assert_eq!(args.formation, "main");
                assert!(args.overwrite);
                assert!(args.file.is_none());
            }
            _ => panic!("expected bundle download command"),
        }

        let cli = Cli::parse_from([
            "cumulo",
            "formations",
            "bundle",
            "upload",
            "-s",
            "web",
            "--formation",
            "restored",
            "--message",
            "import",
        ]);
        match cli.command {
            Commands::Formations {
                command:
                    FormationCommands::Bundle {
                        command: BundleCommands::Upload(args),
                    },
            } => {
                assert_eq!(args.formation, "restored");
                assert_eq!(args.message, "import");
            }
            _ => panic!("expected bundle upload command"),
        }
    }

    #[test]
    fn parse_stencil_render_with_watch() {
        let cli = Cli::parse_from([
            "cumulo",
            "formations",
            "stencils",
            "render",
            "-s",
            "web",
            "--formation",
            "main",
            "svc.yml",
            "--watch",
            "--file",
            "local/svc.yml",
        ]);
        match cli.command {
            Commands::Formations {
                command:
                    FormationCommands::Stencils {
                        command: StencilCommands::Render(args),
                    },
            } => {
                assert_eq!(args.name, "svc.yml");
                assert!(args.watch);
                assert!(args.file.is_some());
            }
            _ => panic!("expected stencil render command"),
        }
    }

    #[test]
    fn parse_env_vars_set() {
        let cli = Cli::parse_from(["cumulo", "env-vars", "set", "FOO", "bar", "-s", "web"]);
        match cli.command {
            Commands::EnvVars {
                command: EnvVarCommands::Set { key, value },
            } => {
                assert_eq!(key, "FOO");
                assert_eq!(value, "bar");
            }
            _ => panic!("expected env-vars set command"),
        }
    }

    #[test]
    fn parse_configuration_upload_no_apply() {
        let cli = Cli::parse_from([
            "cumulo",
            "stacks",
            "configuration",
            "upload",
            "-s",
            "web",
            "-t",
            "service.yml",
            "--source",
            "service.yml",
            "--no-apply",
        ]);
        match cli.command {
            Commands::Stacks {
                command:
                    StackCommands::Configuration {
                        command: ConfigurationCommands::Upload { kind, no_apply, .. },
                    },
            } => {
                assert_eq!(kind, "service.yml");
                assert!(no_apply);
            }
            _ => panic!("expected configuration upload command"),
        }
    }

    #[test]
    fn parse_profiles_create() {
        let cli = Cli::parse_from([
            "cumulo",
            "profiles",
            "create",
            "work",
            "--url",
            "https://api.internal/v3",
        ]);
        match cli.command {
            Commands::Profiles {
                command: ProfileCommands::Create { name, api_url, org },
            } => {
                assert_eq!(name, "work");
                assert_eq!(api_url.as_deref(), Some("https://api.internal/v3"));
                assert!(org.is_none());
            }
            _ => panic!("expected profiles create command"),
        }
    }
}

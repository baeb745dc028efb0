//! Cumulo CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use cumulo_api::{Client, ServiceAction, Stack};
use tracing_subscriber::EnvFilter;

use cumulo_cli::cli::{
    AccountCommands, BundleCommands, Cli, Commands, ConfigurationCommands, ConfigureCommands,
    EnvVarCommands, FormationCommands, ProfileCommands, ServiceCommands, SnapshotCommands,
    SslCommands, StackCommands, StencilCommands,
};
use cumulo_cli::commands::{
    AccountCommand, EnvVarCommand, FormationCommand, ProfileCommand, ServiceCommand,
    SnapshotCommand, StackCommand,
};
use cumulo_cli::config::{self, ProfileStore};
use cumulo_cli::output::OutputFormat;
use cumulo_cli::resolver;
use cumulo_cli::CliError;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    let config_dir = config::config_dir()?;

    // Profile commands work without a client or token.
    if let Commands::Profiles { command } = &cli.command {
        let cmd = ProfileCommand::new(&config_dir);
        return match command {
            ProfileCommands::List => cmd.list(&mut stdout, &format),
            ProfileCommands::Create { name, api_url, org } => {
                cmd.create(&mut stdout, &format, name, api_url.as_deref(), org.as_deref())
            }
            ProfileCommands::Show { name } => cmd.show(&mut stdout, &format, name),
            ProfileCommands::Use { name } => cmd.set_default(&mut stdout, &format, name),
            ProfileCommands::Delete { name } => cmd.delete(&mut stdout, &format, name),
        };
    }

    let client = build_client(&cli, &config_dir).await?;

    match cli.command.clone() {
        Commands::Stacks { command } => {
            let cmd = StackCommand::new(&client);
            match command {
                StackCommands::List(args) => {
                    cmd.list(&mut stdout, &format, &args.names, cli.environment.as_deref(), args.wide)
                        .await
                }
                StackCommands::Create(args) => {
                    cmd.create(&mut stdout, &format, &args, cli.environment.as_deref()).await
                }
                StackCommands::Redeploy(args) => {
                    let stack = require_stack(&client, &cli).await?;
                    cmd.redeploy(&mut stdout, &format, &stack, &args).await
                }
                StackCommands::Restart => {
                    let stack = require_stack(&client, &cli).await?;
                    cmd.restart(&mut stdout, &format, &stack).await
                }
                StackCommands::Reboot(args) => {
                    let stack = require_stack(&client, &cli).await?;
                    cmd.reboot(&mut stdout, &format, &stack, &args).await
                }
                StackCommands::ClearCaches => {
                    let stack = require_stack(&client, &cli).await?;
                    cmd.clear_caches(&mut stdout, &format, &stack).await
                }
                StackCommands::Listen => {
                    let stack = require_stack(&client, &cli).await?;
                    cmd.listen(&mut stdout, &format, &stack.uid).await
                }
                StackCommands::Ssl { command } => {
                    let stack = require_stack(&client, &cli).await?;
                    match command {
                        SslCommands::Add(args) => cmd.ssl_add(&mut stdout, &format, &stack, &args).await,
                    }
                }
                StackCommands::Configure { command } => {
                    let stack = require_stack(&client, &cli).await?;
                    match command {
                        ConfigureCommands::ListVersions { file } => {
                            cmd.config_versions(&mut stdout, &format, &stack, &file).await
                        }
                        ConfigureCommands::Download { file, version, output } => {
                            cmd.config_download(
                                &mut stdout,
                                &format,
                                &stack,
                                &file,
                                version.as_deref(),
                                output.as_deref(),
                            )
                            .await
                        }
                        ConfigureCommands::Upload { path, file, comments } => {
                            cmd.config_upload(
                                &mut stdout,
                                &format,
                                &stack,
                                &file,
                                &path,
                                comments.as_deref(),
                                true,
                            )
                            .await
                        }
                    }
                }
                StackCommands::Configuration { command } => {
                    let stack = require_stack(&client, &cli).await?;
                    match command {
                        ConfigurationCommands::List => cmd.config_list(&mut stdout, &format, &stack).await,
                        ConfigurationCommands::Download { kind, output } => {
                            cmd.config_download(&mut stdout, &format, &stack, &kind, None, output.as_deref())
                                .await
                        }
                        ConfigurationCommands::Upload { kind, source, commit_message, no_apply } => {
                            cmd.config_upload(
                                &mut stdout,
                                &format,
                                &stack,
                                &kind,
                                &source,
                                commit_message.as_deref(),
                                !no_apply,
                            )
                            .await
                        }
                        ConfigurationCommands::Apply { kind } => {
                            cmd.config_apply(&mut stdout, &format, &stack, &kind).await
                        }
                    }
                }
            }
        }
        Commands::Services { command } => {
            let cmd = ServiceCommand::new(&client);
            let stack = require_stack(&client, &cli).await?;
            match command {
                ServiceCommands::List(args) => {
                    cmd.list(&mut stdout, &format, &stack, args.server.as_deref(), args.service.as_deref())
                        .await
                }
                ServiceCommands::Info { name, server } => {
                    cmd.info(&mut stdout, &format, &stack, &name, server.as_deref()).await
                }
                ServiceCommands::Stop(args) => {
                    cmd.action(&mut stdout, &format, &stack, &args.name, ServiceAction::Stop, args.server.as_deref())
                        .await
                }
                ServiceCommands::Pause(args) => {
                    cmd.action(&mut stdout, &format, &stack, &args.name, ServiceAction::Pause, args.server.as_deref())
                        .await
                }
                ServiceCommands::Resume(args) => {
                    cmd.action(&mut stdout, &format, &stack, &args.name, ServiceAction::Resume, args.server.as_deref())
                        .await
                }
                ServiceCommands::Restart(args) => {
                    cmd.action(&mut stdout, &format, &stack, &args.name, ServiceAction::Restart, args.server.as_deref())
                        .await
                }
                ServiceCommands::Scale { name, target } => {
                    cmd.scale(&mut stdout, &format, &stack, &name, &target).await
                }
            }
        }
        Commands::Snapshots { command } => {
            let cmd = SnapshotCommand::new(&client);
            let stack = require_stack(&client, &cli).await?;
            match command {
                SnapshotCommands::List { uids } => cmd.list(&mut stdout, &format, &stack, &uids).await,
                SnapshotCommands::Render(args) => cmd.render(&mut stdout, &format, &stack, &args).await,
            }
        }
        Commands::Formations { command } => {
            let cmd = FormationCommand::new(&client);
            let stack = require_stack(&client, &cli).await?;
            match command {
                FormationCommands::List { names } => cmd.list(&mut stdout, &format, &stack, &names).await,
                FormationCommands::Create(args) => cmd.create(&mut stdout, &format, &stack, &args).await,
                FormationCommands::Fetch(args) => cmd.fetch(&mut stdout, &format, &stack, &args).await,
                FormationCommands::Commit(args) => cmd.commit(&mut stdout, &format, &stack, &args).await,
                FormationCommands::Deploy(args) => cmd.deploy(&mut stdout, &format, &stack, &args).await,
                FormationCommands::Bundle { command } => match command {
                    BundleCommands::Download(args) => {
                        cmd.bundle_download(&mut stdout, &format, &stack, &args).await
                    }
                    BundleCommands::Upload(args) => {
                        cmd.bundle_upload(&mut stdout, &format, &stack, &args).await
                    }
                },
                FormationCommands::Stencils { command } => match command {
                    StencilCommands::List { formation, wide } => {
                        cmd.stencils_list(&mut stdout, &format, &stack, &formation, wide).await
                    }
                    StencilCommands::Show { formation, name } => {
                        cmd.stencil_show(&mut stdout, &stack, &formation, &name).await
                    }
                    StencilCommands::Render(args) => {
                        cmd.stencil_render(&mut stdout, &format, &stack, &args).await
                    }
                    StencilCommands::Add(args) => cmd.stencil_add(&mut stdout, &format, &stack, &args).await,
                },
            }
        }
        Commands::EnvVars { command } => {
            let cmd = EnvVarCommand::new(&client);
            let stack = require_stack(&client, &cli).await?;
            match command {
                EnvVarCommands::List => cmd.list(&mut stdout, &format, &stack).await,
                EnvVarCommands::Set { key, value } => {
                    cmd.set(&mut stdout, &format, &stack, &key, &value).await
                }
            }
        }
        Commands::Accounts { command } => match command {
            AccountCommands::List => AccountCommand::new(&client).list(&mut stdout, &format).await,
        },
        Commands::Profiles { .. } => Ok(()),
    }
}

/// Build the API client for the selected profile, scoped to the selected
/// organization when one is named.
async fn build_client(cli: &Cli, config_dir: &std::path::Path) -> Result<Client, CliError> {
    let store = ProfileStore::load(config_dir)?;
    let profile_name = if cli.profile == "default" {
        store.default_profile.clone().unwrap_or_else(|| "default".to_string())
    } else {
        cli.profile.clone()
    };

    let profile = store.get(&profile_name)?;
    let token = config::resolve_token(config_dir, &profile_name)?;
    let api_url = cli.api_url.as_deref().unwrap_or(&profile.api_url);
    let client = Client::new(api_url, token)?;

    let org = cli.org.clone().or(profile.org);
    match org {
        Some(name) => {
            let accounts = client.accounts().await?;
            let account = resolver::resolve_org(&accounts, &name)?;
            Ok(client.with_account(account.id))
        }
        None => Ok(client),
    }
}

/// Resolve the stack named by `-s`, which most commands require.
async fn require_stack(client: &Client, cli: &Cli) -> Result<Stack, CliError> {
    let name = cli
        .stack
        .as_deref()
        .ok_or_else(|| CliError::InvalidArgument("this command needs a stack: pass -s <name>".into()))?;
    let stacks = client.stacks(None).await?;
    let stack = resolver::resolve_stack(&stacks, name, cli.environment.as_deref())?;
    Ok(stack.clone())
}

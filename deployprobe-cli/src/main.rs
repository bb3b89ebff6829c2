use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use deployprobe_common::{ConfigSource, ProberConfig};
use tracing_subscriber::EnvFilter;

mod config;
mod connectivity;
mod diagnose;
mod docker;
mod health;
mod logs;
mod reachability;
mod remote;
mod render;
mod status;

#[derive(Parser)]
#[command(name = "deployprobe")]
#[command(about = "Production deployment diagnostics over ssh")]
#[command(version)]
struct Cli {
    /// Configuration file (default: DEPLOYPROBE_CONFIG or the standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Target host, overriding the configuration
    #[arg(long, global = true)]
    host: Option<String>,
    /// SSH user, overriding the configuration
    #[arg(long, global = true)]
    user: Option<String>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the network, probe internal reachability, tail error logs and list containers
    Diagnose(diagnose::DiagnoseArgs),
    /// Check the public endpoints from this machine
    Health(health::HealthArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: config::ConfigCommands,
    },
}

/// How a command that ran to completion should exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Degraded,
}

impl Verdict {
    fn exit_code(self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Degraded => 2,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("deployprobe={level},deployprobe_common={level}"))
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(
    path: Option<&Path>,
    host: Option<String>,
    user: Option<String>,
) -> anyhow::Result<(ProberConfig, ConfigSource)> {
    let (mut config, source) =
        ProberConfig::load(path).context("Failed to load configuration")?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(user) = user {
        config.ssh_user = user;
    }
    Ok((config, source))
}

async fn run(cli: Cli) -> anyhow::Result<Verdict> {
    // `config init` never reads the existing configuration
    if let Commands::Config {
        action: config::ConfigCommands::Init { output, force },
    } = cli.command
    {
        return config::init_config(output, force);
    }

    let (config, source) = resolve_config(cli.config.as_deref(), cli.host, cli.user)?;
    match cli.command {
        Commands::Diagnose(args) => {
            config.ensure_valid()?;
            let exec = remote::SshExecutor::from_config(&config);
            tracing::info!("Running diagnostics as {}", exec.destination());
            diagnose::handle_command(args, &config, &exec).await
        }
        Commands::Health(args) => health::handle_command(args, &config).await,
        Commands::Config { action } => config::handle_command(action, &config, &source),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(verdict) => process::exit(verdict.exit_code()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

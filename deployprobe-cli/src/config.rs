use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use deployprobe_common::{ConfigSource, ProberConfig};

use crate::Verdict;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Output format (toml, json, yaml)
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
    /// Write the default configuration to a file
    Init {
        /// Output file path (default: ~/.deployprobe/config.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Validate configuration
    Validate {
        /// Configuration file path to validate (default: the resolved configuration)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

pub fn handle_command(
    command: ConfigCommands,
    config: &ProberConfig,
    source: &ConfigSource,
) -> Result<Verdict> {
    match command {
        ConfigCommands::Show { format } => show_config(config, source, format),
        ConfigCommands::Init { output, force } => init_config(output, force),
        ConfigCommands::Validate { file } => validate_config(config, source, file),
    }
}

fn show_config(config: &ProberConfig, source: &ConfigSource, format: ConfigFormat) -> Result<Verdict> {
    let rendered = match format {
        ConfigFormat::Toml => {
            println!("# Source: {}", source);
            config.to_toml()?
        }
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    println!("{}", rendered);
    Ok(Verdict::Pass)
}

pub fn init_config(output: Option<PathBuf>, force: bool) -> Result<Verdict> {
    let path = match output {
        Some(path) => path,
        None => ProberConfig::default_path()?,
    };
    ProberConfig::default()
        .save(&path, force)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(Verdict::Pass)
}

fn validate_config(
    resolved: &ProberConfig,
    source: &ConfigSource,
    file: Option<PathBuf>,
) -> Result<Verdict> {
    let (config, origin) = match file {
        Some(path) => {
            let config = ProberConfig::from_file(&path)?;
            (config, path.display().to_string())
        }
        None => (resolved.clone(), source.to_string()),
    };

    let result = config.validate();
    println!("Validating {}", origin);
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
    for error in &result.errors {
        println!("  error: {}", error);
    }

    if result.is_valid() {
        println!("Configuration is valid");
        Ok(Verdict::Pass)
    } else {
        anyhow::bail!("configuration has {} error(s)", result.errors.len())
    }
}

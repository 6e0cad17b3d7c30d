use clap::{Parser, Subcommand};
use std::path::PathBuf;

use haven_config::{ConfigLoader, HavenConfig};
use haven_core::HavenError;

mod doctor;
mod shelters;
mod start;

/// Haven: agent-assisted matching between animal shelters, adopters and donors
#[derive(Parser)]
#[command(name = "haven", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to haven.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the agents and serve the HTTP API
    Start,
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check configuration, storage and the chain endpoint
    Doctor {
        /// Skip the RPC reachability check
        #[arg(long)]
        offline: bool,
    },
    /// Administer stored shelters
    Shelters {
        #[command(subcommand)]
        action: ShelterAction,
    },
    /// Show version and build info
    Version,
}

#[derive(Subcommand)]
enum ShelterAction {
    /// List stored shelters
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a shelter with its announcement flag and chat thread
    Delete { id: String },
}

/// Pick the log level: `--verbose` > `--quiet` > `--log-level` > config.
fn resolve_log_level<'a>(
    verbose: bool,
    quiet: bool,
    flag: Option<&'a str>,
    configured: &'a str,
) -> &'a str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        flag.unwrap_or(configured)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over every other setting.
fn init_tracing(level: &str, format: &str) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };
    match format {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .json()
            .with_target(true)
            .init(),
        "compact" => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .compact()
            .with_target(false)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .pretty()
            .with_target(false)
            .init(),
    }
}

impl Cli {
    pub async fn run(self) -> haven_core::Result<()> {
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        let level = resolve_log_level(
            self.verbose,
            self.quiet,
            self.log_level.as_deref(),
            &config.logging.level,
        );
        init_tracing(level, &config.logging.format);

        match self.command {
            Commands::Start => start::cmd_start(config).await,
            Commands::Config { json } => cmd_config(&config, json),
            Commands::Doctor { offline } => {
                doctor::cmd_doctor(&config, config_loader.path(), offline).await
            }
            Commands::Shelters { action } => match action {
                ShelterAction::List { json } => shelters::cmd_list(&config, json),
                ShelterAction::Delete { id } => shelters::cmd_delete(&config, &id),
            },
            Commands::Version => cmd_version(),
        }
    }
}

/// Print the effective configuration with credentials masked.
fn cmd_config(config: &HavenConfig, json: bool) -> haven_core::Result<()> {
    let mut shown = config.clone();
    for secret in [
        &mut shown.services.anthropic_api_key,
        &mut shown.services.openai_api_key,
        &mut shown.server.api_key,
    ] {
        if secret.is_some() {
            *secret = Some("********".into());
        }
    }

    let rendered = if json {
        serde_json::to_string_pretty(&shown)?
    } else {
        toml::to_string_pretty(&shown).map_err(|e| HavenError::Config(e.to_string()))?
    };
    println!("{rendered}");
    Ok(())
}

fn cmd_version() -> haven_core::Result<()> {
    println!("🐾 Haven v{}", env!("CARGO_PKG_VERSION"));
    println!("   Target: {}", std::env::consts::ARCH);
    println!("   OS: {}", std::env::consts::OS);
    #[cfg(debug_assertions)]
    println!("   Profile: debug");
    #[cfg(not(debug_assertions))]
    println!("   Profile: release");
    Ok(())
}

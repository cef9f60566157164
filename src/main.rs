use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seadex_monitor::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "seadex-monitor",
    version,
    about = "Keeps Sonarr anime in sync with SeaDex best releases and sends them to qBittorrent",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $SEADEX_MONITOR_CONFIG or ./config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor: startup pass, scheduled passes and webhook listener
    Run,

    /// Run a single pass and print its report
    Sync {
        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print the effective configuration with secrets masked
    Config,

    /// Summarize the persisted snapshot
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("seadex-monitor starting");

    match cli.command {
        Commands::Run => {
            tracing::info!(
                interval_secs = config.sync.interval_secs,
                webhook = config.webhook.enabled,
                startup_scan = config.sync.startup_scan,
                "Starting run command"
            );
            commands::run(config).await?;
        }

        Commands::Sync { json } => {
            tracing::info!("Starting sync command");
            commands::sync(config, json).await?;
        }

        Commands::Config => {
            commands::show_config(&config)?;
        }

        Commands::Status => {
            commands::status(&config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let default_directive = if verbose {
        "seadex_monitor=debug,info".to_string()
    } else {
        format!("seadex_monitor={level},warn")
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use circlesadmin_core::config::Config;
use circlesadmin_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use circlesadmin_core::metrics::init_metrics;
use circlesadmin_core::AdminServer;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "circlesadmin")]
#[command(author, version, about = "Administrative HTTP API for circles", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error); overrides the config
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the admin API
    Serve {
        /// Bind address, overriding the config
        #[arg(long)]
        addr: Option<SocketAddr>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Serve { addr } => {
            init_logging_with_config(log_config(&args.log_level, args.json_logs, &config))?;
            init_metrics();

            let mut server = AdminServer::in_memory(&config)?;
            if let Some(addr) = addr {
                server = server.with_addr(addr);
            }

            info!(addr = %server.addr(), base_path = %config.server.base_path, "circlesadmin starting");
            server.run(shutdown_signal()).await?;
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Config file settings, with command-line flags taking precedence
fn log_config(level: &Option<String>, json_logs: bool, config: &Config) -> LogConfig {
    let mut log_config = LogConfig::from(&config.logging);
    if let Some(level) = level {
        match level.parse::<LogLevel>() {
            Ok(level) => log_config.level = level,
            Err(e) => eprintln!("{}, using '{}'", e, log_config.level),
        }
    }
    if json_logs {
        log_config.json_format = true;
    }
    log_config
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

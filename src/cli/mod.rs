//! Command-line entry points.

pub mod doctor;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::ConfigError;
use crate::web::{GatewayState, ServerOptions, start_server};

#[derive(Parser, Debug)]
#[command(name = "ouf-gateway", version, about = "Wallet-authenticated assistant gateway")]
pub struct Cli {
    /// TOML settings file. Defaults to ~/.ouf/config.toml when present.
    #[arg(long, global = true, env = "OUF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Check configuration and upstream reachability.
    Doctor {
        /// Exit non-zero when any check fails.
        #[arg(long)]
        strict: bool,
    },
}

/// Dispatch a command against the already-loaded configuration.
pub async fn run(
    command: Option<Command>,
    config: Result<Config, ConfigError>,
) -> anyhow::Result<()> {
    match command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config?).await,
        Command::Doctor { strict } => doctor::run_doctor_command(config, strict).await,
    }
}

/// Start the server and run until Ctrl-C.
pub async fn run_serve(config: Config) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    let options = ServerOptions {
        cors_origins: config.server.cors_origins.clone(),
        max_body_bytes: config.server.max_body_bytes,
    };
    let state = Arc::new(GatewayState::from_config(&config));

    tracing::info!(
        registry = %config.registry.base_url,
        ask = %config.chat.base_url,
        require_wallet = config.chat.require_wallet,
        "Starting gateway"
    );
    let server = start_server(addr, state, options).await?;

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}

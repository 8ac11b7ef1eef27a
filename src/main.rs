use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ouf_gateway::cli::{Cli, run};
use ouf_gateway::config::{Config, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    ouf_gateway::bootstrap::load_ouf_env();
    let cli = Cli::parse();

    // Loaded before the subscriber so the configured log format applies.
    let config = Config::from_env_with_toml(cli.config.as_deref());
    let log_format = match &config {
        Ok(config) => config.server.log_format,
        Err(_) => LogFormat::from_env(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ouf_gateway=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);
    match log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    run(cli.command, config).await
}

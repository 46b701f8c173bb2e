use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::init_logging;
use bic_runtime::config::{resolve_config_path, DEFAULT_LOG_LEVEL};
use bic_runtime::{load_config, LoadedConfig};
use serde::Deserialize;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    // the file may set the level, so peek at it before logging is up
    let configured_level = match cli.log_level.clone() {
        Some(level) => level,
        None => peek_log_level(&cli).await,
    };
    init_logging(&configured_level, cli.debug)?;

    info!("Starting bic v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig { config, path } = load_config(cli.config.as_deref()).await?;
    let ctx = CliContext::new(config, path);

    match dispatch(&cli, &ctx).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}

#[derive(Deserialize)]
struct LogLevelOnly {
    #[serde(default)]
    log_level: Option<String>,
}

async fn peek_log_level(cli: &CliArgs) -> String {
    let path = resolve_config_path(cli.config.as_deref());
    tokio::fs::read_to_string(&path)
        .await
        .ok()
        .and_then(|content| serde_yaml::from_str::<LogLevelOnly>(&content).ok())
        .and_then(|file| file.log_level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::gateway;
use crate::unfurl::{UnfurlOutcome, Unfurler};
use anyhow::{Context, Result};
use std::time::Duration;

/// Load config for the parsed CLI: explicit `--config` or the home default.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load_or_init(),
    }
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Fetch { url, deadline_ms } => {
            let outcome = run_fetch(&config, &url, deadline_ms).await?;
            let json =
                serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
            println!("{json}");
            Ok(())
        }
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, config).await
        }
    }
}

async fn run_fetch(config: &Config, url: &str, deadline_ms: Option<u64>) -> Result<UnfurlOutcome> {
    let unfurler = Unfurler::from_config(config)?;
    let deadline = deadline_ms.map_or_else(|| unfurler.deadline(), Duration::from_millis);
    Ok(unfurler.unfurl_within(url, deadline).await)
}

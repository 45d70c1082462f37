//! thor-rpc binary
//!
//! Serves the Ethereum JSON-RPC provider over HTTP in front of a native node.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use thor_rpc::{Config, Provider, RpcServer};
use thor_sdk::LocalWallet;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding comma-separated hex private keys
const PRIVATE_KEYS_ENV: &str = "THOR_RPC_PRIVATE_KEYS";

/// Ethereum JSON-RPC provider for Thor nodes
#[derive(Parser, Debug, Clone)]
#[command(name = "thor-rpc")]
#[command(about = "Ethereum JSON-RPC provider for Thor nodes")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Native node URL, overrides the configuration file
    #[arg(long)]
    node_url: Option<String>,

    /// RPC server listen address, overrides the configuration file
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Configuration file merged with command line overrides
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config from {:?}", path))?,
            None => Config::default(),
        };
        if let Some(node_url) = &self.node_url {
            config.provider.node_url = node_url.clone();
        }
        if let Some(listen) = self.listen {
            config.server.listen_addr = listen;
        }
        if let Some(level) = &self.log_level {
            config.provider.log_level = level.clone();
        }
        Ok(config)
    }
}

/// Keys from a comma-separated list, blanks skipped
fn parse_private_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.provider.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tracing::info!("thor-rpc starting...");

    let keys = std::env::var(PRIVATE_KEYS_ENV)
        .map(|raw| parse_private_keys(&raw))
        .unwrap_or_default();
    let provider = if keys.is_empty() {
        Provider::connect(config.provider.clone())?
    } else {
        let wallet = LocalWallet::from_private_keys(&keys)
            .with_context(|| format!("invalid key in {}", PRIVATE_KEYS_ENV))?;
        Provider::connect_with_wallet(config.provider.clone(), Arc::new(wallet))?
    };
    let provider = Arc::new(provider);

    let server = RpcServer::new(config.server.clone(), Arc::clone(&provider));
    tokio::select! {
        result = server.run() => result.context("RPC server failed")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
    }

    provider.close();
    tracing::info!("thor-rpc stopped");

    Ok(())
}

//! Operator entry point: analyze one or more wallet addresses and print the
//! results as JSON.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::SecretString;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wallet_risk_engine::app::{RiskEngineConfig, RiskService};
use wallet_risk_engine::infra::{BasescanClient, MetaSleuthProvider};

/// Application configuration
struct Config {
    /// Basescan API key (optional - public rate limits apply if not set)
    basescan_api_key: Option<SecretString>,
    /// Basescan API base URL (optional - uses Base Sepolia if not set)
    basescan_api_url: Option<String>,
    /// MetaSleuth API key (optional - AML factor omitted if not set)
    metasleuth_api_key: Option<SecretString>,
    /// MetaSleuth API base URL (optional - uses default if not set)
    metasleuth_api_url: Option<String>,
    engine: RiskEngineConfig,
}

impl Config {
    fn from_env() -> Self {
        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            basescan_api_key: non_empty("BASESCAN_API_KEY").map(SecretString::from),
            basescan_api_url: non_empty("BASESCAN_API_URL"),
            metasleuth_api_key: non_empty("METASLEUTH_API_KEY").map(SecretString::from),
            metasleuth_api_url: non_empty("METASLEUTH_API_URL"),
            engine: RiskEngineConfig::from_env(),
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wallet_risk_engine=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn analyze_all(service: &RiskService, addresses: &[String]) -> Result<usize> {
    let mut failures = 0;
    for address in addresses {
        match service.analyze_wallet(address).await {
            Ok(analysis) => {
                let json = serde_json::to_string_pretty(&analysis)
                    .context("Failed to serialize risk analysis")?;
                println!("{}", json);
            }
            Err(e) => {
                error!(address = %address, error = %e, "Analysis failed");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let addresses: Vec<String> = env::args().skip(1).collect();
    if addresses.is_empty() {
        anyhow::bail!("Usage: wallet-risk <address> [<address>...]");
    }

    info!("Wallet Risk Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    let onchain = BasescanClient::new(
        config.basescan_api_key.clone(),
        config.basescan_api_url.clone(),
        config.engine.fetch_timeout,
    )
    .context("Failed to create Basescan client")?;

    let aml_provider = MetaSleuthProvider::new(
        config.metasleuth_api_key.clone(),
        config.metasleuth_api_url.clone(),
        config.engine.fetch_timeout,
    )
    .context("Failed to create MetaSleuth provider")?;
    if aml_provider.is_mock_mode() {
        warn!("AML provider has no API key - scores will omit the AML factor");
    }

    let service = RiskService::new(Arc::new(onchain), Arc::new(aml_provider), config.engine);
    let sweeper = service.start_cache_sweeper();

    let failures = tokio::select! {
        result = analyze_all(&service, &addresses) => result?,
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, aborting");
            addresses.len()
        }
    };

    sweeper.shutdown().await;

    if failures > 0 {
        anyhow::bail!("{} of {} analyses failed", failures, addresses.len());
    }
    Ok(())
}

//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{ConfigError, Result};
use crate::session::AccountAddress;

/// Address the carpooling module is published under on devnet.
pub const DEFAULT_CONTRACT_ADDRESS: &str =
    "0x82cc89e747697f4a8d44d7e32cb5ad0e0c784d0dddefff16cf74fcff7462c6a6";

#[derive(Debug, Clone)]
pub struct Config {
    /// Fullnode REST endpoint (e.g. https://fullnode.devnet.aptoslabs.com)
    pub node_url: String,
    /// Account the contract module is published under
    pub contract_address: AccountAddress,
    /// Name of the contract module
    pub contract_module: String,
    /// Base URL of the wallet bridge
    pub wallet_url: String,
    /// Provider name passed to the wallet on connect
    pub wallet_provider: String,
    /// Port for the HTTP API
    pub api_port: u16,
    /// Request timeout for node calls, connect timeout for the wallet bridge
    pub http_timeout: Duration,
    /// Delay between polls of a pending transaction
    pub poll_interval: Duration,
    /// Upper bound on the finality wait; `None` waits as long as the node does
    pub finality_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let contract_address = var("CONTRACT_ADDRESS", DEFAULT_CONTRACT_ADDRESS)
            .parse()
            .map_err(|e| ConfigError(format!("Invalid CONTRACT_ADDRESS: {e}")))?;

        let finality_timeout = match lookup("FINALITY_TIMEOUT_SECS").as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse::<u64>("FINALITY_TIMEOUT_SECS", raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };

        let http_timeout = match parse::<u64>(
            "HTTP_TIMEOUT_SECS",
            &var("HTTP_TIMEOUT_SECS", "30"),
        )? {
            0 => return Err(ConfigError("HTTP_TIMEOUT_SECS must be positive".into())),
            secs => Duration::from_secs(secs),
        };

        Ok(Config {
            node_url: var("NODE_URL", "https://fullnode.devnet.aptoslabs.com")
                .trim_end_matches('/')
                .to_string(),
            contract_address,
            contract_module: var("CONTRACT_MODULE", "carpooling"),
            wallet_url: var("WALLET_URL", "http://127.0.0.1:8787")
                .trim_end_matches('/')
                .to_string(),
            wallet_provider: var("WALLET_PROVIDER", "Petra"),
            api_port: parse("API_PORT", &var("API_PORT", "3001"))?,
            http_timeout,
            poll_interval: Duration::from_millis(parse(
                "POLL_INTERVAL_MS",
                &var("POLL_INTERVAL_MS", "500"),
            )?),
            finality_timeout,
        })
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError(format!("Invalid {key}")))
}

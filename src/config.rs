//! Client configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::tron::types::{USDT_CONTRACT_ADDRESS, USDT_CONTRACT_ADDRESS_NILE, USDT_CONTRACT_ADDRESS_TESTNET};
use crate::tron_error::TronError;

/// TRON network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    /// Shasta testnet.
    Shasta,
    /// Nile testnet.
    Nile,
}

impl Network {
    /// Public TronGrid endpoint.
    pub fn base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.trongrid.io",
            Network::Shasta => "https://api.shasta.trongrid.io",
            Network::Nile => "https://nile.trongrid.io",
        }
    }

    /// USDT (TRC20) contract deployed on this network.
    pub fn usdt_contract(&self) -> &'static str {
        match self {
            Network::Mainnet => USDT_CONTRACT_ADDRESS,
            Network::Shasta => USDT_CONTRACT_ADDRESS_TESTNET,
            Network::Nile => USDT_CONTRACT_ADDRESS_NILE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Shasta => "shasta",
            Network::Nile => "nile",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = TronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "shasta" | "testnet" => Ok(Network::Shasta),
            "nile" => Ok(Network::Nile),
            other => Err(TronError::Config(format!(
                "unsupported network: {}. Valid options: mainnet, shasta, nile",
                other
            ))),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TronConfig {
    /// Network the default endpoints and USDT contract are taken from.
    #[serde(default)]
    pub network: Network,
    /// Full node URL. Defaults to the network's TronGrid endpoint.
    #[serde(default)]
    pub full_node: Option<String>,
    /// Solidity node URL. Defaults to the full node.
    #[serde(default)]
    pub solidity_node: Option<String>,
    /// Event server URL. Defaults to the full node.
    #[serde(default)]
    pub event_server: Option<String>,
    /// TronGrid API key, sent as `TRON-PRO-API-KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// TronGrid API version used for `/{version}/accounts/...` routes.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Attempts made by read-only requests before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Upper bound of the back-off between retries in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Number of contracts whose metadata is kept in memory.
    #[serde(default = "default_metadata_cache_capacity")]
    pub metadata_cache_capacity: usize,
    /// fee_limit (sun) attached to TRC20 transfers.
    #[serde(default = "default_fee_limit")]
    pub fee_limit: u64,
    /// Hex private key used to sign transactions.
    #[serde(default)]
    pub private_key: Option<String>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_metadata_cache_capacity() -> usize {
    256
}

/// 30 TRX.
fn default_fee_limit() -> u64 {
    30_000_000
}

impl Default for TronConfig {
    fn default() -> Self {
        Self::for_network(Network::Mainnet)
    }
}

impl TronConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            full_node: None,
            solidity_node: None,
            event_server: None,
            api_key: None,
            api_version: default_api_version(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            metadata_cache_capacity: default_metadata_cache_capacity(),
            fee_limit: default_fee_limit(),
            private_key: None,
        }
    }

    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, TronError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TronError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TronError> {
        toml::from_str(content)
            .map_err(|e| TronError::Config(format!("failed to parse config: {}", e)))
    }

    pub fn to_toml_string(&self) -> Result<String, TronError> {
        toml::to_string_pretty(self)
            .map_err(|e| TronError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Apply `TRON_*` environment variables on top of the loaded values.
    pub fn apply_env_overrides(&mut self) -> Result<(), TronError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), TronError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = lookup("TRON_NETWORK") {
            self.network = network.parse()?;
        }
        if let Some(key) = lookup("TRON_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("TRON_FULL_NODE") {
            self.full_node = Some(url);
        }
        if let Some(url) = lookup("TRON_SOLIDITY_NODE") {
            self.solidity_node = Some(url);
        }
        if let Some(url) = lookup("TRON_EVENT_SERVER") {
            self.event_server = Some(url);
        }
        if let Some(key) = lookup("TRON_PRIVATE_KEY").filter(|k| !k.is_empty()) {
            self.private_key = Some(key);
        }
        Ok(())
    }

    pub fn full_node_url(&self) -> String {
        self.full_node
            .clone()
            .unwrap_or_else(|| self.network.base_url().to_string())
    }

    pub fn solidity_node_url(&self) -> String {
        self.solidity_node
            .clone()
            .unwrap_or_else(|| self.full_node_url())
    }

    pub fn event_server_url(&self) -> String {
        self.event_server
            .clone()
            .unwrap_or_else(|| self.full_node_url())
    }
}

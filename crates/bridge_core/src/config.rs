use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::kind::WalletKind;

// ---------------------------------------------------------------------------
// Solana cluster
// ---------------------------------------------------------------------------

/// Solana cluster used for balance RPC calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolanaCluster {
    MainnetBeta,
    Devnet,
    Testnet,
    Custom(String),
}

impl SolanaCluster {
    /// JSON-RPC endpoint for the cluster.
    pub fn url(&self) -> &str {
        match self {
            SolanaCluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            SolanaCluster::Devnet => "https://api.devnet.solana.com",
            SolanaCluster::Testnet => "https://api.testnet.solana.com",
            SolanaCluster::Custom(url) => url,
        }
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Bridge routes
// ---------------------------------------------------------------------------

/// Contract addresses for one supported (source, dest) pair.
///
/// Addresses and calldata are opaque to this crate; the external bridge
/// service decides what they mean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub source: WalletKind,
    pub dest: WalletKind,
    pub bridge_contract: String,
    #[serde(default)]
    pub token_contract: Option<String>,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
    #[serde(default = "default_calldata")]
    pub calldata: String,
}

fn default_token_decimals() -> u32 {
    6
}

fn default_calldata() -> String {
    "0x".into()
}

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.tribridge/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub solana_cluster: SolanaCluster,

    // Polling
    pub widget_poll_secs: u64,
    pub dashboard_poll_secs: u64,

    // Timeouts
    pub connect_timeout_secs: u64,
    pub transfer_timeout_secs: u64,
    /// Per-request bound on Solana JSON-RPC balance calls.
    pub rpc_timeout_secs: u64,
    pub evm_confirmations: u64,

    // Session
    pub auto_connect: Vec<WalletKind>,
    pub default_selection: WalletKind,
    pub routes: Vec<RouteConfig>,

    // General
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            solana_cluster: SolanaCluster::MainnetBeta,
            widget_poll_secs: 30,
            dashboard_poll_secs: 60,
            connect_timeout_secs: 60,
            transfer_timeout_secs: 300,
            rpc_timeout_secs: 15,
            evm_confirmations: 1,
            auto_connect: vec![WalletKind::Evm, WalletKind::Tron],
            default_selection: WalletKind::Evm,
            routes: Vec::new(),
            log_level: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Returns the base config directory: `~/.tribridge/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".tribridge"))
    }

    /// Returns the config file path: `~/.tribridge/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.tribridge/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Returns the growth record store: `~/.tribridge/growth.json`
    pub fn growth_store_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("growth.json"))
    }

    /// Loads config from disk, or creates default if missing.
    pub fn load() -> Result<Self> {
        let base = Self::base_dir()?;
        std::fs::create_dir_all(&base)
            .with_context(|| format!("Failed to create directory: {}", base.display()))?;
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            config.validate()?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Reject settings the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.widget_poll_secs == 0 || self.dashboard_poll_secs == 0 {
            anyhow::bail!("poll periods must be at least one second");
        }
        if self.connect_timeout_secs == 0
            || self.transfer_timeout_secs == 0
            || self.rpc_timeout_secs == 0
        {
            anyhow::bail!("timeouts must be at least one second");
        }
        if let SolanaCluster::Custom(url) = &self.solana_cluster {
            if !validate_url(url) {
                anyhow::bail!("invalid Solana RPC URL: {url}");
            }
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if route.source == route.dest {
                anyhow::bail!("route {} -> {} bridges a chain to itself", route.source, route.dest);
            }
            if route.bridge_contract.trim().is_empty() {
                anyhow::bail!("route {} -> {} has no bridge contract", route.source, route.dest);
            }
            if !seen.insert((route.source, route.dest)) {
                anyhow::bail!("duplicate route {} -> {}", route.source, route.dest);
            }
        }
        Ok(())
    }

    /// Look up the configured route for a pair.
    pub fn route(&self, source: WalletKind, dest: WalletKind) -> Option<&RouteConfig> {
        self.routes
            .iter()
            .find(|r| r.source == source && r.dest == dest)
    }

    pub fn widget_poll_interval(&self) -> Duration {
        Duration::from_secs(self.widget_poll_secs)
    }

    pub fn dashboard_poll_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_poll_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

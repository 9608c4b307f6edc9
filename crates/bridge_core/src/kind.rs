use std::fmt;

use serde::{Deserialize, Serialize};

/// The wallet ecosystems a user can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Evm,
    Tron,
    Solana,
}

impl WalletKind {
    pub const ALL: [WalletKind; 3] = [WalletKind::Evm, WalletKind::Tron, WalletKind::Solana];

    /// Human-readable label for balance widgets.
    pub fn label(&self) -> &'static str {
        match self {
            WalletKind::Evm => "Ethereum (ETH)",
            WalletKind::Tron => "Tron (TRX)",
            WalletKind::Solana => "Solana (SOL)",
        }
    }

    /// Display unit of the chain's native asset.
    pub fn unit(&self) -> &'static str {
        match self {
            WalletKind::Evm => "ETH",
            WalletKind::Tron => "TRX",
            WalletKind::Solana => "SOL",
        }
    }

    /// Name of the smallest indivisible unit.
    pub fn native_unit(&self) -> &'static str {
        match self {
            WalletKind::Evm => "wei",
            WalletKind::Tron => "sun",
            WalletKind::Solana => "lamport",
        }
    }

    /// Number of decimal places between the native unit and the display unit.
    pub fn native_decimals(&self) -> u32 {
        match self {
            WalletKind::Evm => 18,
            WalletKind::Tron => 6,
            WalletKind::Solana => 9,
        }
    }

    /// Tag used in persisted storage keys. These match the wallet names the
    /// dashboard has always written, so existing records stay readable.
    pub fn storage_tag(&self) -> &'static str {
        match self {
            WalletKind::Evm => "metamask",
            WalletKind::Tron => "tronlink",
            WalletKind::Solana => "solana",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Evm => f.write_str("evm"),
            WalletKind::Tron => f.write_str("tron"),
            WalletKind::Solana => f.write_str("solana"),
        }
    }
}

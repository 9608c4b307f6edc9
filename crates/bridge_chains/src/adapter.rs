use async_trait::async_trait;
use bridge_core::{RouteConfig, WalletKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::units::{self, DISPLAY_PLACES};

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Connection lifecycle of one wallet kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(String),
    Failed(String),
}

impl ConnectionState {
    /// Address of a connected wallet.
    pub fn address(&self) -> Option<&str> {
        match self {
            ConnectionState::Connected(address) => Some(address.as_str()),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Connecting)
    }
}

// ---------------------------------------------------------------------------
// Balance snapshot
// ---------------------------------------------------------------------------

/// One successful balance reading. Superseded, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub kind: WalletKind,
    pub amount: Decimal,
    pub unit: String,
    pub fetched_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(kind: WalletKind, amount: Decimal) -> Self {
        Self {
            kind,
            amount,
            unit: kind.unit().to_string(),
            fetched_at: Utc::now(),
        }
    }

    /// Build a snapshot from a native integer balance.
    pub fn from_native(kind: WalletKind, native: u128) -> Result<Self, ChainError> {
        let amount = units::to_display(native, kind.native_decimals())
            .map_err(|e| ChainError::QueryError(e.to_string()))?;
        Ok(Self::new(kind, amount))
    }

    /// `1.2345 ETH`
    pub fn display(&self) -> String {
        format!("{} {}", units::format_display(self.amount, DISPLAY_PLACES), self.unit)
    }
}

// ---------------------------------------------------------------------------
// Transfer request
// ---------------------------------------------------------------------------

/// A validated bridge transfer: both wallets connected, amount positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    source_kind: WalletKind,
    dest_kind: WalletKind,
    amount: Decimal,
    source_address: String,
    dest_address: String,
}

impl TransferRequest {
    /// Returns `None` unless the amount is positive, the chains differ and
    /// both addresses are present.
    pub fn new(
        source_kind: WalletKind,
        dest_kind: WalletKind,
        amount: Decimal,
        source_address: impl Into<String>,
        dest_address: impl Into<String>,
    ) -> Option<Self> {
        let source_address = source_address.into();
        let dest_address = dest_address.into();
        if amount <= Decimal::ZERO
            || source_kind == dest_kind
            || source_address.is_empty()
            || dest_address.is_empty()
        {
            return None;
        }
        Some(Self {
            source_kind,
            dest_kind,
            amount,
            source_address,
            dest_address,
        })
    }

    pub fn source_kind(&self) -> WalletKind {
        self.source_kind
    }

    pub fn dest_kind(&self) -> WalletKind {
        self.dest_kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn dest_address(&self) -> &str {
        &self.dest_address
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Uniform capability over one chain's wallet provider.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn kind(&self) -> WalletKind;

    /// Request account access. Returns the address in the chain's canonical
    /// encoding.
    async fn connect(&self) -> Result<String, ChainError>;

    /// Drop the connection. For providers without a real disconnect this
    /// is a no-op and does not revoke permissions.
    async fn disconnect(&self) -> Result<(), ChainError>;

    /// Query the balance and convert it to display units.
    async fn get_balance(&self, address: &str) -> Result<BalanceSnapshot, ChainError>;

    /// Build, sign and submit the source leg toward `route.bridge_contract`.
    /// Succeeds once the chain accepts the transaction into its pending pool.
    async fn build_and_submit_transfer(
        &self,
        request: &TransferRequest,
        route: &RouteConfig,
    ) -> Result<String, ChainError>;

    /// Wait for the chain's own acceptance acknowledgment of a submitted
    /// transaction.
    async fn confirm_transfer(&self, _tx_hash: &str) -> Result<(), ChainError> {
        Ok(())
    }
}

//! Session-level error types.

use std::time::Duration;

use bridge_core::WalletKind;

/// Errors raised while validating or driving a bridge transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A wallet needed by the transfer is not connected.
    #[error("{0} wallet is not connected")]
    MissingWallet(WalletKind),

    /// The entered amount is empty, non-numeric or not positive.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    /// Another transfer is still submitting or awaiting confirmation.
    #[error("a bridge transfer is already in progress")]
    TransferInProgress,

    /// No bridge route is configured for the pair.
    #[error("no bridge route from {from} to {to}")]
    UnsupportedRoute { from: WalletKind, to: WalletKind },

    /// Source-chain submission or confirmation failed.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// A provider call did not resolve in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl BridgeError {
    /// Caller input errors are raised before any network call.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingWallet(_)
                | Self::InvalidAmount(_)
                | Self::TransferInProgress
                | Self::UnsupportedRoute { .. }
        )
    }

    /// Toast title for this error.
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingWallet(_) => "Missing Information",
            Self::InvalidAmount(_) => "Invalid Amount",
            Self::TransferInProgress => "Bridge Busy",
            Self::UnsupportedRoute { .. } => "Unsupported Route",
            Self::TransferFailed(_) | Self::Timeout(_) => "Bridge Failed",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::MissingWallet(kind) => {
                format!("Connect your {} wallet before bridging.", kind.label())
            }
            Self::InvalidAmount(_) => "Please enter a valid amount greater than 0.".into(),
            Self::TransferInProgress => {
                "Wait for the current transfer to finish before starting another.".into()
            }
            Self::UnsupportedRoute { from, to } => {
                format!("Bridging from {} to {} is not supported.", from.label(), to.label())
            }
            Self::TransferFailed(reason) => reason.clone(),
            Self::Timeout(after) => format!("timed out after {after:?} waiting for the wallet"),
        }
    }
}

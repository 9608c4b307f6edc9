use bridge_core::WalletKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 "user rejected request" code.
const USER_REJECTED_CODE: i64 = 4001;

/// A raw failure reported by a wallet provider, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFault {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// The user declined a provider prompt. EVM wallets report code 4001;
    /// TronLink and Solana wallets only say so in the message.
    pub fn is_user_rejection(&self) -> bool {
        if self.code == Some(USER_REJECTED_CODE) {
            return true;
        }
        let msg = self.message.to_lowercase();
        msg.contains("rejected") || msg.contains("declined") || msg.contains("denied")
    }
}

/// Errors returned by chain adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("{0} wallet provider is not installed")]
    ProviderMissing(WalletKind),

    #[error("request rejected by user: {0}")]
    UserRejected(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("balance query failed: {0}")]
    QueryError(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ChainError {
    /// Classify a fault raised while connecting or submitting.
    pub fn from_fault(fault: ProviderFault) -> Self {
        if fault.is_user_rejection() {
            Self::UserRejected(fault.message)
        } else {
            Self::ProviderError(fault.message)
        }
    }

    /// Classify a fault raised while querying a balance.
    pub fn query(fault: ProviderFault) -> Self {
        Self::QueryError(fault.message)
    }

    /// Transport and provider-internal failures can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderError(_) | Self::QueryError(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderMissing(kind) => {
                format!("Please install the {} wallet extension.", provider_name(*kind))
            }
            Self::UserRejected(_) => "The request was declined in the wallet.".into(),
            Self::ProviderError(msg) => msg.clone(),
            Self::QueryError(_) => "Could not fetch the balance. Will retry.".into(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::Unsupported(msg) => msg.clone(),
        }
    }
}

/// Name of the wallet product users see for each kind.
pub fn provider_name(kind: WalletKind) -> &'static str {
    match kind {
        WalletKind::Evm => "MetaMask",
        WalletKind::Tron => "TronLink",
        WalletKind::Solana => "Solana",
    }
}

//! Chain adapters for the three wallet ecosystems.
//!
//! Each adapter wraps an injected wallet-provider capability (the browser
//! extension or wallet-adapter on the host side) behind the uniform
//! [`ChainAdapter`] interface. Absent providers surface as
//! [`ChainError::ProviderMissing`] rather than as missing objects.

pub mod adapter;
pub mod address;
pub mod error;
pub mod evm;
pub mod provider;
pub mod solana;
pub mod tron;
pub mod units;

// Re-export primary types for convenient access.
pub use adapter::{BalanceSnapshot, ChainAdapter, ConnectionState, TransferRequest};
pub use error::{ChainError, ProviderFault};
pub use evm::EvmAdapter;
pub use provider::{
    EvmProvider, EvmReceipt, EvmTransaction, SolanaBalanceRpc, SolanaWalletProvider,
    TronBroadcast, TronProvider,
};
pub use solana::{HttpSolanaRpc, SolanaAdapter};
pub use tron::TronAdapter;

//! Wallet-provider capabilities injected by the host environment.
//!
//! These mirror what the browser extensions expose (an EIP-1193 provider,
//! TronLink's `tronWeb`, a Solana wallet adapter). Key custody, signing and
//! RPC transport all live behind these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderFault;

// ---------------------------------------------------------------------------
// EVM
// ---------------------------------------------------------------------------

/// A transaction handed to the EVM provider for signing and submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTransaction {
    pub from: String,
    pub to: String,
    /// Value in wei.
    pub value: u128,
    /// Hex-encoded calldata, `0x`-prefixed.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    /// `false` when the transaction reverted.
    pub status: bool,
}

#[async_trait]
pub trait EvmProvider: Send + Sync {
    /// `eth_requestAccounts`.
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderFault>;

    /// Balance in wei.
    async fn get_balance(&self, address: &str) -> Result<u128, ProviderFault>;

    /// Sign and submit; returns the transaction hash once it is in the pending pool.
    async fn send_transaction(&self, tx: &EvmTransaction) -> Result<String, ProviderFault>;

    /// Wait until the transaction is mined with `confirmations` blocks on top.
    async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        confirmations: u64,
    ) -> Result<EvmReceipt, ProviderFault>;
}

// ---------------------------------------------------------------------------
// Tron
// ---------------------------------------------------------------------------

/// Acknowledgment returned by `trx.sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TronBroadcast {
    pub result: bool,
    pub txid: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait TronProvider: Send + Sync {
    /// TronLink `tron_requestAccounts`.
    async fn request_accounts(&self) -> Result<(), ProviderFault>;

    /// `tronWeb.ready`: false while the wallet is locked.
    fn is_ready(&self) -> bool;

    /// `tronWeb.defaultAddress.base58`.
    fn default_address(&self) -> Option<String>;

    /// Balance in sun.
    async fn get_balance(&self, address: &str) -> Result<u64, ProviderFault>;

    /// `transactionBuilder.sendToken`; returns the unsigned transaction.
    async fn send_token(
        &self,
        to: &str,
        amount: u64,
        token_contract: &str,
        from: &str,
    ) -> Result<serde_json::Value, ProviderFault>;

    /// `trx.sign`.
    async fn sign(&self, tx: serde_json::Value) -> Result<serde_json::Value, ProviderFault>;

    /// `trx.sendRawTransaction`.
    async fn send_raw_transaction(
        &self,
        signed: serde_json::Value,
    ) -> Result<TronBroadcast, ProviderFault>;
}

// ---------------------------------------------------------------------------
// Solana
// ---------------------------------------------------------------------------

/// The user's Solana wallet, as seen through a wallet adapter.
#[async_trait]
pub trait SolanaWalletProvider: Send + Sync {
    /// Prompt the wallet; returns the base58 public key.
    async fn connect(&self) -> Result<String, ProviderFault>;

    async fn disconnect(&self) -> Result<(), ProviderFault>;

    fn public_key(&self) -> Option<String>;
}

/// Cluster RPC used for balance lookups.
#[async_trait]
pub trait SolanaBalanceRpc: Send + Sync {
    /// Balance in lamports.
    async fn get_balance(&self, pubkey: &str) -> Result<u64, ProviderFault>;
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{RouteConfig, SolanaCluster, WalletKind};
use serde_json::json;
use tracing::{debug, info};

use crate::adapter::{BalanceSnapshot, ChainAdapter, TransferRequest};
use crate::address;
use crate::error::{ChainError, ProviderFault};
use crate::provider::{SolanaBalanceRpc, SolanaWalletProvider};

// ---------------------------------------------------------------------------
// JSON-RPC balance client
// ---------------------------------------------------------------------------

/// `getBalance` over a cluster's public JSON-RPC endpoint.
pub struct HttpSolanaRpc {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl HttpSolanaRpc {
    pub fn new(cluster: &SolanaCluster, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::ProviderError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: cluster.url().to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Extract lamports from a `getBalance` response body
/// (`{"result": {"context": .., "value": <lamports>}}`).
pub fn parse_balance_response(body: &serde_json::Value) -> Result<u64, ProviderFault> {
    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown RPC error")
            .to_string();
        return Err(match err.get("code").and_then(|c| c.as_i64()) {
            Some(code) => ProviderFault::with_code(code, message),
            None => ProviderFault::new(message),
        });
    }
    body.pointer("/result/value")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProviderFault::new("getBalance response has no result.value"))
}

#[async_trait]
impl SolanaBalanceRpc for HttpSolanaRpc {
    async fn get_balance(&self, pubkey: &str) -> Result<u64, ProviderFault> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "getBalance",
            "params": [pubkey, { "commitment": "confirmed" }],
        });
        debug!(id, endpoint = %self.endpoint, "Sending getBalance");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderFault::new(format!("RPC request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFault::new(format!(
                "RPC endpoint returned HTTP {status}: {body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderFault::new(format!("invalid RPC response: {e}")))?;
        parse_balance_response(&body)
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Adapter over a Solana wallet adapter plus a cluster RPC for balances.
///
/// The bridge has no Solana source leg; transfers from Solana are refused.
pub struct SolanaAdapter {
    wallet: Option<Arc<dyn SolanaWalletProvider>>,
    rpc: Arc<dyn SolanaBalanceRpc>,
}

impl SolanaAdapter {
    pub fn new(
        wallet: Option<Arc<dyn SolanaWalletProvider>>,
        rpc: Arc<dyn SolanaBalanceRpc>,
    ) -> Self {
        Self { wallet, rpc }
    }

    fn wallet(&self) -> Result<&Arc<dyn SolanaWalletProvider>, ChainError> {
        self.wallet
            .as_ref()
            .ok_or(ChainError::ProviderMissing(WalletKind::Solana))
    }
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::Solana
    }

    async fn connect(&self) -> Result<String, ChainError> {
        let pubkey = self
            .wallet()?
            .connect()
            .await
            .map_err(ChainError::from_fault)?;
        address::validate(WalletKind::Solana, &pubkey)
            .map_err(|e| ChainError::ProviderError(e.to_string()))?;
        info!(address = %pubkey, "Solana wallet connected");
        Ok(pubkey)
    }

    async fn disconnect(&self) -> Result<(), ChainError> {
        self.wallet()?
            .disconnect()
            .await
            .map_err(ChainError::from_fault)
    }

    async fn get_balance(&self, address: &str) -> Result<BalanceSnapshot, ChainError> {
        let lamports = self
            .rpc
            .get_balance(address)
            .await
            .map_err(ChainError::query)?;
        BalanceSnapshot::from_native(WalletKind::Solana, u128::from(lamports))
    }

    async fn build_and_submit_transfer(
        &self,
        _request: &TransferRequest,
        _route: &RouteConfig,
    ) -> Result<String, ChainError> {
        Err(ChainError::Unsupported(
            "transfers from Solana are not supported".into(),
        ))
    }
}

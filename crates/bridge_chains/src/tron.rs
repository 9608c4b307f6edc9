use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_core::{RouteConfig, WalletKind};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::adapter::{BalanceSnapshot, ChainAdapter, TransferRequest};
use crate::address;
use crate::error::ChainError;
use crate::provider::TronProvider;
use crate::units;

/// Adapter over TronLink's injected `tronWeb`.
///
/// Transfers are TRC-20 `sendToken` calls from the connected account to the
/// route's bridge contract. The raw amount is scaled by the route's token
/// decimals, not by TRX's.
pub struct TronAdapter {
    provider: Option<Arc<dyn TronProvider>>,
    /// Broadcast txids not yet confirmed.
    broadcast: Mutex<HashSet<String>>,
}

impl TronAdapter {
    pub fn new(provider: Option<Arc<dyn TronProvider>>) -> Self {
        Self {
            provider,
            broadcast: Mutex::new(HashSet::new()),
        }
    }

    fn provider(&self) -> Result<&Arc<dyn TronProvider>, ChainError> {
        self.provider
            .as_ref()
            .ok_or(ChainError::ProviderMissing(WalletKind::Tron))
    }
}

#[async_trait]
impl ChainAdapter for TronAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::Tron
    }

    async fn connect(&self) -> Result<String, ChainError> {
        let provider = self.provider()?;
        provider
            .request_accounts()
            .await
            .map_err(ChainError::from_fault)?;
        if !provider.is_ready() {
            return Err(ChainError::ProviderError(
                "TronLink is locked. Unlock it and try again.".into(),
            ));
        }
        let account = provider
            .default_address()
            .ok_or_else(|| ChainError::ProviderError("TronLink has no default address".into()))?;
        address::validate(WalletKind::Tron, &account)
            .map_err(|e| ChainError::ProviderError(e.to_string()))?;
        info!(address = %account, "Tron account authorized");
        Ok(account)
    }

    async fn disconnect(&self) -> Result<(), ChainError> {
        debug!("Tron disconnect is local only");
        Ok(())
    }

    async fn get_balance(&self, address: &str) -> Result<BalanceSnapshot, ChainError> {
        let sun = self
            .provider()?
            .get_balance(address)
            .await
            .map_err(ChainError::query)?;
        BalanceSnapshot::from_native(WalletKind::Tron, u128::from(sun))
    }

    async fn build_and_submit_transfer(
        &self,
        request: &TransferRequest,
        route: &RouteConfig,
    ) -> Result<String, ChainError> {
        let provider = self.provider()?;
        let token = route.token_contract.as_deref().ok_or_else(|| {
            ChainError::InvalidInput("route from Tron has no token contract configured".into())
        })?;
        address::validate(WalletKind::Tron, token)
            .map_err(|e| ChainError::InvalidInput(format!("token contract: {e}")))?;
        address::validate(WalletKind::Tron, &route.bridge_contract)
            .map_err(|e| ChainError::InvalidInput(format!("bridge contract: {e}")))?;

        let raw = units::to_native(request.amount(), route.token_decimals)
            .map_err(|e| ChainError::InvalidInput(e.to_string()))?;
        let raw = u64::try_from(raw)
            .map_err(|_| ChainError::InvalidInput("amount exceeds TRC-20 range".into()))?;

        let unsigned = provider
            .send_token(&route.bridge_contract, raw, token, request.source_address())
            .await
            .map_err(ChainError::from_fault)?;
        let signed = provider.sign(unsigned).await.map_err(ChainError::from_fault)?;
        let ack = provider
            .send_raw_transaction(signed)
            .await
            .map_err(ChainError::from_fault)?;

        if !ack.result {
            let reason = ack
                .message
                .or(ack.code)
                .unwrap_or_else(|| "broadcast refused".into());
            warn!(txid = %ack.txid, reason = %reason, "Tron broadcast failed");
            return Err(ChainError::ProviderError(format!(
                "Tron broadcast failed: {reason}"
            )));
        }

        self.broadcast.lock().insert(ack.txid.clone());
        info!(txid = %ack.txid, amount = raw, token = %token, "Tron bridge transaction broadcast");
        Ok(ack.txid)
    }

    async fn confirm_transfer(&self, tx_hash: &str) -> Result<(), ChainError> {
        // The broadcast ack is the acceptance signal on Tron. Each txid is
        // confirmed once.
        if self.broadcast.lock().remove(tx_hash) {
            Ok(())
        } else {
            Err(ChainError::ProviderError(format!(
                "no broadcast acknowledgment for {tx_hash}"
            )))
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use bridge_core::{RouteConfig, WalletKind};
use tracing::{debug, info, warn};

use crate::adapter::{BalanceSnapshot, ChainAdapter, TransferRequest};
use crate::address;
use crate::error::ChainError;
use crate::provider::{EvmProvider, EvmTransaction};
use crate::units;

/// Adapter over an injected EIP-1193 provider (MetaMask and friends).
pub struct EvmAdapter {
    provider: Option<Arc<dyn EvmProvider>>,
    confirmations: u64,
}

impl EvmAdapter {
    /// `provider` is `None` when no extension is present in the host.
    pub fn new(provider: Option<Arc<dyn EvmProvider>>, confirmations: u64) -> Self {
        Self {
            provider,
            confirmations: confirmations.max(1),
        }
    }

    fn provider(&self) -> Result<&Arc<dyn EvmProvider>, ChainError> {
        self.provider
            .as_ref()
            .ok_or(ChainError::ProviderMissing(WalletKind::Evm))
    }
}

fn validate_calldata(data: &str) -> Result<(), ChainError> {
    let body = data
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidInput(format!("calldata must be 0x-prefixed: {data}")))?;
    hex::decode(body)
        .map(|_| ())
        .map_err(|e| ChainError::InvalidInput(format!("calldata is not valid hex: {e}")))
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::Evm
    }

    async fn connect(&self) -> Result<String, ChainError> {
        let provider = self.provider()?;
        let accounts = provider
            .request_accounts()
            .await
            .map_err(ChainError::from_fault)?;
        let account = accounts
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::ProviderError("wallet returned no accounts".into()))?;
        address::validate(WalletKind::Evm, &account)
            .map_err(|e| ChainError::ProviderError(e.to_string()))?;
        info!(address = %account, "EVM account authorized");
        Ok(account)
    }

    async fn disconnect(&self) -> Result<(), ChainError> {
        // EIP-1193 has no disconnect; permissions stay granted.
        debug!("EVM disconnect is local only");
        Ok(())
    }

    async fn get_balance(&self, address: &str) -> Result<BalanceSnapshot, ChainError> {
        let wei = self
            .provider()?
            .get_balance(address)
            .await
            .map_err(ChainError::query)?;
        BalanceSnapshot::from_native(WalletKind::Evm, wei)
    }

    async fn build_and_submit_transfer(
        &self,
        request: &TransferRequest,
        route: &RouteConfig,
    ) -> Result<String, ChainError> {
        let provider = self.provider()?;
        address::validate(WalletKind::Evm, &route.bridge_contract)
            .map_err(|e| ChainError::InvalidInput(format!("bridge contract: {e}")))?;
        validate_calldata(&route.calldata)?;

        let value = units::to_native(request.amount(), WalletKind::Evm.native_decimals())
            .map_err(|e| ChainError::InvalidInput(e.to_string()))?;

        let tx = EvmTransaction {
            from: request.source_address().to_string(),
            to: route.bridge_contract.clone(),
            value,
            data: route.calldata.clone(),
        };
        let tx_hash = provider
            .send_transaction(&tx)
            .await
            .map_err(ChainError::from_fault)?;
        info!(tx_hash = %tx_hash, to = %tx.to, value = %tx.value, "EVM bridge transaction submitted");
        Ok(tx_hash)
    }

    async fn confirm_transfer(&self, tx_hash: &str) -> Result<(), ChainError> {
        let receipt = self
            .provider()?
            .wait_for_receipt(tx_hash, self.confirmations)
            .await
            .map_err(ChainError::from_fault)?;
        if !receipt.status {
            warn!(tx_hash = %tx_hash, block = receipt.block_number, "bridge transaction reverted");
            return Err(ChainError::ProviderError(format!(
                "bridge contract reverted transaction {tx_hash}"
            )));
        }
        debug!(tx_hash = %tx_hash, block = receipt.block_number, "EVM receipt confirmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use parking_lot::Mutex;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::ProviderFault;
    use crate::provider::EvmReceipt;

    const ACCOUNT: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const BRIDGE: &str = "0x00000000000000000000000000000000000000b1";

    #[derive(Default)]
    struct FakeEvm {
        accounts: Vec<String>,
        reject: bool,
        balance: u128,
        revert: bool,
        sent: Mutex<Vec<EvmTransaction>>,
        waited: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl EvmProvider for FakeEvm {
        async fn request_accounts(&self) -> Result<Vec<String>, ProviderFault> {
            if self.reject {
                return Err(ProviderFault::with_code(4001, "User rejected the request."));
            }
            Ok(self.accounts.clone())
        }

        async fn get_balance(&self, _address: &str) -> Result<u128, ProviderFault> {
            Ok(self.balance)
        }

        async fn send_transaction(&self, tx: &EvmTransaction) -> Result<String, ProviderFault> {
            self.sent.lock().push(tx.clone());
            Ok("0xfeed".into())
        }

        async fn wait_for_receipt(
            &self,
            tx_hash: &str,
            confirmations: u64,
        ) -> Result<EvmReceipt, ProviderFault> {
            self.waited.lock().push((tx_hash.to_string(), confirmations));
            Ok(EvmReceipt {
                tx_hash: tx_hash.to_string(),
                block_number: 19_000_000,
                status: !self.revert,
            })
        }
    }

    fn with_fake(fake: FakeEvm) -> (EvmAdapter, Arc<FakeEvm>) {
        let fake = Arc::new(fake);
        let provider: Arc<dyn EvmProvider> = fake.clone();
        (EvmAdapter::new(Some(provider), 1), fake)
    }

    fn route() -> RouteConfig {
        RouteConfig {
            source: WalletKind::Evm,
            dest: WalletKind::Tron,
            bridge_contract: BRIDGE.into(),
            token_contract: None,
            token_decimals: 6,
            calldata: "0x".into(),
        }
    }

    fn request(amount: &str) -> TransferRequest {
        TransferRequest::new(
            WalletKind::Evm,
            WalletKind::Tron,
            Decimal::from_str(amount).unwrap(),
            ACCOUNT,
            "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_provider_is_reported() {
        let adapter = EvmAdapter::new(None, 1);
        assert_eq!(
            adapter.connect().await,
            Err(ChainError::ProviderMissing(WalletKind::Evm))
        );
        assert!(matches!(
            adapter.get_balance(ACCOUNT).await,
            Err(ChainError::ProviderMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_returns_first_account() {
        let (adapter, _) = with_fake(FakeEvm {
            accounts: vec![ACCOUNT.into(), "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB".into()],
            ..Default::default()
        });
        assert_eq!(adapter.connect().await.unwrap(), ACCOUNT);
    }

    #[tokio::test]
    async fn test_connect_classifies_rejection_and_empty_accounts() {
        let (adapter, _) = with_fake(FakeEvm {
            reject: true,
            ..Default::default()
        });
        assert!(matches!(adapter.connect().await, Err(ChainError::UserRejected(_))));

        let (adapter, _) = with_fake(FakeEvm::default());
        assert!(matches!(adapter.connect().await, Err(ChainError::ProviderError(_))));
    }

    #[tokio::test]
    async fn test_balance_converts_wei() {
        let (adapter, _) = with_fake(FakeEvm {
            balance: 1_500_000_000_000_000_000,
            ..Default::default()
        });
        let snap = adapter.get_balance(ACCOUNT).await.unwrap();
        assert_eq!(snap.amount, Decimal::from_str("1.5").unwrap());
        assert_eq!(snap.unit, "ETH");
    }

    #[tokio::test]
    async fn test_submit_sends_value_to_bridge_contract() {
        let (adapter, fake) = with_fake(FakeEvm::default());
        let hash = adapter
            .build_and_submit_transfer(&request("0.25"), &route())
            .await
            .unwrap();
        assert_eq!(hash, "0xfeed");

        let sent = fake.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, BRIDGE);
        assert_eq!(sent[0].from, ACCOUNT);
        assert_eq!(sent[0].value, 250_000_000_000_000_000);
        assert_eq!(sent[0].data, "0x");
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_route_without_calling_provider() {
        let (adapter, fake) = with_fake(FakeEvm::default());
        let mut bad = route();
        bad.bridge_contract = "0x...bridgeContractAddress".into();
        let result = adapter.build_and_submit_transfer(&request("1"), &bad).await;
        assert!(matches!(result, Err(ChainError::InvalidInput(_))));

        let mut bad = route();
        bad.calldata = "0x...".into();
        let result = adapter.build_and_submit_transfer(&request("1"), &bad).await;
        assert!(matches!(result, Err(ChainError::InvalidInput(_))));

        assert!(fake.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_waits_for_receipt_and_detects_revert() {
        let (adapter, fake) = with_fake(FakeEvm::default());
        adapter.confirm_transfer("0xfeed").await.unwrap();
        assert_eq!(fake.waited.lock()[0], ("0xfeed".to_string(), 1));

        let (adapter, _) = with_fake(FakeEvm {
            revert: true,
            ..Default::default()
        });
        let err = adapter.confirm_transfer("0xfeed").await.unwrap_err();
        assert!(err.to_string().contains("reverted"));
    }
}

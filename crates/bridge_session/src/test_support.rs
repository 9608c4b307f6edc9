//! Fake chain adapter shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bridge_chains::address::tron_from_hex;
use bridge_chains::{BalanceSnapshot, ChainAdapter, ChainError, TransferRequest};
use bridge_core::{RouteConfig, WalletKind};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::Notify;

pub const EVM_ADDRESS: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const SOLANA_ADDRESS: &str = "11111111111111111111111111111111";
pub const EVM_BRIDGE: &str = "0x00000000000000000000000000000000000000b1";
pub const TX_HASH: &str = "0x5e1f00000000000000000000000000000000000000000000000000000000c0de";

pub fn tron_address() -> String {
    tron_from_hex("41aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap()
}

pub fn dyn_adapters(fakes: &[&Arc<FakeAdapter>]) -> Vec<Arc<dyn ChainAdapter>> {
    fakes
        .iter()
        .map(|fake| Arc::clone(fake) as Arc<dyn ChainAdapter>)
        .collect()
}

pub fn route(source: WalletKind, dest: WalletKind) -> RouteConfig {
    RouteConfig {
        source,
        dest,
        bridge_contract: EVM_BRIDGE.into(),
        token_contract: None,
        token_decimals: 6,
        calldata: "0x".into(),
    }
}

pub struct FakeAdapter {
    kind: WalletKind,
    address: String,
    connect_gate: Option<Notify>,
    confirm_gate: Option<Notify>,
    disconnect_gate: Option<Notify>,
    connect_error: Mutex<Option<ChainError>>,
    submit_error: Mutex<Option<ChainError>>,
    balance: Mutex<Result<Decimal, ChainError>>,
    balance_delay: Duration,
    in_flight: AtomicUsize,

    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub max_concurrent_balance: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
    pub submitted: Mutex<Vec<(TransferRequest, RouteConfig)>>,
}

impl FakeAdapter {
    pub fn new(kind: WalletKind, address: &str) -> Self {
        Self {
            kind,
            address: address.to_string(),
            connect_gate: None,
            confirm_gate: None,
            disconnect_gate: None,
            connect_error: Mutex::new(None),
            submit_error: Mutex::new(None),
            balance: Mutex::new(Ok(Decimal::ONE)),
            balance_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            max_concurrent_balance: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// `connect` blocks until [`release_connect`](Self::release_connect).
    pub fn gate_connect(mut self) -> Self {
        self.connect_gate = Some(Notify::new());
        self
    }

    /// `confirm_transfer` blocks until [`release_confirm`](Self::release_confirm).
    pub fn gate_confirm(mut self) -> Self {
        self.confirm_gate = Some(Notify::new());
        self
    }

    /// `disconnect` blocks until [`release_disconnect`](Self::release_disconnect).
    pub fn gate_disconnect(mut self) -> Self {
        self.disconnect_gate = Some(Notify::new());
        self
    }

    pub fn failing_connect(self, err: ChainError) -> Self {
        *self.connect_error.lock() = Some(err);
        self
    }

    pub fn with_balance(self, amount: Decimal) -> Self {
        *self.balance.lock() = Ok(amount);
        self
    }

    pub fn slow_balance(mut self, delay: Duration) -> Self {
        self.balance_delay = delay;
        self
    }

    pub fn release_connect(&self) {
        if let Some(gate) = &self.connect_gate {
            gate.notify_one();
        }
    }

    pub fn release_confirm(&self) {
        if let Some(gate) = &self.confirm_gate {
            gate.notify_one();
        }
    }

    pub fn release_disconnect(&self) {
        if let Some(gate) = &self.disconnect_gate {
            gate.notify_one();
        }
    }

    pub fn fail_connect(&self, err: ChainError) {
        *self.connect_error.lock() = Some(err);
    }

    pub fn succeed_connect(&self) {
        *self.connect_error.lock() = None;
    }

    pub fn fail_submit(&self, err: ChainError) {
        *self.submit_error.lock() = Some(err);
    }

    pub fn set_balance(&self, balance: Result<Decimal, ChainError>) {
        *self.balance.lock() = balance;
    }
}

#[async_trait]
impl ChainAdapter for FakeAdapter {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    async fn connect(&self) -> Result<String, ChainError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.connect_gate {
            gate.notified().await;
        }
        match self.connect_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(self.address.clone()),
        }
    }

    async fn disconnect(&self) -> Result<(), ChainError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.disconnect_gate {
            gate.notified().await;
        }
        Ok(())
    }

    async fn get_balance(&self, _address: &str) -> Result<BalanceSnapshot, ChainError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_balance.fetch_max(now, Ordering::SeqCst);
        if !self.balance_delay.is_zero() {
            tokio::time::sleep(self.balance_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let amount = self.balance.lock().clone()?;
        Ok(BalanceSnapshot::new(self.kind, amount))
    }

    async fn build_and_submit_transfer(
        &self,
        request: &TransferRequest,
        route: &RouteConfig,
    ) -> Result<String, ChainError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().push((request.clone(), route.clone()));
        match self.submit_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(TX_HASH.to_string()),
        }
    }

    async fn confirm_transfer(&self, _tx_hash: &str) -> Result<(), ChainError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.confirm_gate {
            gate.notified().await;
        }
        Ok(())
    }
}

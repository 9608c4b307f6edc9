//! Connection registry: the single owner of every wallet's connection state
//! and of the active wallet selection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bridge_chains::address::shorten;
use bridge_chains::{ChainAdapter, ChainError, ConnectionState};
use bridge_core::{Notifier, WalletKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

fn slot(kind: WalletKind) -> usize {
    match kind {
        WalletKind::Evm => 0,
        WalletKind::Tron => 1,
        WalletKind::Solana => 2,
    }
}

/// Tracks the connection lifecycle of each wallet kind.
///
/// State only moves through the registry: pollers and the orchestrator read
/// it through [`subscribe`](Self::subscribe) and never write it.
pub struct ConnectionRegistry {
    adapters: [Option<Arc<dyn ChainAdapter>>; 3],
    states: [watch::Sender<ConnectionState>; 3],
    disconnecting: [AtomicBool; 3],
    active: watch::Sender<WalletKind>,
    notifier: Arc<Notifier>,
    connect_timeout: Duration,
}

impl ConnectionRegistry {
    /// Every kind starts `Disconnected`. A kind with no adapter fails every
    /// connect with `ProviderMissing`.
    pub fn new(
        adapters: Vec<Arc<dyn ChainAdapter>>,
        default_selection: WalletKind,
        connect_timeout: Duration,
        notifier: Arc<Notifier>,
    ) -> Self {
        let mut slots: [Option<Arc<dyn ChainAdapter>>; 3] = [None, None, None];
        for adapter in adapters {
            let kind = adapter.kind();
            if slots[slot(kind)].replace(adapter).is_some() {
                warn!(%kind, "Duplicate adapter registered; keeping the last one");
            }
        }
        Self {
            adapters: slots,
            states: std::array::from_fn(|_| watch::Sender::new(ConnectionState::Disconnected)),
            disconnecting: std::array::from_fn(|_| AtomicBool::new(false)),
            active: watch::Sender::new(default_selection),
            notifier,
            connect_timeout,
        }
    }

    pub fn adapter(&self, kind: WalletKind) -> Option<Arc<dyn ChainAdapter>> {
        self.adapters[slot(kind)].clone()
    }

    pub fn current_state(&self, kind: WalletKind) -> ConnectionState {
        self.states[slot(kind)].borrow().clone()
    }

    /// Address of `kind` when it is connected.
    pub fn address(&self, kind: WalletKind) -> Option<String> {
        self.states[slot(kind)].borrow().address().map(str::to_string)
    }

    pub fn active_kind(&self) -> WalletKind {
        *self.active.borrow()
    }

    pub fn subscribe(&self, kind: WalletKind) -> watch::Receiver<ConnectionState> {
        self.states[slot(kind)].subscribe()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<WalletKind> {
        self.active.subscribe()
    }

    /// Change the active selection. Connection states are untouched.
    pub fn select(&self, kind: WalletKind) {
        let changed = self.active.send_if_modified(|active| {
            if *active == kind {
                false
            } else {
                *active = kind;
                true
            }
        });
        if changed {
            info!(%kind, "Active wallet selected");
        }
    }

    /// Ask the adapter for account access and record the outcome.
    ///
    /// A request while the kind is already `Connecting` or `Connected` does
    /// not reach the adapter; it returns the current state.
    pub async fn request_connect(&self, kind: WalletKind) -> ConnectionState {
        let state = &self.states[slot(kind)];
        let claimed = state.send_if_modified(|current| match current {
            ConnectionState::Connecting | ConnectionState::Connected(_) => false,
            ConnectionState::Disconnected | ConnectionState::Failed(_) => {
                *current = ConnectionState::Connecting;
                true
            }
        });
        if !claimed {
            debug!(%kind, "Connect already in progress or established");
            return state.borrow().clone();
        }
        debug!(%kind, "Connecting");
        let claim = ConnectClaim {
            state,
            settled: false,
        };

        let outcome = match self.adapter(kind) {
            Some(adapter) => {
                match tokio::time::timeout(self.connect_timeout, adapter.connect()).await {
                    Ok(result) => result,
                    Err(_) => Err(ChainError::ProviderError(format!(
                        "timed out after {:?} waiting for the wallet",
                        self.connect_timeout
                    ))),
                }
            }
            None => Err(ChainError::ProviderMissing(kind)),
        };

        let next = match outcome {
            Ok(address) => {
                info!(%kind, address = %address, "Wallet connected");
                self.notifier.success(
                    "Wallet Connected",
                    format!("{} connected: {}", kind.label(), shorten(&address, 10)),
                );
                ConnectionState::Connected(address)
            }
            Err(e) => {
                warn!(%kind, error = %e, "Wallet connection failed");
                match &e {
                    ChainError::ProviderMissing(_) => {
                        self.notifier.error("Wallet Not Found", e.user_message())
                    }
                    ChainError::UserRejected(_) => {
                        self.notifier.warning("Connection Cancelled", e.user_message())
                    }
                    _ => self.notifier.error("Connection Failed", e.user_message()),
                }
                ConnectionState::Failed(e.to_string())
            }
        };
        claim.settle(next.clone());
        next
    }

    /// Reset a kind to `Disconnected`. Ignored while a connect is pending.
    ///
    /// A connected kind reads `Connected` until the provider disconnect has
    /// returned, so a connect issued meanwhile cannot overlap it.
    pub async fn request_disconnect(&self, kind: WalletKind) {
        let state = &self.states[slot(kind)];
        let flag = &self.disconnecting[slot(kind)];
        let previous = state.borrow().clone();
        match previous {
            ConnectionState::Disconnected => {}
            ConnectionState::Connecting => {
                debug!(%kind, "Disconnect ignored while connecting");
            }
            ConnectionState::Failed(_) => {
                state.send_replace(ConnectionState::Disconnected);
            }
            ConnectionState::Connected(address) => {
                if flag.swap(true, Ordering::AcqRel) {
                    debug!(%kind, "Disconnect already in progress");
                    return;
                }
                let reset = DisconnectReset { state, flag };
                if let Some(adapter) = self.adapter(kind) {
                    if let Err(e) = adapter.disconnect().await {
                        warn!(%kind, error = %e, "Provider disconnect failed");
                    }
                }
                drop(reset);
                info!(%kind, address = %address, "Wallet disconnected");
                self.notifier
                    .info("Wallet Disconnected", format!("{} disconnected", kind.label()));
            }
        }
    }

    /// True while a provider disconnect for `kind` is still running.
    pub fn is_disconnecting(&self, kind: WalletKind) -> bool {
        self.disconnecting[slot(kind)].load(Ordering::Acquire)
    }

    /// Issue the start-of-session connects, one task per kind.
    pub fn mount(self: &Arc<Self>, kinds: &[WalletKind]) -> Vec<JoinHandle<ConnectionState>> {
        kinds
            .iter()
            .map(|&kind| {
                let registry = Arc::clone(self);
                tokio::spawn(async move { registry.request_connect(kind).await })
            })
            .collect()
    }
}

/// Holds a kind in `Connecting`. Dropped unsettled (the connect future was
/// cancelled), it marks the kind failed so a later connect can run.
struct ConnectClaim<'a> {
    state: &'a watch::Sender<ConnectionState>,
    settled: bool,
}

impl ConnectClaim<'_> {
    fn settle(mut self, outcome: ConnectionState) {
        self.state.send_replace(outcome);
        self.settled = true;
    }
}

impl Drop for ConnectClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Connect cancelled before the wallet answered");
            self.state
                .send_replace(ConnectionState::Failed("connect cancelled".into()));
        }
    }
}

/// Publishes `Disconnected` once the provider disconnect is over, including
/// when the disconnect future is dropped.
struct DisconnectReset<'a> {
    state: &'a watch::Sender<ConnectionState>,
    flag: &'a AtomicBool,
}

impl Drop for DisconnectReset<'_> {
    fn drop(&mut self) {
        self.state.send_replace(ConnectionState::Disconnected);
        self.flag.store(false, Ordering::Release);
    }
}

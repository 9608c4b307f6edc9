//! Periodic balance refresh for connected wallets.
//!
//! One task per wallet kind. A task waits until its kind is eligible
//! (connected, and active when the scope demands it), then fetches on a fixed
//! interval. The fetch runs inline in the task, so a slow provider delays the
//! next tick instead of stacking concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use bridge_chains::{BalanceSnapshot, ChainAdapter, ConnectionState};
use bridge_core::WalletKind;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

/// Which wallets a poller refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerScope {
    /// Only the active selection (the balance widget).
    ActiveOnly,
    /// Every connected wallet (the dashboard).
    AllConnected,
}

impl PollerScope {
    fn label(self) -> &'static str {
        match self {
            PollerScope::ActiveOnly => "widget",
            PollerScope::AllConnected => "dashboard",
        }
    }
}

/// Latest snapshot per wallet kind, as published by one poller.
pub struct SnapshotBoard {
    slots: [watch::Sender<Option<BalanceSnapshot>>; 3],
}

impl SnapshotBoard {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| watch::Sender::new(None)),
        }
    }

    fn slot(&self, kind: WalletKind) -> &watch::Sender<Option<BalanceSnapshot>> {
        match kind {
            WalletKind::Evm => &self.slots[0],
            WalletKind::Tron => &self.slots[1],
            WalletKind::Solana => &self.slots[2],
        }
    }

    pub fn latest(&self, kind: WalletKind) -> Option<BalanceSnapshot> {
        self.slot(kind).borrow().clone()
    }

    pub fn subscribe(&self, kind: WalletKind) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.slot(kind).subscribe()
    }

    /// Supersede the previous snapshot for the snapshot's kind.
    pub fn publish(&self, snapshot: BalanceSnapshot) {
        self.slot(snapshot.kind).send_replace(Some(snapshot));
    }
}

impl Default for SnapshotBoard {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BalancePoller;

impl BalancePoller {
    /// Start polling. Tasks run until the returned handle is shut down or
    /// dropped.
    pub fn spawn(
        registry: Arc<ConnectionRegistry>,
        scope: PollerScope,
        interval: Duration,
    ) -> PollerHandle {
        let board = Arc::new(SnapshotBoard::new());
        let (shutdown_tx, _) = broadcast::channel(1);

        let tasks = WalletKind::ALL
            .iter()
            .map(|&kind| {
                let worker = PollWorker {
                    kind,
                    scope,
                    interval,
                    registry: Arc::clone(&registry),
                    board: Arc::clone(&board),
                };
                let shutdown = shutdown_tx.subscribe();
                tokio::spawn(worker.run(shutdown))
            })
            .collect();

        debug!(poller = scope.label(), ?interval, "Balance poller started");
        PollerHandle {
            scope,
            board,
            shutdown_tx,
            tasks: Mutex::new(tasks),
        }
    }
}

/// Owns the poller's tasks. Dropping the handle stops them.
pub struct PollerHandle {
    scope: PollerScope,
    board: Arc<SnapshotBoard>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PollerHandle {
    pub fn scope(&self) -> PollerScope {
        self.scope
    }

    pub fn board(&self) -> Arc<SnapshotBoard> {
        Arc::clone(&self.board)
    }

    pub fn snapshot(&self, kind: WalletKind) -> Option<BalanceSnapshot> {
        self.board.latest(kind)
    }

    pub fn subscribe(&self, kind: WalletKind) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.board.subscribe(kind)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        if !tasks.is_empty() {
            debug!(poller = self.scope.label(), "Balance poller shutting down");
        }
        for task in tasks {
            task.abort();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Fetch {
    Done,
    Ineligible,
    Shutdown,
}

struct PollWorker {
    kind: WalletKind,
    scope: PollerScope,
    interval: Duration,
    registry: Arc<ConnectionRegistry>,
    board: Arc<SnapshotBoard>,
}

impl PollWorker {
    fn eligible_address(&self, state: &ConnectionState, active: WalletKind) -> Option<String> {
        if self.scope == PollerScope::ActiveOnly && active != self.kind {
            return None;
        }
        state.address().map(str::to_string)
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut state_rx = self.registry.subscribe(self.kind);
        let mut active_rx = self.registry.subscribe_active();

        loop {
            let address = {
                let state = state_rx.borrow_and_update().clone();
                let active = *active_rx.borrow_and_update();
                self.eligible_address(&state, active)
            };

            let keep_running = match address {
                Some(address) => {
                    self.poll_while_eligible(&address, &mut state_rx, &mut active_rx, &mut shutdown)
                        .await
                }
                None => wait_for_change(&mut state_rx, &mut active_rx, &mut shutdown).await,
            };
            if !keep_running {
                return;
            }
        }
    }

    /// Poll `address` until eligibility changes. Returns `false` when the
    /// worker should exit.
    async fn poll_while_eligible(
        &self,
        address: &str,
        state_rx: &mut watch::Receiver<ConnectionState>,
        active_rx: &mut watch::Receiver<WalletKind>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> bool {
        let Some(adapter) = self.registry.adapter(self.kind) else {
            return wait_for_change(state_rx, active_rx, shutdown).await;
        };
        debug!(kind = %self.kind, poller = self.scope.label(), "Polling started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.fetch_once(adapter.as_ref(), address, state_rx, active_rx, shutdown).await {
                        Fetch::Done => {}
                        Fetch::Ineligible => break,
                        Fetch::Shutdown => return false,
                    }
                }
                changed = state_rx.changed() => {
                    if changed.is_err() { return false; }
                    if !self.still_eligible(address, state_rx, active_rx) { break; }
                }
                changed = active_rx.changed() => {
                    if changed.is_err() { return false; }
                    if !self.still_eligible(address, state_rx, active_rx) { break; }
                }
                _ = shutdown.recv() => return false,
            }
        }

        debug!(kind = %self.kind, poller = self.scope.label(), "Polling stopped");
        true
    }

    /// Run one balance fetch to completion. Selection or state changes that
    /// leave the kind eligible do not abandon the request.
    async fn fetch_once(
        &self,
        adapter: &dyn ChainAdapter,
        address: &str,
        state_rx: &mut watch::Receiver<ConnectionState>,
        active_rx: &mut watch::Receiver<WalletKind>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Fetch {
        let fetch = adapter.get_balance(address);
        tokio::pin!(fetch);

        loop {
            tokio::select! {
                result = &mut fetch => {
                    match result {
                        Ok(snapshot) => {
                            debug!(kind = %self.kind, balance = %snapshot.display(), "Balance refreshed");
                            self.board.publish(snapshot);
                        }
                        Err(e) => {
                            warn!(kind = %self.kind, error = %e, "Balance poll failed; keeping last snapshot");
                        }
                    }
                    return Fetch::Done;
                }
                changed = state_rx.changed() => {
                    if changed.is_err() { return Fetch::Shutdown; }
                    if !self.still_eligible(address, state_rx, active_rx) { return Fetch::Ineligible; }
                }
                changed = active_rx.changed() => {
                    if changed.is_err() { return Fetch::Shutdown; }
                    if !self.still_eligible(address, state_rx, active_rx) { return Fetch::Ineligible; }
                }
                _ = shutdown.recv() => return Fetch::Shutdown,
            }
        }
    }

    fn still_eligible(
        &self,
        address: &str,
        state_rx: &watch::Receiver<ConnectionState>,
        active_rx: &watch::Receiver<WalletKind>,
    ) -> bool {
        let state = state_rx.borrow().clone();
        let active = *active_rx.borrow();
        self.eligible_address(&state, active).as_deref() == Some(address)
    }
}

/// Block until the connection state or the selection changes. Returns
/// `false` on shutdown or when the registry is gone.
async fn wait_for_change(
    state_rx: &mut watch::Receiver<ConnectionState>,
    active_rx: &mut watch::Receiver<WalletKind>,
    shutdown: &mut broadcast::Receiver<()>,
) -> bool {
    tokio::select! {
        changed = state_rx.changed() => changed.is_ok(),
        changed = active_rx.changed() => changed.is_ok(),
        _ = shutdown.recv() => false,
    }
}

//! Session-over-session growth figure shown next to the active balance.
//!
//! Sales are a notional `amount * 100`, not a market price. The stored record
//! keeps only the previous observation per wallet kind.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bridge_chains::BalanceSnapshot;
use bridge_core::{KvStore, WalletKind};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::poller::SnapshotBoard;
use crate::registry::ConnectionRegistry;

const SALES_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Previous sales assumed on first observation: 80% of current, i.e. +25%.
fn first_observation_ratio() -> Decimal {
    Decimal::new(8, 1)
}

/// Storage key for a kind's record: `lastMonth<tag>Sales`.
pub fn storage_key(kind: WalletKind) -> String {
    format!("lastMonth{}Sales", kind.storage_tag())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub previous_sales: Decimal,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthReading {
    pub kind: WalletKind,
    pub current_sales: Decimal,
    pub previous_sales: Decimal,
    pub growth_pct: Decimal,
}

impl GrowthReading {
    /// True when there was no positive baseline to compare against.
    pub fn is_zero_guarded(&self) -> bool {
        self.previous_sales <= Decimal::ZERO
    }
}

impl fmt::Display for GrowthReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero_guarded() {
            return f.write_str("+0%");
        }
        let mut pct = self
            .growth_pct
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        pct.rescale(1);
        if pct.is_sign_negative() && !pct.is_zero() {
            write!(f, "{pct}%")
        } else {
            write!(f, "+{}%", pct.abs())
        }
    }
}

/// Compute growth of `amount` against the stored record.
pub fn estimate(kind: WalletKind, amount: Decimal, record: Option<&GrowthRecord>) -> GrowthReading {
    let current_sales = amount * SALES_MULTIPLIER;
    let previous_sales = match record {
        Some(record) => record.previous_sales,
        None => current_sales * first_observation_ratio(),
    };
    let growth_pct = if previous_sales <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        (current_sales - previous_sales) / previous_sales * SALES_MULTIPLIER
    };
    GrowthReading {
        kind,
        current_sales,
        previous_sales,
        growth_pct,
    }
}

/// Reads and overwrites growth records and publishes the latest reading.
pub struct GrowthEstimator {
    store: Arc<dyn KvStore>,
    reading: watch::Sender<Option<GrowthReading>>,
}

impl GrowthEstimator {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            reading: watch::Sender::new(None),
        }
    }

    pub fn record(&self, kind: WalletKind) -> Option<GrowthRecord> {
        let stored = self.store.get(&storage_key(kind))?;
        match Decimal::from_str(&stored.value) {
            Ok(previous_sales) => Some(GrowthRecord {
                previous_sales,
                observed_at: stored.updated_at,
            }),
            Err(e) => {
                warn!(%kind, value = %stored.value, error = %e, "Ignoring unreadable growth record");
                None
            }
        }
    }

    /// Compute growth for `snapshot` and replace the stored record with the
    /// current sales figure.
    pub fn observe(&self, snapshot: &BalanceSnapshot) -> GrowthReading {
        let record = self.record(snapshot.kind);
        let reading = estimate(snapshot.kind, snapshot.amount, record.as_ref());
        if let Err(e) = self
            .store
            .set(&storage_key(snapshot.kind), reading.current_sales.normalize().to_string())
        {
            warn!(kind = %snapshot.kind, error = %e, "Failed to persist growth record");
        }
        debug!(kind = %snapshot.kind, growth = %reading, "Growth recomputed");
        self.reading.send_replace(Some(reading.clone()));
        reading
    }

    pub fn latest(&self) -> Option<GrowthReading> {
        self.reading.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<GrowthReading>> {
        self.reading.subscribe()
    }
}

/// Recomputes growth whenever the active selection changes or the active
/// kind gets a new snapshot.
pub struct GrowthTracker {
    estimator: Arc<GrowthEstimator>,
    shutdown_tx: broadcast::Sender<()>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl GrowthTracker {
    pub fn spawn(
        registry: Arc<ConnectionRegistry>,
        board: Arc<SnapshotBoard>,
        estimator: Arc<GrowthEstimator>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(track(
            registry.subscribe_active(),
            board,
            Arc::clone(&estimator),
            shutdown_rx,
        ));
        Self {
            estimator,
            shutdown_tx,
            task: parking_lot::Mutex::new(Some(task)),
        }
    }

    pub fn estimator(&self) -> &Arc<GrowthEstimator> {
        &self.estimator
    }

    pub fn latest(&self) -> Option<GrowthReading> {
        self.estimator.latest()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for GrowthTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn track(
    mut active_rx: watch::Receiver<WalletKind>,
    board: Arc<SnapshotBoard>,
    estimator: Arc<GrowthEstimator>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let active = *active_rx.borrow_and_update();
        let mut snapshot_rx = board.subscribe(active);

        let current = snapshot_rx.borrow_and_update().clone();
        if let Some(snapshot) = current {
            estimator.observe(&snapshot);
        }

        loop {
            tokio::select! {
                changed = active_rx.changed() => {
                    if changed.is_err() { return; }
                    break;
                }
                changed = snapshot_rx.changed() => {
                    if changed.is_err() { return; }
                    let current = snapshot_rx.borrow_and_update().clone();
                    if let Some(snapshot) = current {
                        estimator.observe(&snapshot);
                    }
                }
                _ = shutdown.recv() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bridge_core::{FileKvStore, MemoryKvStore, Notifier};

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(previous: &str) -> GrowthRecord {
        GrowthRecord {
            previous_sales: dec(previous),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_observation_is_plus_25() {
        let reading = estimate(WalletKind::Evm, dec("10"), None);
        assert_eq!(reading.current_sales, dec("1000"));
        assert_eq!(reading.previous_sales, dec("800"));
        assert_eq!(reading.growth_pct, dec("25"));
        assert_eq!(reading.to_string(), "+25.0%");
    }

    #[test]
    fn test_zero_previous_is_plus_zero() {
        for amount in ["0", "3.5", "1000"] {
            let reading = estimate(WalletKind::Tron, dec(amount), Some(&record("0")));
            assert_eq!(reading.growth_pct, Decimal::ZERO);
            assert_eq!(reading.to_string(), "+0%");
        }
        let reading = estimate(WalletKind::Tron, Decimal::ZERO, None);
        assert_eq!(reading.to_string(), "+0%");
    }

    #[test]
    fn test_decline_and_flat_readings() {
        let reading = estimate(WalletKind::Solana, dec("4"), Some(&record("800")));
        assert_eq!(reading.to_string(), "-50.0%");

        let reading = estimate(WalletKind::Solana, dec("8"), Some(&record("800")));
        assert_eq!(reading.to_string(), "+0.0%");

        let reading = estimate(WalletKind::Solana, dec("1"), Some(&record("300")));
        assert_eq!(reading.to_string(), "-66.7%");
    }

    #[test]
    fn test_storage_keys_match_wallet_names() {
        assert_eq!(storage_key(WalletKind::Evm), "lastMonthmetamaskSales");
        assert_eq!(storage_key(WalletKind::Tron), "lastMonthtronlinkSales");
        assert_eq!(storage_key(WalletKind::Solana), "lastMonthsolanaSales");
    }

    #[test]
    fn test_observe_overwrites_record() {
        let store = Arc::new(MemoryKvStore::new());
        let estimator = GrowthEstimator::new(store.clone());

        let first = estimator.observe(&BalanceSnapshot::new(WalletKind::Evm, dec("10")));
        assert_eq!(first.to_string(), "+25.0%");
        assert_eq!(store.get("lastMonthmetamaskSales").unwrap().value, "1000");

        let second = estimator.observe(&BalanceSnapshot::new(WalletKind::Evm, dec("12.5")));
        assert_eq!(second.previous_sales, dec("1000"));
        assert_eq!(second.to_string(), "+25.0%");
        assert_eq!(estimator.record(WalletKind::Evm).unwrap().previous_sales, dec("1250"));
        assert_eq!(estimator.latest(), Some(second));
    }

    #[test]
    fn test_unreadable_record_is_treated_as_missing() {
        let store = Arc::new(MemoryKvStore::new());
        store.set("lastMonthtronlinkSales", "NaN-ish".into()).unwrap();
        let estimator = GrowthEstimator::new(store);
        assert!(estimator.record(WalletKind::Tron).is_none());
        let reading = estimator.observe(&BalanceSnapshot::new(WalletKind::Tron, dec("10")));
        assert_eq!(reading.to_string(), "+25.0%");
    }

    #[test]
    fn test_records_survive_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growth.json");

        let estimator = GrowthEstimator::new(Arc::new(FileKvStore::open(&path).unwrap()));
        estimator.observe(&BalanceSnapshot::new(WalletKind::Solana, dec("2")));

        let reopened = GrowthEstimator::new(Arc::new(FileKvStore::open(&path).unwrap()));
        assert_eq!(reopened.record(WalletKind::Solana).unwrap().previous_sales, dec("200"));
    }

    #[tokio::test]
    async fn test_tracker_follows_selection_and_snapshots() {
        let registry = Arc::new(ConnectionRegistry::new(
            Vec::new(),
            WalletKind::Evm,
            Duration::from_secs(5),
            Arc::new(Notifier::new()),
        ));
        let board = Arc::new(SnapshotBoard::new());
        let store = Arc::new(MemoryKvStore::new());
        let estimator = Arc::new(GrowthEstimator::new(store.clone()));
        let tracker = GrowthTracker::spawn(Arc::clone(&registry), Arc::clone(&board), estimator);
        let mut readings = tracker.estimator().subscribe();

        // No snapshot yet: nothing computed, nothing stored.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tracker.latest().is_none());
        assert!(store.get("lastMonthmetamaskSales").is_none());

        board.publish(BalanceSnapshot::new(WalletKind::Evm, dec("10")));
        let reading = readings
            .wait_for(|r| r.is_some())
            .await
            .unwrap()
            .clone()
            .unwrap();
        assert_eq!(reading.kind, WalletKind::Evm);
        assert_eq!(reading.to_string(), "+25.0%");

        // Snapshots of an inactive kind are ignored.
        board.publish(BalanceSnapshot::new(WalletKind::Tron, dec("4")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get("lastMonthtronlinkSales").is_none());

        // Selecting Tron recomputes from its existing snapshot.
        registry.select(WalletKind::Tron);
        let reading = readings
            .wait_for(|r| r.as_ref().map(|r| r.kind) == Some(WalletKind::Tron))
            .await
            .unwrap()
            .clone()
            .unwrap();
        assert_eq!(reading.current_sales, dec("400"));
        assert_eq!(store.get("lastMonthtronlinkSales").unwrap().value, "400");

        tracker.shutdown();
    }
}

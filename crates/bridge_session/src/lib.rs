//! Wallet connection state machine and bridge-transfer orchestration.
//!
//! A [`Session`] owns one [`ConnectionRegistry`], two balance pollers (the
//! 30 s widget and the 60 s dashboard), a growth tracker fed by the dashboard
//! poller, and the [`BridgeOrchestrator`]. UI layers subscribe to the watch
//! channels these expose and to the shared [`bridge_core::Notifier`].

pub mod error;
pub mod growth;
pub mod orchestrator;
pub mod poller;
pub mod registry;
pub mod session;

#[cfg(test)]
mod test_support;

pub use error::BridgeError;
pub use growth::{GrowthEstimator, GrowthReading, GrowthRecord, GrowthTracker, estimate};
pub use orchestrator::{
    BridgeOrchestrator, PendingTransfer, TransferDraft, TransferPhase, TransferResult,
    parse_amount,
};
pub use poller::{BalancePoller, PollerHandle, PollerScope, SnapshotBoard};
pub use registry::ConnectionRegistry;
pub use session::{Session, WalletProviders, build_adapters};

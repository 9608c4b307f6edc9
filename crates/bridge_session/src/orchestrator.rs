//! Drives one bridge transfer at a time through validation, submission and
//! source-chain confirmation.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bridge_chains::{ChainError, TransferRequest};
use bridge_core::notifications::LONG_DURATION_MS;
use bridge_core::{Notification, NotificationType, Notifier, RouteConfig, WalletKind};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::registry::ConnectionRegistry;

/// Where the current transfer attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Idle,
    Validating,
    Submitting,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

impl TransferPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingConfirmation)
    }
}

/// What the user entered on the bridge form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub source: WalletKind,
    pub dest: WalletKind,
    pub amount: String,
}

impl TransferDraft {
    pub fn new(source: WalletKind, dest: WalletKind, amount: impl Into<String>) -> Self {
        Self {
            source,
            dest,
            amount: amount.into(),
        }
    }
}

/// Terminal outcome of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TransferResult {
    /// Carries the source-chain transaction hash.
    Success(String),
    /// Carries a human-readable reason.
    Failed(String),
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            Self::Success(hash) => Some(hash.as_str()),
            Self::Failed(_) => None,
        }
    }
}

/// Parse a user-entered amount. Must be a plain positive decimal.
pub fn parse_amount(input: &str) -> Result<Decimal, BridgeError> {
    let trimmed = input.trim();
    let invalid = || BridgeError::InvalidAmount(input.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let amount = Decimal::from_str(trimmed).map_err(|_| invalid())?;
    if amount <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(amount)
}

pub struct BridgeOrchestrator {
    registry: Arc<ConnectionRegistry>,
    routes: Vec<RouteConfig>,
    notifier: Arc<Notifier>,
    step_timeout: Duration,
    in_flight: AtomicBool,
    phase: watch::Sender<TransferPhase>,
    last_result: Mutex<Option<TransferResult>>,
}

impl BridgeOrchestrator {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        routes: Vec<RouteConfig>,
        step_timeout: Duration,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            registry,
            routes,
            notifier,
            step_timeout,
            in_flight: AtomicBool::new(false),
            phase: watch::Sender::new(TransferPhase::Idle),
            last_result: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> TransferPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<TransferPhase> {
        self.phase.subscribe()
    }

    pub fn last_result(&self) -> Option<TransferResult> {
        self.last_result.lock().clone()
    }

    /// Validate and run a transfer to its terminal result.
    pub async fn request_transfer(&self, draft: TransferDraft) -> Result<TransferResult, BridgeError> {
        let pending = self.begin(draft)?;
        Ok(pending.run().await)
    }

    /// Claim the in-flight slot and validate the draft.
    ///
    /// Runs synchronously: a rejection is returned before any adapter call.
    /// The slot is held by the returned [`PendingTransfer`] until it is run
    /// or dropped.
    pub fn begin(&self, draft: TransferDraft) -> Result<PendingTransfer<'_>, BridgeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Bridge request rejected: transfer in progress");
            let err = BridgeError::TransferInProgress;
            self.notifier.warning(err.title(), err.user_message());
            return Err(err);
        }
        let slot = Slot { orchestrator: self };
        self.phase.send_replace(TransferPhase::Validating);

        match self.validate(&draft) {
            Ok((request, route)) => Ok(PendingTransfer {
                slot,
                request,
                route,
            }),
            Err(err) => {
                debug!(error = %err, "Bridge request rejected");
                self.notifier.error(err.title(), err.user_message());
                Err(err)
            }
        }
    }

    fn validate(&self, draft: &TransferDraft) -> Result<(TransferRequest, RouteConfig), BridgeError> {
        let unsupported = || BridgeError::UnsupportedRoute {
            from: draft.source,
            to: draft.dest,
        };
        if draft.source == draft.dest {
            return Err(unsupported());
        }
        let source_address = self
            .registry
            .address(draft.source)
            .ok_or(BridgeError::MissingWallet(draft.source))?;
        let dest_address = self
            .registry
            .address(draft.dest)
            .ok_or(BridgeError::MissingWallet(draft.dest))?;
        let amount = parse_amount(&draft.amount)?;
        let route = self
            .routes
            .iter()
            .find(|r| r.source == draft.source && r.dest == draft.dest)
            .cloned()
            .ok_or_else(unsupported)?;

        let request =
            TransferRequest::new(draft.source, draft.dest, amount, source_address, dest_address)
                .ok_or_else(|| BridgeError::InvalidAmount(draft.amount.clone()))?;
        Ok((request, route))
    }

    async fn execute(
        &self,
        request: &TransferRequest,
        route: &RouteConfig,
    ) -> Result<String, BridgeError> {
        let source = request.source_kind();
        let adapter = self
            .registry
            .adapter(source)
            .ok_or(BridgeError::MissingWallet(source))?;

        self.phase.send_replace(TransferPhase::Submitting);
        info!(
            %source,
            dest = %request.dest_kind(),
            amount = %request.amount(),
            bridge = %route.bridge_contract,
            "Submitting bridge transfer"
        );
        self.notifier.info(
            "Bridge Started",
            format!(
                "Bridging {} from {} to {}. Confirm in your wallet.",
                request.amount(),
                source.label(),
                request.dest_kind().label()
            ),
        );
        let tx_hash = self
            .bounded(adapter.build_and_submit_transfer(request, route))
            .await?;

        self.phase.send_replace(TransferPhase::AwaitingConfirmation);
        debug!(tx_hash = %tx_hash, "Awaiting source-chain confirmation");
        self.bounded(adapter.confirm_transfer(&tx_hash)).await?;
        Ok(tx_hash)
    }

    async fn bounded<T>(
        &self,
        step: impl Future<Output = Result<T, ChainError>>,
    ) -> Result<T, BridgeError> {
        match tokio::time::timeout(self.step_timeout, step).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BridgeError::TransferFailed(e.user_message())),
            Err(_) => Err(BridgeError::Timeout(self.step_timeout)),
        }
    }
}

/// Holds the single in-flight slot. Releasing it returns the phase to idle.
struct Slot<'a> {
    orchestrator: &'a BridgeOrchestrator,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.orchestrator.phase.send_replace(TransferPhase::Idle);
        self.orchestrator.in_flight.store(false, Ordering::Release);
    }
}

/// A validated transfer that owns the in-flight slot.
pub struct PendingTransfer<'a> {
    slot: Slot<'a>,
    request: TransferRequest,
    route: RouteConfig,
}

impl PendingTransfer<'_> {
    pub fn request(&self) -> &TransferRequest {
        &self.request
    }

    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    /// Submit and confirm. Every error ends in [`TransferResult::Failed`].
    pub async fn run(self) -> TransferResult {
        let orchestrator = self.slot.orchestrator;
        let result = match orchestrator.execute(&self.request, &self.route).await {
            Ok(tx_hash) => {
                orchestrator.phase.send_replace(TransferPhase::Succeeded);
                info!(tx_hash = %tx_hash, "Bridge transfer submitted");
                orchestrator.notifier.publish(
                    Notification::new(
                        NotificationType::Success,
                        "Bridge Initiated",
                        format!(
                            "{} from {} is on its way to {}. Transaction: {}",
                            self.request.amount(),
                            self.request.source_kind().label(),
                            self.request.dest_kind().label(),
                            tx_hash
                        ),
                    )
                    .with_duration(LONG_DURATION_MS),
                );
                TransferResult::Success(tx_hash)
            }
            Err(err) => {
                orchestrator.phase.send_replace(TransferPhase::Failed);
                warn!(error = %err, "Bridge transfer failed");
                let reason = err.user_message();
                orchestrator.notifier.publish(
                    Notification::new(NotificationType::Error, err.title(), reason.clone())
                        .with_duration(LONG_DURATION_MS),
                );
                TransferResult::Failed(reason)
            }
        };
        *orchestrator.last_result.lock() = Some(result.clone());
        result
    }
}

use std::sync::Arc;

use bridge_chains::{
    ChainAdapter, ChainError, ConnectionState, EvmAdapter, EvmProvider, HttpSolanaRpc, SolanaAdapter,
    SolanaWalletProvider, TronAdapter, TronProvider,
};
use bridge_core::{BridgeConfig, KvStore, Notifier};
use tokio::task::JoinHandle;
use tracing::info;

use crate::growth::{GrowthEstimator, GrowthTracker};
use crate::orchestrator::BridgeOrchestrator;
use crate::poller::{BalancePoller, PollerHandle, PollerScope};
use crate::registry::ConnectionRegistry;

/// Wallet providers the host found. `None` means the extension is absent.
#[derive(Default)]
pub struct WalletProviders {
    pub evm: Option<Arc<dyn EvmProvider>>,
    pub tron: Option<Arc<dyn TronProvider>>,
    pub solana: Option<Arc<dyn SolanaWalletProvider>>,
}

/// Build one adapter per wallet kind. Solana balances go through the
/// configured cluster's JSON-RPC endpoint.
pub fn build_adapters(
    config: &BridgeConfig,
    providers: WalletProviders,
) -> Result<Vec<Arc<dyn ChainAdapter>>, ChainError> {
    let rpc = HttpSolanaRpc::new(&config.solana_cluster, config.rpc_timeout())?;
    let evm: Arc<dyn ChainAdapter> =
        Arc::new(EvmAdapter::new(providers.evm, config.evm_confirmations));
    let tron: Arc<dyn ChainAdapter> = Arc::new(TronAdapter::new(providers.tron));
    let solana: Arc<dyn ChainAdapter> =
        Arc::new(SolanaAdapter::new(providers.solana, Arc::new(rpc)));
    Ok(vec![evm, tron, solana])
}

/// Everything one user session needs: the registry, both pollers, the
/// growth tracker and the orchestrator.
pub struct Session {
    registry: Arc<ConnectionRegistry>,
    widget: PollerHandle,
    dashboard: PollerHandle,
    growth: GrowthTracker,
    orchestrator: Arc<BridgeOrchestrator>,
    notifier: Arc<Notifier>,
    mount_tasks: Vec<JoinHandle<ConnectionState>>,
}

impl Session {
    /// Start background tasks and issue the configured auto-connects.
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: &BridgeConfig,
        adapters: Vec<Arc<dyn ChainAdapter>>,
        store: Arc<dyn KvStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(
            adapters,
            config.default_selection,
            config.connect_timeout(),
            Arc::clone(&notifier),
        ));

        let widget = BalancePoller::spawn(
            Arc::clone(&registry),
            PollerScope::ActiveOnly,
            config.widget_poll_interval(),
        );
        let dashboard = BalancePoller::spawn(
            Arc::clone(&registry),
            PollerScope::AllConnected,
            config.dashboard_poll_interval(),
        );
        let growth = GrowthTracker::spawn(
            Arc::clone(&registry),
            dashboard.board(),
            Arc::new(GrowthEstimator::new(store)),
        );
        let orchestrator = Arc::new(BridgeOrchestrator::new(
            Arc::clone(&registry),
            config.routes.clone(),
            config.transfer_timeout(),
            Arc::clone(&notifier),
        ));

        let mount_tasks = registry.mount(&config.auto_connect);
        info!(
            auto_connect = ?config.auto_connect,
            routes = config.routes.len(),
            "Bridge session started"
        );

        Self {
            registry,
            widget,
            dashboard,
            growth,
            orchestrator,
            notifier,
            mount_tasks,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn widget_poller(&self) -> &PollerHandle {
        &self.widget
    }

    pub fn dashboard_poller(&self) -> &PollerHandle {
        &self.dashboard
    }

    pub fn growth(&self) -> &GrowthTracker {
        &self.growth
    }

    pub fn orchestrator(&self) -> &Arc<BridgeOrchestrator> {
        &self.orchestrator
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Stop every background task. Connection states are left as they are.
    pub fn shutdown(&mut self) {
        for task in self.mount_tasks.drain(..) {
            task.abort();
        }
        self.widget.shutdown();
        self.dashboard.shutdown();
        self.growth.shutdown();
        info!("Bridge session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for task in self.mount_tasks.drain(..) {
            task.abort();
        }
    }
}

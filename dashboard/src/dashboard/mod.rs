use std::{future::Future, ops::ControlFlow, sync::Arc};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tokio::sync::{
    mpsc::{UnboundedReceiver, UnboundedSender},
    RwLock,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    aggregator::{AccountSnapshot, ReadAggregator},
    config::LocalConfig,
    dispatcher::{ActionDispatcher, DispatchOutcome, TrackedTx, TxState},
    protocol::{AddressBook, Asset, LendingProtocol},
    utils::{cancellation::CancellationToken, constants::WALLET_NOT_DETECTED},
    view::{projector, ElementBindings, ElementRole, UiSurface},
    wallet::{ConnectionGate, WalletProvider},
};

/// Everything that can happen to a running dashboard
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    ConnectClicked,
    SupplyClicked { asset: String },
    BorrowClicked { asset: String },
    CollateralToggled { asset: String, checked: bool },
    /// A collateral toggle never reached the chain
    CollateralRejected { asset: String, checked: bool },
    Refresh,
    TransactionSettled(TrackedTx),
    Quit,
}

/// Latest snapshot, shared with the health server
pub type SharedSnapshot = Arc<RwLock<Option<AccountSnapshot>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: u64,
    /// Address book key, e.g. `mainnet`
    pub name: String,
}

/// Per-connection context handed to every operation of the event loop
#[derive(Debug, Clone)]
pub struct DashboardSession {
    pub account: Address,
    pub network: NetworkInfo,
    pub assets: Vec<Asset>,
    pub bindings: ElementBindings,
}

/// Identifies the network behind `wallet`.
///
/// An unreachable wallet is reported to the user before the error is returned.
pub async fn detect_network(
    wallet: &dyn WalletProvider,
    surface: &dyn UiSurface,
    network_override: Option<&str>,
) -> Result<NetworkInfo> {
    let chain_id = match wallet.chain_id().await {
        Ok(chain_id) => chain_id,
        Err(e) => {
            surface.alert(WALLET_NOT_DETECTED);
            return Err(e.context("Wallet provider not detected"));
        }
    };

    let name = match network_override {
        Some(name) => name.to_string(),
        None => {
            let version = wallet.network_version().await?;
            AddressBook::network_name(version)?.to_string()
        }
    };

    info!("Wallet is on {} (chain id {})", name, chain_id);
    Ok(NetworkInfo { chain_id, name })
}

pub struct Dashboard {
    protocol: Arc<dyn LendingProtocol>,
    surface: Arc<dyn UiSurface>,
    network: NetworkInfo,
    gate: Arc<ConnectionGate>,
    aggregator: ReadAggregator,
    dispatcher: ActionDispatcher,
    events: UnboundedSender<DashboardEvent>,
    snapshot: SharedSnapshot,
    cancel: CancellationToken,
}

impl Dashboard {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        protocol: Arc<dyn LendingProtocol>,
        surface: Arc<dyn UiSurface>,
        local_config: &LocalConfig,
        network: NetworkInfo,
        events: UnboundedSender<DashboardEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let gate = Arc::new(ConnectionGate::new(
            wallet.clone(),
            local_config.connection_poll_interval(),
            local_config.connection_timeout(),
        ));
        let dispatcher = ActionDispatcher::new(
            protocol.clone(),
            wallet,
            surface.clone(),
            events.clone(),
            local_config.receipt_poll_interval(),
            local_config.receipt_timeout(),
            cancel.clone(),
        );

        Self {
            aggregator: ReadAggregator::new(protocol.clone()),
            protocol,
            surface,
            network,
            gate,
            dispatcher,
            events,
            snapshot: Arc::new(RwLock::new(None)),
            cancel,
        }
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn gate(&self) -> &ConnectionGate {
        &self.gate
    }

    /// Binds the elements, waits for the wallet, renders and then serves events
    /// until `Quit` arrives or the session is cancelled.
    #[instrument("DASHBOARD", skip_all)]
    pub async fn run(&self, mut events: UnboundedReceiver<DashboardEvent>) -> Result<()> {
        let assets = self.protocol.assets().to_vec();
        let symbols = assets
            .iter()
            .map(|asset| asset.symbol.clone())
            .collect::<Vec<_>>();

        let bindings = ElementBindings::bind(self.surface.as_ref(), &symbols)
            .context("Failed to bind dashboard elements")?;

        if let Some(button) = bindings.enable_button() {
            button.set_text("Connect wallet");
        }

        let Some(account) = self.wait_for_connection(&mut events).await? else {
            info!("Dashboard closed before the wallet connected");
            return Ok(());
        };

        if let Some(button) = bindings.enable_button() {
            button.set_text(format!("Connected {}", account));
        }

        let session = DashboardSession {
            account,
            network: self.network.clone(),
            assets,
            bindings,
        };
        info!(
            "Dashboard ready for {} on {}",
            session.account, session.network.name
        );

        self.refresh(&session).await;

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let flow = tokio::select! {
                _ = self.cancel.cancelled() => break,
                flow = self.handle_event(&session, event) => flow,
            };
            if flow.is_break() {
                break;
            }
        }

        info!("Dashboard stopped");
        Ok(())
    }

    /// Re-reads the account and projects the result
    pub async fn refresh(&self, session: &DashboardSession) -> AccountSnapshot {
        let snapshot = self.aggregator.refresh(session.account).await;

        projector::render_snapshot(&session.assets, &session.bindings, &snapshot);
        self.surface.render();

        *self.snapshot.write().await = Some(snapshot.clone());
        snapshot
    }

    async fn wait_for_connection(
        &self,
        events: &mut UnboundedReceiver<DashboardEvent>,
    ) -> Result<Option<Address>> {
        let poll = self.gate.poll_connection(&self.cancel);
        tokio::pin!(poll);

        loop {
            tokio::select! {
                result = &mut poll => return result.map(Some),
                event = events.recv() => match event {
                    Some(DashboardEvent::ConnectClicked) => {
                        let gate = self.gate.clone();
                        self.spawn_dispatch(async move {
                            if let Err(e) = gate.request_connection().await {
                                warn!("{:#}", e);
                            }
                        });
                    }
                    Some(DashboardEvent::Quit) | None => return Ok(None),
                    Some(other) => debug!("Ignoring {:?} until the wallet connects", other),
                },
            }
        }
    }

    async fn handle_event(
        &self,
        session: &DashboardSession,
        event: DashboardEvent,
    ) -> ControlFlow<()> {
        match event {
            DashboardEvent::ConnectClicked => {
                debug!("Already connected as {}", session.account);
            }
            DashboardEvent::SupplyClicked { asset } => {
                let input = Self::input_value(session, &asset, ElementRole::SupplyInput);
                let (dispatcher, account) = (self.dispatcher.clone(), session.account);
                self.spawn_dispatch(async move {
                    dispatcher.supply(account, &asset, &input).await;
                });
            }
            DashboardEvent::BorrowClicked { asset } => {
                let input = Self::input_value(session, &asset, ElementRole::BorrowInput);
                let (dispatcher, account) = (self.dispatcher.clone(), session.account);
                self.spawn_dispatch(async move {
                    dispatcher.borrow(account, &asset, &input).await;
                });
            }
            DashboardEvent::CollateralToggled { asset, checked } => {
                if let Some(checkbox) = session.bindings.get(&asset, ElementRole::CollateralCheckbox)
                {
                    checkbox.set_checked(checked);
                }

                let (dispatcher, account) = (self.dispatcher.clone(), session.account);
                let events = self.events.clone();
                self.spawn_dispatch(async move {
                    let outcome = dispatcher.mark_collateral(account, &asset, checked).await;
                    if let DispatchOutcome::Rejected(_) = outcome {
                        let _ = events.send(DashboardEvent::CollateralRejected { asset, checked });
                    }
                });
            }
            DashboardEvent::CollateralRejected { asset, checked } => {
                if let Some(checkbox) = session.bindings.get(&asset, ElementRole::CollateralCheckbox)
                {
                    checkbox.set_checked(!checked);
                }
            }
            DashboardEvent::Refresh => {
                self.refresh(session).await;
            }
            DashboardEvent::TransactionSettled(tx) => {
                // failed transactions refresh too, so toggled checkboxes snap back
                if matches!(tx.state, TxState::Confirmed { .. } | TxState::Failed { .. }) {
                    self.refresh(session).await;
                }
            }
            DashboardEvent::Quit => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }

    /// Runs a user action off the event loop until it finishes or the session is cancelled
    fn spawn_dispatch(&self, dispatch: impl Future<Output = ()> + Send + 'static) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!("Dispatch abandoned on shutdown"),
                _ = dispatch => {}
            }
        });
    }

    fn input_value(session: &DashboardSession, asset: &str, role: ElementRole) -> String {
        session
            .bindings
            .get(asset, role)
            .map(|element| element.value())
            .unwrap_or_default()
    }
}

mod tracked_tx;

use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, TxHash};
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

pub use tracked_tx::{TrackedTx, TxAction, TxState};

use crate::{
    dashboard::DashboardEvent,
    protocol::LendingProtocol,
    utils::{cancellation::CancellationToken, math_helper},
    view::UiSurface,
    wallet::WalletProvider,
};

/// What became of one user action
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Input was not a usable amount; nothing was sent
    Skipped,
    Submitted(TrackedTx),
    /// The wallet or protocol refused; the user has been alerted
    Rejected(String),
}

/// Validates user actions, forwards them to the protocol and follows the
/// resulting transactions until they settle.
#[derive(Clone)]
pub struct ActionDispatcher {
    protocol: Arc<dyn LendingProtocol>,
    wallet: Arc<dyn WalletProvider>,
    surface: Arc<dyn UiSurface>,
    events: UnboundedSender<DashboardEvent>,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
    cancel: CancellationToken,
}

impl ActionDispatcher {
    pub fn new(
        protocol: Arc<dyn LendingProtocol>,
        wallet: Arc<dyn WalletProvider>,
        surface: Arc<dyn UiSurface>,
        events: UnboundedSender<DashboardEvent>,
        receipt_poll_interval: Duration,
        receipt_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            protocol,
            wallet,
            surface,
            events,
            receipt_poll_interval,
            receipt_timeout,
            cancel,
        }
    }

    /// Supplies `input` units of `symbol`. Zero or non-numeric input is ignored.
    pub async fn supply(&self, account: Address, symbol: &str, input: &str) -> DispatchOutcome {
        self.dispatch_amount(TxAction::Supply, account, symbol, input)
            .await
    }

    /// Borrows `input` units of `symbol`. Zero or non-numeric input is ignored.
    pub async fn borrow(&self, account: Address, symbol: &str, input: &str) -> DispatchOutcome {
        self.dispatch_amount(TxAction::Borrow, account, symbol, input)
            .await
    }

    /// Enters the asset's market when `is_collateral`, exits it otherwise
    pub async fn mark_collateral(
        &self,
        account: Address,
        symbol: &str,
        is_collateral: bool,
    ) -> DispatchOutcome {
        let action = if is_collateral {
            TxAction::EnterMarket
        } else {
            TxAction::ExitMarket
        };

        let result = async {
            let asset = self.protocol.asset(symbol)?;
            if is_collateral {
                self.protocol.enter_market(account, asset).await
            } else {
                self.protocol.exit_market(account, asset).await
            }
        }
        .await;

        self.track(action, symbol, None, result)
    }

    async fn dispatch_amount(
        &self,
        action: TxAction,
        account: Address,
        symbol: &str,
        input: &str,
    ) -> DispatchOutcome {
        let Some(amount) = Self::validated(action, symbol, input) else {
            return DispatchOutcome::Skipped;
        };

        let scaled = self.protocol.asset(symbol).and_then(|asset| {
            let raw = math_helper::to_fixed_point(input, amount, asset.decimals)?;
            Ok((asset, raw))
        });
        let (asset, raw) = match scaled {
            Ok(scaled) => scaled,
            Err(e) => return self.track(action, symbol, Some(amount), Err(e)),
        };

        // smaller than one base unit of the asset
        if raw.is_zero() {
            debug!("Ignoring {} {} with amount {:?}: rounds to zero", action, symbol, input);
            return DispatchOutcome::Skipped;
        }

        let result = match action {
            TxAction::Supply => self.protocol.supply(account, asset, raw).await,
            _ => self.protocol.borrow(account, asset, raw).await,
        };

        self.track(action, symbol, Some(amount), result)
    }

    fn validated(action: TxAction, symbol: &str, input: &str) -> Option<f64> {
        let amount = math_helper::parse_amount(input);
        if amount.is_none() {
            debug!("Ignoring {} {} with amount {:?}", action, symbol, input);
        }
        amount
    }

    fn track(
        &self,
        action: TxAction,
        symbol: &str,
        amount: Option<f64>,
        result: Result<TxHash>,
    ) -> DispatchOutcome {
        match result {
            Ok(hash) => {
                info!(
                    "{} {} {} submitted, transaction hash {}",
                    symbol,
                    action,
                    amount.map(|amount| amount.to_string()).unwrap_or_default(),
                    hash
                );
                let tx = TrackedTx::submitted(action, symbol, amount, hash);
                self.watch_receipt(tx.clone());
                DispatchOutcome::Submitted(tx)
            }
            Err(e) => {
                let message = error_chain(&e);
                error!("{} {} failed: {}", symbol, action, message);
                self.surface.alert(&message);
                DispatchOutcome::Rejected(message)
            }
        }
    }

    fn watch_receipt(&self, tx: TrackedTx) {
        let dispatcher = self.clone();

        tokio::spawn(async move {
            let Some(state) = wait_for_receipt(
                dispatcher.wallet.as_ref(),
                tx.hash,
                dispatcher.receipt_poll_interval,
                dispatcher.receipt_timeout,
                &dispatcher.cancel,
            )
            .await
            else {
                debug!("Stopped watching {}", tx.hash);
                return;
            };

            let tx = tx.settle(state);
            match &tx.state {
                TxState::Confirmed { block_number } => info!(
                    "{} {} confirmed in block {:?}",
                    tx.asset, tx.action, block_number
                ),
                TxState::Failed { reason } => {
                    error!("{} {} failed: {}", tx.asset, tx.action, reason);
                    dispatcher
                        .surface
                        .alert(&format!("{} {} failed: {}", tx.asset, tx.action, reason));
                }
                TxState::Submitted => {}
            }

            if dispatcher
                .events
                .send(DashboardEvent::TransactionSettled(tx))
                .is_err()
            {
                debug!("Dashboard stopped before the transaction settled");
            }
        });
    }
}

/// Polls for the receipt of `hash`.
///
/// Returns `None` when cancelled; a missing receipt after `timeout` counts as failed.
pub async fn wait_for_receipt(
    wallet: &dyn WalletProvider,
    hash: TxHash,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Option<TxState> {
    let poll = async {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            match wallet.transaction_receipt(hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    return TxState::Confirmed {
                        block_number: receipt.block_number,
                    }
                }
                Ok(Some(_)) => {
                    return TxState::Failed {
                        reason: "transaction reverted".to_string(),
                    }
                }
                Ok(None) => debug!("{} is pending", hash),
                Err(e) => warn!("{:#}", e),
            }
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => None,
        state = tokio::time::timeout(timeout, poll) => Some(state.unwrap_or_else(|_| TxState::Failed {
            reason: format!("no receipt after {}s", timeout.as_secs()),
        })),
    }
}

/// `outer -> inner -> root` rendering of an error and its causes
pub fn error_chain(e: &anyhow::Error) -> String {
    e.chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        test_support::{test_account, test_assets, units, FakeProtocol, FakeWallet},
        view::MemorySurface,
        wallet::TxReceipt,
    };

    struct Harness {
        protocol: Arc<FakeProtocol>,
        wallet: Arc<FakeWallet>,
        surface: Arc<MemorySurface>,
        dispatcher: ActionDispatcher,
        events: mpsc::UnboundedReceiver<DashboardEvent>,
    }

    fn harness() -> Harness {
        let protocol = Arc::new(FakeProtocol::new(test_assets()));
        let wallet = Arc::new(FakeWallet::connected_after(0));
        let surface = Arc::new(MemorySurface::new());
        let (events_tx, events) = mpsc::unbounded_channel();
        let dispatcher = ActionDispatcher::new(
            protocol.clone(),
            wallet.clone(),
            surface.clone(),
            events_tx,
            Duration::from_millis(5),
            Duration::from_millis(200),
            CancellationToken::new(),
        );
        Harness {
            protocol,
            wallet,
            surface,
            dispatcher,
            events,
        }
    }

    #[tokio::test]
    async fn test_invalid_amounts_never_reach_the_protocol() {
        let h = harness();

        for input in ["0", "NaN", "", "abc", "-3"] {
            assert_eq!(
                h.dispatcher.supply(test_account(), "ETH", input).await,
                DispatchOutcome::Skipped
            );
            assert_eq!(
                h.dispatcher.borrow(test_account(), "USDC", input).await,
                DispatchOutcome::Skipped
            );
        }

        assert!(h.protocol.writes().is_empty());
        assert!(h.surface.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_amount_below_one_base_unit_is_skipped() {
        let h = harness();

        assert_eq!(
            h.dispatcher.supply(test_account(), "USDC", "0.0000001").await,
            DispatchOutcome::Skipped
        );
        assert_eq!(
            h.dispatcher.borrow(test_account(), "USDC", "0.0000004").await,
            DispatchOutcome::Skipped
        );
        // one base unit still goes through
        assert!(matches!(
            h.dispatcher.supply(test_account(), "USDC", "0.000001").await,
            DispatchOutcome::Submitted(_)
        ));

        assert_eq!(
            h.protocol.writes(),
            vec![("supply".to_string(), "USDC".to_string(), Some(U256::from(1u64)))]
        );
        assert!(h.surface.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_supply_scales_amount_and_confirms() {
        let mut h = harness();

        let outcome = h.dispatcher.supply(test_account(), "usdc", "12.5").await;
        let DispatchOutcome::Submitted(tx) = outcome else {
            panic!("expected a submitted transaction, got {:?}", outcome);
        };
        assert_eq!(tx.state, TxState::Submitted);
        assert_eq!(
            h.protocol.writes(),
            vec![("supply".to_string(), "USDC".to_string(), Some(units(125, 5)))]
        );

        h.wallet.set_receipt(
            tx.hash,
            TxReceipt {
                success: true,
                block_number: Some(11),
            },
        );

        let Some(DashboardEvent::TransactionSettled(settled)) = h.events.recv().await else {
            panic!("expected a settled transaction");
        };
        assert_eq!(settled.hash, tx.hash);
        assert_eq!(
            settled.state,
            TxState::Confirmed {
                block_number: Some(11)
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_write_alerts_with_error_chain() {
        let h = harness();
        h.protocol.fail_writes("insufficient liquidity");

        let outcome = h.dispatcher.borrow(test_account(), "ETH", "1").await;

        let DispatchOutcome::Rejected(message) = outcome else {
            panic!("expected a rejection, got {:?}", outcome);
        };
        assert!(message.contains("insufficient liquidity"));
        assert_eq!(h.surface.alerts(), vec![message]);
    }

    #[tokio::test]
    async fn test_reverted_transaction_settles_as_failed() {
        let mut h = harness();

        let DispatchOutcome::Submitted(tx) =
            h.dispatcher.mark_collateral(test_account(), "UNI", true).await
        else {
            panic!("expected a submitted transaction");
        };
        assert_eq!(tx.action, TxAction::EnterMarket);

        h.wallet.set_receipt(
            tx.hash,
            TxReceipt {
                success: false,
                block_number: Some(3),
            },
        );

        let Some(DashboardEvent::TransactionSettled(settled)) = h.events.recv().await else {
            panic!("expected a settled transaction");
        };
        assert!(matches!(settled.state, TxState::Failed { .. }));
        assert_eq!(h.surface.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_collateral_toggle_routes_to_enter_and_exit() {
        let h = harness();

        h.dispatcher.mark_collateral(test_account(), "ETH", true).await;
        h.dispatcher.mark_collateral(test_account(), "ETH", false).await;

        assert_eq!(
            h.protocol.writes(),
            vec![
                ("enter_market".to_string(), "ETH".to_string(), None),
                ("exit_market".to_string(), "ETH".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_receipt_times_out() {
        let wallet = FakeWallet::connected_after(0);
        let state = wait_for_receipt(
            &wallet,
            TxHash::ZERO,
            Duration::from_millis(5),
            Duration::from_millis(30),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(state, Some(TxState::Failed { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_wait_returns_none() {
        let wallet = FakeWallet::connected_after(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let state = wait_for_receipt(
            &wallet,
            TxHash::ZERO,
            Duration::from_millis(5),
            Duration::from_secs(5),
            &cancel,
        )
        .await;

        assert_eq!(state, None);
    }
}

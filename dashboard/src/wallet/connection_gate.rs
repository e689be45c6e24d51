use std::{sync::Arc, time::Duration};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, instrument, warn};

use super::WalletProvider;
use crate::utils::cancellation::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Polling,
    /// Terminal: disconnects are not tracked
    Connected(Address),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}

/// Waits for the wallet to expose an authorized account before the dashboard starts.
///
/// Concurrent `poll_connection` calls share a single poll loop, so the
/// `Connected` transition is published exactly once.
pub struct ConnectionGate {
    wallet: Arc<dyn WalletProvider>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    state: watch::Sender<ConnectionState>,
    connected: OnceCell<Address>,
}

impl ConnectionGate {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            wallet,
            poll_interval,
            timeout,
            state,
            connected: OnceCell::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// One-off check without changing the gate state
    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.wallet.selected_account().await?.is_some())
    }

    /// Polls `eth_accounts` until it is non-empty and returns the selected account.
    ///
    /// # Errors
    /// Returns an error when `cancel` fires or the configured timeout elapses; the
    /// gate then falls back to `Disconnected` and a later call starts a fresh poll.
    #[instrument("CONNECTION_GATE", skip_all)]
    pub async fn poll_connection(&self, cancel: &CancellationToken) -> Result<Address> {
        self.connected
            .get_or_try_init(|| self.poll_until_connected(cancel))
            .await
            .copied()
    }

    /// Asks the wallet to prompt the user. A rejection leaves the gate untouched.
    pub async fn request_connection(&self) -> Result<Vec<Address>> {
        info!("Requesting account access");
        let accounts = self
            .wallet
            .request_accounts()
            .await
            .context("Account access was not granted")?;
        debug!("Wallet returned {} account(s)", accounts.len());
        Ok(accounts)
    }

    async fn poll_until_connected(&self, cancel: &CancellationToken) -> Result<Address> {
        self.state.send_replace(ConnectionState::Polling);
        let _reset = PollingReset(&self.state);
        info!("Waiting for the wallet to connect");

        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.poll_loop(cancel))
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow::anyhow!(
                        "Wallet did not connect within {}s",
                        timeout.as_secs()
                    ))
                }),
            None => self.poll_loop(cancel).await,
        };

        match &result {
            Ok(account) => {
                self.state.send_replace(ConnectionState::Connected(*account));
                info!("Wallet connected with account {}", account);
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Disconnected);
                warn!("Stopped waiting for the wallet: {}", e);
            }
        }

        result
    }

    async fn poll_loop(&self, cancel: &CancellationToken) -> Result<Address> {
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => anyhow::bail!("Connection polling cancelled"),
                _ = ticker.tick() => {}
            }

            match self.wallet.selected_account().await {
                Ok(Some(account)) => return Ok(account),
                Ok(None) => debug!("No authorized account yet"),
                Err(e) => warn!("Failed to read accounts: {}", e),
            }
        }
    }
}

/// Falls back to `Disconnected` when a poll is dropped before it finished
struct PollingReset<'a>(&'a watch::Sender<ConnectionState>);

impl Drop for PollingReset<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            let polling = *state == ConnectionState::Polling;
            if polling {
                *state = ConnectionState::Disconnected;
            }
            polling
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_account, FakeWallet};

    fn gate(wallet: &Arc<FakeWallet>, timeout: Option<Duration>) -> ConnectionGate {
        ConnectionGate::new(wallet.clone(), Duration::from_millis(10), timeout)
    }

    #[tokio::test]
    async fn test_poll_connects_once_accounts_appear() {
        let wallet = Arc::new(FakeWallet::connected_after(3));
        let gate = gate(&wallet, None);

        let account = gate.poll_connection(&CancellationToken::new()).await.unwrap();

        assert_eq!(account, test_account());
        assert_eq!(gate.state(), ConnectionState::Connected(test_account()));
        assert_eq!(wallet.accounts_calls(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_polls_share_one_loop_and_stop() {
        let wallet = Arc::new(FakeWallet::connected_after(5));
        let gate = Arc::new(gate(&wallet, None));
        let mut states = gate.subscribe();
        let cancel = CancellationToken::new();

        let pollers = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { gate.poll_connection(&cancel).await })
            })
            .collect::<Vec<_>>();

        for poller in futures::future::join_all(pollers).await {
            assert_eq!(poller.unwrap().unwrap(), test_account());
        }

        // a single loop ran: five empty answers plus the connecting one
        assert_eq!(wallet.accounts_calls(), 6);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(wallet.accounts_calls(), 6);

        // a late caller gets the cached account without polling again
        assert_eq!(gate.poll_connection(&cancel).await.unwrap(), test_account());
        assert_eq!(wallet.accounts_calls(), 6);

        assert!(states.borrow_and_update().is_connected());
    }

    #[tokio::test]
    async fn test_cancel_returns_to_disconnected() {
        let wallet = Arc::new(FakeWallet::never_connected());
        let gate = Arc::new(gate(&wallet, None));
        let cancel = CancellationToken::new();

        let poller = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.poll_connection(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(gate.state(), ConnectionState::Polling);

        cancel.cancel();
        assert!(poller.await.unwrap().is_err());
        assert_eq!(gate.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_dropped_poll_returns_to_disconnected() {
        let wallet = Arc::new(FakeWallet::never_connected());
        let gate = gate(&wallet, None);
        let cancel = CancellationToken::new();

        let stopped = tokio::time::timeout(
            Duration::from_millis(30),
            gate.poll_connection(&cancel),
        )
        .await;

        assert!(stopped.is_err());
        assert_eq!(gate.state(), ConnectionState::Disconnected);

        // a later poll starts over
        wallet.connect();
        assert_eq!(gate.poll_connection(&cancel).await.unwrap(), test_account());
        assert_eq!(gate.state(), ConnectionState::Connected(test_account()));
    }

    #[tokio::test]
    async fn test_timeout_bounds_polling() {
        let wallet = Arc::new(FakeWallet::never_connected());
        let gate = gate(&wallet, Some(Duration::from_millis(50)));

        let err = gate
            .poll_connection(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("did not connect"));
        assert_eq!(gate.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_rejected_request_leaves_state_unchanged() {
        let wallet = Arc::new(FakeWallet::never_connected());
        wallet.reject_requests();
        let gate = gate(&wallet, None);

        assert!(gate.request_connection().await.is_err());
        assert_eq!(gate.state(), ConnectionState::Disconnected);
        assert!(!gate.is_connected().await.unwrap());
    }
}

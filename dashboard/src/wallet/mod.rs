pub mod alloy_wallet;
pub mod connection_gate;

use alloy::primitives::{Address, TxHash};
use anyhow::Result;
use async_trait::async_trait;

pub use alloy_wallet::AlloyWallet;
pub use connection_gate::{ConnectionGate, ConnectionState};

/// Settlement of a submitted transaction as reported by the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub success: bool,
    pub block_number: Option<u64>,
}

/// The account-holding side of the session: authorization, network identity and
/// transaction receipts. Signing happens behind this boundary.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts the user already authorized (`eth_accounts`)
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Prompts the user for account access (`eth_requestAccounts`)
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    async fn chain_id(&self) -> Result<u64>;

    /// Legacy network id, which equals the chain id on every network we know
    async fn network_version(&self) -> Result<u64> {
        self.chain_id().await
    }

    /// `None` while the transaction is still pending
    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>>;

    /// The first authorized account, if any
    async fn selected_account(&self) -> Result<Option<Address>> {
        Ok(self.accounts().await?.into_iter().next())
    }
}

use alloy::{
    network::{Ethereum, ReceiptResponse},
    primitives::{Address, TxHash},
    providers::Provider,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{TxReceipt, WalletProvider};

/// Wallet reached over JSON-RPC. The endpoint holds the keys and signs
/// `eth_sendTransaction` on behalf of the authorized accounts.
#[derive(Clone)]
pub struct AlloyWallet<P: Provider<Ethereum>> {
    provider: P,
}

impl<P: Provider<Ethereum>> AlloyWallet<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> WalletProvider for AlloyWallet<P>
where
    P: Provider<Ethereum> + Send + Sync + 'static,
{
    async fn accounts(&self) -> Result<Vec<Address>> {
        self.provider
            .get_accounts()
            .await
            .context("eth_accounts failed")
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.provider
            .raw_request::<(), Vec<Address>>("eth_requestAccounts".into(), ())
            .await
            .context("eth_requestAccounts failed")
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("eth_chainId failed")
    }

    async fn network_version(&self) -> Result<u64> {
        match self
            .provider
            .raw_request::<(), String>("net_version".into(), ())
            .await
        {
            Ok(version) => version
                .parse::<u64>()
                .with_context(|| format!("net_version returned {}", version)),
            Err(e) => {
                debug!("net_version unavailable ({}), using chain id", e);
                self.chain_id().await
            }
        }
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .with_context(|| format!("Failed to fetch receipt for {}", hash))?;

        Ok(receipt.map(|receipt| TxReceipt {
            success: receipt.status(),
            block_number: receipt.block_number(),
        }))
    }
}

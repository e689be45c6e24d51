use std::sync::Arc;

use alloy::{
    network::Ethereum,
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::{http::reqwest::Url, layers::RetryBackoffLayer},
};
use anyhow::{Context, Result};
use tracing::info;

use crate::{
    config::LocalConfig,
    protocol::{AddressBook, CompoundProtocol, LendingProtocol},
    wallet::{AlloyWallet, WalletProvider},
};

/// BlockchainManager creates the provider and the chain-backed halves of a session.
pub struct BlockchainManager;

impl BlockchainManager {
    /// Creates an HTTP provider for the wallet endpoint.
    ///
    /// # Arguments
    /// * `local_config` - Local configuration containing the RPC URL
    pub fn get_provider(
        local_config: &LocalConfig,
    ) -> Result<impl Provider<Ethereum> + Clone + 'static> {
        // max retries, initial backoff in ms, compute units per second
        let retry_layer = RetryBackoffLayer::new(10, 1000, 10000);

        let url = Url::parse(&local_config.rpc_url)
            .with_context(|| format!("Invalid RPC_URL {}", local_config.rpc_url))?;
        let client = RpcClient::builder().layer(retry_layer).http(url);

        Ok(ProviderBuilder::new().on_client(client))
    }

    pub fn get_wallet<P>(provider: P) -> Arc<dyn WalletProvider>
    where
        P: Provider<Ethereum> + Send + Sync + 'static,
    {
        Arc::new(AlloyWallet::new(provider))
    }

    /// Compound markets for the configured assets on `network`
    pub fn get_lending_protocol<P>(
        provider: P,
        local_config: &LocalConfig,
        network: &str,
    ) -> Result<Arc<dyn LendingProtocol>>
    where
        P: Provider<Ethereum> + Send + Sync + 'static,
    {
        let address_book = match &local_config.address_book {
            Some(path) => AddressBook::load_with_overrides(path)?,
            None => AddressBook::default(),
        };

        let protocol = CompoundProtocol::from_address_book(
            provider,
            &address_book,
            network,
            &local_config.assets,
        )
        .with_context(|| format!("Failed to resolve markets on {}", network))?
        .with_approval_timeout(local_config.receipt_timeout());

        info!(
            "Tracking {} market(s) on {}",
            protocol.assets().len(),
            network
        );

        Ok(Arc::new(protocol))
    }
}

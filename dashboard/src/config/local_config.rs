use std::time::Duration;

use anyhow::Result;

use super::env_helper::{load_env_var, load_env_var_or, parse_list};
use crate::utils::constants::{
    DEFAULT_ASSETS, DEFAULT_CONNECTION_POLL_INTERVAL_MS, DEFAULT_HEALTH_SERVER_PORT,
    DEFAULT_RECEIPT_POLL_INTERVAL_MS, DEFAULT_RECEIPT_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub rpc_url: String,
    /// Upper-case tickers, in display order
    pub assets: Vec<String>,
    pub connection_poll_interval_ms: u64,
    /// 0 keeps polling until cancelled
    pub connection_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
    /// Address book network to use instead of the one derived from the chain id
    pub network: Option<String>,
    /// JSON file with extra address book entries
    pub address_book: Option<String>,
    pub health_server: bool,
    pub health_server_port: u16,
}

impl LocalConfig {
    pub fn load_from_env() -> Result<Self> {
        let assets = parse_list(&load_env_var_or("ASSETS", DEFAULT_ASSETS.to_string())?)
            .into_iter()
            .map(|asset| asset.to_uppercase())
            .collect::<Vec<_>>();

        if assets.is_empty() {
            anyhow::bail!("ASSETS must name at least one asset");
        }

        let network = match load_env_var_or("NETWORK", String::new())? {
            network if network.is_empty() => None,
            network => Some(network.to_lowercase()),
        };

        let address_book = match load_env_var_or("ADDRESS_BOOK", String::new())? {
            path if path.is_empty() => None,
            path => Some(path),
        };

        let local_config = Self {
            rpc_url: load_env_var("RPC_URL")?,
            assets,
            connection_poll_interval_ms: load_env_var_or(
                "CONNECTION_POLL_INTERVAL_MS",
                DEFAULT_CONNECTION_POLL_INTERVAL_MS,
            )?,
            connection_timeout_secs: load_env_var_or("CONNECTION_TIMEOUT_SECS", 0)?,
            receipt_poll_interval_ms: load_env_var_or(
                "RECEIPT_POLL_INTERVAL_MS",
                DEFAULT_RECEIPT_POLL_INTERVAL_MS,
            )?,
            receipt_timeout_secs: load_env_var_or(
                "RECEIPT_TIMEOUT_SECS",
                DEFAULT_RECEIPT_TIMEOUT_SECS,
            )?,
            network,
            address_book,
            health_server: load_env_var_or("HEALTH_SERVER", true)?,
            health_server_port: load_env_var_or("PORT", DEFAULT_HEALTH_SERVER_PORT)?,
        };

        local_config.validate()?;
        Ok(local_config)
    }

    /// Poll intervals feed `tokio::time::interval`, which rejects a zero period
    pub fn validate(&self) -> Result<()> {
        if self.connection_poll_interval_ms == 0 {
            anyhow::bail!("CONNECTION_POLL_INTERVAL_MS must be greater than 0");
        }
        if self.receipt_poll_interval_ms == 0 {
            anyhow::bail!("RECEIPT_POLL_INTERVAL_MS must be greater than 0");
        }
        Ok(())
    }

    pub fn connection_poll_interval(&self) -> Duration {
        Duration::from_millis(self.connection_poll_interval_ms)
    }

    pub fn connection_timeout(&self) -> Option<Duration> {
        match self.connection_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            assets: parse_list(DEFAULT_ASSETS),
            connection_poll_interval_ms: DEFAULT_CONNECTION_POLL_INTERVAL_MS,
            connection_timeout_secs: 0,
            receipt_poll_interval_ms: DEFAULT_RECEIPT_POLL_INTERVAL_MS,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            network: None,
            address_book: None,
            health_server: true,
            health_server_port: DEFAULT_HEALTH_SERVER_PORT,
        }
    }
}

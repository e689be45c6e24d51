use std::collections::HashMap;

use alloy::primitives::{address, Address};
use anyhow::{Context, Result};

use super::{Asset, ProtocolError};

pub const COMPTROLLER: &str = "Comptroller";

/// Underlying decimals of the assets the address book knows about
const DECIMALS: &[(&str, u8)] = &[
    ("ETH", 18),
    ("USDC", 6),
    ("UNI", 18),
    ("DAI", 18),
    ("USDT", 6),
    ("WBTC", 8),
    ("COMP", 18),
];

/// Chain ids with a built-in address table
const NETWORKS: &[(u64, &str)] = &[(1, "mainnet")];

/// Network-specific contract addresses, keyed by network name then symbol
#[derive(Debug, Clone)]
pub struct AddressBook {
    networks: HashMap<String, HashMap<String, Address>>,
}

impl Default for AddressBook {
    fn default() -> Self {
        let mainnet = HashMap::from([
            (
                COMPTROLLER.to_string(),
                address!("3d9819210a31b4961b30ef54be2aed79b9c9cd3b"),
            ),
            (
                "cETH".to_string(),
                address!("4ddc2d193948926d02f9b1fe9e1daa0718270ed5"),
            ),
            (
                "cUSDC".to_string(),
                address!("39aa39c021dfbae8fac545936693ac917d5e7563"),
            ),
            (
                "cUNI".to_string(),
                address!("35a18000230da775cac24873d00ff85bccded550"),
            ),
            (
                "cDAI".to_string(),
                address!("5d3a536e4d6dbd6114cc1ead35777bab948e3643"),
            ),
            (
                "cUSDT".to_string(),
                address!("f650c3d88d12db855b8bf7d11be6c55a4e07dcc9"),
            ),
            (
                "cWBTC".to_string(),
                address!("ccf4429db6322d5c611ee964527d42e5d685dd6a"),
            ),
            (
                "cCOMP".to_string(),
                address!("70e36f6bf80a52b3b46b3af8e106cc0ed743e8e4"),
            ),
        ]);

        Self {
            networks: HashMap::from([("mainnet".to_string(), mainnet)]),
        }
    }
}

impl AddressBook {
    /// Builds an address book from explicit tables, mostly for private deployments
    pub fn new(networks: HashMap<String, HashMap<String, Address>>) -> Self {
        Self { networks }
    }

    /// Parses `{"<network>": {"Comptroller": "0x..", "cETH": "0x.."}}`
    pub fn from_json(json: &str) -> Result<Self> {
        let networks = serde_json::from_str(json).context("Malformed address book")?;
        Ok(Self::new(networks))
    }

    /// Built-in tables extended by the address book file at `path`.
    /// Entries from the file win over built-in ones.
    pub fn load_with_overrides(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read address book {}", path))?;
        let overrides = Self::from_json(&json).with_context(|| format!("In {}", path))?;
        Ok(Self::default().merge(overrides))
    }

    pub fn merge(mut self, other: AddressBook) -> Self {
        for (network, addresses) in other.networks {
            self.networks.entry(network).or_default().extend(addresses);
        }
        self
    }

    /// Maps a chain id to the network name used as address book key.
    ///
    /// Only chains with a built-in table are known; others need `NETWORK`.
    pub fn network_name(chain_id: u64) -> Result<&'static str> {
        NETWORKS
            .iter()
            .find(|(known, _)| *known == chain_id)
            .map(|(_, name)| *name)
            .ok_or_else(|| ProtocolError::UnknownNetwork(chain_id).into())
    }

    pub fn address(&self, symbol: &str, network: &str) -> Result<Address> {
        self.networks
            .get(network)
            .and_then(|addresses| addresses.get(symbol))
            .copied()
            .ok_or_else(|| {
                ProtocolError::UnknownAddress {
                    symbol: symbol.to_string(),
                    network: network.to_string(),
                }
                .into()
            })
    }

    pub fn decimals(symbol: &str) -> Result<u8> {
        let symbol = symbol.to_uppercase();
        DECIMALS
            .iter()
            .find(|(known, _)| *known == symbol)
            .map(|(_, decimals)| *decimals)
            .ok_or_else(|| ProtocolError::UnknownAsset(symbol).into())
    }

    /// Resolves the configured tickers into assets for one network
    pub fn resolve_assets(&self, symbols: &[String], network: &str) -> Result<Vec<Asset>> {
        symbols
            .iter()
            .map(|symbol| -> Result<Asset> {
                let symbol = symbol.to_uppercase();
                let market = self.address(&format!("c{}", symbol), network)?;
                Ok(Asset::new(&symbol, Self::decimals(&symbol)?, market))
            })
            .collect()
    }
}

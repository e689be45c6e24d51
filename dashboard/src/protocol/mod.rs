pub mod address_book;
pub mod compound;

use alloy::primitives::{Address, TxHash, U256};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use address_book::AddressBook;
pub use compound::CompoundProtocol;

/// A supported underlying asset and the market that wraps it on the active network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Upper-case ticker, e.g. `USDC`
    pub symbol: String,
    /// Decimals of the underlying token
    pub decimals: u8,
    /// Address of the wrapped lending market (cToken)
    pub market: Address,
}

impl Asset {
    pub fn new(symbol: &str, decimals: u8, market: Address) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            decimals,
            market,
        }
    }

    /// Lower-case ticker used in element ids
    pub fn label(&self) -> String {
        self.symbol.to_lowercase()
    }

    /// The native asset is supplied by value rather than through an ERC-20 allowance
    pub fn is_native(&self) -> bool {
        self.symbol == "ETH"
    }
}

/// Raw result of the comptroller liquidity view, both values scaled by 1e18
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountLiquidity {
    pub liquidity: U256,
    pub shortfall: U256,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown asset {0}")]
    UnknownAsset(String),
    #[error("no addresses known for chain id {0}")]
    UnknownNetwork(u64),
    #[error("no address for {symbol} on {network}")]
    UnknownAddress { symbol: String, network: String },
    #[error("{action} rejected by the protocol with error code {code}")]
    ProtocolCode { action: &'static str, code: U256 },
}

/// Read and write surface of the lending protocol.
///
/// Reads return raw fixed-point values; scaling is left to the caller.
/// Writes return as soon as the wallet accepted the transaction.
#[async_trait]
pub trait LendingProtocol: Send + Sync {
    /// Assets configured for this session, in display order
    fn assets(&self) -> &[Asset];

    fn asset(&self, symbol: &str) -> Result<&Asset> {
        let symbol = symbol.to_uppercase();
        self.assets()
            .iter()
            .find(|asset| asset.symbol == symbol)
            .ok_or_else(|| ProtocolError::UnknownAsset(symbol).into())
    }

    async fn account_liquidity(&self, account: Address) -> Result<AccountLiquidity>;

    async fn underlying_balance(&self, account: Address, asset: &Asset) -> Result<U256>;

    async fn borrow_balance(&self, account: Address, asset: &Asset) -> Result<U256>;

    /// Markets the account has entered as collateral
    async fn assets_in(&self, account: Address) -> Result<Vec<Address>>;

    /// Price of one unit of the underlying in USD
    async fn price(&self, asset: &Asset) -> Result<f64>;

    async fn supply(&self, account: Address, asset: &Asset, amount: U256) -> Result<TxHash>;

    async fn borrow(&self, account: Address, asset: &Asset, amount: U256) -> Result<TxHash>;

    async fn enter_market(&self, account: Address, asset: &Asset) -> Result<TxHash>;

    async fn exit_market(&self, account: Address, asset: &Asset) -> Result<TxHash>;
}

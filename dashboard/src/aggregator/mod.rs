mod snapshot;

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use tracing::{instrument, warn};

pub use snapshot::{AccountSnapshot, AssetPosition};

use crate::{
    protocol::{Asset, LendingProtocol},
    utils::{constants::LIQUIDITY_DECIMALS, math_helper},
};

/// Fans out the reads of one dashboard refresh and scales the results.
///
/// Per-asset reads are best-effort: a failed read becomes `None` for that asset
/// and is logged, the other assets are unaffected.
#[derive(Clone)]
pub struct ReadAggregator {
    protocol: Arc<dyn LendingProtocol>,
}

impl ReadAggregator {
    pub fn new(protocol: Arc<dyn LendingProtocol>) -> Self {
        Self { protocol }
    }

    pub fn assets(&self) -> &[Asset] {
        self.protocol.assets()
    }

    /// Spare borrowing capacity and shortfall in USD
    pub async fn get_account_liquidity(&self, account: Address) -> Result<(f64, f64)> {
        let liquidity = self.protocol.account_liquidity(account).await?;
        Ok((
            math_helper::divide_by_precision_f64(liquidity.liquidity, LIQUIDITY_DECIMALS),
            math_helper::divide_by_precision_f64(liquidity.shortfall, LIQUIDITY_DECIMALS),
        ))
    }

    pub async fn get_underlying_balance(&self, account: Address, asset: &Asset) -> Result<f64> {
        let balance = self.protocol.underlying_balance(account, asset).await?;
        Ok(math_helper::divide_by_precision_f64(balance, asset.decimals))
    }

    pub async fn get_borrow_balance(&self, account: Address, asset: &Asset) -> Result<f64> {
        let balance = self.protocol.borrow_balance(account, asset).await?;
        Ok(math_helper::divide_by_precision_f64(balance, asset.decimals))
    }

    pub async fn get_assets_in(&self, account: Address) -> Result<Vec<Address>> {
        self.protocol.assets_in(account).await
    }

    /// Prices of `symbols` keyed by the requested symbol.
    ///
    /// Requests run concurrently; results are matched back by position, so the
    /// order in which they resolve does not matter.
    pub async fn get_prices(&self, symbols: &[String]) -> HashMap<String, Option<f64>> {
        let requests = symbols.iter().map(|symbol| async move {
            let asset = self.protocol.asset(symbol)?;
            self.protocol.price(asset).await
        });

        let prices = join_all(requests).await;

        symbols
            .iter()
            .zip(prices)
            .map(|(symbol, price)| (symbol.clone(), Self::best_effort("price", symbol, price)))
            .collect()
    }

    /// Supplied amounts in configured asset order
    pub async fn get_underlying_balances(&self, account: Address) -> Vec<Option<f64>> {
        let requests = self
            .assets()
            .iter()
            .map(|asset| self.get_underlying_balance(account, asset));

        self.assets()
            .iter()
            .zip(join_all(requests).await)
            .map(|(asset, balance)| Self::best_effort("supplied balance", &asset.symbol, balance))
            .collect()
    }

    /// Borrowed amounts in configured asset order
    pub async fn get_borrow_balances(&self, account: Address) -> Vec<Option<f64>> {
        let requests = self
            .assets()
            .iter()
            .map(|asset| self.get_borrow_balance(account, asset));

        self.assets()
            .iter()
            .zip(join_all(requests).await)
            .map(|(asset, balance)| Self::best_effort("borrow balance", &asset.symbol, balance))
            .collect()
    }

    /// Reads everything the dashboard shows for `account` in one concurrent pass
    #[instrument("REFRESH", skip(self))]
    pub async fn refresh(&self, account: Address) -> AccountSnapshot {
        let symbols = self
            .assets()
            .iter()
            .map(|asset| asset.symbol.clone())
            .collect::<Vec<_>>();

        let (liquidity, supplied, borrowed, prices, assets_in) = futures::join!(
            self.get_account_liquidity(account),
            self.get_underlying_balances(account),
            self.get_borrow_balances(account),
            self.get_prices(&symbols),
            self.get_assets_in(account),
        );

        let (liquidity, shortfall) = match liquidity.context("Account liquidity unavailable") {
            Ok((liquidity, shortfall)) => (Some(liquidity), Some(shortfall)),
            Err(e) => {
                warn!("{:#}", e);
                (None, None)
            }
        };

        let assets_in = assets_in.unwrap_or_else(|e| {
            warn!("Collateral markets unavailable: {:#}", e);
            Vec::new()
        });

        let positions = self
            .assets()
            .iter()
            .zip(supplied.into_iter().zip(borrowed))
            .map(|(asset, (supplied, borrowed))| AssetPosition {
                symbol: asset.symbol.clone(),
                market: asset.market,
                supplied,
                borrowed,
                price: prices.get(&asset.symbol).copied().flatten(),
                is_collateral: assets_in.contains(&asset.market),
            })
            .collect();

        AccountSnapshot {
            account,
            liquidity,
            shortfall,
            positions,
            assets_in,
            refreshed_at: Utc::now(),
        }
    }

    fn best_effort<T>(what: &str, symbol: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to read {} {}: {:#}", symbol, what, e);
                None
            }
        }
    }
}

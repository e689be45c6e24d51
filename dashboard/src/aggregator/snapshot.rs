use std::collections::{HashMap, HashSet};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::math_helper;

/// What one account holds in one market. `None` marks a read that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetPosition {
    pub symbol: String,
    pub market: Address,
    pub supplied: Option<f64>,
    pub borrowed: Option<f64>,
    pub price: Option<f64>,
    pub is_collateral: bool,
}

/// Everything one rendering pass needs, read in a single refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub account: Address,
    /// Spare borrowing capacity in USD
    pub liquidity: Option<f64>,
    /// USD amount by which the account is under-collateralized
    pub shortfall: Option<f64>,
    /// In configured asset order
    pub positions: Vec<AssetPosition>,
    pub assets_in: Vec<Address>,
    pub refreshed_at: DateTime<Utc>,
}

impl AccountSnapshot {
    pub fn supplied(&self) -> Vec<Option<f64>> {
        self.positions.iter().map(|position| position.supplied).collect()
    }

    pub fn borrowed(&self) -> Vec<Option<f64>> {
        self.positions.iter().map(|position| position.borrowed).collect()
    }

    pub fn prices(&self) -> HashMap<String, Option<f64>> {
        self.positions
            .iter()
            .map(|position| (position.symbol.clone(), position.price))
            .collect()
    }

    pub fn assets_in_set(&self) -> HashSet<Address> {
        self.assets_in.iter().copied().collect()
    }

    pub fn position(&self, symbol: &str) -> Option<&AssetPosition> {
        self.positions
            .iter()
            .find(|position| position.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn borrowable(&self, symbol: &str) -> Option<f64> {
        math_helper::borrowable_units(self.liquidity, self.position(symbol)?.price)
    }
}

//! Writes snapshot data into bound elements. No network or wallet access.

use std::collections::{HashMap, HashSet};

use alloy::primitives::Address;

use super::{ElementBindings, ElementRole};
use crate::{aggregator::AccountSnapshot, protocol::Asset, utils::math_helper};

/// borrowable = liquidity / price, or the placeholder when either is unusable
pub fn set_borrowable_amounts(
    assets: &[Asset],
    bindings: &ElementBindings,
    prices: &HashMap<String, Option<f64>>,
    liquidity: Option<f64>,
) {
    for asset in assets {
        let price = prices.get(&asset.symbol).copied().flatten();
        if let Some(element) = bindings.get(&asset.symbol, ElementRole::Borrowable) {
            element.set_text(math_helper::format_amount(math_helper::borrowable_units(
                liquidity, price,
            )));
        }
    }
}

/// `balances` is index-aligned with `assets`
pub fn set_supplied_amounts(
    assets: &[Asset],
    bindings: &ElementBindings,
    balances: &[Option<f64>],
) {
    set_amounts(assets, bindings, ElementRole::Supplied, balances);
}

/// `balances` is index-aligned with `assets`
pub fn set_borrow_balances(assets: &[Asset], bindings: &ElementBindings, balances: &[Option<f64>]) {
    set_amounts(assets, bindings, ElementRole::Borrowed, balances);
}

/// Checks the collateral box of every asset whose market is in `assets_in`
pub fn set_up_collateral_interface(
    assets: &[Asset],
    bindings: &ElementBindings,
    assets_in: &HashSet<Address>,
) {
    for asset in assets {
        if let Some(checkbox) = bindings.get(&asset.symbol, ElementRole::CollateralCheckbox) {
            checkbox.set_checked(assets_in.contains(&asset.market));
        }
    }
}

/// Full projection of one snapshot
pub fn render_snapshot(assets: &[Asset], bindings: &ElementBindings, snapshot: &AccountSnapshot) {
    set_borrowable_amounts(assets, bindings, &snapshot.prices(), snapshot.liquidity);
    set_supplied_amounts(assets, bindings, &snapshot.supplied());
    set_borrow_balances(assets, bindings, &snapshot.borrowed());
    set_up_collateral_interface(assets, bindings, &snapshot.assets_in_set());
}

fn set_amounts(
    assets: &[Asset],
    bindings: &ElementBindings,
    role: ElementRole,
    amounts: &[Option<f64>],
) {
    for (asset, amount) in assets.iter().zip(amounts) {
        if let Some(element) = bindings.get(&asset.symbol, role) {
            element.set_text(math_helper::format_amount(*amount));
        }
    }
}

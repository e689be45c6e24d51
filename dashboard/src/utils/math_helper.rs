use alloy::primitives::{utils::parse_units, U256};
use anyhow::{Context, Result};

use super::constants::PLACEHOLDER;

/// Scales a fixed-point on-chain integer down by `10^precision`.
///
/// Values whose integer part does not fit in a `u128` saturate to `f64::MAX`.
pub fn divide_by_precision_f64(value: U256, precision: u8) -> f64 {
    let scale = U256::from(10).pow(U256::from(precision));

    let (Some(quotient), Some(remainder)) = (value.checked_div(scale), value.checked_rem(scale))
    else {
        return f64::MAX;
    };

    let (Ok(quotient), Ok(remainder), Ok(scale)) = (
        u128::try_from(quotient),
        u128::try_from(remainder),
        u128::try_from(scale),
    ) else {
        return f64::MAX;
    };

    quotient as f64 + (remainder as f64) / (scale as f64)
}

/// Parses user input into an amount worth dispatching.
///
/// Returns `None` for anything that is not a finite, strictly positive number.
/// Empty input counts as zero.
pub fn parse_amount(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match input.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Some(amount),
        _ => None,
    }
}

/// Converts a validated decimal amount into its fixed-point on-chain value.
///
/// The raw input is preferred so that `0.1` stays exact; inputs such as `1e3`
/// fall back to the parsed float.
pub fn to_fixed_point(input: &str, amount: f64, decimals: u8) -> Result<U256> {
    if let Ok(units) = parse_units(input.trim(), decimals) {
        return Ok(units.get_absolute());
    }

    let formatted = format!("{:.*}", decimals as usize, amount);
    let units = parse_units(&formatted, decimals)
        .with_context(|| format!("Failed to scale {} by {} decimals", input, decimals))?;
    Ok(units.get_absolute())
}

/// Formats a quantity for display, hiding values that are missing or not finite
pub fn format_amount(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => value.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Borrowable units of an asset given spare liquidity and the asset's price
pub fn borrowable_units(liquidity: Option<f64>, price: Option<f64>) -> Option<f64> {
    let (liquidity, price) = (liquidity?, price?);
    if price <= 0.0 {
        return None;
    }
    let units = liquidity / price;
    units.is_finite().then_some(units)
}

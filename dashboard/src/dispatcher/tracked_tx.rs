use std::fmt;

use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxAction {
    Supply,
    Borrow,
    EnterMarket,
    ExitMarket,
}

impl fmt::Display for TxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxAction::Supply => "Supply",
            TxAction::Borrow => "Borrow",
            TxAction::EnterMarket => "enterMarkets",
            TxAction::ExitMarket => "exitMarket",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxState {
    Submitted,
    Confirmed { block_number: Option<u64> },
    Failed { reason: String },
}

impl TxState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, TxState::Submitted)
    }
}

/// A transaction the dashboard sent and is waiting on
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTx {
    pub action: TxAction,
    pub asset: String,
    /// Human readable amount, `None` for collateral toggles
    pub amount: Option<f64>,
    pub hash: TxHash,
    pub state: TxState,
    pub submitted_at: DateTime<Utc>,
}

impl TrackedTx {
    pub fn submitted(action: TxAction, asset: &str, amount: Option<f64>, hash: TxHash) -> Self {
        Self {
            action,
            asset: asset.to_uppercase(),
            amount,
            hash,
            state: TxState::Submitted,
            submitted_at: Utc::now(),
        }
    }

    /// Moves a submitted transaction to its final state. Settled transactions do not change.
    pub fn settle(mut self, state: TxState) -> Self {
        if !self.state.is_settled() {
            self.state = state;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_only_once() {
        let tx = TrackedTx::submitted(TxAction::Borrow, "usdc", Some(5.0), TxHash::ZERO);
        assert_eq!(tx.asset, "USDC");

        let confirmed = tx.settle(TxState::Confirmed {
            block_number: Some(7),
        });
        let still_confirmed = confirmed.clone().settle(TxState::Failed {
            reason: "late".to_string(),
        });

        assert_eq!(still_confirmed.state, confirmed.state);
        assert!(confirmed.state.is_settled());
    }
}

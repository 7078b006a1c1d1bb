use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The aggregate view of every connection's balances and open positions.
///
/// This struct is the final output of the `PortfolioAggregator` and serves as
/// the data transfer object for the dashboard's headline numbers. Field names
/// serialize in camelCase to match the rest of the display wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    // I. Capital
    pub total_balance: Decimal,
    pub total_pnl: Decimal,
    /// `total_balance` plus unrealized `total_pnl`.
    pub total_value: Decimal,

    // II. Position-Level Statistics
    pub active_positions: usize,
    pub win_count: usize,
    pub loss_count: usize,
    /// Share of open positions currently in profit, in percent. Always
    /// within `[0, 100]`; exactly zero when there are no open positions.
    pub win_rate: Decimal,
    pub largest_gain: Decimal,
    pub largest_loss: Decimal,

    // III. Exposure
    pub avg_position_size: Decimal,
    pub total_volume: Decimal,
}

impl PortfolioTotals {
    /// Creates a new, zeroed-out PortfolioTotals.
    /// This is useful as a default or starting point before calculations.
    pub fn new() -> Self {
        Self {
            total_balance: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            total_value: Decimal::ZERO,
            active_positions: 0,
            win_count: 0,
            loss_count: 0,
            win_rate: Decimal::ZERO,
            largest_gain: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            avg_position_size: Decimal::ZERO,
            total_volume: Decimal::ZERO,
        }
    }
}

impl Default for PortfolioTotals {
    fn default() -> Self {
        Self::new()
    }
}

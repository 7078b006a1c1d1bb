use crate::error::PortfolioError;
use crate::report::PortfolioTotals;
use core_types::{LiveConnection, Position};
use rust_decimal::Decimal;

/// A stateless calculator for reducing live connection state to portfolio totals.
#[derive(Debug, Default)]
pub struct PortfolioAggregator {}

impl PortfolioAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for aggregating live connection state.
    ///
    /// # Arguments
    ///
    /// * `connections` - The current live connection list as merged from the registry.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PortfolioTotals` or a `PortfolioError`.
    pub fn calculate(
        &self,
        connections: &[LiveConnection],
    ) -> Result<PortfolioTotals, PortfolioError> {
        let mut totals = PortfolioTotals::new();

        if connections.is_empty() {
            // With no connections every metric is zero or undefined.
            // Return a fresh report, which is exactly that.
            return Ok(totals);
        }

        self.sum_balances(connections, &mut totals)?;
        self.tally_positions(connections, &mut totals)?;

        totals.total_value = totals.total_balance + totals.total_pnl;

        Ok(totals)
    }

    /// Returns a copy of the position with trustworthy profit figures.
    ///
    /// Registries sometimes report `pnl = 0` on positions that clearly have
    /// price movement. When the reported pnl is exactly zero and entry price,
    /// current price and amount are all positive, pnl and pnl percent are
    /// recomputed from prices. A reported non-zero pnl is never overwritten.
    pub fn normalize(&self, position: &Position) -> Result<Position, PortfolioError> {
        if position.pnl != Decimal::ZERO {
            return Ok(position.clone());
        }

        if position.entry_price <= Decimal::ZERO
            || position.current_price <= Decimal::ZERO
            || position.amount <= Decimal::ZERO
        {
            // Nothing to recompute from. Keep the reported zeros.
            return Ok(position.clone());
        }

        let pnl = position.direction.signed_pnl(
            position.entry_price,
            position.current_price,
            position.amount,
        );
        let pnl_percent = pnl
            .checked_div(position.notional())
            .ok_or_else(|| {
                PortfolioError::InternalError(
                    "Failed to compute pnl percent for a zero-notional position".to_string(),
                )
            })?
            * Decimal::from(100);

        let mut normalized = position.clone();
        normalized.pnl = pnl;
        normalized.pnl_percent = pnl_percent;

        Ok(normalized)
    }

    /// Sums account balances across all connections.
    fn sum_balances(
        &self,
        connections: &[LiveConnection],
        totals: &mut PortfolioTotals,
    ) -> Result<(), PortfolioError> {
        for connection in connections {
            if let Some(balance) = &connection.balance {
                totals.total_balance += balance.total;
            }
        }

        Ok(())
    }

    /// Walks every open position, accumulating counts, profit and extremes.
    fn tally_positions(
        &self,
        connections: &[LiveConnection],
        totals: &mut PortfolioTotals,
    ) -> Result<(), PortfolioError> {
        let mut entry_notional_sum = Decimal::ZERO;

        for connection in connections {
            for position in connection.open_positions() {
                let position = self.normalize(position)?;

                totals.active_positions += 1;
                totals.total_pnl += position.pnl;
                totals.total_volume += position.current_price * position.amount;
                entry_notional_sum += position.notional();

                if position.pnl > Decimal::ZERO {
                    totals.win_count += 1;
                } else if position.pnl < Decimal::ZERO {
                    totals.loss_count += 1;
                }

                if totals.active_positions == 1 {
                    totals.largest_gain = position.pnl;
                    totals.largest_loss = position.pnl;
                } else {
                    if position.pnl > totals.largest_gain {
                        totals.largest_gain = position.pnl;
                    }
                    if position.pnl < totals.largest_loss {
                        totals.largest_loss = position.pnl;
                    }
                }
            }
        }

        // --- Ratios ---
        if totals.active_positions > 0 {
            totals.win_rate = (Decimal::from(totals.win_count)
                / Decimal::from(totals.active_positions))
                * Decimal::from(100);
            totals.avg_position_size = entry_notional_sum / Decimal::from(totals.active_positions);
        }

        Ok(())
    }
}

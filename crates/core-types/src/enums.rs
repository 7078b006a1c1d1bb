use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side of the order
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Lifecycle state of a registered exchange connection.
///
/// The registry reports these as lowercase strings (`"active"`, `"error"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Inactive,
    Testing,
    Error,
}

impl ConnectionStatus {
    /// True when the connection is serving live data.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Active)
    }
}

/// Direction of an open position. Wire encoding is `"LONG"` / `"SHORT"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionDirection {
    Long,
    Short,
}

impl PositionDirection {
    /// Raw profit of a position in this direction at the given prices.
    pub fn signed_pnl(&self, entry: Decimal, current: Decimal, amount: Decimal) -> Decimal {
        match self {
            PositionDirection::Long => (current - entry) * amount,
            PositionDirection::Short => (entry - current) * amount,
        }
    }

    /// The order side that opened a position in this direction.
    pub fn entry_side(&self) -> OrderSide {
        match self {
            PositionDirection::Long => OrderSide::Buy,
            PositionDirection::Short => OrderSide::Sell,
        }
    }

    /// The order side that flattens a position in this direction.
    pub fn close_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }
}

/// Position lifecycle as reported by the registry (`"OPEN"`, `"CLOSED"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
    Pending,
    Cancelled,
}

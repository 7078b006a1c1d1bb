use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{ConnectionStatus, PositionDirection, PositionStatus};

/// Per-coin balance breakdown inside a unified account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinBalance {
    pub coin: String,
    pub wallet_balance: Decimal,
    pub available_balance: Decimal,
    pub locked: Decimal,
    pub usd_value: Decimal,
}

/// Account balance snapshot for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub total: Decimal,
    pub available: Decimal,
    pub in_order: Decimal,
    #[serde(default)]
    pub coins: Vec<CoinBalance>,
}

/// One exchange position as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub exchange: String,
    pub direction: PositionDirection,
    pub amount: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub pnl: Decimal,
    pub pnl_percent: Decimal,
    pub status: PositionStatus,
}

impl Position {
    /// Capital committed at entry, the base for percentage figures.
    pub fn notional(&self) -> Decimal {
        self.entry_price * self.amount
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

/// One connection as the session sees it after merging registry state.
///
/// Derived data: rebuilt wholesale on every reconciliation pass and never
/// persisted. `api_key_masked` is the only key material a display surface
/// ever receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveConnection {
    pub id: String,
    pub name: String,
    pub status: ConnectionStatus,
    pub balance: Option<AccountBalance>,
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Recent orders; the registry reports them shaped like closed positions.
    #[serde(default)]
    pub order_history: Vec<Position>,
    pub api_key_masked: String,
    pub last_updated: DateTime<Utc>,
}

impl LiveConnection {
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }
}

/// One row of the market ticker feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTicker {
    pub symbol: String,
    pub price: Decimal,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
}

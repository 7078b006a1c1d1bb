use chrono::{DateTime, Utc};
use core_types::{AccountBalance, MarketTicker, Position};
use serde::{Deserialize, Serialize};

use crate::error::EventsError;

/// A fresh set of market tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub tickers: Vec<MarketTicker>,
    pub timestamp: DateTime<Utc>,
}

/// New live data for a single connection.
///
/// `balance` doubles as the health signal: a connection whose live retrieval
/// failed is delivered with `balance: None` and an empty position list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub connection_id: String,
    pub balance: Option<AccountBalance>,
    pub positions: Vec<Position>,
    #[serde(default)]
    pub order_history: Vec<Position>,
    pub timestamp: DateTime<Utc>,
}

/// The top-level real-time event enum.
///
/// Everything flowing into the session rides this type, whatever transport
/// produced it. Ordering is guaranteed only within a single variant; a
/// consumer must not assume a `MarketUpdate` and a `PortfolioUpdate` arrive
/// in any particular relative order.
///
/// The `#[serde(tag = "type", content = "payload")]` attribute serializes the
/// enum into a clean JSON object. For example, a `MarketUpdate` variant looks
/// like:
/// `{
///   "type": "market_update",
///   "payload": {
///     "tickers": [...],
///     "timestamp": "..."
///   }
/// }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fresh market ticker batch.
    MarketUpdate(MarketUpdate),
    /// New balances and positions for one connection.
    PortfolioUpdate(PortfolioUpdate),
    /// A simple hello confirming the event transport is live.
    Connected,
}

impl StreamEvent {
    /// Parses an event off the wire.
    pub fn from_json(raw: &str) -> Result<Self, EventsError> {
        serde_json::from_str(raw).map_err(|e| EventsError::Serialization(e.to_string()))
    }

    /// Renders the event into its wire form.
    pub fn to_json(&self) -> Result<String, EventsError> {
        serde_json::to_string(self).map_err(|e| EventsError::Serialization(e.to_string()))
    }
}

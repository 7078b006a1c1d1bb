use core_types::{AccountBalance, ConnectionStatus, MarketTicker, Position};
use rust_decimal::Decimal;
use serde::Deserialize;

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.
// The registry mixes conventions: the connection list uses snake_case keys at
// the top level and camelCase inside the live-data payload.

/// The response from `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryHealth {
    pub success: bool,
    pub status: String,
    pub version: String,
    pub active_connections: usize,
    pub mode: String,
}

/// Plain acknowledgement envelope used by the mutation endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The response from a successful `POST /api/bybit/add-connection` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddConnectionResponse {
    pub success: bool,
    pub connection_id: String,
    #[serde(default)]
    pub data: Option<RemoteLiveData>,
}

/// Envelope of `GET /api/bybit/connections`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionsResponse {
    pub success: bool,
    pub connections: Vec<RemoteConnection>,
}

/// One entry of the authoritative connection list.
///
/// A healthy entry carries `data`; an entry whose live retrieval failed
/// carries `status = "error"` and an `error` string instead.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConnection {
    pub connection_id: String,
    pub name: String,
    pub status: ConnectionStatus,
    pub created_at: String,
    #[serde(default)]
    pub data: Option<RemoteLiveData>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Live account payload attached to a connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLiveData {
    pub balance: Option<AccountBalance>,
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Recent orders, shaped like closed positions by the registry.
    #[serde(default)]
    pub order_history: Vec<Position>,
    /// Registry-local timestamp, passed through verbatim.
    pub last_updated: String,
    #[serde(default)]
    pub errors: LiveDataErrors,
}

/// Per-section retrieval errors inside a live-data payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDataErrors {
    pub balance: Option<String>,
    pub positions: Option<String>,
    pub order_history: Option<String>,
}

/// Envelope of `GET /api/market/tickers`.
#[derive(Debug, Clone, Deserialize)]
pub struct TickersResponse {
    pub success: bool,
    pub data: Vec<MarketTicker>,
}

/// Envelope of `GET /api/portfolio/summary`.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioSummaryResponse {
    pub success: bool,
    pub summary: RemotePortfolioSummary,
}

/// The registry's own portfolio roll-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePortfolioSummary {
    pub total_portfolio_value: Decimal,
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
    pub active_positions: usize,
    pub total_connections: usize,
    #[serde(default)]
    pub portfolio_data: Vec<PortfolioSlice>,
}

/// Per-connection slice inside the registry's portfolio summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSlice {
    pub connection_id: String,
    pub balance: Option<AccountBalance>,
    pub positions_count: usize,
}

/// Body the registry's exception handlers attach to non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryErrorResponse {
    pub success: bool,
    pub error: String,
}

//! Scripted registry stand-in shared by the engine's tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use core_types::{
    AccountBalance, ConnectionStatus, MarketTicker, OrderSide, Position, PositionDirection,
    PositionStatus,
};
use registry_client::{
    AddConnectionResponse, RegisterConnection, RegistryClient, RegistryError, RegistryHealth,
    RemoteConnection, RemoteLiveData, RemotePortfolioSummary,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A scripted `RegistryClient` that records every call and serves canned
/// data, so tests can drive the engine without a network.
pub struct ScriptedRegistry {
    /// Connection ids whose registration is rejected.
    pub fail_registrations: Vec<String>,
    /// When set, every call fails as if the registry were unreachable.
    pub offline: bool,
    /// When set, test-connection calls are rejected.
    pub reject_tests: bool,
    /// The connection list served by `get_connections`.
    pub connections: Mutex<Vec<RemoteConnection>>,
    /// The tickers served by `get_market_tickers`.
    pub tickers: Vec<MarketTicker>,
    /// Ids passed to `add_connection`, in call order.
    pub registered: Mutex<Vec<String>>,
    /// Ids passed to `remove_connection`, in call order.
    pub removed: Mutex<Vec<String>>,
    /// Rendered order operations (`cancel ...` / `close ...`), in call order.
    pub order_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self {
            fail_registrations: Vec::new(),
            offline: false,
            reject_tests: false,
            connections: Mutex::new(Vec::new()),
            tickers: Vec::new(),
            registered: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            order_calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// The highest number of registration calls that were ever in flight
    /// at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn unreachable_error() -> RegistryError {
        RegistryError::Rejected("registry unreachable".to_string())
    }
}

#[async_trait]
impl RegistryClient for ScriptedRegistry {
    async fn health(&self) -> Result<RegistryHealth, RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        Ok(RegistryHealth {
            success: true,
            status: "healthy".to_string(),
            version: "2.0.0".to_string(),
            active_connections: self.connections.lock().unwrap().len(),
            mode: "live".to_string(),
        })
    }

    async fn test_connection(
        &self,
        _api_key: &str,
        _secret_key: &str,
        _testnet: bool,
    ) -> Result<(), RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        if self.reject_tests {
            return Err(RegistryError::Rejected(
                "ByBit API Error: invalid api key".to_string(),
            ));
        }
        Ok(())
    }

    async fn add_connection(
        &self,
        request: &RegisterConnection,
    ) -> Result<AddConnectionResponse, RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }

        let live = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(live, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.registered
            .lock()
            .unwrap()
            .push(request.connection_id.clone());

        if self.fail_registrations.contains(&request.connection_id) {
            return Err(RegistryError::Rejected(
                "ByBit API Error: invalid api key".to_string(),
            ));
        }

        Ok(AddConnectionResponse {
            success: true,
            connection_id: request.connection_id.clone(),
            data: None,
        })
    }

    async fn get_connections(&self) -> Result<Vec<RemoteConnection>, RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        Ok(self.connections.lock().unwrap().clone())
    }

    async fn remove_connection(&self, connection_id: &str) -> Result<(), RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        self.removed.lock().unwrap().push(connection_id.to_string());
        self.connections
            .lock()
            .unwrap()
            .retain(|c| c.connection_id != connection_id);
        Ok(())
    }

    async fn cancel_order(
        &self,
        connection_id: &str,
        order_id: &str,
        symbol: &str,
    ) -> Result<(), RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        self.order_calls
            .lock()
            .unwrap()
            .push(format!("cancel {connection_id} {order_id} {symbol}"));
        Ok(())
    }

    async fn close_position(
        &self,
        connection_id: &str,
        symbol: &str,
        side: OrderSide,
    ) -> Result<(), RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        self.order_calls
            .lock()
            .unwrap()
            .push(format!("close {connection_id} {symbol} {side:?}"));
        Ok(())
    }

    async fn get_market_tickers(
        &self,
        _symbols: &[String],
    ) -> Result<Vec<MarketTicker>, RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        Ok(self.tickers.clone())
    }

    async fn get_portfolio_summary(&self) -> Result<RemotePortfolioSummary, RegistryError> {
        if self.offline {
            return Err(Self::unreachable_error());
        }
        Ok(RemotePortfolioSummary {
            total_portfolio_value: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            active_positions: 0,
            total_connections: self.connections.lock().unwrap().len(),
            portfolio_data: Vec::new(),
        })
    }
}

// --- Canned data builders ---

pub fn sample_balance() -> AccountBalance {
    AccountBalance {
        total: dec!(1000),
        available: dec!(800),
        in_order: dec!(200),
        coins: vec![],
    }
}

pub fn open_position(symbol: &str, entry: Decimal, current: Decimal, amount: Decimal) -> Position {
    Position {
        id: format!("{symbol}_Buy"),
        symbol: symbol.to_string(),
        exchange: "ByBit".to_string(),
        direction: PositionDirection::Long,
        amount,
        entry_price: entry,
        current_price: current,
        pnl: Decimal::ZERO,
        pnl_percent: Decimal::ZERO,
        status: PositionStatus::Open,
    }
}

pub fn healthy_remote(id: &str, name: &str, balance: AccountBalance) -> RemoteConnection {
    RemoteConnection {
        connection_id: id.to_string(),
        name: name.to_string(),
        status: ConnectionStatus::Active,
        created_at: "2025-06-01T10:00:00.000000".to_string(),
        data: Some(RemoteLiveData {
            balance: Some(balance),
            positions: vec![],
            order_history: vec![],
            last_updated: "2025-06-01T10:00:05.000000".to_string(),
            errors: Default::default(),
        }),
        error: None,
    }
}

pub fn remote_without_data(id: &str, name: &str, error: &str) -> RemoteConnection {
    RemoteConnection {
        connection_id: id.to_string(),
        name: name.to_string(),
        status: ConnectionStatus::Error,
        created_at: "2025-06-01T10:00:00.000000".to_string(),
        data: None,
        error: Some(error.to_string()),
    }
}

pub fn ticker(symbol: &str, price: Decimal) -> MarketTicker {
    MarketTicker {
        symbol: symbol.to_string(),
        price,
        change_24h: dec!(1.5),
        volume_24h: dec!(1000000),
        high_24h: price * dec!(1.02),
        low_24h: price * dec!(0.98),
    }
}

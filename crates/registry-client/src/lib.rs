use std::fmt;

use async_trait::async_trait;
use configuration::Registry;
use core_types::{ConnectionCredential, MarketSelection, MarketTicker, OrderSide, mask_secret};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

pub mod error;
pub mod responses;

// --- Public API ---
pub use error::RegistryError;
pub use responses::{
    AckResponse, AddConnectionResponse, ConnectionsResponse, LiveDataErrors,
    PortfolioSummaryResponse, RegistryErrorResponse, RegistryHealth, RemoteConnection,
    RemoteLiveData, RemotePortfolioSummary,
};

use responses::TickersResponse;

/// The generic, abstract interface to the remote trading-session registry.
/// This trait is the contract the session engine is written against, allowing
/// the underlying implementation (HTTP or scripted mock) to be swapped out.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Liveness probe of the registry backend.
    async fn health(&self) -> Result<RegistryHealth, RegistryError>;

    /// Validates a credential pair against the exchange without storing it.
    async fn test_connection(
        &self,
        api_key: &str,
        secret_key: &str,
        testnet: bool,
    ) -> Result<(), RegistryError>;

    /// Registers (or replaces, keyed by id) a trading connection.
    async fn add_connection(
        &self,
        request: &RegisterConnection,
    ) -> Result<AddConnectionResponse, RegistryError>;

    /// The authoritative list of registered connections with live data.
    async fn get_connections(&self) -> Result<Vec<RemoteConnection>, RegistryError>;

    /// Deregisters a connection and stops its data stream.
    async fn remove_connection(&self, connection_id: &str) -> Result<(), RegistryError>;

    /// Cancels one working order on the given connection.
    async fn cancel_order(
        &self,
        connection_id: &str,
        order_id: &str,
        symbol: &str,
    ) -> Result<(), RegistryError>;

    /// Flattens one position on the given connection.
    async fn close_position(
        &self,
        connection_id: &str,
        symbol: &str,
        side: OrderSide,
    ) -> Result<(), RegistryError>;

    /// Current tickers for the requested symbols.
    async fn get_market_tickers(
        &self,
        symbols: &[String],
    ) -> Result<Vec<MarketTicker>, RegistryError>;

    /// The registry's own portfolio roll-up across all connections.
    async fn get_portfolio_summary(&self) -> Result<RemotePortfolioSummary, RegistryError>;
}

/// Payload for registering a connection with the registry.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterConnection {
    pub connection_id: String,
    pub name: String,
    pub api_key: String,
    pub secret_key: String,
    pub testnet: bool,
    pub markets: MarketSelection,
}

impl RegisterConnection {
    /// Builds the registration payload from a stored credential.
    ///
    /// Returns `None` when either secret is redacted or empty; such records
    /// cannot be replayed.
    pub fn from_credential(credential: &ConnectionCredential) -> Option<Self> {
        let api_key = credential.api_key.as_captured()?;
        let secret_key = credential.secret_key.as_captured()?;
        if api_key.is_empty() || secret_key.is_empty() {
            return None;
        }
        Some(Self {
            connection_id: credential.id.clone(),
            name: credential.name.clone(),
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
            testnet: credential.testnet,
            markets: credential.markets,
        })
    }
}

// Secrets must not leak through debug logging.
impl fmt::Debug for RegisterConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterConnection")
            .field("connection_id", &self.connection_id)
            .field("name", &self.name)
            .field("api_key", &mask_secret(&self.api_key))
            .field("secret_key", &mask_secret(&self.secret_key))
            .field("testnet", &self.testnet)
            .finish_non_exhaustive()
    }
}

/// A concrete implementation of the `RegistryClient` over HTTP.
#[derive(Clone)]
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(registry: &Registry) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(registry.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: registry.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RegistryError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, RegistryError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RegistryError> {
        let response = self.client.delete(self.url(path)).send().await?;
        Self::decode(response).await
    }

    /// Maps a registry response to a typed value. Non-2xx responses carry a
    /// `{"success": false, "error": ...}` body from the registry's exception
    /// handlers; anything else is reported verbatim.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RegistryError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text)
                .map_err(|e| RegistryError::Deserialization(e.to_string()))
        } else {
            match serde_json::from_str::<RegistryErrorResponse>(&text) {
                Ok(body) => Err(RegistryError::Rejected(body.error)),
                Err(_) => Err(RegistryError::Rejected(format!("HTTP {status}: {text}"))),
            }
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn health(&self) -> Result<RegistryHealth, RegistryError> {
        self.get_json("/api/health", &[]).await
    }

    async fn test_connection(
        &self,
        api_key: &str,
        secret_key: &str,
        testnet: bool,
    ) -> Result<(), RegistryError> {
        let body = json!({ "apiKey": api_key, "secretKey": secret_key, "testnet": testnet });
        self.post_json::<AckResponse>("/api/bybit/test-connection", &body)
            .await?;
        Ok(())
    }

    async fn add_connection(
        &self,
        request: &RegisterConnection,
    ) -> Result<AddConnectionResponse, RegistryError> {
        self.post_json("/api/bybit/add-connection", request).await
    }

    async fn get_connections(&self) -> Result<Vec<RemoteConnection>, RegistryError> {
        let response: ConnectionsResponse = self.get_json("/api/bybit/connections", &[]).await?;
        Ok(response.connections)
    }

    async fn remove_connection(&self, connection_id: &str) -> Result<(), RegistryError> {
        self.delete_json::<AckResponse>(&format!("/api/bybit/connection/{connection_id}"))
            .await?;
        Ok(())
    }

    async fn cancel_order(
        &self,
        connection_id: &str,
        order_id: &str,
        symbol: &str,
    ) -> Result<(), RegistryError> {
        let body = json!({
            "connectionId": connection_id,
            "orderId": order_id,
            "symbol": symbol,
        });
        self.post_json::<AckResponse>("/api/bybit/cancel-order", &body)
            .await?;
        Ok(())
    }

    async fn close_position(
        &self,
        connection_id: &str,
        symbol: &str,
        side: OrderSide,
    ) -> Result<(), RegistryError> {
        let body = json!({
            "connectionId": connection_id,
            "symbol": symbol,
            "side": side,
        });
        self.post_json::<AckResponse>("/api/bybit/close-position", &body)
            .await?;
        Ok(())
    }

    async fn get_market_tickers(
        &self,
        symbols: &[String],
    ) -> Result<Vec<MarketTicker>, RegistryError> {
        let query = [("symbols", symbols.join(","))];
        let response: TickersResponse = self.get_json("/api/market/tickers", &query).await?;
        Ok(response.data)
    }

    async fn get_portfolio_summary(&self) -> Result<RemotePortfolioSummary, RegistryError> {
        let response: PortfolioSummaryResponse =
            self.get_json("/api/portfolio/summary", &[]).await?;
        Ok(response.summary)
    }
}

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Derivation passphrase compiled into the application.
///
/// Trust boundary: this constant is shipped with every installation, so the
/// encryption it feeds protects credentials against casual file inspection
/// and cross-user copying, not against an attacker who holds both the salt
/// file and this binary. Operators can swap it out via
/// `[security] passphrase` or `VANTAGE__SECURITY__PASSPHRASE`.
pub const DEFAULT_PASSPHRASE: &str = "ctb-trading-bot-secret-key-change-in-production";

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub intervals: Intervals,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.registry.base_url.trim().is_empty() {
            return Err(crate::error::ConfigError::ValidationError(
                "registry.base_url must not be empty".into(),
            ));
        }
        if self.intervals.price_refresh_secs == 0 || self.intervals.ticker_rotation_secs == 0 {
            return Err(crate::error::ConfigError::ValidationError(
                "interval seconds must be greater than zero".into(),
            ));
        }
        if self.intervals.event_buffer == 0 {
            return Err(crate::error::ConfigError::ValidationError(
                "intervals.event_buffer must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Where the remote trading-session registry lives.
#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
    /// Base URL of the registry backend (e.g., "http://127.0.0.1:8000").
    pub base_url: String,
    /// Per-request timeout for registry calls, in seconds.
    pub request_timeout_secs: u64,
    /// Symbols requested from the market ticker endpoint.
    pub market_symbols: Vec<String>,
}

impl Registry {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 30,
            market_symbols: vec![
                "BTCUSDT".into(),
                "ETHUSDT".into(),
                "SOLUSDT".into(),
                "ADAUSDT".into(),
                "DOGEUSDT".into(),
            ],
        }
    }
}

/// Local persistence locations.
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// Directory holding the identity, salt and credential slots.
    pub data_dir: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./storage"),
        }
    }
}

/// Cadence of the session's periodic work.
#[derive(Debug, Clone, Deserialize)]
pub struct Intervals {
    /// Seconds between live-data refreshes (balances, positions, tickers).
    pub price_refresh_secs: u64,
    /// Seconds between display-rotation steps for the ticker strip.
    pub ticker_rotation_secs: u64,
    /// Capacity of the bounded stream-event channel.
    pub event_buffer: usize,
}

impl Intervals {
    pub fn price_refresh(&self) -> Duration {
        Duration::from_secs(self.price_refresh_secs)
    }

    pub fn ticker_rotation(&self) -> Duration {
        Duration::from_secs(self.ticker_rotation_secs)
    }
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            price_refresh_secs: 30,
            ticker_rotation_secs: 5,
            event_buffer: 256,
        }
    }
}

/// Key-derivation inputs an operator may override.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Security {
    /// Optional replacement for the built-in derivation passphrase.
    pub passphrase: Option<String>,
}

impl Security {
    /// The passphrase the vault derives keys from.
    pub fn effective_passphrase(&self) -> &str {
        self.passphrase.as_deref().unwrap_or(DEFAULT_PASSPHRASE)
    }
}

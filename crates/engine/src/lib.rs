use crate::error::EngineError;
use chrono::Utc;
use configuration::Config;
use core_types::{
    ConnectionCredential, ConnectionStatus, LiveConnection, MarketSelection, MarketTicker,
    PositionDirection,
};
use events::{EventReceiver, EventSender, MarketUpdate, PortfolioUpdate, StreamEvent};
use portfolio::{PortfolioAggregator, PortfolioTotals};
use registry_client::{RegisterConnection, RegistryClient};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};
use vault::CredentialVault;

pub mod error;
pub mod reconciler;
#[cfg(test)]
mod testing;

pub use reconciler::{ConnectionReconciler, RestoreReport};

/// The transient live view owned by one session.
///
/// Rebuilt from the registry and never persisted; the vault holds the only
/// durable state.
#[derive(Debug, Clone, Default)]
struct SessionState {
    connections: Vec<LiveConnection>,
    tickers: Vec<MarketTicker>,
    ticker_cursor: usize,
    totals: PortfolioTotals,
}

impl SessionState {
    fn recompute_totals(&mut self) {
        match PortfolioAggregator::new().calculate(&self.connections) {
            Ok(totals) => self.totals = totals,
            Err(e) => warn!("portfolio aggregation failed, keeping previous totals: {e}"),
        }
    }

    fn advance_ticker_cursor(&mut self) {
        if self.tickers.is_empty() {
            self.ticker_cursor = 0;
            return;
        }
        self.ticker_cursor = (self.ticker_cursor + 1) % self.tickers.len();
    }
}

/// The central orchestrator for a live dashboard session.
pub struct Session {
    // --- Configuration ---
    config: Config,

    // --- Shared, Thread-Safe Components ---
    registry: Arc<dyn RegistryClient>,
    vault: Arc<CredentialVault>,
    state: Arc<Mutex<SessionState>>,

    // --- Event Plumbing ---
    events_tx: EventSender,
    events_rx: Option<EventReceiver>,

    // --- Task Management ---
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Creates a new `Session` instance with all its required components.
    pub fn new(config: Config, registry: Arc<dyn RegistryClient>, vault: Arc<CredentialVault>) -> Self {
        let (events_tx, events_rx) = events::channel(config.intervals.event_buffer);

        Self {
            config,
            registry,
            vault,
            state: Arc::new(Mutex::new(SessionState::default())),
            events_tx,
            events_rx: Some(events_rx),
            tasks: Vec::new(),
        }
    }

    /// Brings the session to a running state.
    ///
    /// Replays stored credentials against the registry, builds the initial
    /// live view, then spawns the periodic tasks. An unreachable registry
    /// degrades to a disconnected session with an empty live view instead
    /// of failing startup.
    pub async fn start(&mut self) -> Result<RestoreReport, EngineError> {
        let reconciler =
            ConnectionReconciler::new(Arc::clone(&self.vault), Arc::clone(&self.registry));

        let report = reconciler.restore_connections().await;
        info!(
            restored = report.restored,
            skipped = report.skipped,
            failed = report.failed,
            "credential restoration finished"
        );

        let connections = match reconciler.fetch_live_connections().await {
            Ok(connections) => connections,
            Err(e) => {
                warn!("registry unreachable, starting with an empty live view: {e}");
                Vec::new()
            }
        };

        let tickers = match self
            .registry
            .get_market_tickers(&self.config.registry.market_symbols)
            .await
        {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!("initial ticker fetch failed: {e}");
                Vec::new()
            }
        };

        {
            let mut state = self.state.lock().await;
            state.connections = connections;
            state.tickers = tickers;
            state.recompute_totals();
        }

        self.spawn_tasks()?;
        self.events_tx.send(StreamEvent::Connected).await.ok();

        Ok(report)
    }

    /// Spawns the event intake loop and the two periodic tasks.
    fn spawn_tasks(&mut self) -> Result<(), EngineError> {
        let Some(mut events_rx) = self.events_rx.take() else {
            return Err(EngineError::Configuration(
                "session already started".to_string(),
            ));
        };

        // Event intake: the only writer of live data. It owns the receiver,
        // so aborting this task also releases the subscription.
        let state = Arc::clone(&self.state);
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                Self::apply_event(&state, event).await;
            }
            debug!("event channel closed, intake stopping");
        }));

        // Price refresh: re-fetches tickers and connection data on a fixed
        // cadence and feeds them into the event channel.
        let registry = Arc::clone(&self.registry);
        let events_tx = self.events_tx.clone();
        let symbols = self.config.registry.market_symbols.clone();
        let refresh_every = self.config.intervals.price_refresh();
        self.tasks.push(tokio::spawn(async move {
            let mut timer = interval(refresh_every);
            // The first tick is immediate and repeats the startup fetch.
            loop {
                timer.tick().await;
                Self::refresh_tick(registry.as_ref(), &symbols, &events_tx).await;
            }
        }));

        // Display rotation: advances the ticker spotlight for the
        // presentation layer. Runs on its own cadence, uncoordinated with
        // the refresh task.
        let state = Arc::clone(&self.state);
        let rotate_every = self.config.intervals.ticker_rotation();
        self.tasks.push(tokio::spawn(async move {
            let mut timer = interval(rotate_every);
            loop {
                timer.tick().await;
                state.lock().await.advance_ticker_cursor();
            }
        }));

        Ok(())
    }

    /// One refresh pass: fetch tickers and the connection list, publish the
    /// results as typed events. Errors are logged and the pass moves on; the
    /// next tick gets another chance.
    async fn refresh_tick(
        registry: &dyn RegistryClient,
        symbols: &[String],
        events_tx: &EventSender,
    ) {
        match registry.get_market_tickers(symbols).await {
            Ok(tickers) => {
                let update = StreamEvent::MarketUpdate(MarketUpdate {
                    tickers,
                    timestamp: Utc::now(),
                });
                if events_tx.send(update).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!("ticker refresh failed: {e}"),
        }

        match registry.get_connections().await {
            Ok(remotes) => {
                for remote in remotes {
                    let update = match remote.data {
                        Some(data) => PortfolioUpdate {
                            connection_id: remote.connection_id,
                            balance: data.balance,
                            positions: data.positions,
                            order_history: data.order_history,
                            timestamp: Utc::now(),
                        },
                        // No live data: deliver the empty patch that moves
                        // the connection into its error state.
                        None => PortfolioUpdate {
                            connection_id: remote.connection_id,
                            balance: None,
                            positions: Vec::new(),
                            order_history: Vec::new(),
                            timestamp: Utc::now(),
                        },
                    };
                    if events_tx
                        .send(StreamEvent::PortfolioUpdate(update))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
            Err(e) => warn!("connection refresh failed: {e}"),
        }
    }

    /// Applies one event to the session state.
    ///
    /// Events are ordered within their own variant only; a market update and
    /// a portfolio update may arrive in either relative order.
    async fn apply_event(state: &Mutex<SessionState>, event: StreamEvent) {
        let mut state = state.lock().await;
        match event {
            StreamEvent::MarketUpdate(update) => {
                state.tickers = update.tickers;
                if state.ticker_cursor >= state.tickers.len() {
                    state.ticker_cursor = 0;
                }
            }
            StreamEvent::PortfolioUpdate(update) => {
                let Some(connection) = state
                    .connections
                    .iter_mut()
                    .find(|c| c.id == update.connection_id)
                else {
                    debug!(id = %update.connection_id, "update for unknown connection dropped");
                    return;
                };

                connection.status = if update.balance.is_some() {
                    ConnectionStatus::Active
                } else {
                    ConnectionStatus::Error
                };
                connection.balance = update.balance;
                connection.positions = update.positions;
                connection.order_history = update.order_history;
                connection.last_updated = update.timestamp;
                state.recompute_totals();
            }
            StreamEvent::Connected => {
                debug!("event transport confirmed live");
            }
        }
    }

    /// Stops the periodic tasks and the event intake.
    ///
    /// In-flight registry calls are not chased; whatever they return is
    /// discarded once the tasks are gone. Aborting the intake task drops the
    /// event receiver, which closes the channel for all producers.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("session tasks stopped");
    }

    // --- Snapshots for the presentation layer ---

    pub async fn connections(&self) -> Vec<LiveConnection> {
        self.state.lock().await.connections.clone()
    }

    pub async fn totals(&self) -> PortfolioTotals {
        self.state.lock().await.totals.clone()
    }

    pub async fn tickers(&self) -> Vec<MarketTicker> {
        self.state.lock().await.tickers.clone()
    }

    /// The ticker currently under the rotating spotlight.
    pub async fn ticker_spotlight(&self) -> Option<MarketTicker> {
        let state = self.state.lock().await;
        state.tickers.get(state.ticker_cursor).cloned()
    }

    // --- User-initiated operations ---

    /// Validates, registers and stores a new exchange connection.
    ///
    /// The flow is test, register, persist: the credential is checked
    /// against the exchange first, registered with the registry second and
    /// written to the vault last. If the vault write fails the registry-side
    /// registration is kept; the connection shows up remote-only until it is
    /// saved again.
    pub async fn add_connection(
        &self,
        name: &str,
        api_key: &str,
        secret_key: &str,
        testnet: bool,
        markets: MarketSelection,
    ) -> Result<LiveConnection, EngineError> {
        let mut credential = ConnectionCredential::new(name, api_key, secret_key, testnet, markets);
        credential.validate()?;

        self.registry
            .test_connection(api_key, secret_key, testnet)
            .await
            .map_err(|e| EngineError::ConnectionTest(e.to_string()))?;

        let Some(request) = RegisterConnection::from_credential(&credential) else {
            // validate() above guarantees both secrets are captured.
            return Err(EngineError::Configuration(
                "credential lost its secrets before registration".to_string(),
            ));
        };
        let response = self.registry.add_connection(&request).await?;
        credential.last_used = Some(Utc::now());

        let mut set = self.vault.load().unwrap_or_default();
        set.upsert_connection(credential.clone());
        if !self.vault.save(&set) {
            return Err(EngineError::VaultRejected);
        }

        let connection = LiveConnection {
            id: response.connection_id,
            name: credential.name.clone(),
            status: ConnectionStatus::Active,
            balance: response.data.as_ref().and_then(|d| d.balance.clone()),
            positions: response
                .data
                .as_ref()
                .map(|d| d.positions.clone())
                .unwrap_or_default(),
            order_history: response.data.map(|d| d.order_history).unwrap_or_default(),
            api_key_masked: credential.api_key.display_masked(),
            last_updated: Utc::now(),
        };

        let mut state = self.state.lock().await;
        state.connections.retain(|c| c.id != connection.id);
        state.connections.push(connection.clone());
        state.recompute_totals();

        info!(id = %connection.id, name = %connection.name, "connection added");
        Ok(connection)
    }

    /// Checks a credential pair against the exchange without storing it.
    pub async fn test_connection(
        &self,
        api_key: &str,
        secret_key: &str,
        testnet: bool,
    ) -> Result<(), EngineError> {
        self.registry
            .test_connection(api_key, secret_key, testnet)
            .await
            .map_err(|e| EngineError::ConnectionTest(e.to_string()))
    }

    /// Deregisters a connection and removes its stored credential.
    pub async fn remove_connection(&self, connection_id: &str) -> Result<(), EngineError> {
        self.registry.remove_connection(connection_id).await?;

        let mut set = self.vault.load().unwrap_or_default();
        if set.remove_connection(connection_id) && !self.vault.save(&set) {
            return Err(EngineError::VaultRejected);
        }

        let mut state = self.state.lock().await;
        let before = state.connections.len();
        state.connections.retain(|c| c.id != connection_id);
        if state.connections.len() != before {
            state.recompute_totals();
        }

        info!(id = %connection_id, "connection removed");
        Ok(())
    }

    /// Cancels one working order on a connection.
    pub async fn cancel_order(
        &self,
        connection_id: &str,
        order_id: &str,
        symbol: &str,
    ) -> Result<(), EngineError> {
        self.registry
            .cancel_order(connection_id, order_id, symbol)
            .await?;
        info!(connection_id, order_id, symbol, "order cancel requested");
        Ok(())
    }

    /// Flattens the open position for `symbol` on a connection.
    ///
    /// The closing order side is derived from the position's direction: a
    /// long position closes with a sell, a short with a buy.
    pub async fn close_position(
        &self,
        connection_id: &str,
        symbol: &str,
    ) -> Result<(), EngineError> {
        let direction = self.find_position_direction(connection_id, symbol).await?;
        self.registry
            .close_position(connection_id, symbol, direction.close_side())
            .await?;
        info!(connection_id, symbol, "position close requested");
        Ok(())
    }

    async fn find_position_direction(
        &self,
        connection_id: &str,
        symbol: &str,
    ) -> Result<PositionDirection, EngineError> {
        {
            let state = self.state.lock().await;
            if let Some(connection) = state.connections.iter().find(|c| c.id == connection_id) {
                if let Some(position) = connection
                    .positions
                    .iter()
                    .find(|p| p.symbol == symbol && p.is_open())
                {
                    return Ok(position.direction);
                }
            }
        }

        // Fall back to a fresh registry read so one-shot callers work before
        // the first refresh lands.
        let remotes = self.registry.get_connections().await?;
        let remote = remotes
            .iter()
            .find(|r| r.connection_id == connection_id)
            .ok_or_else(|| EngineError::ConnectionNotFound(connection_id.to_string()))?;

        remote
            .data
            .as_ref()
            .and_then(|data| {
                data.positions
                    .iter()
                    .find(|p| p.symbol == symbol && p.is_open())
            })
            .map(|p| p.direction)
            .ok_or_else(|| EngineError::PositionNotFound {
                connection_id: connection_id.to_string(),
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        ScriptedRegistry, healthy_remote, open_position, remote_without_data, sample_balance,
        ticker,
    };
    use core_types::{CredentialSet, StoredSecret, UserIdentity, mask_secret};
    use rust_decimal_macros::dec;
    use vault::{KvStore, MemoryStore};

    fn fresh_vault() -> Arc<CredentialVault> {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let identity = UserIdentity::generate("Trader");
        Arc::new(CredentialVault::open(store, "test-passphrase", &identity).unwrap())
    }

    fn vault_with(set: &CredentialSet) -> Arc<CredentialVault> {
        let vault = fresh_vault();
        assert!(vault.save(set));
        vault
    }

    fn stored_credential(id: &str, name: &str) -> ConnectionCredential {
        let mut credential = ConnectionCredential::new(
            name,
            "AKEY12345678",
            "SKEY12345678",
            false,
            MarketSelection::default(),
        );
        credential.id = id.to_string();
        credential
    }

    fn live_connection(id: &str) -> LiveConnection {
        LiveConnection {
            id: id.to_string(),
            name: format!("account {id}"),
            status: ConnectionStatus::Active,
            balance: Some(sample_balance()),
            positions: vec![],
            order_history: vec![],
            api_key_masked: mask_secret("AKEY12345678"),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn startup_restores_and_builds_live_view() {
        let mut set = CredentialSet::default();
        set.connections.push(stored_credential("conn_a", "local"));

        let registry = ScriptedRegistry::new();
        registry.connections.lock().unwrap().extend([
            healthy_remote("conn_a", "local", sample_balance()),
            healthy_remote("conn_b", "remote only", sample_balance()),
        ]);
        let registry = Arc::new(registry);

        let mut session = Session::new(Config::default(), registry, vault_with(&set));
        let report = session.start().await.unwrap();
        assert_eq!(report.restored, 1);

        let connections = session.connections().await;
        assert_eq!(connections.len(), 2);
        assert!(connections[0].api_key_masked.ends_with("5678"));
        assert_eq!(connections[1].api_key_masked, mask_secret(""));

        let totals = session.totals().await;
        assert_eq!(totals.total_balance, dec!(2000));

        session.shutdown();
    }

    #[tokio::test]
    async fn startup_degrades_when_registry_is_down() {
        let mut set = CredentialSet::default();
        set.connections.push(stored_credential("conn_a", "local"));

        let mut registry = ScriptedRegistry::new();
        registry.offline = true;
        let registry = Arc::new(registry);

        let mut session = Session::new(Config::default(), registry, vault_with(&set));
        let report = session.start().await.unwrap();

        assert_eq!(report.failed, 1);
        assert!(session.connections().await.is_empty());
        assert_eq!(session.totals().await.total_balance, dec!(0));

        session.shutdown();
    }

    #[tokio::test]
    async fn session_can_only_start_once() {
        let registry = Arc::new(ScriptedRegistry::new());
        let mut session = Session::new(Config::default(), registry, fresh_vault());
        session.start().await.unwrap();

        let second = session.start().await;
        assert!(matches!(second, Err(EngineError::Configuration(_))));

        session.shutdown();
    }

    #[tokio::test]
    async fn portfolio_update_patches_one_connection() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry, fresh_vault());
        {
            let mut state = session.state.lock().await;
            state.connections.push(live_connection("conn_a"));
            state.connections.push(live_connection("conn_b"));
            state.recompute_totals();
        }

        let mut balance = sample_balance();
        balance.total = dec!(2500);
        let update = StreamEvent::PortfolioUpdate(PortfolioUpdate {
            connection_id: "conn_a".to_string(),
            balance: Some(balance),
            positions: vec![open_position("BTCUSDT", dec!(100), dec!(110), dec!(2))],
            order_history: vec![],
            timestamp: Utc::now(),
        });
        Session::apply_event(&session.state, update).await;

        let connections = session.connections().await;
        assert_eq!(connections[0].balance.as_ref().unwrap().total, dec!(2500));
        assert_eq!(connections[0].positions.len(), 1);
        // The untouched connection keeps its data.
        assert_eq!(connections[1].balance.as_ref().unwrap().total, dec!(1000));

        let totals = session.totals().await;
        assert_eq!(totals.total_balance, dec!(3500));
        assert_eq!(totals.active_positions, 1);
        assert_eq!(totals.total_pnl, dec!(20));
    }

    #[tokio::test]
    async fn empty_patch_moves_connection_into_error_state() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry, fresh_vault());
        session
            .state
            .lock()
            .await
            .connections
            .push(live_connection("conn_a"));

        let update = StreamEvent::PortfolioUpdate(PortfolioUpdate {
            connection_id: "conn_a".to_string(),
            balance: None,
            positions: vec![],
            order_history: vec![],
            timestamp: Utc::now(),
        });
        Session::apply_event(&session.state, update).await;

        let connections = session.connections().await;
        assert_eq!(connections[0].status, ConnectionStatus::Error);
        assert!(connections[0].balance.is_none());
    }

    #[tokio::test]
    async fn update_for_unknown_connection_is_dropped() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry, fresh_vault());

        let update = StreamEvent::PortfolioUpdate(PortfolioUpdate {
            connection_id: "conn_ghost".to_string(),
            balance: Some(sample_balance()),
            positions: vec![],
            order_history: vec![],
            timestamp: Utc::now(),
        });
        Session::apply_event(&session.state, update).await;

        assert!(session.connections().await.is_empty());
    }

    #[tokio::test]
    async fn market_update_replaces_tickers_and_cursor_stays_in_range() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry, fresh_vault());
        {
            let mut state = session.state.lock().await;
            state.tickers = vec![
                ticker("BTCUSDT", dec!(60000)),
                ticker("ETHUSDT", dec!(3000)),
                ticker("SOLUSDT", dec!(150)),
            ];
            state.ticker_cursor = 2;
        }

        let update = StreamEvent::MarketUpdate(MarketUpdate {
            tickers: vec![ticker("BTCUSDT", dec!(61000))],
            timestamp: Utc::now(),
        });
        Session::apply_event(&session.state, update).await;

        assert_eq!(session.tickers().await.len(), 1);
        let spotlight = session.ticker_spotlight().await.unwrap();
        assert_eq!(spotlight.price, dec!(61000));
    }

    #[tokio::test]
    async fn ticker_rotation_wraps_around() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry, fresh_vault());
        {
            let mut state = session.state.lock().await;
            state.tickers = vec![ticker("BTCUSDT", dec!(60000)), ticker("ETHUSDT", dec!(3000))];
        }

        let mut state = session.state.lock().await;
        state.advance_ticker_cursor();
        assert_eq!(state.ticker_cursor, 1);
        state.advance_ticker_cursor();
        assert_eq!(state.ticker_cursor, 0);
    }

    #[tokio::test]
    async fn add_connection_tests_registers_and_saves() {
        let registry = Arc::new(ScriptedRegistry::new());
        let vault = fresh_vault();
        let session = Session::new(Config::default(), registry.clone(), vault.clone());

        let connection = session
            .add_connection(
                "main",
                "AKEY12345678",
                "SKEY12345678",
                false,
                MarketSelection::default(),
            )
            .await
            .unwrap();

        assert_eq!(registry.registered.lock().unwrap().len(), 1);
        assert!(connection.api_key_masked.ends_with("5678"));

        let stored = vault.load().unwrap();
        assert_eq!(stored.connections.len(), 1);
        assert_eq!(stored.connections[0].name, "main");
        assert!(stored.connections[0].last_used.is_some());

        let connections = session.connections().await;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].id, stored.connections[0].id);
    }

    #[tokio::test]
    async fn add_connection_surfaces_a_failed_test() {
        let mut registry = ScriptedRegistry::new();
        registry.reject_tests = true;
        let registry = Arc::new(registry);
        let vault = fresh_vault();
        let session = Session::new(Config::default(), registry.clone(), vault.clone());

        let result = session
            .add_connection(
                "main",
                "AKEY12345678",
                "SKEY12345678",
                false,
                MarketSelection::default(),
            )
            .await;

        assert!(matches!(result, Err(EngineError::ConnectionTest(_))));
        // Nothing was registered or persisted.
        assert!(registry.registered.lock().unwrap().is_empty());
        assert!(vault.load().is_none());
    }

    #[tokio::test]
    async fn add_connection_rejects_empty_input() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry, fresh_vault());

        let result = session
            .add_connection("main", "", "SKEY", false, MarketSelection::default())
            .await;
        assert!(matches!(result, Err(EngineError::Input(_))));
    }

    #[tokio::test]
    async fn remove_connection_deletes_everywhere() {
        let mut set = CredentialSet::default();
        set.connections.push(stored_credential("conn_a", "main"));
        let vault = vault_with(&set);

        let registry = ScriptedRegistry::new();
        registry
            .connections
            .lock()
            .unwrap()
            .push(healthy_remote("conn_a", "main", sample_balance()));
        let registry = Arc::new(registry);

        let session = Session::new(Config::default(), registry.clone(), vault.clone());
        session
            .state
            .lock()
            .await
            .connections
            .push(live_connection("conn_a"));

        session.remove_connection("conn_a").await.unwrap();

        assert_eq!(*registry.removed.lock().unwrap(), vec!["conn_a"]);
        assert!(vault.load().unwrap().connections.is_empty());
        assert!(session.connections().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_order_passes_through() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry.clone(), fresh_vault());

        session
            .cancel_order("conn_a", "ord-1", "BTCUSDT")
            .await
            .unwrap();
        assert_eq!(
            *registry.order_calls.lock().unwrap(),
            vec!["cancel conn_a ord-1 BTCUSDT"]
        );
    }

    #[tokio::test]
    async fn close_position_uses_the_opposite_side() {
        let registry = Arc::new(ScriptedRegistry::new());
        let session = Session::new(Config::default(), registry.clone(), fresh_vault());
        {
            let mut state = session.state.lock().await;
            let mut connection = live_connection("conn_a");
            connection
                .positions
                .push(open_position("BTCUSDT", dec!(100), dec!(110), dec!(2)));
            state.connections.push(connection);
        }

        session.close_position("conn_a", "BTCUSDT").await.unwrap();
        assert_eq!(
            *registry.order_calls.lock().unwrap(),
            vec!["close conn_a BTCUSDT Sell"]
        );
    }

    #[tokio::test]
    async fn close_position_falls_back_to_the_registry_view() {
        let registry = ScriptedRegistry::new();
        let mut remote = healthy_remote("conn_a", "main", sample_balance());
        if let Some(data) = remote.data.as_mut() {
            data.positions
                .push(open_position("ETHUSDT", dec!(3000), dec!(2900), dec!(1)));
        }
        registry.connections.lock().unwrap().push(remote);
        let registry = Arc::new(registry);

        let session = Session::new(Config::default(), registry.clone(), fresh_vault());
        session.close_position("conn_a", "ETHUSDT").await.unwrap();
        assert_eq!(
            *registry.order_calls.lock().unwrap(),
            vec!["close conn_a ETHUSDT Sell"]
        );
    }

    #[tokio::test]
    async fn close_position_for_unknown_symbol_fails() {
        let registry = ScriptedRegistry::new();
        registry
            .connections
            .lock()
            .unwrap()
            .push(healthy_remote("conn_a", "main", sample_balance()));
        let registry = Arc::new(registry);

        let session = Session::new(Config::default(), registry, fresh_vault());
        let result = session.close_position("conn_a", "BTCUSDT").await;
        assert!(matches!(
            result,
            Err(EngineError::PositionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn shutdown_stops_the_periodic_tasks() {
        let registry = Arc::new(ScriptedRegistry::new());
        let mut session = Session::new(Config::default(), registry, fresh_vault());
        session.start().await.unwrap();
        assert_eq!(session.tasks.len(), 3);

        session.shutdown();
        assert!(session.tasks.is_empty());
    }

    #[tokio::test]
    async fn refresh_tick_feeds_the_event_channel() {
        let registry = ScriptedRegistry::new();
        registry
            .connections
            .lock()
            .unwrap()
            .push(healthy_remote("conn_a", "main", sample_balance()));
        let registry: Arc<ScriptedRegistry> = Arc::new(registry);

        let (events_tx, mut events_rx) = events::channel(16);
        let symbols = vec!["BTCUSDT".to_string()];
        Session::refresh_tick(registry.as_ref(), &symbols, &events_tx).await;

        let first = events_rx.recv().await.unwrap();
        assert!(matches!(first, StreamEvent::MarketUpdate(_)));
        let second = events_rx.recv().await.unwrap();
        match second {
            StreamEvent::PortfolioUpdate(update) => {
                assert_eq!(update.connection_id, "conn_a");
                assert!(update.balance.is_some());
            }
            other => panic!("expected a portfolio update, got {other:?}"),
        }
    }
}

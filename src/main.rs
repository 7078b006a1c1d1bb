use std::sync::Arc;

use clap::{Parser, Subcommand};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use configuration::{Config, load_config};
use core_types::{LiveConnection, MarketSelection};
use engine::{ConnectionReconciler, Session};
use portfolio::{PortfolioAggregator, PortfolioTotals};
use registry_client::{HttpRegistryClient, RegistryClient};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vault::{CredentialVault, FileStore, IdentityStore, KvStore};

/// The main entry point for the Vantage dashboard application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from a .env file, if one exists.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = load_config()?;

    // Execute the appropriate command
    match cli.command {
        Commands::Run => handle_run(config).await?,
        Commands::Status => handle_status(config).await?,
        Commands::AddConnection(args) => handle_add_connection(config, args).await?,
        Commands::TestConnection(args) => handle_test_connection(config, args).await?,
        Commands::RemoveConnection(args) => handle_remove_connection(config, args).await?,
        Commands::CancelOrder(args) => handle_cancel_order(config, args).await?,
        Commands::ClosePosition(args) => handle_close_position(config, args).await?,
        Commands::ClearVault => handle_clear_vault(config)?,
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A local dashboard for live multi-account trading sessions.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore stored connections and run the live session until interrupted.
    Run,
    /// Print a one-shot snapshot of connections, positions and totals.
    Status,
    /// Validate, register and store a new exchange connection.
    AddConnection(AddConnectionArgs),
    /// Check an API key pair against the exchange without storing anything.
    TestConnection(TestConnectionArgs),
    /// Deregister a connection and drop its stored credential.
    RemoveConnection(RemoveConnectionArgs),
    /// Cancel a working order on one connection.
    CancelOrder(CancelOrderArgs),
    /// Close an open position at market.
    ClosePosition(ClosePositionArgs),
    /// Delete every credential stored on this machine.
    ClearVault,
}

#[derive(Parser)]
struct AddConnectionArgs {
    /// Display name for the connection (e.g., "Main Account").
    #[arg(long)]
    name: String,

    /// The exchange API key.
    #[arg(long)]
    api_key: String,

    /// The exchange API secret.
    #[arg(long)]
    secret_key: String,

    /// Register against the exchange testnet instead of the live venue.
    #[arg(long, default_value_t = false)]
    testnet: bool,
}

#[derive(Parser)]
struct TestConnectionArgs {
    /// The exchange API key.
    #[arg(long)]
    api_key: String,

    /// The exchange API secret.
    #[arg(long)]
    secret_key: String,

    /// Check against the exchange testnet instead of the live venue.
    #[arg(long, default_value_t = false)]
    testnet: bool,
}

#[derive(Parser)]
struct RemoveConnectionArgs {
    /// The connection id, as shown by `status`.
    #[arg(long)]
    id: String,
}

#[derive(Parser)]
struct CancelOrderArgs {
    /// The connection the order lives on.
    #[arg(long)]
    connection: String,

    /// The exchange order id.
    #[arg(long)]
    order_id: String,

    /// The order's symbol (e.g., "BTCUSDT").
    #[arg(long)]
    symbol: String,
}

#[derive(Parser)]
struct ClosePositionArgs {
    /// The connection the position lives on.
    #[arg(long)]
    connection: String,

    /// The position's symbol (e.g., "BTCUSDT").
    #[arg(long)]
    symbol: String,
}

// ==============================================================================
// Shared Wiring
// ==============================================================================

/// Opens the credential vault rooted at the configured storage directory.
fn open_vault(config: &Config) -> anyhow::Result<Arc<CredentialVault>> {
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(&config.storage.data_dir)?);
    let identity = IdentityStore::new(Arc::clone(&store)).current()?;
    let vault = CredentialVault::open(store, config.security.effective_passphrase(), &identity)?;
    Ok(Arc::new(vault))
}

fn open_registry(config: &Config) -> anyhow::Result<Arc<dyn RegistryClient>> {
    Ok(Arc::new(HttpRegistryClient::new(&config.registry)?))
}

fn build_session(config: Config) -> anyhow::Result<Session> {
    let vault = open_vault(&config)?;
    let registry = open_registry(&config)?;
    Ok(Session::new(config, registry, vault))
}

// ==============================================================================
// Run Command Logic
// ==============================================================================

/// Handles the live session: restores stored connections, starts the
/// periodic refresh and rotation tasks and stays up until Ctrl-C.
async fn handle_run(config: Config) -> anyhow::Result<()> {
    let spotlight_every = config.intervals.ticker_rotation();
    let mut session = build_session(config)?;

    let report = session.start().await?;
    println!("Session started: {report}.");

    let connections = session.connections().await;
    if connections.is_empty() {
        println!("No connections yet. Add one with `vantage add-connection`.");
    } else {
        print_connections(&connections);
        print_totals(&session.totals().await);
    }

    println!("Press Ctrl-C to stop.");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut spotlight_timer = tokio::time::interval(spotlight_every);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = spotlight_timer.tick() => {
                if let Some(ticker) = session.ticker_spotlight().await {
                    info!(symbol = %ticker.symbol, price = %ticker.price, change = %ticker.change_24h, "spotlight");
                }
            }
        }
    }

    session.shutdown();
    println!("Session stopped.");
    Ok(())
}

// ==============================================================================
// Status Command Logic
// ==============================================================================

/// Handles the one-shot snapshot: registry health, vault contents and the
/// merged live view with portfolio totals.
async fn handle_status(config: Config) -> anyhow::Result<()> {
    let vault = open_vault(&config)?;
    let registry = open_registry(&config)?;

    match registry.health().await {
        Ok(health) => println!(
            "Registry: {} (v{}, {} mode, {} active connections)",
            health.status, health.version, health.mode, health.active_connections
        ),
        Err(e) => println!("Registry: unreachable ({e})"),
    }
    print_vault_line(&vault);

    let reconciler = ConnectionReconciler::new(Arc::clone(&vault), Arc::clone(&registry));
    let connections = reconciler.fetch_live_connections().await?;
    if connections.is_empty() {
        println!("No live connections.");
        return Ok(());
    }

    print_connections(&connections);
    print_positions(&connections);

    let totals = PortfolioAggregator::new().calculate(&connections)?;
    print_totals(&totals);

    match registry.get_portfolio_summary().await {
        Ok(summary) => println!(
            "Registry agrees on {} active position(s) across {} connection(s).",
            summary.active_positions, summary.total_connections
        ),
        Err(e) => warn!("portfolio summary unavailable: {e}"),
    }

    Ok(())
}

fn print_vault_line(vault: &CredentialVault) {
    let info = vault.info();
    if !info.slot_present {
        println!("Vault: empty");
    } else if !info.is_current_user {
        println!("Vault: credential slot belongs to another local profile");
    } else {
        println!(
            "Vault: {} stored connection(s){}",
            info.connection_count,
            if info.has_ai_credential {
                ", AI key present"
            } else {
                ""
            }
        );
    }
}

// ==============================================================================
// Connection Command Logic
// ==============================================================================

async fn handle_add_connection(config: Config, args: AddConnectionArgs) -> anyhow::Result<()> {
    let session = build_session(config)?;
    let connection = session
        .add_connection(
            &args.name,
            &args.api_key,
            &args.secret_key,
            args.testnet,
            MarketSelection::default(),
        )
        .await?;
    println!(
        "Connection '{}' registered as {} (key {}).",
        connection.name, connection.id, connection.api_key_masked
    );
    Ok(())
}

async fn handle_test_connection(config: Config, args: TestConnectionArgs) -> anyhow::Result<()> {
    let registry = open_registry(&config)?;
    registry
        .test_connection(&args.api_key, &args.secret_key, args.testnet)
        .await?;
    println!("Credentials accepted by the exchange.");
    Ok(())
}

async fn handle_remove_connection(
    config: Config,
    args: RemoveConnectionArgs,
) -> anyhow::Result<()> {
    let session = build_session(config)?;
    session.remove_connection(&args.id).await?;
    println!("Connection {} removed.", args.id);
    Ok(())
}

async fn handle_cancel_order(config: Config, args: CancelOrderArgs) -> anyhow::Result<()> {
    let session = build_session(config)?;
    session
        .cancel_order(&args.connection, &args.order_id, &args.symbol)
        .await?;
    println!("Cancel request for order {} accepted.", args.order_id);
    Ok(())
}

async fn handle_close_position(config: Config, args: ClosePositionArgs) -> anyhow::Result<()> {
    let session = build_session(config)?;
    session.close_position(&args.connection, &args.symbol).await?;
    println!(
        "Close request for {} on {} accepted.",
        args.symbol, args.connection
    );
    Ok(())
}

fn handle_clear_vault(config: Config) -> anyhow::Result<()> {
    let vault = open_vault(&config)?;
    if vault.clear() {
        println!("Stored credentials deleted.");
        Ok(())
    } else {
        anyhow::bail!("the credential slot could not be deleted")
    }
}

// ==============================================================================
// Display Helpers
// ==============================================================================

fn print_connections(connections: &[LiveConnection]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "ID", "Name", "Status", "API Key", "Balance", "Open", "Updated",
    ]);
    for connection in connections {
        let balance = connection
            .balance
            .as_ref()
            .map(|b| b.total.round_dp(2).to_string())
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![
            connection.id.clone(),
            connection.name.clone(),
            format!("{:?}", connection.status),
            connection.api_key_masked.clone(),
            balance,
            connection.open_positions().count().to_string(),
            connection.last_updated.format("%H:%M:%S").to_string(),
        ]);
    }
    println!("{table}");
}

fn print_positions(connections: &[LiveConnection]) {
    let aggregator = PortfolioAggregator::new();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Connection",
        "Symbol",
        "Side",
        "Amount",
        "Entry",
        "Mark",
        "PnL",
        "PnL %",
    ]);
    let mut rows = 0;
    for connection in connections {
        for position in connection.open_positions() {
            // Recompute broken zero-PnL figures before they reach the screen.
            let position = match aggregator.normalize(position) {
                Ok(position) => position,
                Err(e) => {
                    warn!(symbol = %position.symbol, "position skipped: {e}");
                    continue;
                }
            };
            rows += 1;
            table.add_row(vec![
                connection.name.clone(),
                position.symbol.clone(),
                format!("{:?}", position.direction),
                position.amount.to_string(),
                position.entry_price.to_string(),
                position.current_price.to_string(),
                position.pnl.round_dp(2).to_string(),
                format!("{}%", position.pnl_percent.round_dp(2)),
            ]);
        }
    }
    if rows > 0 {
        println!("{table}");
    }
}

fn print_totals(totals: &PortfolioTotals) {
    println!(
        "Totals: balance {}, PnL {}, value {}",
        totals.total_balance.round_dp(2),
        totals.total_pnl.round_dp(2),
        totals.total_value.round_dp(2)
    );
    println!(
        "Positions: {} open ({} winning / {} losing), win rate {}%, best {}, worst {}",
        totals.active_positions,
        totals.win_count,
        totals.loss_count,
        totals.win_rate.round_dp(1),
        totals.largest_gain.round_dp(2),
        totals.largest_loss.round_dp(2)
    );
}

// In app/src/main.rs

use anyhow::{Context, Result};
use api_client::{BinanceClient, MarketDataSource, OrderSink, SyntheticMarket};
use app_config::{MarketDataKind, Settings, TradingMode};
use chrono::Utc;
use clap::{Parser, Subcommand};
use core_types::Balances;
use database::TradeRecorder;
use engine::{Engine, StopSignal};
use events::{EngineEvent, EventReceiver};
use execution::{LiveLedger, SharedLedger, SimulatedLedger, shared};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

mod logging;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A moving-average crossover trading bot for Binance spot pairs.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the trading engine until Ctrl-C or a fatal error.
    Run,

    /// Prints the account balances the bot would trade with, plus open orders in live accounts.
    Balances,

    /// Prints every recorded trade, oldest first.
    History,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = app_config::load_settings().context("failed to load settings")?;
    let _guard = logging::init(&settings.app)?;

    tracing::info!(mode = ?settings.trading.mode, "Starting tradebot");

    match cli.command {
        Commands::Run => run_app(settings).await?,
        Commands::Balances => handle_balances(settings).await?,
        Commands::History => handle_history(settings).await?,
    }

    tracing::info!("tradebot has finished successfully.");
    Ok(())
}

// --- "Run" Subcommand Logic ---

async fn run_app(settings: Settings) -> Result<()> {
    // --- 1. Initialization ---
    let db = database::connect(&settings.database).await?;
    let recorder: Arc<dyn TradeRecorder> = Arc::new(db.clone());

    // --- 2. Component Instantiation ---
    let ledger = build_ledger(&settings, recorder).await?;
    let source = build_source(&settings)?;

    let (events_tx, events_rx) = events::channel();
    let event_logger = tokio::spawn(log_events(events_rx));

    let stop = StopSignal::new();

    // --- 3. Run until Ctrl-C or a halt ---
    // The engine holds an event sender; it must be gone before the logger can finish.
    let result = {
        let engine = Engine::new(
            settings.trading.clone(),
            source,
            ledger.clone(),
            events_tx,
            stop.clone(),
        );
        let engine_run = engine.run();
        tokio::pin!(engine_run);

        tokio::select! {
            result = &mut engine_run => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; stopping all trading tasks...");
                stop.stop();
                engine_run.await
            }
        }
    };

    // --- 4. Shutdown ---
    let _ = event_logger.await;

    if let Some(balances) = ledger.lock().await.balances() {
        tracing::info!("Final balances:\n{}", format_balances(&balances));
    }
    let trades = db.count().await?;
    db.close().await;
    tracing::info!(trades, "Trade log closed.");

    result.context("trading engine halted")
}

async fn build_ledger(settings: &Settings, recorder: Arc<dyn TradeRecorder>) -> Result<SharedLedger> {
    match settings.trading.mode {
        TradingMode::Simulated => {
            let book = initial_balances(settings);
            tracing::info!("Simulated trading. Starting balances:\n{}", format_balances(&book));
            Ok(shared(SimulatedLedger::new(book, recorder)?))
        }
        TradingMode::Live => {
            tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
            let client: Arc<dyn OrderSink> = Arc::new(BinanceClient::new(&settings.binance)?);
            let mut ledger = LiveLedger::new(client, recorder);
            match ledger.refresh_balances().await {
                Ok(balances) => tracing::info!("Exchange balances:\n{}", format_balances(&balances)),
                Err(e) => tracing::warn!(error = %e, "Could not fetch starting balances."),
            }
            Ok(shared(ledger))
        }
    }
}

fn build_source(settings: &Settings) -> Result<Arc<dyn MarketDataSource>> {
    let source: Arc<dyn MarketDataSource> = match settings.trading.market_data {
        MarketDataKind::Binance => Arc::new(BinanceClient::new(&settings.binance)?),
        MarketDataKind::Synthetic => {
            let synthetic = &settings.trading.synthetic;
            tracing::info!(seed = synthetic.seed, "Using synthetic market data.");
            Arc::new(SyntheticMarket::new(
                synthetic.seed,
                synthetic.start_price,
                synthetic.step_sigma,
                Utc::now(),
            ))
        }
    };
    Ok(source)
}

/// Configured starting book. Asset keys may come back lowercased from the
/// config layer, so they are normalised here.
fn initial_balances(settings: &Settings) -> Balances {
    Balances::from_free(
        settings
            .trading
            .initial_balances
            .iter()
            .map(|(asset, amount)| (asset.to_uppercase(), *amount)),
    )
}

/// Drains engine events until every sender is gone.
async fn log_events(mut rx: EventReceiver) {
    loop {
        match rx.recv().await {
            Ok(EngineEvent::TradeExecuted(entry)) => {
                tracing::debug!(
                    symbol = %entry.symbol,
                    side = %entry.side,
                    notional = %entry.notional(),
                    "event: trade executed"
                );
            }
            Ok(event) => tracing::debug!(symbol = %event.symbol(), ?event, "event"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger fell behind.");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// --- "Balances" Subcommand Logic ---

async fn handle_balances(settings: Settings) -> Result<()> {
    if !settings.binance.has_credentials() {
        tracing::info!("No API credentials configured; showing the simulated starting book.");
        println!("{}", format_balances(&initial_balances(&settings)));
        return Ok(());
    }

    let client = BinanceClient::new(&settings.binance)?;
    let balances = client.fetch_balances().await?.non_zero();
    println!("Balances:\n{}", format_balances(&balances));

    let orders = client.get_open_orders(None).await?;
    println!("\nOpen orders:");
    if orders.is_empty() {
        println!("  (none)");
    }
    for order in &orders {
        println!(
            "  {} #{} {} {} qty={} filled={} price={} ({:?})",
            order.symbol,
            order.order_id,
            order.side,
            order.order_type,
            order.orig_qty,
            order.executed_qty,
            order.price,
            order.status
        );
    }
    Ok(())
}

// --- "History" Subcommand Logic ---

async fn handle_history(settings: Settings) -> Result<()> {
    let db = database::connect(&settings.database).await?;

    let mut trades = db.all();
    let mut count = 0usize;
    while let Some(entry) = trades.try_next().await? {
        count += 1;
        let order = entry
            .order
            .as_ref()
            .map(|o| format!(" order={} ({:?})", o.exchange_order_id, o.status))
            .unwrap_or_default();
        println!(
            "{}  {} {} {} @ {}{}",
            entry.at.format("%Y-%m-%d %H:%M:%S"),
            entry.side,
            entry.quantity,
            entry.symbol,
            entry.price,
            order
        );
    }
    drop(trades);

    println!("{count} trade(s) recorded.");
    db.close().await;
    Ok(())
}

fn format_balances(balances: &Balances) -> String {
    if balances.is_empty() {
        return "  (none)".to_string();
    }
    balances
        .iter()
        .map(|(asset, b)| format!("  {asset:<6} free={} locked={}", b.free, b.locked))
        .collect::<Vec<_>>()
        .join("\n")
}

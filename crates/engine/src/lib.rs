// In crates/engine/src/lib.rs

pub mod error;
pub mod stop;
pub mod task;

use crate::task::{TaskSettings, TradingTask};
use api_client::MarketDataSource;
use app_config::types::TradingSettings;
use events::EventSender;
use execution::SharedLedger;
use futures::future;
use std::sync::Arc;
use strategies::{PriceWindow, create_strategy};

pub use error::{EngineError, Result};
pub use stop::StopSignal;
pub use task::{CycleOutcome, TaskState};

/// The portfolio-level orchestrator for all trading activities.
///
/// Every enabled pair gets its own `TradingTask` with its own window and
/// strategy; they all share one market data source and one ledger.
pub struct Engine {
    settings: TradingSettings,
    source: Arc<dyn MarketDataSource>,
    ledger: SharedLedger,
    events: EventSender,
    stop: StopSignal,
}

impl Engine {
    pub fn new(
        settings: TradingSettings,
        source: Arc<dyn MarketDataSource>,
        ledger: SharedLedger,
        events: EventSender,
        stop: StopSignal,
    ) -> Self {
        Self {
            settings,
            source,
            ledger,
            events,
            stop,
        }
    }

    /// Builds one task per enabled pair without starting any of them.
    pub fn build_tasks(&self) -> Result<Vec<TradingTask>> {
        let mut tasks = Vec::new();

        for pair in &self.settings.pairs {
            if !pair.enabled {
                tracing::warn!(symbol = %pair.symbol, "Skipping disabled trading pair.");
                continue;
            }

            tracing::info!(symbol = %pair.symbol, "Setting up trading task.");

            // 1. Runtime settings and window for this pair
            let settings = TaskSettings::from_config(pair, &self.settings)?;
            let window = PriceWindow::with_margin(
                pair.short_window,
                pair.long_window,
                self.settings.window_margin,
            )
            .map_err(|e| EngineError::Configuration(format!("{}: {e}", pair.symbol)))?;

            // 2. The strategy instance
            let strategy = create_strategy(&pair.strategy, pair.strategy_settings())
                .map_err(|e| EngineError::Configuration(format!("{}: {e}", pair.symbol)))?;

            tasks.push(TradingTask::new(
                settings,
                window,
                strategy,
                self.source.clone(),
                self.ledger.clone(),
                self.events.clone(),
                &self.stop,
            ));
        }

        if tasks.is_empty() {
            return Err(EngineError::Configuration(
                "no trading tasks to start; enable at least one pair".into(),
            ));
        }
        Ok(tasks)
    }

    /// Spawns every task and waits for all of them.
    ///
    /// A halt in any task flips the stop signal so the others wind down too;
    /// the first halt is returned.
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Initializing trading engine...");
        let tasks = self.build_tasks()?;

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|mut task| {
                let stop = self.stop.clone();
                tokio::spawn(async move {
                    let result = task.run().await;
                    if result.is_err() {
                        stop.stop();
                    }
                    result
                })
            })
            .collect();

        tracing::info!(count = handles.len(), "All trading tasks have been spawned.");

        let mut first_error = None;
        for joined in future::join_all(handles).await {
            let outcome = joined.map_err(EngineError::from).and_then(|r| r);
            if let Err(e) = outcome {
                tracing::error!(error = %e, "Trading task terminated with an error.");
                self.stop.stop();
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("All trading tasks stopped cleanly.");
                Ok(())
            }
        }
    }
}

// In crates/engine/src/task.rs

use crate::error::{EngineError, Result};
use crate::stop::StopSignal;
use api_client::MarketDataSource;
use app_config::PairConfig;
use app_config::types::TradingSettings;
use chrono::Utc;
use core_types::{PricePoint, Symbol, TradeLogEntry};
use events::{EngineEvent, EventSender};
use execution::SharedLedger;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use strategies::{Assessment, PriceWindow, PushOutcome, Strategy};
use tokio::sync::watch;

/// Where a task is within its polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Fetching,
    Evaluating,
    Acting,
    Sleeping,
}

/// Per-pair runtime parameters.
#[derive(Debug, Clone)]
pub struct TaskSettings {
    pub symbol: Symbol,
    pub interval: String,
    pub trade_quantity: Decimal,
    pub poll_interval: Duration,
    /// Attempts per fetch, including the first.
    pub fetch_retries: u32,
    pub fetch_retry_delay: Duration,
}

impl TaskSettings {
    pub fn from_config(pair: &PairConfig, trading: &TradingSettings) -> Result<Self> {
        let symbol = Symbol::new(&pair.symbol)
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        Ok(Self {
            symbol,
            interval: pair.interval.clone(),
            trade_quantity: pair.trade_quantity,
            poll_interval: Duration::from_secs(trading.poll_interval_seconds),
            fetch_retries: trading.fetch_retries,
            fetch_retry_delay: Duration::from_secs(trading.fetch_retry_delay_seconds),
        })
    }
}

/// What one pass through Fetching, Evaluating and Acting produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Every fetch attempt failed; the window was not touched.
    FetchFailed { attempts: u32 },
    /// The stop signal fired while waiting to retry a fetch.
    Stopped,
    /// The strategy ran and asked for nothing.
    Evaluated { assessment: Assessment, push: PushOutcome },
    Traded { assessment: Assessment, entry: TradeLogEntry },
    /// The strategy asked for a trade that did not happen.
    ActionFailed { assessment: Assessment, error: String },
}

enum Fetched {
    Point(PricePoint),
    Failed { attempts: u32, error: String },
    Stopped,
}

/// A self-contained task that manages all trading logic for a single asset.
pub struct TradingTask {
    settings: TaskSettings,
    window: PriceWindow,
    strategy: Box<dyn Strategy + Send + Sync>,
    source: Arc<dyn MarketDataSource>,
    ledger: SharedLedger,
    events: EventSender,
    /// Held so the watch channel stays open for the task's whole life.
    signal: StopSignal,
    stop: watch::Receiver<bool>,
    state: TaskState,
}

impl TradingTask {
    pub fn new(
        settings: TaskSettings,
        window: PriceWindow,
        strategy: Box<dyn Strategy + Send + Sync>,
        source: Arc<dyn MarketDataSource>,
        ledger: SharedLedger,
        events: EventSender,
        stop: &StopSignal,
    ) -> Self {
        Self {
            settings,
            window,
            strategy,
            source,
            ledger,
            events,
            signal: stop.clone(),
            stop: stop.subscribe(),
            state: TaskState::Idle,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.settings.symbol
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn window(&self) -> &PriceWindow {
        &self.window
    }

    /// The signal this task watches. Stopping it ends `run`.
    pub fn stop_signal(&self) -> &StopSignal {
        &self.signal
    }

    /// The main, long-running loop for this trading task.
    ///
    /// Returns `Ok(())` once the stop signal fires, or `EngineError::Halted`
    /// when the ledger reports a broken invariant.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            symbol = %self.settings.symbol,
            interval = %self.settings.interval,
            strategy = self.strategy.name(),
            "Starting trading task."
        );

        // --- 1. Warm-up Phase ---
        self.warm_up().await;

        // --- 2. Polling Loop ---
        loop {
            self.state = TaskState::Idle;
            if self.stop_requested() {
                break;
            }

            if self.run_cycle().await? == CycleOutcome::Stopped {
                break;
            }

            self.state = TaskState::Sleeping;
            if !self.pause(self.settings.poll_interval).await {
                break;
            }
        }

        self.state = TaskState::Idle;
        tracing::info!(symbol = %self.settings.symbol, "Trading task stopped.");
        Ok(())
    }

    /// Seeds the window with recent history. Failure only costs a slower start.
    pub async fn warm_up(&mut self) -> usize {
        let symbol = &self.settings.symbol;
        let wanted = self.window.capacity();

        match self
            .source
            .fetch_recent_closes(symbol, &self.settings.interval, wanted)
            .await
        {
            Ok(points) => {
                let appended = points
                    .into_iter()
                    .filter(|p| self.window.push(*p) == PushOutcome::Appended)
                    .count();
                tracing::info!(%symbol, points = appended, "Task warm-up complete.");
                let _ = self.events.send(EngineEvent::WarmedUp {
                    symbol: symbol.clone(),
                    points: appended,
                });
                appended
            }
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "Warm-up failed; starting with an empty window.");
                0
            }
        }
    }

    /// One Fetching -> Evaluating -> Acting pass.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let at = Utc::now();
        let symbol = self.settings.symbol.clone();

        // --- 1. Fetching ---
        self.state = TaskState::Fetching;
        let point = match self.fetch_latest().await {
            Fetched::Point(point) => point,
            Fetched::Stopped => return Ok(CycleOutcome::Stopped),
            Fetched::Failed { attempts, error } => {
                tracing::error!(%symbol, %at, attempts, %error, "Price fetch failed; skipping cycle.");
                let _ = self.events.send(EngineEvent::FetchFailed {
                    symbol,
                    at,
                    attempts,
                    error,
                });
                return Ok(CycleOutcome::FetchFailed { attempts });
            }
        };

        // --- 2. Evaluating ---
        self.state = TaskState::Evaluating;
        let push = self.window.push(point);
        if push == PushOutcome::Stale {
            tracing::debug!(%symbol, timestamp = %point.timestamp, "Ignoring out-of-order close.");
        }
        let assessment = self.strategy.assess(&self.window, at);

        tracing::info!(
            %symbol,
            close = %point.close,
            short = ?assessment.short_average,
            long = ?assessment.long_average,
            signal = %assessment.sample.signal,
            previous = %assessment.previous,
            action = ?assessment.action,
            "Cycle evaluated."
        );
        let _ = self.events.send(EngineEvent::CycleEvaluated {
            symbol: symbol.clone(),
            at,
            close: point.close,
            short_average: assessment.short_average,
            long_average: assessment.long_average,
            previous: assessment.previous,
            signal: assessment.sample.signal,
            action: assessment.action,
        });

        if !assessment.action.is_trade() {
            return Ok(CycleOutcome::Evaluated { assessment, push });
        }

        // --- 3. Acting ---
        self.state = TaskState::Acting;
        let result = {
            let mut ledger = self.ledger.lock().await;
            ledger
                .apply(&symbol, assessment.action, self.settings.trade_quantity, point.close)
                .await
        };

        match result {
            Ok(entry) => {
                tracing::info!(
                    %symbol,
                    side = %entry.side,
                    quantity = %entry.quantity,
                    price = %entry.price,
                    "Trade executed."
                );
                let _ = self.events.send(EngineEvent::TradeExecuted(entry.clone()));
                Ok(CycleOutcome::Traded { assessment, entry })
            }
            Err(e) if e.is_fatal() => {
                let reason = e.to_string();
                tracing::error!(%symbol, %at, action = ?assessment.action, error = %reason, "Halting trading task.");
                let _ = self.events.send(EngineEvent::Halted {
                    symbol: symbol.clone(),
                    reason: reason.clone(),
                });
                Err(EngineError::Halted { symbol, reason })
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(%symbol, %at, action = ?assessment.action, %error, "Action failed; edge consumed.");
                let _ = self.events.send(EngineEvent::ActionFailed {
                    symbol,
                    at,
                    action: assessment.action,
                    error: error.clone(),
                });
                Ok(CycleOutcome::ActionFailed { assessment, error })
            }
        }
    }

    /// Fetches the latest close with a bounded, fixed-delay retry.
    async fn fetch_latest(&mut self) -> Fetched {
        let attempts = self.settings.fetch_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self
                .source
                .fetch_latest_close(&self.settings.symbol, &self.settings.interval)
                .await
            {
                Ok(point) => return Fetched::Point(point),
                Err(e) => {
                    tracing::warn!(
                        symbol = %self.settings.symbol,
                        attempt,
                        of = attempts,
                        error = %e,
                        "Fetch attempt failed."
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < attempts && !self.pause(self.settings.fetch_retry_delay).await {
                return Fetched::Stopped;
            }
        }

        Fetched::Failed {
            attempts,
            error: last_error,
        }
    }

    fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    /// Sleeps for `duration`. Returns `false` if the stop signal fired first.
    async fn pause(&mut self, duration: Duration) -> bool {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            if self.stop_requested() {
                return false;
            }
            tokio::select! {
                _ = &mut sleep => return true,
                changed = self.stop.changed() => {
                    // The task owns a sender, so this only fails on teardown.
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for TradingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingTask")
            .field("symbol", &self.settings.symbol)
            .field("state", &self.state)
            .field("window_len", &self.window.len())
            .finish()
    }
}

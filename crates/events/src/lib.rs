// --- Engine Event Structures ---

use chrono::{DateTime, Utc};
use core_types::{Action, Signal, Symbol, TradeLogEntry};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default capacity of the event channel. Slow subscribers lag, they never block the engine.
pub const DEFAULT_CAPACITY: usize = 256;

/// Everything a trading task reports while it runs.
/// `tag` and `content` are used by serde for clean JSON representation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// The window was seeded with history before the first cycle.
    WarmedUp { symbol: Symbol, points: usize },
    /// One cycle ran through the strategy.
    CycleEvaluated {
        symbol: Symbol,
        at: DateTime<Utc>,
        close: Decimal,
        short_average: Option<Decimal>,
        long_average: Option<Decimal>,
        previous: Signal,
        signal: Signal,
        action: Action,
    },
    TradeExecuted(TradeLogEntry),
    /// An action was attempted and failed. The edge is consumed anyway.
    ActionFailed {
        symbol: Symbol,
        at: DateTime<Utc>,
        action: Action,
        error: String,
    },
    /// Every fetch attempt of a cycle failed.
    FetchFailed {
        symbol: Symbol,
        at: DateTime<Utc>,
        attempts: u32,
        error: String,
    },
    /// The task stopped on a fatal error.
    Halted { symbol: Symbol, reason: String },
}

impl EngineEvent {
    pub fn symbol(&self) -> &Symbol {
        match self {
            EngineEvent::WarmedUp { symbol, .. }
            | EngineEvent::CycleEvaluated { symbol, .. }
            | EngineEvent::ActionFailed { symbol, .. }
            | EngineEvent::FetchFailed { symbol, .. }
            | EngineEvent::Halted { symbol, .. } => symbol,
            EngineEvent::TradeExecuted(entry) => &entry.symbol,
        }
    }
}

pub type EventSender = broadcast::Sender<EngineEvent>;
pub type EventReceiver = broadcast::Receiver<EngineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    broadcast::channel(DEFAULT_CAPACITY)
}

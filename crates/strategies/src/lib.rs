// In crates/strategies/src/lib.rs

use chrono::{DateTime, Utc};
use core_types::{Action, Signal, SignalSample};
use rust_decimal::Decimal;

pub mod error;
pub mod factory;
pub mod ma_crossover;
pub mod types;
pub mod window;

pub use error::{Error, Result};
pub use factory::create_strategy;
pub use ma_crossover::{MACrossover, detect_transition};
pub use types::MACrossoverSettings;
pub use window::{PriceWindow, PushOutcome};

/// Everything a strategy concluded in one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub sample: SignalSample,
    /// The signal of the prior cycle (FLAT on the very first one).
    pub previous: Signal,
    pub action: Action,
    pub short_average: Option<Decimal>,
    pub long_average: Option<Decimal>,
}

/// The universal interface for a trading strategy.
///
/// A strategy reads the price window and turns it into an `Action`. It is
/// stateful: it remembers what it saw on previous calls, so every call to
/// `assess` counts as one cycle.
pub trait Strategy {
    /// The name of the strategy.
    fn name(&self) -> &'static str;

    fn assess(&mut self, window: &PriceWindow, at: DateTime<Utc>) -> Assessment;
}

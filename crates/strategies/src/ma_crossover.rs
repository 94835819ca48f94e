// In crates/strategies/src/ma_crossover.rs

use crate::types::MACrossoverSettings;
use crate::window::PriceWindow;
use crate::{Assessment, Strategy};
use chrono::{DateTime, Utc};
use core_types::{Action, Signal, SignalSample};
use std::cmp::Ordering;

/// Maps two consecutive signals to an action.
///
/// Only a direct DOWN -> UP or UP -> DOWN change is an edge. Transitions into
/// or out of FLAT never trade.
pub fn detect_transition(previous: Signal, current: Signal) -> Action {
    match (previous, current) {
        (Signal::Down, Signal::Up) => Action::EnterLong,
        (Signal::Up, Signal::Down) => Action::ExitLong,
        _ => Action::None,
    }
}

/// The stateful dual moving-average crossover signal engine.
///
/// Holds the last two samples. Each call to [`MACrossover::advance`] shifts
/// them by one, whether or not the resulting action is later carried out.
#[derive(Debug)]
pub struct MACrossover {
    settings: MACrossoverSettings,
    current: Option<SignalSample>,
    previous: Option<SignalSample>,
}

impl MACrossover {
    pub fn new(settings: MACrossoverSettings) -> Self {
        Self {
            settings,
            current: None,
            previous: None,
        }
    }

    pub fn settings(&self) -> &MACrossoverSettings {
        &self.settings
    }

    /// Derives a signal from the window's averages.
    pub fn evaluate(&self, window: &PriceWindow, at: DateTime<Utc>) -> SignalSample {
        let signal = match (window.short_average(), window.long_average()) {
            (Some(short), Some(long)) => match short.cmp(&long) {
                Ordering::Greater => Signal::Up,
                Ordering::Less => Signal::Down,
                Ordering::Equal => Signal::Flat,
            },
            _ => Signal::Flat,
        };
        SignalSample::new(signal, at)
    }

    /// Compares `sample` with the retained current sample, then shifts.
    pub fn advance(&mut self, sample: SignalSample) -> Action {
        let previous = self.current_signal();
        let action = detect_transition(previous, sample.signal);
        self.previous = self.current.replace(sample);
        action
    }

    /// The most recent signal, FLAT before the first sample.
    pub fn current_signal(&self) -> Signal {
        self.current.map(|s| s.signal).unwrap_or_default()
    }

    pub fn current(&self) -> Option<SignalSample> {
        self.current
    }

    pub fn previous(&self) -> Option<SignalSample> {
        self.previous
    }
}

impl Strategy for MACrossover {
    fn name(&self) -> &'static str {
        "ma_crossover"
    }

    fn assess(&mut self, window: &PriceWindow, at: DateTime<Utc>) -> Assessment {
        // 1. Signal from the current averages.
        let sample = self.evaluate(window, at);

        // 2. Edge against the last cycle's signal.
        let previous = self.current_signal();
        let action = self.advance(sample);

        Assessment {
            sample,
            previous,
            action,
            short_average: window.short_average(),
            long_average: window.long_average(),
        }
    }
}

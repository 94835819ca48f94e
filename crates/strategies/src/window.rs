// In crates/strategies/src/window.rs

use crate::error::{Error, Result};
use core_types::PricePoint;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Extra points kept beyond the long window.
pub const DEFAULT_MARGIN: usize = 10;

/// What happened to a point handed to [`PriceWindow::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The point was newer than the last one and was added.
    Appended,
    /// The point had the same timestamp as the last one and overwrote its close.
    Replaced,
    /// The point was older than the last one and was ignored.
    Stale,
}

/// A bounded, time-ordered window of closes with rolling short/long sums.
///
/// Both averages are maintained incrementally, so a push costs O(1)
/// regardless of the window lengths.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    points: VecDeque<PricePoint>,
    short: usize,
    long: usize,
    capacity: usize,
    short_sum: Decimal,
    long_sum: Decimal,
}

impl PriceWindow {
    pub fn new(short: usize, long: usize) -> Result<Self> {
        Self::with_margin(short, long, DEFAULT_MARGIN)
    }

    pub fn with_margin(short: usize, long: usize, margin: usize) -> Result<Self> {
        if short == 0 || short >= long {
            return Err(Error::InvalidWindow { short, long });
        }
        let capacity = long + margin;
        Ok(Self {
            points: VecDeque::with_capacity(capacity + 1),
            short,
            long,
            capacity,
            short_sum: Decimal::ZERO,
            long_sum: Decimal::ZERO,
        })
    }

    /// Adds a point, keeping the window sorted by timestamp.
    pub fn push(&mut self, point: PricePoint) -> PushOutcome {
        if let Some(last) = self.points.back_mut() {
            if point.timestamp < last.timestamp {
                return PushOutcome::Stale;
            }
            if point.timestamp == last.timestamp {
                // The newest point is inside both windows.
                let delta = point.close - last.close;
                last.close = point.close;
                self.short_sum += delta;
                self.long_sum += delta;
                return PushOutcome::Replaced;
            }
        }

        self.points.push_back(point);
        self.short_sum += point.close;
        self.long_sum += point.close;

        let len = self.points.len();
        if len > self.short {
            self.short_sum -= self.points[len - 1 - self.short].close;
        }
        if len > self.long {
            self.long_sum -= self.points[len - 1 - self.long].close;
        }

        // capacity >= long, so the evicted point is already outside both sums.
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }

        PushOutcome::Appended
    }

    /// Mean of the last `short` closes, or `None` until that many exist.
    pub fn short_average(&self) -> Option<Decimal> {
        (self.points.len() >= self.short).then(|| self.short_sum / Decimal::from(self.short))
    }

    /// Mean of the last `long` closes, or `None` until that many exist.
    pub fn long_average(&self) -> Option<Decimal> {
        (self.points.len() >= self.long).then(|| self.long_sum / Decimal::from(self.long))
    }

    pub fn short_len(&self) -> usize {
        self.short
    }

    pub fn long_len(&self) -> usize {
        self.long
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }
}

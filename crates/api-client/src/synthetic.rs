// In crates/api-client/src/synthetic.rs

use crate::MarketDataSource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use core_types::{PricePoint, Symbol};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::collections::HashMap;
use tokio::sync::Mutex;

const DEFAULT_START_PRICE: f64 = 30_000.0;
const DEFAULT_STEP_SIGMA: f64 = 150.0;
const PRICE_FLOOR: f64 = 0.01;

/// Parses Binance-style intervals such as `1m`, `4h` or `1d`.
pub fn parse_interval(interval: &str) -> Option<Duration> {
    let (unit_start, _) = interval.char_indices().last()?;
    let (digits, unit) = interval.split_at(unit_start);
    let n: i64 = digits.parse().ok().filter(|n| *n > 0)?;
    match unit {
        "m" => Some(Duration::minutes(n)),
        "h" => Some(Duration::hours(n)),
        "d" => Some(Duration::days(n)),
        "w" => Some(Duration::weeks(n)),
        _ => None,
    }
}

/// One symbol's random walk.
#[derive(Debug)]
struct Walk {
    rng: StdRng,
    price: f64,
    next_open: DateTime<Utc>,
}

impl Walk {
    fn step(&mut self, sigma: f64, candle: Duration) -> Result<PricePoint> {
        // Box-Muller: two uniforms to one standard normal.
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();

        self.price = (self.price + sigma * z).max(PRICE_FLOOR);
        let close = Decimal::from_f64(self.price)
            .map(|d| d.round_dp(2))
            .ok_or_else(|| Error::InvalidResponse(format!("unrepresentable price {}", self.price)))?;

        let point = PricePoint::new(self.next_open, close);
        self.next_open += candle;
        Ok(point)
    }
}

/// An offline market that produces a seeded Gaussian random walk per symbol,
/// one candle per fetched close.
#[derive(Debug)]
pub struct SyntheticMarket {
    seed: u64,
    start_price: f64,
    step_sigma: f64,
    start: DateTime<Utc>,
    walks: Mutex<HashMap<Symbol, Walk>>,
}

impl SyntheticMarket {
    pub fn new(seed: u64, start_price: Decimal, step_sigma: Decimal, start: DateTime<Utc>) -> Self {
        Self {
            seed,
            start_price: start_price.to_f64().unwrap_or(DEFAULT_START_PRICE),
            step_sigma: step_sigma.to_f64().unwrap_or(DEFAULT_STEP_SIGMA),
            start,
            walks: Mutex::new(HashMap::new()),
        }
    }

    /// A walk starting around 30 000 at the current time.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            start_price: DEFAULT_START_PRICE,
            step_sigma: DEFAULT_STEP_SIGMA,
            start: Utc::now(),
            walks: Mutex::new(HashMap::new()),
        }
    }

    async fn next_points(
        &self,
        symbol: &Symbol,
        interval: &str,
        count: usize,
    ) -> Result<Vec<PricePoint>> {
        let candle = parse_interval(interval)
            .ok_or_else(|| Error::DataUnavailable(format!("unsupported interval {interval:?}")))?;

        let mut walks = self.walks.lock().await;
        let walk = walks.entry(symbol.clone()).or_insert_with(|| {
            let salt = symbol
                .as_str()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            Walk {
                rng: StdRng::seed_from_u64(self.seed ^ salt),
                price: self.start_price,
                next_open: self.start,
            }
        });

        (0..count).map(|_| walk.step(self.step_sigma, candle)).collect()
    }
}

#[async_trait]
impl MarketDataSource for SyntheticMarket {
    async fn fetch_latest_close(&self, symbol: &Symbol, interval: &str) -> Result<PricePoint> {
        self.next_points(symbol, interval, 1)
            .await?
            .pop()
            .ok_or_else(|| Error::DataUnavailable(symbol.to_string()))
    }

    async fn fetch_recent_closes(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>> {
        self.next_points(symbol, interval, limit).await
    }
}

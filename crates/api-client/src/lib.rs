// In crates/api-client/src/lib.rs

use async_trait::async_trait;
use core_types::{Balances, OrderAck, PricePoint, Side, Symbol};
use rust_decimal::Decimal;

mod auth;
pub mod binance;
pub mod error;
pub mod synthetic;
pub mod types;

// Re-export public types
pub use binance::BinanceClient;
pub use error::{Error, Result};
pub use synthetic::SyntheticMarket;

/// Where closing prices come from.
///
/// The polling loop only talks to this trait, so an exchange, a replay or a
/// synthetic generator can stand behind it.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// The close of the most recent (possibly still forming) candle.
    async fn fetch_latest_close(&self, symbol: &Symbol, interval: &str) -> Result<PricePoint>;

    /// Up to `limit` most recent closes, oldest first.
    async fn fetch_recent_closes(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>>;
}

/// Where live orders go. (Authenticated)
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Places a market order for the full quantity.
    async fn submit_market_order(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderAck>;

    /// Current account balances, listing only assets with something free or locked.
    async fn fetch_balances(&self) -> Result<Balances>;
}

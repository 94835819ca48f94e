// In crates/api-client/src/types.rs

use core_types::OrderStatus;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Temporary struct to deserialize the kline response from Binance,
/// which is a JSON array of mixed types.
#[derive(Debug, Deserialize)]
pub struct RawKline(
    pub i64,    // 0: Open time
    pub String, // 1: Open
    pub String, // 2: High
    pub String, // 3: Low
    pub String, // 4: Close
    pub String, // 5: Volume
    pub i64,    // 6: Close time
    pub String, // 7: Quote asset volume
    pub i64,    // 8: Number of trades
    pub String, // 9: Taker buy base asset volume
    pub String, // 10: Taker buy quote asset volume
    pub String, // 11: Ignore
);

/// Response of `POST /api/v3/order`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub status: OrderStatus,
    pub executed_qty: Decimal,
    /// Binance's own spelling.
    pub cummulative_quote_qty: Decimal,
}

impl NewOrderResponse {
    /// Volume-weighted fill price, when anything was filled.
    pub fn average_price(&self) -> Option<Decimal> {
        if self.executed_qty > Decimal::ZERO {
            self.cummulative_quote_qty.checked_div(self.executed_qty)
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpotBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Response of `GET /api/v3/account`, trimmed to what the bot reads.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpotAccount {
    pub can_trade: bool,
    pub balances: Vec<SpotBalance>,
}

/// One entry of `GET /api/v3/openOrders`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub symbol: String,
    pub order_id: i64,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub status: OrderStatus,
}

/// Error body Binance returns alongside non-2xx statuses.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

// In crates/api-client/src/binance.rs

use crate::auth::sign_request;
use crate::error::{Error, Result};
use crate::types::{ApiErrorResponse, NewOrderResponse, OpenOrder, RawKline, SpotAccount};
use crate::{MarketDataSource, OrderSink};
use app_config::types::BinanceSettings;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use core_types::{AssetBalance, Balances, OrderAck, PricePoint, Side, Symbol};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Largest `limit` the spot klines endpoint accepts.
const MAX_KLINES: usize = 1000;
const RECV_WINDOW_MS: u64 = 5000;

/// Binance spot REST client.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    http_client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl BinanceClient {
    /// Constructs a new client from `BinanceSettings`. Public endpoints work
    /// with empty credentials.
    pub fn new(settings: &BinanceSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !settings.api_key.is_empty() {
            let key = HeaderValue::from_str(&settings.api_key)
                .map_err(|e| Error::ClientBuildError(format!("invalid API key: {e}")))?;
            headers.insert("X-MBX-APIKEY", key);
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(Self {
            http_client,
            secret_key: settings.secret_key.clone(),
            base_url: settings.rest_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Appends `timestamp`, `recvWindow` and the signature to a query string.
    fn signed_query(&self, params: &str) -> Result<String> {
        let mut query = params.to_string();
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={RECV_WINDOW_MS}&timestamp={}",
            Utc::now().timestamp_millis()
        ));
        let signature = sign_request(&self.secret_key, &query)?;
        query.push_str(&format!("&signature={signature}"));
        Ok(query)
    }

    /// Fetches klines via `GET /api/v3/klines`, oldest first.
    pub async fn get_klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>> {
        let limit = limit.clamp(1, MAX_KLINES);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        let response = self.http_client.get(&url).send().await?;
        let raw: Vec<RawKline> = read_body(response).await?;

        raw.into_iter().map(to_price_point).collect()
    }

    /// Places a market order via `POST /api/v3/order`.
    pub async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Decimal,
    ) -> Result<NewOrderResponse> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newOrderRespType=RESULT",
            symbol,
            side.as_str(),
            quantity.normalize()
        );
        let body = self.signed_query(&params)?;
        let url = format!("{}/api/v3/order", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        read_body(response).await
    }

    /// Fetches the spot account via `GET /api/v3/account`.
    pub async fn get_account(&self) -> Result<SpotAccount> {
        let query = self.signed_query("omitZeroBalances=true")?;
        let url = format!("{}/api/v3/account?{}", self.base_url, query);

        let response = self.http_client.get(&url).send().await?;
        read_body(response).await
    }

    /// Lists resting orders via `GET /api/v3/openOrders`, for one symbol or all.
    pub async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<OpenOrder>> {
        let params = symbol.map(|s| format!("symbol={s}")).unwrap_or_default();
        let query = self.signed_query(&params)?;
        let url = format!("{}/api/v3/openOrders?{}", self.base_url, query);

        let response = self.http_client.get(&url).send().await?;
        read_body(response).await
    }
}

/// Reads a response body, turning Binance `{code, msg}` payloads into `Error::ApiError`.
async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    let value: Value = serde_json::from_str(&text).map_err(|e| {
        if status.is_success() {
            Error::DeserializationFailed(e)
        } else {
            Error::InvalidResponse(format!("HTTP {status}: {text}"))
        }
    })?;

    if let Ok(err) = serde_json::from_value::<ApiErrorResponse>(value.clone()) {
        return Err(Error::ApiError {
            code: err.code,
            msg: err.msg,
        });
    }
    if !status.is_success() {
        return Err(Error::InvalidResponse(format!("HTTP {status}: {text}")));
    }

    Ok(serde_json::from_value(value)?)
}

fn to_price_point(raw: RawKline) -> Result<PricePoint> {
    let timestamp = Utc
        .timestamp_millis_opt(raw.0)
        .single()
        .ok_or_else(|| Error::InvalidResponse(format!("bad kline open time {}", raw.0)))?;
    let close: Decimal = raw
        .4
        .parse()
        .map_err(|_| Error::InvalidResponse(format!("bad kline close {:?}", raw.4)))?;
    Ok(PricePoint::new(timestamp, close))
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_latest_close(&self, symbol: &Symbol, interval: &str) -> Result<PricePoint> {
        self.get_klines(symbol, interval, 1)
            .await?
            .pop()
            .ok_or_else(|| Error::DataUnavailable(format!("no klines returned for {symbol}")))
    }

    async fn fetch_recent_closes(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>> {
        self.get_klines(symbol, interval, limit).await
    }
}

#[async_trait]
impl OrderSink for BinanceClient {
    async fn submit_market_order(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderAck> {
        let response = self.place_market_order(symbol, side, quantity).await?;
        tracing::info!(
            symbol = %response.symbol,
            order_id = response.order_id,
            status = ?response.status,
            "Market order acknowledged."
        );
        Ok(OrderAck {
            id: response.order_id.to_string(),
            status: response.status,
            executed_quantity: Some(response.executed_qty),
            average_price: response.average_price(),
        })
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let account = self.get_account().await?;
        let mut balances = Balances::new();
        for b in account.balances {
            balances.insert(b.asset, AssetBalance::new(b.free, b.locked));
        }
        Ok(balances.non_zero())
    }
}

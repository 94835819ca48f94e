//! Integration tests for the Binance spot REST client against a mocked server.

use api_client::{BinanceClient, Error, MarketDataSource, OrderSink};
use app_config::types::BinanceSettings;
use chrono::{TimeZone, Utc};
use core_types::{OrderStatus, Side, Symbol};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> BinanceClient {
    let settings = BinanceSettings {
        api_key: "test-key".to_string(),
        secret_key: "test-secret".to_string(),
        rest_base_url: server.uri(),
    };
    BinanceClient::new(&settings).unwrap()
}

fn kline(open_time: i64, close: &str) -> serde_json::Value {
    json!([
        open_time, "1.0", "2.0", "0.5", close, "10.0", open_time + 3_599_999,
        "100.0", 42, "5.0", "50.0", "0"
    ])
}

#[tokio::test]
async fn latest_close_uses_last_kline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .and(query_param("symbol", "BTCUSDT"))
        .and(query_param("interval", "1h"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([kline(1_700_000_000_000, "37000.12")])))
        .expect(1)
        .mount(&server)
        .await;

    let symbol = Symbol::new("BTCUSDT").unwrap();
    let point = client(&server).fetch_latest_close(&symbol, "1h").await.unwrap();

    assert_eq!(point.close, dec!(37000.12));
    assert_eq!(point.timestamp, Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
}

#[tokio::test]
async fn recent_closes_come_back_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            kline(1_000, "1.5"),
            kline(3_601_000, "2.5"),
            kline(7_201_000, "3.5"),
        ])))
        .mount(&server)
        .await;

    let symbol = Symbol::new("BTCUSDT").unwrap();
    let points = client(&server).fetch_recent_closes(&symbol, "1h", 3).await.unwrap();

    let closes: Vec<_> = points.iter().map(|p| p.close).collect();
    assert_eq!(closes, vec![dec!(1.5), dec!(2.5), dec!(3.5)]);
}

#[tokio::test]
async fn empty_kline_list_is_data_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let symbol = Symbol::new("BTCUSDT").unwrap();
    let err = client(&server).fetch_latest_close(&symbol, "1h").await.unwrap_err();
    assert!(matches!(err, Error::DataUnavailable(_)));
}

#[tokio::test]
async fn market_order_is_signed_and_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order"))
        .and(header("X-MBX-APIKEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "BTCUSDT",
            "orderId": 28,
            "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
            "transactTime": 1507725176595_i64,
            "price": "0.00000000",
            "origQty": "0.00100000",
            "executedQty": "0.00100000",
            "cummulativeQuoteQty": "50.00000000",
            "status": "FILLED",
            "timeInForce": "GTC",
            "type": "MARKET",
            "side": "BUY"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let symbol = Symbol::new("BTCUSDT").unwrap();
    let ack = client(&server)
        .submit_market_order(&symbol, Side::Buy, dec!(0.001))
        .await
        .unwrap();

    assert_eq!(ack.id, "28");
    assert_eq!(ack.status, OrderStatus::Filled);
    assert_eq!(ack.average_price, Some(dec!(50000)));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("side=BUY"));
    assert!(body.contains("type=MARKET"));
    assert!(body.contains("quantity=0.001"));
    assert!(body.contains("&signature="));
}

#[tokio::test]
async fn exchange_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": -2010,
            "msg": "Account has insufficient balance for requested action."
        })))
        .mount(&server)
        .await;

    let symbol = Symbol::new("BTCUSDT").unwrap();
    let err = client(&server)
        .submit_market_order(&symbol, Side::Sell, dec!(1))
        .await
        .unwrap_err();

    assert!(err.is_rejection());
    assert!(matches!(err, Error::ApiError { code: -2010, .. }));
}

#[tokio::test]
async fn balances_skip_empty_assets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "canTrade": true,
            "balances": [
                { "asset": "BTC", "free": "0.00100000", "locked": "0.00000000" },
                { "asset": "LTC", "free": "0.00000000", "locked": "0.00000000" },
                { "asset": "USDT", "free": "50.00000000", "locked": "10.00000000" }
            ]
        })))
        .mount(&server)
        .await;

    let balances = client(&server).fetch_balances().await.unwrap();
    assert_eq!(balances.len(), 2);
    assert_eq!(balances.free("BTC"), dec!(0.001));
    assert_eq!(balances.get("USDT").locked, dec!(10));
    assert_eq!(balances.free("LTC"), dec!(0));
}

#[tokio::test]
async fn open_orders_are_signed_and_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/openOrders"))
        .and(query_param("symbol", "BTCUSDT"))
        .and(header("X-MBX-APIKEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "symbol": "BTCUSDT",
            "orderId": 7,
            "clientOrderId": "abc",
            "price": "30000.00000000",
            "origQty": "0.00200000",
            "executedQty": "0.00050000",
            "status": "PARTIALLY_FILLED",
            "timeInForce": "GTC",
            "type": "LIMIT",
            "side": "BUY"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let symbol = Symbol::new("BTCUSDT").unwrap();
    let orders = client(&server).get_open_orders(Some(&symbol)).await.unwrap();

    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.order_id, 7);
    assert_eq!(order.order_type, "LIMIT");
    assert_eq!(order.orig_qty, dec!(0.002));
    assert_eq!(order.status, OrderStatus::PartiallyFilled);
}

// In crates/execution/src/live.rs

use crate::{ExecutionError, Ledger, Result, validate_request};
use api_client::OrderSink;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Action, Balances, Order, Symbol, TradeLogEntry};
use database::TradeRecorder;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A ledger that places real market orders through an `OrderSink`.
///
/// It never mutates balances itself. After each fill it asks the exchange for
/// a fresh account snapshot and keeps the last one it saw.
pub struct LiveLedger {
    sink: Arc<dyn OrderSink>,
    recorder: Arc<dyn TradeRecorder>,
    last_balances: Option<Balances>,
}

impl LiveLedger {
    pub fn new(sink: Arc<dyn OrderSink>, recorder: Arc<dyn TradeRecorder>) -> Self {
        Self {
            sink,
            recorder,
            last_balances: None,
        }
    }

    /// Pulls the current account balances into the local snapshot.
    pub async fn refresh_balances(&mut self) -> Result<Balances> {
        let balances = self.sink.fetch_balances().await?;
        self.last_balances = Some(balances.clone());
        Ok(balances)
    }
}

#[async_trait]
impl Ledger for LiveLedger {
    fn name(&self) -> &'static str {
        "LiveLedger"
    }

    fn balances(&self) -> Option<Balances> {
        self.last_balances.clone()
    }

    async fn apply(
        &mut self,
        symbol: &Symbol,
        action: Action,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<TradeLogEntry> {
        let side = validate_request(action, quantity, price)?;
        tracing::info!(%symbol, %side, %quantity, "Submitting live market order...");

        // --- Step 1: Place the Market Order ---
        let ack = self
            .sink
            .submit_market_order(symbol, side, quantity)
            .await
            .inspect_err(|e| tracing::error!(%symbol, error = %e, "Failed to place market order."))?;

        if !ack.status.is_accepted() {
            return Err(ExecutionError::OrderRejected {
                reason: format!("order {} came back {:?}", ack.id, ack.status),
            });
        }

        // --- Step 2: Fill price from the exchange, reference price otherwise ---
        let fill_price = ack
            .average_price
            .filter(|p| *p > Decimal::ZERO)
            .unwrap_or(price);

        // --- Step 3: Post-trade account snapshot ---
        let balances = match self.sink.fetch_balances().await {
            Ok(balances) => balances,
            Err(e) => {
                tracing::warn!(order_id = %ack.id, error = %e, "Could not fetch balances after fill.");
                Balances::new()
            }
        };

        let entry = TradeLogEntry {
            side,
            symbol: symbol.clone(),
            quantity,
            price: fill_price,
            balances,
            order: Some(Order {
                symbol: symbol.clone(),
                side,
                quantity,
                exchange_order_id: ack.id.clone(),
                status: ack.status,
            }),
            at: Utc::now(),
        };

        // --- Step 4: Record ---
        // The order is already on the exchange; a failed write must name it.
        if let Err(e) = self.recorder.record(&entry).await {
            tracing::error!(
                order_id = %ack.id,
                %symbol,
                error = %e,
                "Order filled but could not be recorded."
            );
            return Err(e.into());
        }

        if !entry.balances.is_empty() {
            self.last_balances = Some(entry.balances.clone());
        }
        tracing::info!(order_id = %ack.id, %symbol, %side, price = %fill_price, "Live trade recorded.");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{OrderAck, OrderStatus, Side};
    use database::Result as DbResult;
    use futures::stream::{self, BoxStream, StreamExt};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct ScriptedSink {
        ack: std::result::Result<OrderAck, fn() -> api_client::Error>,
        balances: Option<Balances>,
        orders: Mutex<Vec<(Side, Decimal)>>,
    }

    impl ScriptedSink {
        fn filled(average_price: Option<Decimal>, balances: Option<Balances>) -> Self {
            Self {
                ack: Ok(OrderAck {
                    id: "42".into(),
                    status: OrderStatus::Filled,
                    executed_quantity: Some(dec!(0.001)),
                    average_price,
                }),
                balances,
                orders: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl OrderSink for ScriptedSink {
        async fn submit_market_order(
            &self,
            _symbol: &Symbol,
            side: Side,
            quantity: Decimal,
        ) -> api_client::Result<OrderAck> {
            self.orders.lock().unwrap().push((side, quantity));
            match &self.ack {
                Ok(ack) => Ok(ack.clone()),
                Err(make) => Err(make()),
            }
        }

        async fn fetch_balances(&self) -> api_client::Result<Balances> {
            self.balances
                .clone()
                .ok_or_else(|| api_client::Error::InvalidResponse("down".into()))
        }
    }

    #[derive(Default)]
    struct MemoryRecorder(Mutex<Vec<TradeLogEntry>>);

    #[async_trait]
    impl TradeRecorder for MemoryRecorder {
        async fn record(&self, entry: &TradeLogEntry) -> DbResult<()> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn all(&self) -> BoxStream<'_, DbResult<TradeLogEntry>> {
            let entries = self.0.lock().unwrap().clone();
            stream::iter(entries.into_iter().map(Ok)).boxed()
        }
    }

    struct FullDisk;

    #[async_trait]
    impl TradeRecorder for FullDisk {
        async fn record(&self, _entry: &TradeLogEntry) -> DbResult<()> {
            Err(database::Error::Io(std::io::Error::other("disk full")))
        }

        fn all(&self) -> BoxStream<'_, DbResult<TradeLogEntry>> {
            stream::empty().boxed()
        }
    }

    fn btcusdt() -> Symbol {
        Symbol::new("BTCUSDT").unwrap()
    }

    #[tokio::test]
    async fn test_fill_price_and_snapshot_come_from_exchange() {
        let snapshot = Balances::from_free([("USDT", dec!(50)), ("BTC", dec!(0.001))]);
        let sink = Arc::new(ScriptedSink::filled(Some(dec!(50010)), Some(snapshot.clone())));
        let recorder = Arc::new(MemoryRecorder::default());
        let mut ledger = LiveLedger::new(sink.clone(), recorder.clone());

        let entry = ledger
            .apply(&btcusdt(), Action::EnterLong, dec!(0.001), dec!(50000))
            .await
            .unwrap();

        assert_eq!(entry.price, dec!(50010));
        assert_eq!(entry.balances, snapshot);
        let order = entry.order.as_ref().unwrap();
        assert_eq!(order.exchange_order_id, "42");
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(ledger.balances(), Some(snapshot));
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
        assert_eq!(*sink.orders.lock().unwrap(), vec![(Side::Buy, dec!(0.001))]);
    }

    #[tokio::test]
    async fn test_missing_fill_price_and_balances_fall_back() {
        let sink = Arc::new(ScriptedSink::filled(Some(Decimal::ZERO), None));
        let mut ledger = LiveLedger::new(sink, Arc::new(MemoryRecorder::default()));

        let entry = ledger
            .apply(&btcusdt(), Action::ExitLong, dec!(0.001), dec!(48000))
            .await
            .unwrap();

        assert_eq!(entry.price, dec!(48000));
        assert!(entry.balances.is_empty());
        assert_eq!(ledger.balances(), None);
    }

    #[tokio::test]
    async fn test_exchange_rejection_is_not_recorded() {
        let sink = Arc::new(ScriptedSink {
            ack: Err(|| api_client::Error::ApiError {
                code: -2010,
                msg: "insufficient balance".into(),
            }),
            balances: None,
            orders: Mutex::new(Vec::new()),
        });
        let recorder = Arc::new(MemoryRecorder::default());
        let mut ledger = LiveLedger::new(sink, recorder.clone());

        let err = ledger
            .apply(&btcusdt(), Action::EnterLong, dec!(1), dec!(50000))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::OrderRejected { .. }));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_and_rejected_status() {
        let sink = Arc::new(ScriptedSink {
            ack: Err(|| api_client::Error::InvalidResponse("HTTP 502".into())),
            balances: None,
            orders: Mutex::new(Vec::new()),
        });
        let mut ledger = LiveLedger::new(sink, Arc::new(MemoryRecorder::default()));
        let err = ledger
            .apply(&btcusdt(), Action::EnterLong, dec!(1), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::TransportFailure(_)));

        let mut rejected = ScriptedSink::filled(None, None);
        if let Ok(ack) = rejected.ack.as_mut() {
            ack.status = OrderStatus::Rejected;
        }
        let mut ledger = LiveLedger::new(Arc::new(rejected), Arc::new(MemoryRecorder::default()));
        let err = ledger
            .apply(&btcusdt(), Action::EnterLong, dec!(1), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::OrderRejected { .. }));
    }

    #[tokio::test]
    async fn test_filled_order_that_cannot_be_recorded_is_not_fatal() {
        let snapshot = Balances::from_free([("USDT", dec!(50)), ("BTC", dec!(0.001))]);
        let sink = Arc::new(ScriptedSink::filled(Some(dec!(50000)), Some(snapshot)));
        let mut ledger = LiveLedger::new(sink.clone(), Arc::new(FullDisk));

        let err = ledger
            .apply(&btcusdt(), Action::EnterLong, dec!(0.001), dec!(50000))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::RecordFailed(_)));
        assert!(!err.is_fatal());
        // The order did reach the exchange, but the unrecorded snapshot is not adopted.
        assert_eq!(sink.orders.lock().unwrap().len(), 1);
        assert_eq!(ledger.balances(), None);
    }
}

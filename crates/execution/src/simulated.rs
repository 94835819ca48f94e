// In crates/execution/src/simulated.rs

use crate::{ExecutionError, Ledger, Result, validate_request};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Action, Balances, Side, Symbol, TradeLogEntry};
use database::TradeRecorder;
use rust_decimal::Decimal;
use std::sync::Arc;

/// An in-memory balance book that fills every order at the reference price.
pub struct SimulatedLedger {
    balances: Balances,
    recorder: Arc<dyn TradeRecorder>,
}

impl SimulatedLedger {
    pub fn new(initial: Balances, recorder: Arc<dyn TradeRecorder>) -> Result<Self> {
        if let Some((asset, balance)) = initial.first_negative() {
            return Err(ExecutionError::InvalidRequest(format!(
                "initial balance for {asset} is negative: {balance:?}"
            )));
        }
        Ok(Self {
            balances: initial,
            recorder,
        })
    }

    /// Computes the post-trade book without touching the current one.
    fn settle(&self, symbol: &Symbol, side: Side, quantity: Decimal, price: Decimal) -> Result<Balances> {
        let notional = quantity.checked_mul(price).ok_or_else(|| {
            ExecutionError::InvariantViolation(format!("notional {quantity} x {price} overflows"))
        })?;
        // Both inputs are positive but the product can round away to nothing.
        if notional.is_zero() {
            return Err(ExecutionError::InvalidRequest(format!(
                "notional {quantity} x {price} rounds to zero"
            )));
        }
        let (base, quote) = (symbol.base_asset(), symbol.quote_asset());

        let mut next = self.balances.clone();
        match side {
            Side::Buy => {
                next.debit_free(quote, notional)?;
                next.credit_free(base, quantity)?;
            }
            Side::Sell => {
                next.debit_free(base, quantity)?;
                next.credit_free(quote, notional)?;
            }
        }

        if let Some((asset, balance)) = next.first_negative() {
            return Err(ExecutionError::InvariantViolation(format!(
                "{asset} would become negative: {balance:?}"
            )));
        }
        Ok(next)
    }
}

#[async_trait]
impl Ledger for SimulatedLedger {
    fn name(&self) -> &'static str {
        "SimulatedLedger"
    }

    fn balances(&self) -> Option<Balances> {
        Some(self.balances.clone())
    }

    async fn apply(
        &mut self,
        symbol: &Symbol,
        action: Action,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<TradeLogEntry> {
        // --- 1. Validate and compute on a copy ---
        let side = validate_request(action, quantity, price)?;
        let next = self.settle(symbol, side, quantity, price)?;

        // --- 2. Record before committing ---
        let entry = TradeLogEntry {
            side,
            symbol: symbol.clone(),
            quantity,
            price,
            balances: next.clone(),
            order: None,
            at: Utc::now(),
        };
        self.recorder.record(&entry).await?;

        // --- 3. Commit ---
        self.balances = next;
        tracing::info!(
            %symbol,
            %side,
            %quantity,
            %price,
            "Simulated trade applied."
        );
        Ok(entry)
    }
}

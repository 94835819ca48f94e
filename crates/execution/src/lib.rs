// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{Action, Balances, Side, Symbol, TradeLogEntry};
use rust_decimal::Decimal;

pub mod error;
pub mod live;
pub mod simulated;
pub mod types;

// Re-export public types
pub use error::{ExecutionError, Result};
pub use live::LiveLedger;
pub use simulated::SimulatedLedger;
pub use types::{SharedLedger, shared};

/// The balance book trades are applied to.
///
/// A `Ledger` takes an `EnterLong`/`ExitLong` action and either applies it
/// completely, returning the recorded `TradeLogEntry`, or not at all. The
/// target may be an in-memory simulation or a real exchange account.
#[async_trait]
pub trait Ledger: Send {
    /// The name of the ledger (e.g., "SimulatedLedger", "LiveLedger").
    fn name(&self) -> &'static str;

    /// The latest known balances, if this ledger tracks any.
    fn balances(&self) -> Option<Balances>;

    /// Executes one trade of `quantity` base units at reference `price`.
    ///
    /// On success exactly one entry has been durably recorded before this
    /// returns. On error nothing has changed locally.
    async fn apply(
        &mut self,
        symbol: &Symbol,
        action: Action,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<TradeLogEntry>;
}

/// Checks the arguments every ledger requires and resolves the order side.
pub(crate) fn validate_request(action: Action, quantity: Decimal, price: Decimal) -> Result<Side> {
    let side = action
        .side()
        .ok_or_else(|| ExecutionError::InvalidRequest(format!("{action:?} is not a trade")))?;
    if quantity <= Decimal::ZERO {
        return Err(ExecutionError::InvalidRequest(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    if price <= Decimal::ZERO {
        return Err(ExecutionError::InvalidRequest(format!(
            "price must be positive, got {price}"
        )));
    }
    Ok(side)
}

// In crates/execution/src/error.rs

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Insufficient {asset}: required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Order rejected: {reason}")]
    OrderRejected { reason: String },

    #[error("Could not reach the exchange: {0}")]
    TransportFailure(#[source] api_client::Error),

    #[error("Invalid trade request: {0}")]
    InvalidRequest(String),

    #[error("Failed to record trade: {0}")]
    RecordFailed(#[from] database::Error),

    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl ExecutionError {
    /// Fatal errors stop trading. Everything else skips the trade.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionError::InvariantViolation(_))
    }
}

impl From<core_types::Error> for ExecutionError {
    fn from(err: core_types::Error) -> Self {
        match err {
            core_types::Error::InsufficientBalance {
                asset,
                required,
                available,
            } => ExecutionError::InsufficientFunds {
                asset,
                required,
                available,
            },
            other => ExecutionError::InvariantViolation(other.to_string()),
        }
    }
}

impl From<api_client::Error> for ExecutionError {
    fn from(err: api_client::Error) -> Self {
        if err.is_rejection() {
            ExecutionError::OrderRejected {
                reason: err.to_string(),
            }
        } else {
            ExecutionError::TransportFailure(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

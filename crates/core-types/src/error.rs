// In crates/core-types/src/error.rs

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid trading symbol '{0}': no known quote asset suffix")]
    InvalidSymbol(String),

    #[error("Insufficient {asset}: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Arithmetic overflow on {0}")]
    Overflow(String),
}

pub type Result<T> = std::result::Result<T, Error>;

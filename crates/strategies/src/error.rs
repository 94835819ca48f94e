// In crates/strategies/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid window lengths: short={short}, long={long} (need 1 <= short < long)")]
    InvalidWindow { short: usize, long: usize },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),
}

pub type Result<T> = std::result::Result<T, Error>;

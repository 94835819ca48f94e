// In crates/engine/src/error.rs

use core_types::Symbol;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Trading halted for {symbol}: {reason}")]
    Halted { symbol: Symbol, reason: String },

    #[error("Engine configuration error: {0}")]
    Configuration(String),

    #[error("Trading task ended abnormally: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

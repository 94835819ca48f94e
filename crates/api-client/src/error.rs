// In crates/api-client/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the API client: {0}")]
    ClientBuildError(String),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("API error: code {code}, msg: {msg}")]
    ApiError { code: i64, msg: String },
    #[error("Invalid response from exchange: {0}")]
    InvalidResponse(String),
    #[error("No market data available: {0}")]
    DataUnavailable(String),
}

impl Error {
    /// True when the exchange itself refused the request, as opposed to the
    /// request never getting a readable answer.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::ApiError { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// In crates/database/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("Could not prepare the database location: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database operation failed: {0}")]
    OperationFailed(sqlx::Error),
    #[error("Failed to encode trade entry: {0}")]
    EncodeFailed(serde_json::Error),
    #[error("Stored trade entry is unreadable: {0}")]
    Corrupt(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

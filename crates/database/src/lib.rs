// In crates/database/src/lib.rs

use app_config::types::DatabaseSettings;
use async_trait::async_trait;
use chrono::Utc;
use core_types::TradeLogEntry;
use futures::stream::{BoxStream, StreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;

pub mod error;

// Re-export the most important types for easy access.
pub use error::{Error, Result};

/// Append-only, durable storage for executed trades.
#[async_trait]
pub trait TradeRecorder: Send + Sync {
    /// Persists one entry. Returns only once the write is durable.
    async fn record(&self, entry: &TradeLogEntry) -> Result<()>;

    /// Every recorded entry in write order. Each call starts a fresh read.
    fn all(&self) -> BoxStream<'_, Result<TradeLogEntry>>;
}

/// A wrapper around the `sqlx` SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Db(SqlitePool);

/// Opens (creating if needed) the trade log described by the settings and runs migrations.
pub async fn connect(settings: &DatabaseSettings) -> Result<Db> {
    Db::open(&settings.path).await
}

impl Db {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // FULL sync with WAL: a committed insert has reached the disk.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(path = %path.display(), "Trade log opened.");
        Ok(Db(pool))
    }

    /// Number of recorded trades.
    pub async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM trades")
            .fetch_one(&self.0)
            .await
            .map_err(Error::OperationFailed)?;
        let n: i64 = row.try_get("n").map_err(Error::OperationFailed)?;
        Ok(n as u64)
    }

    pub async fn close(&self) {
        self.0.close().await;
    }
}

#[async_trait]
impl TradeRecorder for Db {
    async fn record(&self, entry: &TradeLogEntry) -> Result<()> {
        let json = serde_json::to_string(entry).map_err(Error::EncodeFailed)?;

        sqlx::query("INSERT INTO trades (recorded_at, entry) VALUES (?, ?)")
            .bind(Utc::now().to_rfc3339())
            .bind(json)
            .execute(&self.0)
            .await
            .map_err(Error::OperationFailed)?;

        tracing::debug!(symbol = %entry.symbol, side = %entry.side, "Trade recorded.");
        Ok(())
    }

    fn all(&self) -> BoxStream<'_, Result<TradeLogEntry>> {
        sqlx::query("SELECT entry FROM trades ORDER BY id ASC")
            .fetch(&self.0)
            .map(|row| {
                let row = row.map_err(Error::OperationFailed)?;
                let json: String = row.try_get("entry").map_err(Error::OperationFailed)?;
                serde_json::from_str(&json).map_err(Error::Corrupt)
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{Balances, Side, Symbol};
    use futures::TryStreamExt;
    use rust_decimal_macros::dec;

    fn entry(side: Side, price: rust_decimal::Decimal) -> TradeLogEntry {
        TradeLogEntry {
            side,
            symbol: Symbol::new("BTCUSDT").unwrap(),
            quantity: dec!(0.001),
            price,
            balances: Balances::from_free([("USDT", dec!(50)), ("BTC", dec!(0.001))]),
            order: None,
            at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_all_returns_entries_in_write_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(dir.path().join("trades.db")).await.unwrap();

        let written = vec![
            entry(Side::Buy, dec!(50000)),
            entry(Side::Sell, dec!(51000.5)),
            entry(Side::Buy, dec!(49999.99)),
        ];
        for e in &written {
            db.record(e).await.unwrap();
        }

        let read: Vec<TradeLogEntry> = db.all().try_collect().await.unwrap();
        assert_eq!(read, written);
        assert_eq!(db.count().await.unwrap(), 3);

        // A second read starts over.
        let again: Vec<TradeLogEntry> = db.all().try_collect().await.unwrap();
        assert_eq!(again.len(), 3);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("trades.db");

        let db = Db::open(&path).await.unwrap();
        db.record(&entry(Side::Buy, dec!(50000))).await.unwrap();
        db.close().await;

        let reopened = Db::open(&path).await.unwrap();
        let read: Vec<TradeLogEntry> = reopened.all().try_collect().await.unwrap();
        assert_eq!(read, vec![entry(Side::Buy, dec!(50000))]);
    }

    #[tokio::test]
    async fn test_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(dir.path().join("trades.db")).await.unwrap();
        assert_eq!(db.count().await.unwrap(), 0);
        let read: Vec<TradeLogEntry> = db.all().try_collect().await.unwrap();
        assert!(read.is_empty());
    }
}

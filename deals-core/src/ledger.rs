use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::PipelineError;
use crate::offer::{Offer, Store};

/// Durable state: the subscriber set and the write-once record of offers
/// already notified. One pool lives for the whole process; the single
/// connection serializes writes, which makes the check-then-write for a
/// `(store, offer_id)` key atomic even if two watcher runs ever overlap.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub async fn connect(url: &str) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS subscribers (
                chat_id INTEGER PRIMARY KEY,
                added_at TEXT
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS offer_ledger (
                store TEXT,
                offer_id TEXT,
                title TEXT,
                PRIMARY KEY(store, offer_id)
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, PipelineError> {
        Self::connect("sqlite::memory:").await
    }

    /// Insert-if-absent; re-subscribing is a no-op.
    pub async fn add_subscriber(&self, chat_id: i64) -> Result<(), PipelineError> {
        sqlx::query("INSERT OR IGNORE INTO subscribers(chat_id, added_at) VALUES (?, ?)")
            .bind(chat_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete-if-present; unsubscribing a non-member is a no-op.
    pub async fn remove_subscriber(&self, chat_id: i64) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM subscribers WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn subscribers(&self) -> Result<Vec<i64>, PipelineError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT chat_id FROM subscribers ORDER BY chat_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(chat_id,)| chat_id).collect())
    }

    /// Record that a notification went out for this offer. Returns true only
    /// the first time a `(store, external_id)` pair is seen; the row is never
    /// updated or deleted afterwards.
    pub async fn record_offer_if_new(&self, offer: &Offer) -> Result<bool, PipelineError> {
        self.record_if_new(offer.store, &offer.external_id, &offer.title)
            .await
    }

    pub async fn record_if_new(
        &self,
        store: Store,
        offer_id: &str,
        title: &str,
    ) -> Result<bool, PipelineError> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO offer_ledger(store, offer_id, title) VALUES (?, ?, ?)")
                .bind(store.as_str())
                .bind(offer_id)
                .bind(title)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Rust guideline compliant 2026-10-18

//! SQLite adapter for the `LogSink` port.
//!
//! Appends each record as one row of the `page_view_log` table. The table only
//! accepts well-formed JSON text, so a malformed record is rejected on its own
//! and counted in `failed_put_count` while the rest of the batch lands.
//!
//! # Append-only semantics
//!
//! Rows are never updated or deduplicated: delivering the same batch twice
//! stores it twice.

use domain::{LogSink, PutBatchOutput, SinkError};

/// `LogSink` adapter backed by a SQLite table via `sqlx`.
#[derive(Debug, Clone)]
pub struct SqliteLogSink {
    pool: sqlx::SqlitePool,
}

impl SqliteLogSink {
    /// Wrap `pool` and ensure the `page_view_log` table exists.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when schema creation fails.
    pub async fn new(pool: sqlx::SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS page_view_log (
                seq    INTEGER PRIMARY KEY AUTOINCREMENT,
                record TEXT    NOT NULL CHECK (json_valid(record))
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

fn unavailable(e: &sqlx::Error) -> SinkError {
    tracing::error!(error = %e, "sqlite_log_sink.unavailable");
    SinkError::Unavailable { reason: e.to_string() }
}

impl LogSink for SqliteLogSink {
    /// Insert every record inside one transaction.
    ///
    /// Records that are not UTF-8 JSON, or whose insert fails, are skipped and
    /// counted; the remaining records are committed.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Unavailable` when the transaction cannot be opened
    /// or committed.
    async fn put_record_batch(&self, records: Vec<Vec<u8>>) -> Result<PutBatchOutput, SinkError> {
        let mut tx = self.pool.begin().await.map_err(|e| unavailable(&e))?;
        let mut failed_put_count = 0;
        for record in records {
            let Ok(text) = String::from_utf8(record) else {
                failed_put_count += 1;
                continue;
            };
            if let Err(e) = sqlx::query("INSERT INTO page_view_log (record) VALUES (?)")
                .bind(text)
                .execute(&mut *tx)
                .await
            {
                tracing::debug!(error = %e, "sqlite_log_sink.put.failed");
                failed_put_count += 1;
            }
        }
        tx.commit().await.map_err(|e| unavailable(&e))?;
        Ok(PutBatchOutput { failed_put_count })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

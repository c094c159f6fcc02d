// Rust guideline compliant 2026-10-18

//! SQLite adapter for the `TimeSeriesSink` port.
//!
//! Records live in the `time_series` table keyed by
//! `(dimensions, measure_name, time)`, where `dimensions` is the attribute set
//! rendered as a JSON object. Writes are upserts that only replace a stored
//! row when the incoming version is strictly greater; anything else is
//! dropped silently and left out of `records_ingested`.

use domain::{SinkError, TimeSeriesRecord, TimeSeriesSink, WriteRecordsOutput};
use serde_json::{Map, Value};

/// `TimeSeriesSink` adapter backed by a SQLite table via `sqlx`.
#[derive(Debug, Clone)]
pub struct SqliteTimeSeriesSink {
    pool: sqlx::SqlitePool,
}

impl SqliteTimeSeriesSink {
    /// Wrap `pool` and ensure the `time_series` table exists.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when schema creation fails.
    pub async fn new(pool: sqlx::SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS time_series (
                dimensions    TEXT    NOT NULL,
                measure_name  TEXT    NOT NULL,
                measure_value REAL    NOT NULL,
                time          INTEGER NOT NULL,
                version       INTEGER NOT NULL,
                PRIMARY KEY (dimensions, measure_name, time)
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

/// Render the attribute set as a JSON object (keys sorted, so it is canonical).
fn dimensions(record: &TimeSeriesRecord) -> String {
    let map: Map<String, Value> = record
        .attributes
        .iter()
        .map(|a| (a.name.to_owned(), Value::String(a.value.clone())))
        .collect();
    Value::Object(map).to_string()
}

impl TimeSeriesSink for SqliteTimeSeriesSink {
    /// Upsert every record inside one transaction.
    ///
    /// A record whose measure is not a number or whose version does not fit
    /// an `INTEGER` is skipped like a stale version.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Unavailable` on any `sqlx` error; the whole batch is
    /// rolled back.
    async fn write_records(
        &self,
        records: Vec<TimeSeriesRecord>,
    ) -> Result<WriteRecordsOutput, SinkError> {
        let unavailable = |e: sqlx::Error| {
            tracing::error!(error = %e, "sqlite_time_series.unavailable");
            SinkError::Unavailable { reason: e.to_string() }
        };

        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        let mut records_ingested = 0;
        for record in &records {
            let (Ok(value), Ok(version)) =
                (record.measure_value.parse::<f64>(), i64::try_from(record.version))
            else {
                tracing::debug!(time_ms = record.time_ms, "sqlite_time_series.record.skipped");
                continue;
            };
            let result = sqlx::query(
                "INSERT INTO time_series (dimensions, measure_name, measure_value, time, version)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (dimensions, measure_name, time) DO UPDATE
                 SET measure_value = excluded.measure_value, version = excluded.version
                 WHERE excluded.version > time_series.version",
            )
            .bind(dimensions(record))
            .bind(record.measure_name)
            .bind(value)
            .bind(record.time_ms)
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
            if result.rows_affected() > 0 {
                records_ingested += 1;
            }
        }
        tx.commit().await.map_err(unavailable)?;
        Ok(WriteRecordsOutput { records_ingested })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

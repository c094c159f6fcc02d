// Rust guideline compliant 2026-10-18

//! SQLite adapter for the `QueryEngine` port.
//!
//! One engine per storage layout: the benchmark pairs an engine named
//! `columnar` (reading `page_view_log`) with one named `time-series` (reading
//! `time_series`). Both may share the same pool.

use domain::{QueryEngine, QueryError, QueryOutput};

/// `QueryEngine` adapter that runs raw SQL against a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteQueryEngine {
    name: String,
    pool: sqlx::SqlitePool,
}

impl SqliteQueryEngine {
    /// Create an engine displayed as `name` in benchmark reports.
    #[must_use]
    pub fn new(name: impl Into<String>, pool: sqlx::SqlitePool) -> Self {
        Self { name: name.into(), pool }
    }
}

impl QueryEngine for SqliteQueryEngine {
    /// Run `query` and fetch every row before returning.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Unavailable` when the pool is closed, exhausted or
    /// the database file cannot be read; `QueryError::Failed` otherwise.
    async fn execute(&self, query: &str) -> Result<QueryOutput, QueryError> {
        let rows = sqlx::query(query).fetch_all(&self.pool).await.map_err(|e| match e {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                tracing::error!(engine = %self.name, error = %e, "sqlite_engine.unavailable");
                QueryError::Unavailable
            }
            other => QueryError::Failed { reason: other.to_string() },
        })?;
        Ok(QueryOutput { rows: rows.len() })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Rust guideline compliant 2026-10-18

//! Shared domain types for the page-view ingestion showdown.
//!
//! Defines the `PageView` event, its time-series projection types, and the
//! hexagonal port traits: `LogSink`, `TimeSeriesSink`, `QueryEngine`, and
//! `Progress`. All pipeline crates depend on this crate; it depends on no
//! other workspace crate.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Measure name carried by every [`TimeSeriesRecord`].
pub const TIME_ON_PAGE_MEASURE: &str = "time-on-page";

/// A single synthetic page-view event.
///
/// Serializes to JSON with absent optional fields omitted. `page_opened_at`
/// is always written with millisecond precision (`2024-01-01T00:00:00.000Z`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    /// Site the page belongs to (partition key in the columnar store).
    pub site: String,
    /// Stable visitor identifier.
    pub user_id: String,
    /// Session identifier, scoped to a user.
    pub session_id: String,
    /// Unique per event within one generation run.
    pub page_id: String,
    /// Path of the viewed page, e.g. `/3f0c...html`.
    pub page_url: String,
    /// Instant the page was opened.
    #[serde(serialize_with = "serialize_millis")]
    pub page_opened_at: DateTime<Utc>,
    /// Date-only partition key derived from `page_opened_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_opened_at_date: Option<NaiveDate>,
    /// Seconds spent on the page; always `>= 1`.
    pub time_on_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_iso: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    pub is_bot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub querystring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

fn serialize_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl PageView {
    /// Names of every field projected as a time-series attribute, in order.
    ///
    /// All fields except the two measurement fields `time_on_page` and
    /// `page_opened_at`.
    pub const ATTRIBUTE_NAMES: [&'static str; 18] = [
        "site",
        "user_id",
        "session_id",
        "page_id",
        "page_url",
        "page_opened_at_date",
        "country_iso",
        "country_name",
        "city_name",
        "device_type",
        "is_bot",
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_term",
        "utm_content",
        "querystring",
        "referrer",
    ];

    /// Pair each name of [`ATTRIBUTE_NAMES`](Self::ATTRIBUTE_NAMES) with the
    /// string form of its value; `None` when the field is absent.
    #[must_use]
    pub fn attribute_values(&self) -> [(&'static str, Option<String>); 18] {
        [
            ("site", Some(self.site.clone())),
            ("user_id", Some(self.user_id.clone())),
            ("session_id", Some(self.session_id.clone())),
            ("page_id", Some(self.page_id.clone())),
            ("page_url", Some(self.page_url.clone())),
            ("page_opened_at_date", self.page_opened_at_date.map(|d| d.to_string())),
            ("country_iso", self.country_iso.clone()),
            ("country_name", self.country_name.clone()),
            ("city_name", self.city_name.clone()),
            ("device_type", self.device_type.clone()),
            ("is_bot", Some(self.is_bot.to_string())),
            ("utm_source", self.utm_source.clone()),
            ("utm_medium", self.utm_medium.clone()),
            ("utm_campaign", self.utm_campaign.clone()),
            ("utm_term", self.utm_term.clone()),
            ("utm_content", self.utm_content.clone()),
            ("querystring", self.querystring.clone()),
            ("referrer", self.referrer.clone()),
        ]
    }
}

/// Type tag of an attribute value in the time-series sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Varchar,
}

/// Type tag of a measurement value in the time-series sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureKind {
    Double,
}

/// One named, stringified attribute of a time-series record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub value: String,
    pub kind: ValueKind,
}

/// A single measurement plus its identifying attributes.
///
/// The sink keys records on `(attributes, measure_name, time_ms)` and only
/// overwrites an existing record when `version` is strictly greater.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    /// Ordered attribute set; absent event fields are omitted.
    pub attributes: Vec<Attribute>,
    /// Always [`TIME_ON_PAGE_MEASURE`] for page views.
    pub measure_name: &'static str,
    /// Measurement value in string form.
    pub measure_value: String,
    pub measure_kind: MeasureKind,
    /// Record timestamp, epoch milliseconds.
    pub time_ms: i64,
    /// Upsert version; never 0.
    pub version: u64,
}

/// Answer of the append-only log sink to one batch put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PutBatchOutput {
    /// Number of records in the batch that were not enqueued.
    pub failed_put_count: usize,
}

/// Answer of the time-series sink to one batch write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteRecordsOutput {
    /// Records actually stored; stale versions are not counted.
    pub records_ingested: usize,
}

/// Result set summary returned by a query engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOutput {
    /// Number of materialized rows.
    pub rows: usize,
}

/// Errors that a sink implementation may return for a whole batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    /// The sink could not be reached or the call itself failed.
    #[error("sink unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
    /// The sink refused the batch as a whole.
    #[error("batch rejected: {reason}")]
    Rejected {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the `QueryEngine` port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// The engine accepted the query but could not complete it.
    #[error("query failed: {reason}")]
    Failed {
        /// Human-readable description.
        reason: String,
    },
    /// The engine could not be reached.
    #[error("query engine unavailable")]
    Unavailable,
}

/// Hexagonal port: append-only log sink (delivery-stream style).
///
/// Records are opaque bytes; each one is stored independently.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait LogSink {
    /// Append a batch of records.
    ///
    /// A partially accepted batch is reported through
    /// [`PutBatchOutput::failed_put_count`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the call as a whole fails.
    async fn put_record_batch(&self, records: Vec<Vec<u8>>) -> Result<PutBatchOutput, SinkError>;
}

/// Hexagonal port: time-series sink with upsert-by-version semantics.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait TimeSeriesSink {
    /// Write a batch of records.
    ///
    /// Records whose version is not strictly greater than the stored one for
    /// the same key are silently dropped and excluded from
    /// [`WriteRecordsOutput::records_ingested`].
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the call as a whole fails.
    async fn write_records(
        &self,
        records: Vec<TimeSeriesRecord>,
    ) -> Result<WriteRecordsOutput, SinkError>;
}

/// Hexagonal port: an opaque request/response query service.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait QueryEngine {
    /// Run `query` in the engine's own language and materialize the full result.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the query cannot be completed.
    async fn execute(&self, query: &str) -> Result<QueryOutput, QueryError>;

    /// Display name of the engine (e.g. `"columnar"`).
    fn name(&self) -> &str;
}

/// Hexagonal port: ingestion progress reporting.
pub trait Progress {
    /// Called once per chunk after both sink writes completed.
    ///
    /// `ingested` is the cumulative row count including this chunk.
    fn report(&self, ingested: u64, chunk_len: usize);
}

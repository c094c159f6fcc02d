// Rust guideline compliant 2026-10-18

//! Dual-sink writer -- pushes one chunk of page views to the append-only log
//! sink and to the time-series sink concurrently, then reconciles the
//! acknowledgement counts.
//!
//! Entry points: [`project`] (the dimension projector) and
//! [`DualSinkWriter::write_chunk`].
//!
//! Partial acceptance by either sink is reported as a [`Diagnostic`], never
//! retried; only a failed call aborts with [`WriterError`].

use domain::{
    Attribute, LogSink, MeasureKind, PageView, SinkError, TIME_ON_PAGE_MEASURE,
    TimeSeriesRecord, TimeSeriesSink, ValueKind,
};

// ---------------------------------------------------------------------------
// WriterError
// ---------------------------------------------------------------------------

/// Errors that abort a chunk write.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// An event could not be serialized for the log sink.
    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    /// The log sink call failed.
    #[error("log sink write error: {0}")]
    LogSink(#[source] SinkError),
    /// The time-series sink call failed.
    #[error("time-series sink write error: {0}")]
    TimeSeries(#[source] SinkError),
}

// ---------------------------------------------------------------------------
// Dimension projector
// ---------------------------------------------------------------------------

/// Project one page view onto a time-series record.
///
/// Every attribute of [`PageView::ATTRIBUTE_NAMES`] that is present becomes a
/// `VARCHAR` attribute; `time_on_page` becomes the `DOUBLE` measure and
/// `page_opened_at` the timestamp. The version is `time_on_page + 1` so it is
/// never 0, which the sink treats as "no record".
#[must_use]
pub fn project(view: &PageView) -> TimeSeriesRecord {
    let attributes = view
        .attribute_values()
        .into_iter()
        .filter_map(|(name, value)| {
            value.map(|value| Attribute { name, value, kind: ValueKind::Varchar })
        })
        .collect();
    TimeSeriesRecord {
        attributes,
        measure_name: TIME_ON_PAGE_MEASURE,
        measure_value: view.time_on_page.to_string(),
        measure_kind: MeasureKind::Double,
        time_ms: view.page_opened_at.timestamp_millis(),
        version: u64::from(view.time_on_page) + 1,
    }
}

// ---------------------------------------------------------------------------
// Write report
// ---------------------------------------------------------------------------

/// A divergence between a chunk and what one sink acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The log sink did not enqueue `failed` records.
    LogSinkFailedPuts { failed: usize },
    /// The time-series sink ingested a different number of records than sent.
    TimeSeriesMismatch { expected: usize, ingested: usize },
}

impl Diagnostic {
    /// Number of records the diagnostic accounts for.
    #[must_use]
    pub fn discrepancy(&self) -> usize {
        match *self {
            Self::LogSinkFailedPuts { failed } => failed,
            Self::TimeSeriesMismatch { expected, ingested } => expected.abs_diff(ingested),
        }
    }
}

/// Outcome of a chunk write that reached both sinks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteReport {
    /// Number of events in the chunk.
    pub records: usize,
    /// Partial-failure observations; empty when both sinks took everything.
    pub diagnostics: Vec<Diagnostic>,
}

impl WriteReport {
    /// Records the log sink failed to enqueue.
    #[must_use]
    pub fn failed_log_records(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::LogSinkFailedPuts { .. }))
            .map(Diagnostic::discrepancy)
            .sum()
    }

    /// Absolute gap between sent and ingested time-series records.
    #[must_use]
    pub fn time_series_discrepancy(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::TimeSeriesMismatch { .. }))
            .map(Diagnostic::discrepancy)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// DualSinkWriter
// ---------------------------------------------------------------------------

/// Writes each chunk to both sinks without a shared transaction.
///
/// Generic over both sink ports for zero-cost static dispatch.
#[derive(Debug)]
pub struct DualSinkWriter<L: LogSink, T: TimeSeriesSink> {
    log_sink: L,
    time_series_sink: T,
}

impl<L: LogSink, T: TimeSeriesSink> DualSinkWriter<L, T> {
    /// Create a writer over the two sinks.
    #[must_use]
    pub fn new(log_sink: L, time_series_sink: T) -> Self {
        Self { log_sink, time_series_sink }
    }

    /// Borrow the log sink.
    #[must_use]
    pub fn log_sink(&self) -> &L {
        &self.log_sink
    }

    /// Borrow the time-series sink.
    #[must_use]
    pub fn time_series_sink(&self) -> &T {
        &self.time_series_sink
    }

    /// Write `chunk` to both sinks concurrently and reconcile their answers.
    ///
    /// Both writes are dispatched together and this call resolves only once
    /// both have finished, whether they succeeded or not. Partial acceptance
    /// is logged at `warn` and returned in [`WriteReport::diagnostics`].
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Encode`] before any I/O if an event cannot be
    /// serialized, otherwise [`WriterError::LogSink`] or
    /// [`WriterError::TimeSeries`] when a sink call fails. When both fail the
    /// log-sink error is returned and the other one is logged.
    pub async fn write_chunk(&self, chunk: &[PageView]) -> Result<WriteReport, WriterError> {
        let records = chunk
            .iter()
            .map(serde_json::to_vec)
            .collect::<Result<Vec<_>, _>>()?;
        let ts_records: Vec<TimeSeriesRecord> = chunk.iter().map(project).collect();

        tracing::debug!(records = chunk.len(), "writer.chunk.dispatch");
        let (log_result, ts_result) = tokio::join!(
            self.log_sink.put_record_batch(records),
            self.time_series_sink.write_records(ts_records)
        );

        let (put, written) = match (log_result, ts_result) {
            (Ok(put), Ok(written)) => (put, written),
            (Err(log_err), Err(ts_err)) => {
                tracing::error!(error = %ts_err, "writer.time_series.failed");
                return Err(WriterError::LogSink(log_err));
            }
            (Err(e), Ok(_)) => return Err(WriterError::LogSink(e)),
            (Ok(_), Err(e)) => return Err(WriterError::TimeSeries(e)),
        };

        let mut diagnostics = Vec::new();
        if put.failed_put_count > 0 {
            tracing::warn!(failed = put.failed_put_count, "writer.log_sink.failed_puts");
            diagnostics.push(Diagnostic::LogSinkFailedPuts { failed: put.failed_put_count });
        }
        if written.records_ingested != chunk.len() {
            let diagnostic = Diagnostic::TimeSeriesMismatch {
                expected: chunk.len(),
                ingested: written.records_ingested,
            };
            tracing::warn!(
                expected = chunk.len(),
                ingested = written.records_ingested,
                discrepancy = diagnostic.discrepancy(),
                "writer.time_series.mismatch"
            );
            diagnostics.push(diagnostic);
        }

        Ok(WriteReport { records: chunk.len(), diagnostics })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DualSinkWriter, WriterError, project};
    use chrono::{TimeZone as _, Utc};
    use domain::{
        LogSink, MeasureKind, PageView, PutBatchOutput, SinkError, TimeSeriesRecord,
        TimeSeriesSink, ValueKind, WriteRecordsOutput,
    };
    use generator::{Generator, GeneratorConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    fn make_chunk(n: u64) -> Vec<PageView> {
        let config = GeneratorConfig::builder(n)
            .chunk_size(usize::try_from(n.max(1)).unwrap())
            .start_at(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
            .seed(21)
            .build()
            .unwrap();
        Generator::new(config).next().unwrap_or_default()
    }

    type Trace = Rc<RefCell<Vec<&'static str>>>;

    /// Log sink mock: records batches, reports `failed` failures, or errors.
    struct MockLogSink {
        batches: RefCell<Vec<Vec<Vec<u8>>>>,
        failed: usize,
        error: Option<SinkError>,
        trace: Trace,
    }

    impl MockLogSink {
        fn new(trace: &Trace) -> Self {
            Self { batches: RefCell::new(vec![]), failed: 0, error: None, trace: Rc::clone(trace) }
        }
    }

    impl LogSink for MockLogSink {
        async fn put_record_batch(
            &self,
            records: Vec<Vec<u8>>,
        ) -> Result<PutBatchOutput, SinkError> {
            self.trace.borrow_mut().push("log:start");
            tokio::task::yield_now().await;
            self.trace.borrow_mut().push("log:end");
            if let Some(ref e) = self.error {
                return Err(e.clone());
            }
            self.batches.borrow_mut().push(records);
            Ok(PutBatchOutput { failed_put_count: self.failed })
        }
    }

    /// Time-series sink mock: ingests all but `shortfall` records, or errors.
    struct MockTimeSeriesSink {
        records: RefCell<Vec<TimeSeriesRecord>>,
        shortfall: usize,
        error: Option<SinkError>,
        trace: Trace,
    }

    impl MockTimeSeriesSink {
        fn new(trace: &Trace) -> Self {
            Self { records: RefCell::new(vec![]), shortfall: 0, error: None, trace: Rc::clone(trace) }
        }
    }

    impl TimeSeriesSink for MockTimeSeriesSink {
        async fn write_records(
            &self,
            records: Vec<TimeSeriesRecord>,
        ) -> Result<WriteRecordsOutput, SinkError> {
            self.trace.borrow_mut().push("ts:start");
            tokio::task::yield_now().await;
            self.trace.borrow_mut().push("ts:end");
            if let Some(ref e) = self.error {
                return Err(e.clone());
            }
            let ingested = records.len() - self.shortfall;
            self.records.borrow_mut().extend(records);
            Ok(WriteRecordsOutput { records_ingested: ingested })
        }
    }

    fn unavailable() -> SinkError {
        SinkError::Unavailable { reason: "down".to_owned() }
    }

    // ------------------------------------------------------------------
    // Projector
    // ------------------------------------------------------------------

    #[test]
    fn project_measure_and_version() {
        for view in make_chunk(200) {
            let record = project(&view);
            assert_eq!(record.measure_name, "time-on-page");
            assert_eq!(record.measure_kind, MeasureKind::Double);
            assert_eq!(record.measure_value, view.time_on_page.to_string());
            assert_eq!(record.version, u64::from(view.time_on_page) + 1);
            assert_eq!(record.time_ms, view.page_opened_at.timestamp_millis());
        }
    }

    #[test]
    fn project_attributes_skip_measure_fields_and_absent_values() {
        let mut view = make_chunk(1).remove(0);
        view.referrer = None;
        view.utm_term = Some("shoes".to_owned());
        let record = project(&view);
        let names: Vec<&str> = record.attributes.iter().map(|a| a.name).collect();
        assert!(!names.contains(&"time_on_page"));
        assert!(!names.contains(&"page_opened_at"));
        assert!(!names.contains(&"referrer"));
        assert!(names.contains(&"utm_term"));
        assert!(record.attributes.iter().all(|a| a.kind == ValueKind::Varchar));
        let is_bot = record.attributes.iter().find(|a| a.name == "is_bot").unwrap();
        assert_eq!(is_bot.value, "false");
        // Declared order is preserved.
        let expected: Vec<&str> = domain::PageView::ATTRIBUTE_NAMES
            .iter()
            .copied()
            .filter(|n| names.contains(n))
            .collect();
        assert_eq!(names, expected);
    }

    // ------------------------------------------------------------------
    // Writer
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn clean_write_reaches_both_sinks() {
        let trace = Trace::default();
        let writer = DualSinkWriter::new(MockLogSink::new(&trace), MockTimeSeriesSink::new(&trace));
        let chunk = make_chunk(100);

        let report = writer.write_chunk(&chunk).await.unwrap();

        assert_eq!(report.records, 100);
        assert!(report.diagnostics.is_empty());
        let batches = writer.log_sink().batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 100);
        // One independent JSON record per event, in chunk order.
        for (bytes, view) in batches[0].iter().zip(&chunk) {
            let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
            assert_eq!(json["page_id"], view.page_id.as_str());
        }
        let records = writer.time_series_sink().records.borrow();
        let times: Vec<i64> = records.iter().map(|r| r.time_ms).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn both_writes_are_in_flight_together() {
        let trace = Trace::default();
        let writer = DualSinkWriter::new(MockLogSink::new(&trace), MockTimeSeriesSink::new(&trace));
        writer.write_chunk(&make_chunk(3)).await.unwrap();
        let trace = trace.borrow();
        // Both sinks started before either finished.
        assert_eq!(trace[..2], ["log:start", "ts:start"]);
        assert_eq!(trace.len(), 4);
    }

    #[tokio::test]
    async fn log_sink_partial_failure_is_a_diagnostic() {
        let trace = Trace::default();
        let mut log_sink = MockLogSink::new(&trace);
        log_sink.failed = 3;
        let writer = DualSinkWriter::new(log_sink, MockTimeSeriesSink::new(&trace));

        let report = writer.write_chunk(&make_chunk(100)).await.unwrap();

        assert_eq!(report.diagnostics, vec![Diagnostic::LogSinkFailedPuts { failed: 3 }]);
        assert_eq!(report.failed_log_records(), 3);
        assert_eq!(report.time_series_discrepancy(), 0);
    }

    #[tokio::test]
    async fn time_series_shortfall_is_a_diagnostic() {
        let trace = Trace::default();
        let mut ts_sink = MockTimeSeriesSink::new(&trace);
        ts_sink.shortfall = 3;
        let writer = DualSinkWriter::new(MockLogSink::new(&trace), ts_sink);

        let report = writer.write_chunk(&make_chunk(100)).await.unwrap();

        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::TimeSeriesMismatch { expected: 100, ingested: 97 }]
        );
        assert_eq!(report.diagnostics[0].discrepancy(), 3);
        assert_eq!(report.time_series_discrepancy(), 3);
    }

    #[tokio::test]
    async fn time_series_failure_still_waits_for_log_sink() {
        let trace = Trace::default();
        let mut ts_sink = MockTimeSeriesSink::new(&trace);
        ts_sink.error = Some(unavailable());
        let writer = DualSinkWriter::new(MockLogSink::new(&trace), ts_sink);

        let result = writer.write_chunk(&make_chunk(10)).await;

        assert!(matches!(result, Err(WriterError::TimeSeries(SinkError::Unavailable { .. }))));
        assert_eq!(writer.log_sink().batches.borrow().len(), 1);
        assert!(trace.borrow().contains(&"log:end"));
    }

    #[tokio::test]
    async fn double_failure_reports_log_sink_error() {
        let trace = Trace::default();
        let mut log_sink = MockLogSink::new(&trace);
        log_sink.error = Some(SinkError::Rejected { reason: "quota".to_owned() });
        let mut ts_sink = MockTimeSeriesSink::new(&trace);
        ts_sink.error = Some(unavailable());
        let writer = DualSinkWriter::new(log_sink, ts_sink);

        let result = writer.write_chunk(&make_chunk(10)).await;

        assert!(matches!(result, Err(WriterError::LogSink(SinkError::Rejected { .. }))));
        assert_eq!(trace.borrow().len(), 4);
    }

    #[tokio::test]
    async fn sink_error_is_the_source() {
        let trace = Trace::default();
        let mut ts_sink = MockTimeSeriesSink::new(&trace);
        ts_sink.error = Some(unavailable());
        let writer = DualSinkWriter::new(MockLogSink::new(&trace), ts_sink);

        let err = writer.write_chunk(&make_chunk(3)).await.unwrap_err();

        let source = std::error::Error::source(&err).expect("sink error should be chained");
        assert_eq!(source.downcast_ref::<SinkError>(), Some(&unavailable()));
    }

    #[tokio::test]
    async fn empty_chunk_is_clean() {
        let trace = Trace::default();
        let writer = DualSinkWriter::new(MockLogSink::new(&trace), MockTimeSeriesSink::new(&trace));
        let report = writer.write_chunk(&[]).await.unwrap();
        assert_eq!(report.records, 0);
        assert!(report.diagnostics.is_empty());
    }
}

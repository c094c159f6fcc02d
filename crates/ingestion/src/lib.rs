// Rust guideline compliant 2026-10-18

//! Ingestion loop -- drains a chunk sequence through the dual-sink writer and
//! reports cumulative progress.
//!
//! Entry point: [`Ingestion::run`]. Configuration via [`IngestionConfig::builder`].

use domain::{LogSink, PageView, Progress, TimeSeriesSink};
use std::time::Duration;
use writer::{DualSinkWriter, WriterError};

// ---------------------------------------------------------------------------
// IngestionError
// ---------------------------------------------------------------------------

/// Errors that can occur during ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// The supplied configuration is invalid.
    #[error("invalid ingestion configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// Writing a chunk failed; the rest of the run was abandoned.
    #[error("chunk {chunk} write failed: {source}")]
    Write {
        /// Zero-based index of the failed chunk.
        chunk: u64,
        /// The underlying writer error.
        #[source]
        source: WriterError,
    },
}

// ---------------------------------------------------------------------------
// IngestionConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for an [`Ingestion`] run.
///
/// Construct via [`IngestionConfig::builder`].
#[derive(Debug)]
pub struct IngestionConfig {
    /// Delay before each chunk after the first.
    pub pause: Duration,
    /// Optional upper bound on the number of chunks written. `None` drains the
    /// whole sequence.
    pub max_chunks: Option<u64>,
}

/// Builder for [`IngestionConfig`].
///
/// Obtain via [`IngestionConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct IngestionConfigBuilder {
    pause: Duration,
    max_chunks: Option<u64>,
}

impl IngestionConfig {
    /// Create a builder.
    ///
    /// Default values: `pause = 0`, `max_chunks = None`.
    #[must_use]
    pub fn builder() -> IngestionConfigBuilder {
        IngestionConfigBuilder { pause: Duration::ZERO, max_chunks: None }
    }
}

impl IngestionConfigBuilder {
    /// Wait this long between chunks, e.g. to stay under a sink's write quota.
    #[must_use]
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Stop after `n` chunks even if the sequence has more.
    #[must_use]
    pub fn max_chunks(mut self, n: u64) -> Self {
        self.max_chunks = Some(n);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::InvalidConfig`] when `max_chunks` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<IngestionConfig, IngestionError> {
        if self.max_chunks == Some(0) {
            return Err(IngestionError::InvalidConfig {
                reason: "max_chunks must be >= 1".to_owned(),
            });
        }
        Ok(IngestionConfig { pause: self.pause, max_chunks: self.max_chunks })
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Totals of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestionSummary {
    /// Chunks written to both sinks.
    pub chunks: u64,
    /// Events written to both sinks.
    pub rows: u64,
    /// Events the log sink reported as not enqueued.
    pub failed_log_records: u64,
    /// Summed gap between sent and ingested time-series records.
    pub time_series_discrepancy: u64,
}

/// Pulls chunks one at a time and writes each through a [`DualSinkWriter`].
#[derive(Debug)]
pub struct Ingestion {
    config: IngestionConfig,
}

impl Ingestion {
    /// Create a new ingestion loop from `config`.
    #[must_use]
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    /// Drain `chunks` into `writer`, in order, one chunk in flight at a time.
    ///
    /// After each chunk is acknowledged by both sinks, `progress` receives the
    /// cumulative row count. Partial sink failures are summed into the
    /// returned summary and do not stop the run.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::Write`] on the first chunk whose write fails;
    /// no later chunk is pulled or written.
    pub async fn run<I, L, T, P>(
        &self,
        chunks: I,
        writer: &DualSinkWriter<L, T>,
        progress: &P,
    ) -> Result<IngestionSummary, IngestionError>
    where
        I: IntoIterator<Item = Vec<PageView>>,
        L: LogSink,
        T: TimeSeriesSink,
        P: Progress,
    {
        let mut summary = IngestionSummary::default();
        for chunk in chunks {
            if summary.chunks > 0 && !self.config.pause.is_zero() {
                tokio::time::sleep(self.config.pause).await;
            }

            let report = writer
                .write_chunk(&chunk)
                .await
                .map_err(|source| IngestionError::Write { chunk: summary.chunks, source })?;

            summary.chunks += 1;
            summary.rows += chunk.len() as u64;
            summary.failed_log_records += report.failed_log_records() as u64;
            summary.time_series_discrepancy += report.time_series_discrepancy() as u64;
            progress.report(summary.rows, chunk.len());

            if let Some(max) = self.config.max_chunks
                && summary.chunks >= max
            {
                tracing::info!(chunks = summary.chunks, "ingestion.run.stopped: chunk limit reached");
                break;
            }
        }

        tracing::info!(
            chunks = summary.chunks,
            rows = summary.rows,
            failed_log_records = summary.failed_log_records,
            time_series_discrepancy = summary.time_series_discrepancy,
            "ingestion.run.completed"
        );
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{Ingestion, IngestionConfig, IngestionError, IngestionSummary};
    use domain::{
        LogSink, Progress, PutBatchOutput, SinkError, TimeSeriesRecord, TimeSeriesSink,
        WriteRecordsOutput,
    };
    use generator::{Generator, GeneratorConfig};
    use std::cell::{Cell, RefCell};
    use std::time::Duration;
    use writer::{DualSinkWriter, WriterError};

    // ------------------------------------------------------------------
    // Mock adapters
    // ------------------------------------------------------------------

    /// Log sink that counts records and fails the call numbered `fail_on`.
    struct MockLogSink {
        calls: Cell<u64>,
        records: Cell<usize>,
        failed_per_batch: usize,
        fail_on: Option<u64>,
    }

    impl MockLogSink {
        fn new() -> Self {
            Self { calls: Cell::new(0), records: Cell::new(0), failed_per_batch: 0, fail_on: None }
        }
    }

    impl LogSink for MockLogSink {
        async fn put_record_batch(
            &self,
            records: Vec<Vec<u8>>,
        ) -> Result<PutBatchOutput, SinkError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if self.fail_on == Some(call) {
                return Err(SinkError::Unavailable { reason: "stream deleted".to_owned() });
            }
            self.records.set(self.records.get() + records.len());
            Ok(PutBatchOutput { failed_put_count: self.failed_per_batch })
        }
    }

    /// Time-series sink that ingests everything.
    struct MockTimeSeriesSink {
        records: Cell<usize>,
    }

    impl TimeSeriesSink for MockTimeSeriesSink {
        async fn write_records(
            &self,
            records: Vec<TimeSeriesRecord>,
        ) -> Result<WriteRecordsOutput, SinkError> {
            self.records.set(self.records.get() + records.len());
            Ok(WriteRecordsOutput { records_ingested: records.len() })
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        reports: RefCell<Vec<(u64, usize)>>,
    }

    impl Progress for RecordingProgress {
        fn report(&self, ingested: u64, chunk_len: usize) {
            self.reports.borrow_mut().push((ingested, chunk_len));
        }
    }

    fn make_writer(log_sink: MockLogSink) -> DualSinkWriter<MockLogSink, MockTimeSeriesSink> {
        DualSinkWriter::new(log_sink, MockTimeSeriesSink { records: Cell::new(0) })
    }

    fn generator(max_rows: u64) -> Generator {
        Generator::new(GeneratorConfig::builder(max_rows).seed(5).build().unwrap())
    }

    fn ingestion() -> Ingestion {
        Ingestion::new(IngestionConfig::builder().build().unwrap())
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    #[test]
    fn config_defaults() {
        let cfg = IngestionConfig::builder().build().unwrap();
        assert_eq!(cfg.pause, Duration::ZERO);
        assert!(cfg.max_chunks.is_none());
    }

    #[test]
    fn config_rejects_zero_max_chunks() {
        let cfg = IngestionConfig::builder().max_chunks(0).build();
        assert!(matches!(cfg, Err(IngestionError::InvalidConfig { .. })));
    }

    // ------------------------------------------------------------------
    // Run loop
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn ingests_250_rows_in_three_chunks() {
        let writer = make_writer(MockLogSink::new());
        let progress = RecordingProgress::default();

        let summary = ingestion().run(generator(250), &writer, &progress).await.unwrap();

        assert_eq!(*progress.reports.borrow(), vec![(100, 100), (200, 100), (250, 50)]);
        assert_eq!(
            summary,
            IngestionSummary { chunks: 3, rows: 250, failed_log_records: 0, time_series_discrepancy: 0 }
        );
        assert_eq!(writer.log_sink().records.get(), 250);
        assert_eq!(writer.time_series_sink().records.get(), 250);
    }

    #[tokio::test]
    async fn partial_failures_accumulate_without_stopping() {
        let mut log_sink = MockLogSink::new();
        log_sink.failed_per_batch = 2;
        let writer = make_writer(log_sink);
        let progress = RecordingProgress::default();

        let summary = ingestion().run(generator(300), &writer, &progress).await.unwrap();

        assert_eq!(summary.rows, 300);
        assert_eq!(summary.failed_log_records, 6);
        assert_eq!(progress.reports.borrow().len(), 3);
    }

    #[tokio::test]
    async fn hard_sink_failure_aborts_the_run() {
        let mut log_sink = MockLogSink::new();
        log_sink.fail_on = Some(1);
        let writer = make_writer(log_sink);
        let progress = RecordingProgress::default();

        let result = ingestion().run(generator(500), &writer, &progress).await;

        assert!(
            matches!(
                result,
                Err(IngestionError::Write { chunk: 1, source: WriterError::LogSink(_) })
            ),
            "expected Write at chunk 1, got {result:?}"
        );
        assert_eq!(*progress.reports.borrow(), vec![(100, 100)]);
        // The chain reaches the sink's own error.
        let err = result.unwrap_err();
        let writer_err = std::error::Error::source(&err).expect("writer error");
        assert!(std::error::Error::source(writer_err).is_some_and(|e| e.is::<SinkError>()));
        // No chunk after the failed one reached the sinks.
        assert_eq!(writer.log_sink().calls.get(), 2);
        assert_eq!(writer.time_series_sink().records.get(), 200);
    }

    #[tokio::test]
    async fn max_chunks_stops_early() {
        let writer = make_writer(MockLogSink::new());
        let progress = RecordingProgress::default();
        let ingestion = Ingestion::new(IngestionConfig::builder().max_chunks(2).build().unwrap());

        let summary = ingestion.run(generator(1_000), &writer, &progress).await.unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.rows, 200);
    }

    #[tokio::test]
    async fn empty_sequence_reports_nothing() {
        let writer = make_writer(MockLogSink::new());
        let progress = RecordingProgress::default();

        let summary = ingestion().run(generator(0), &writer, &progress).await.unwrap();

        assert_eq!(summary, IngestionSummary::default());
        assert!(progress.reports.borrow().is_empty());
        assert_eq!(writer.log_sink().calls.get(), 0);
    }
}

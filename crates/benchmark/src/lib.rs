// Rust guideline compliant 2026-10-18

//! Query benchmark harness -- runs matched query pairs against a columnar and
//! a time-series engine and summarizes their latencies.
//!
//! Entry points: [`Benchmark::run`], [`Benchmark::run_case`],
//! [`Metrics::from_latencies`]. Configuration via [`BenchmarkConfig::builder`].
//!
//! # Measurement scope
//!
//! One latency is the wall-clock time from dispatching a query to holding its
//! fully materialized result. The two engines are never queried at the same
//! time, so neither measurement includes time spent waiting on the other.
//! All latencies are whole milliseconds.

use domain::{QueryEngine, QueryError};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// BenchmarkError
// ---------------------------------------------------------------------------

/// Errors that can occur while benchmarking.
#[derive(Debug, thiserror::Error)]
pub enum BenchmarkError {
    /// The supplied configuration is invalid.
    #[error("invalid benchmark configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A query failed; the test case and the remaining ones were abandoned.
    #[error("test case '{case}' failed on {engine}: {source}")]
    Query {
        /// Name of the test case being run.
        case: String,
        /// Name of the engine that failed.
        engine: String,
        /// The underlying query error.
        #[source]
        source: QueryError,
    },
}

// ---------------------------------------------------------------------------
// BenchmarkConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`Benchmark`].
///
/// Construct via [`BenchmarkConfig::builder`].
#[derive(Debug)]
pub struct BenchmarkConfig {
    /// Sequential runs per test case and engine.
    pub runs: u32,
}

/// Builder for [`BenchmarkConfig`].
///
/// Obtain via [`BenchmarkConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct BenchmarkConfigBuilder {
    runs: u32,
}

impl BenchmarkConfig {
    /// Create a builder.
    ///
    /// Default values: `runs = 10`.
    #[must_use]
    pub fn builder() -> BenchmarkConfigBuilder {
        BenchmarkConfigBuilder { runs: 10 }
    }
}

impl BenchmarkConfigBuilder {
    /// Override the number of runs per test case.
    #[must_use]
    pub fn runs(mut self, runs: u32) -> Self {
        self.runs = runs;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BenchmarkError::InvalidConfig`] when `runs` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<BenchmarkConfig, BenchmarkError> {
        if self.runs == 0 {
            return Err(BenchmarkError::InvalidConfig { reason: "runs must be >= 1".to_owned() });
        }
        Ok(BenchmarkConfig { runs: self.runs })
    }
}

// ---------------------------------------------------------------------------
// Test cases and metrics
// ---------------------------------------------------------------------------

/// One query, expressed once per engine with equivalent semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    /// Query in the columnar engine's language.
    pub columnar_query: String,
    /// Query in the time-series engine's language.
    pub time_series_query: String,
}

/// Latency statistics of one engine over one test case, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub min: u64,
    pub max: u64,
    /// Arithmetic mean, rounded to the nearest millisecond.
    pub avg: u64,
    /// Population standard deviation, rounded to the nearest millisecond.
    pub std_dev: u64,
    /// Every individual latency, in run order.
    pub requests: Vec<u64>,
}

impl Metrics {
    /// Summarize `latencies`; `None` when there is nothing to summarize.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "millisecond latencies are far below 2^52; rounded means are non-negative"
    )]
    pub fn from_latencies(latencies: &[u64]) -> Option<Self> {
        let min = *latencies.iter().min()?;
        let max = *latencies.iter().max()?;
        let n = latencies.len() as f64;
        let mean = latencies.iter().map(|&x| x as f64).sum::<f64>() / n;
        let variance = latencies
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        Some(Self {
            min,
            max,
            avg: mean.round() as u64,
            std_dev: variance.sqrt().round() as u64,
            requests: latencies.to_vec(),
        })
    }
}

/// Side-by-side metrics of one completed test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub name: String,
    pub columnar: Metrics,
    pub time_series: Metrics,
}

/// Latencies collected while a test case is running.
#[derive(Debug)]
struct CaseRun<'a> {
    case: &'a TestCase,
    columnar: Vec<u64>,
    time_series: Vec<u64>,
}

impl CaseRun<'_> {
    fn summarize(self) -> Option<CaseReport> {
        Some(CaseReport {
            name: self.case.name.clone(),
            columnar: Metrics::from_latencies(&self.columnar)?,
            time_series: Metrics::from_latencies(&self.time_series)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Benchmark
// ---------------------------------------------------------------------------

/// Runs test cases sequentially against two query engines.
#[derive(Debug)]
pub struct Benchmark {
    config: BenchmarkConfig,
}

impl Benchmark {
    /// Create a new harness from `config`.
    #[must_use]
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Run every case in order; stop at the first failing query.
    ///
    /// # Errors
    ///
    /// Returns [`BenchmarkError::Query`] from the first failing case. Metrics
    /// of earlier cases are discarded with it.
    pub async fn run<C: QueryEngine, T: QueryEngine>(
        &self,
        cases: &[TestCase],
        columnar: &C,
        time_series: &T,
    ) -> Result<Vec<CaseReport>, BenchmarkError> {
        let mut reports = Vec::with_capacity(cases.len());
        for case in cases {
            reports.push(self.run_case(case, columnar, time_series).await?);
        }
        Ok(reports)
    }

    /// Run one case `config.runs` times against both engines.
    ///
    /// Run `i + 1` starts only after run `i` completed on both engines; within
    /// a run the columnar query goes first.
    ///
    /// # Errors
    ///
    /// Returns [`BenchmarkError::Query`] if any query fails; no metrics are
    /// produced for the case.
    pub async fn run_case<C: QueryEngine, T: QueryEngine>(
        &self,
        case: &TestCase,
        columnar: &C,
        time_series: &T,
    ) -> Result<CaseReport, BenchmarkError> {
        tracing::info!(case = %case.name, runs = self.config.runs, "benchmark.case.started");
        let runs = self.config.runs as usize;
        let mut run = CaseRun {
            case,
            columnar: Vec::with_capacity(runs),
            time_series: Vec::with_capacity(runs),
        };

        for i in 0..self.config.runs {
            let c = timed(case, columnar, &case.columnar_query).await?;
            let t = timed(case, time_series, &case.time_series_query).await?;
            tracing::debug!(case = %case.name, run = i, columnar_ms = c, time_series_ms = t, "benchmark.run");
            run.columnar.push(c);
            run.time_series.push(t);
        }

        run.summarize().ok_or_else(|| BenchmarkError::InvalidConfig {
            reason: "runs must be >= 1".to_owned(),
        })
    }
}

/// Execute `query` on `engine` and return its latency in milliseconds.
async fn timed<E: QueryEngine>(
    case: &TestCase,
    engine: &E,
    query: &str,
) -> Result<u64, BenchmarkError> {
    let start = Instant::now();
    let output = engine.execute(query).await.map_err(|source| BenchmarkError::Query {
        case: case.name.clone(),
        engine: engine.name().to_owned(),
        source,
    })?;
    let elapsed = start.elapsed();
    tracing::trace!(engine = engine.name(), rows = output.rows, "benchmark.query.done");
    Ok(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// Rust guideline compliant 2026-10-18

//! Showdown entry point -- ingest synthetic page views into two storage
//! layouts, then race matched queries against both.
//!
//! Every generated chunk is written concurrently to an append-only JSON log
//! (`page_view_log`, read by the `columnar` engine) and to a versioned
//! time-series table (`time_series`, read by the `time-series` engine). Both
//! live in `showdown.db` in the current working directory. Once ingestion
//! completes, each test case runs `RUNS` times per engine and one latency
//! table per case is printed to stdout.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info cargo run --release --bin showdown
//!
//! # Also show per-run latencies
//! RUST_LOG=debug cargo run --release --bin showdown
//! ```
//!
//! Press CTRL+C to abandon the run: no report is printed and the process
//! exits with an error. Rows already committed stay in the file.

mod adapters;
mod queries;

use adapters::log_progress::LogProgress;
use adapters::sqlite_engine::SqliteQueryEngine;
use adapters::sqlite_log_sink::SqliteLogSink;
use adapters::sqlite_time_series::SqliteTimeSeriesSink;
use anyhow::Context as _;
use benchmark::{Benchmark, BenchmarkConfig, CaseReport};
use generator::{Generator, GeneratorConfig};
use ingestion::{Ingestion, IngestionConfig};
use queries::QueryWindow;
use tracing::Instrument as _;
use writer::DualSinkWriter;

/// Database file created in the current working directory on first run.
const DB_URL: &str = "sqlite:showdown.db";

/// Value of the `site` attribute on every generated event.
const SITE: &str = "showdown";

/// Events generated per invocation.
const MAX_ROWS: u64 = 100_000;

/// Events per chunk, i.e. per dual-sink write.
const CHUNK_SIZE: usize = 100;

/// Width of the trailing query window.
const HOURS_BEHIND: u32 = 3;

/// Sequential runs per test case and engine.
const RUNS: u32 = 10;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = DB_URL
        .parse::<sqlx::sqlite::SqliteConnectOptions>()
        .context("invalid database URL")?
        .create_if_missing(true);
    // SQLite admits one writer at a time; a single connection makes the two
    // concurrent sink writes queue on the pool instead of failing busy.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .context("failed to open SQLite database")?;

    let writer = DualSinkWriter::new(
        SqliteLogSink::new(pool.clone()).await.context("failed to create log table")?,
        SqliteTimeSeriesSink::new(pool.clone())
            .await
            .context("failed to create time-series table")?,
    );
    let columnar = SqliteQueryEngine::new("columnar", pool.clone());
    let time_series = SqliteQueryEngine::new("time-series", pool.clone());

    // Events are 1 ms apart; start far enough back that the last one is not
    // in the future.
    let generator_config = GeneratorConfig::builder(MAX_ROWS)
        .chunk_size(CHUNK_SIZE)
        .site(SITE)
        .seconds_in_past(MAX_ROWS / 1_000 + 1)
        .build()
        .context("failed to build generator config")?;
    let ingestion = Ingestion::new(
        IngestionConfig::builder().build().context("failed to build ingestion config")?,
    );
    let benchmark = Benchmark::new(
        BenchmarkConfig::builder().runs(RUNS).build().context("failed to build benchmark config")?,
    );
    let progress = LogProgress::new(MAX_ROWS);

    let pipeline = async {
        let summary = ingestion
            .run(Generator::new(generator_config), &writer, &progress)
            .instrument(tracing::info_span!("ingestion"))
            .await
            .context("ingestion failed")?;
        if summary.failed_log_records > 0 || summary.time_series_discrepancy > 0 {
            tracing::warn!(
                failed_log_records = summary.failed_log_records,
                time_series_discrepancy = summary.time_series_discrepancy,
                "main.ingestion: sinks diverged"
            );
        }

        let window = QueryWindow::trailing_hours(chrono::Utc::now(), HOURS_BEHIND);
        let cases = queries::showdown_cases(SITE, &window);
        benchmark
            .run(&cases, &columnar, &time_series)
            .instrument(tracing::info_span!("benchmark"))
            .await
            .context("benchmark failed")
    };

    let outcome = until_interrupted(pipeline, tokio::signal::ctrl_c()).await;
    pool.close().await;
    let reports = outcome?;

    println!("showdown: ROWS={MAX_ROWS}  RUNS={RUNS}  WINDOW={HOURS_BEHIND}h  (milliseconds)");
    for report in &reports {
        print_report(report);
    }
    Ok(())
}

/// Race `pipeline` against `interrupt`.
///
/// # Errors
///
/// Returns the pipeline's own error, or an error when `interrupt` fires first
/// (including a failure to listen for it), so an abandoned run never exits 0.
async fn until_interrupted<T>(
    pipeline: impl Future<Output = anyhow::Result<T>>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> anyhow::Result<T> {
    tokio::select! {
        signal = interrupt => {
            signal.context("failed to listen for ctrl_c")?;
            tracing::info!("main.shutdown: ctrl_c received, abandoning run");
            anyhow::bail!("run interrupted before the benchmark completed")
        }
        result = pipeline => result,
    }
}

/// Print one test case as a side-by-side latency table.
fn print_report(report: &CaseReport) {
    let (c, t) = (&report.columnar, &report.time_series);
    println!();
    println!("{}", report.name);
    println!("{:>8} | {:>10} | {:>11}", "", "columnar", "time-series");
    println!("{:-<9}+{:-<12}+{:-<12}", "", "", "");
    println!("{:>8} | {:>10} | {:>11}", "min", c.min, t.min);
    println!("{:>8} | {:>10} | {:>11}", "max", c.max, t.max);
    println!("{:>8} | {:>10} | {:>11}", "avg", c.avg, t.avg);
    println!("{:>8} | {:>10} | {:>11}", "std_dev", c.std_dev, t.std_dev);
    println!("columnar requests:    {}", join(&c.requests));
    println!("time-series requests: {}", join(&t.requests));
}

fn join(latencies: &[u64]) -> String {
    latencies.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
}

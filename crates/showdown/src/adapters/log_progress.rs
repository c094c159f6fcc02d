// Rust guideline compliant 2026-10-18

//! Logging adapter for the `Progress` port.

use domain::Progress;

/// `Progress` adapter that emits one `info` event per ingested chunk.
#[derive(Debug)]
pub struct LogProgress {
    total: u64,
}

impl LogProgress {
    /// Create a reporter for a run of `total` rows.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self { total }
    }
}

impl Progress for LogProgress {
    fn report(&self, ingested: u64, chunk_len: usize) {
        tracing::info!(ingested, total = self.total, chunk_len, "ingestion.progress");
    }
}

#[cfg(test)]
mod tests {
    use super::LogProgress;
    use domain::Progress as _;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared buffer the fmt subscriber writes formatted events into.
    #[derive(Debug, Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn each_report_logs_one_progress_event() {
        let progress = LogProgress::new(250);
        let output = capture(|| {
            progress.report(100, 100);
            progress.report(250, 50);
        });

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2, "{output}");
        assert!(lines.iter().all(|l| l.contains("INFO") && l.contains("ingestion.progress")));
        assert!(lines[0].contains("ingested=100 total=250 chunk_len=100"), "{output}");
        assert!(lines[1].contains("ingested=250 total=250 chunk_len=50"), "{output}");
    }
}

//! Batch progress for manifest downloads.
//!
//! Per-URL tasks report their outcome here from many threads at once. A
//! `[PROGRESS]` line is logged each time another tenth of the batch finishes,
//! and an optional terminal bar mirrors the same counters.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

const PROGRESS_STEPS: usize = 10;

/// Outcome of one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Artifact or marker already present; no request made.
    Skipped,
    /// Fetched and persisted.
    Downloaded,
    /// Unavailable, rejected or failed verification; recorded in the ledger.
    Failed,
}

/// Thread-safe counters for one batch.
#[derive(Debug)]
pub struct BatchProgress {
    total: usize,
    skipped: AtomicUsize,
    downloaded: AtomicUsize,
    failed: AtomicUsize,
    last_step: AtomicUsize,
    start_time: Instant,
    bar: Option<ProgressBar>,
}

impl BatchProgress {
    /// Counters for `total` items, logging only.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            skipped: AtomicUsize::new(0),
            downloaded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            last_step: AtomicUsize::new(0),
            start_time: Instant::now(),
            bar: None,
        }
    }

    /// Also drive a terminal progress bar.
    pub fn with_bar(mut self, message: impl Into<String>) -> Self {
        let pb = ProgressBar::new(self.total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(message.into());
        self.bar = Some(pb);
        self
    }

    /// Record one finished item.
    pub fn record(&self, outcome: ItemOutcome) {
        let counter = match outcome {
            ItemOutcome::Skipped => &self.skipped,
            ItemOutcome::Downloaded => &self.downloaded,
            ItemOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        if let Some(bar) = &self.bar {
            bar.inc(1);
        }

        let done = self.completed();
        let step = step_of(done, self.total);
        if step > self.last_step.fetch_max(step, Ordering::SeqCst) {
            info!("{}", self.format_progress());
        }
    }

    /// Items finished so far, whatever the outcome.
    pub fn completed(&self) -> usize {
        self.skipped() + self.downloaded() + self.failed()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Completion percentage (an empty batch is complete).
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed() as f64 / self.total as f64 * 100.0
    }

    /// Progress line as logged.
    pub fn format_progress(&self) -> String {
        let mut line = format!(
            "[PROGRESS] {}/{} files - {:.1}% complete ({} downloaded, {} skipped, {} failed)",
            self.completed(),
            self.total,
            self.percentage(),
            self.downloaded(),
            self.skipped(),
            self.failed()
        );
        let elapsed = self.start_time.elapsed();
        if elapsed >= Duration::from_secs(1) {
            line.push_str(&format!(" in {}", format_duration(elapsed)));
        }
        line
    }

    /// Close the terminal bar, if any.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn step_of(done: usize, total: usize) -> usize {
    if total == 0 {
        return PROGRESS_STEPS;
    }
    done.min(total) * PROGRESS_STEPS / total
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}

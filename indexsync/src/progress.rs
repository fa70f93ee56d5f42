use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::poller::SyncResult;

/// Live spinner for an indexer run being polled
pub struct SyncProgress {
    bar: ProgressBar,
    indexer: String,
    polls: AtomicU32,
    start: Instant,
}

impl SyncProgress {
    pub fn new(indexer: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(bar, indexer)
    }

    /// Progress that draws nothing, for non-interactive runs
    pub fn hidden(indexer: &str) -> Self {
        Self::with_bar(ProgressBar::hidden(), indexer)
    }

    fn with_bar(bar: ProgressBar, indexer: &str) -> Self {
        Self {
            bar,
            indexer: indexer.to_string(),
            polls: AtomicU32::new(0),
            start: Instant::now(),
        }
    }

    pub fn observe(&self, state: &str, items_processed: u64, items_failed: u64) {
        let polls = self.polls.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.set_message(format!(
            "{}: {} - {} items synced ({} failed), poll #{}",
            self.indexer, state, items_processed, items_failed, polls
        ));
    }

    pub fn finish(&self, result: &SyncResult) {
        self.bar.finish_with_message(format!(
            "Done! {} finished with '{}': {} items synced in {:.1}s ({} failed)",
            self.indexer,
            result.state,
            result.items_processed,
            self.start.elapsed().as_secs_f64(),
            result.items_failed
        ));
    }

    pub fn abandon(&self, reason: &str) {
        self.bar
            .abandon_with_message(format!("{}: {}", self.indexer, reason));
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::Relaxed)
    }
}

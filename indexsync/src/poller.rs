//! Blocking wait for an indexer run to reach a terminal state
//!
//! ```text
//! Polling --(no lastResult | notStarted | inProgress)--> wait --> Polling
//! Polling --(success | transientFailure | persistentFailure | reset)--> Done
//! Polling --(unknown or missing state | HTTP/transport error)--> Error
//! wait    --(deadline | max attempts | shutdown)--> Error
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::indexer::IndexerController;
use crate::progress::SyncProgress;
use crate::status::{ItemError, RunPhase, RunState};
use crate::transport::SearchServiceClient;

/// Timing rules for the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// 1.0 keeps the interval fixed
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
    pub timeout: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl PollPolicy {
    /// Fixed interval, no deadline, no attempt limit
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff_multiplier: 1.0,
            max_interval: interval,
            timeout: None,
            max_attempts: None,
        }
    }

    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay to use after waiting `current`, never above the cap
    pub fn next_delay(&self, current: Duration) -> Duration {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier <= 1.0 {
            return self.interval;
        }
        let cap = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .map(|next| next.min(cap))
            .unwrap_or(cap)
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub indexer: String,
    pub state: RunState,
    pub items_processed: u64,
    pub items_failed: u64,
    pub polls: u32,
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ItemError>,
}

impl SyncResult {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Success
    }
}

pub struct SyncStatusPoller {
    controller: IndexerController,
    policy: PollPolicy,
    shutdown: Option<watch::Receiver<bool>>,
    progress: Option<SyncProgress>,
}

impl SyncStatusPoller {
    pub fn new(client: Arc<SearchServiceClient>, policy: PollPolicy) -> Self {
        Self {
            controller: IndexerController::new(client),
            policy,
            shutdown: None,
            progress: None,
        }
    }

    /// Stop waiting once `true` is sent on the channel
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_progress(mut self, progress: SyncProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn progress(&self) -> Option<&SyncProgress> {
        self.progress.as_ref()
    }

    /// Poll until the run reaches a terminal state.
    ///
    /// Transport and HTTP failures are returned immediately without retry.
    pub async fn wait_for_completion(&self, indexer: &str) -> Result<SyncResult> {
        let result = self.poll_loop(indexer).await;
        if let (Some(progress), Err(e)) = (&self.progress, &result) {
            progress.abandon(&e.to_string());
        }
        result
    }

    async fn poll_loop(&self, indexer: &str) -> Result<SyncResult> {
        let start = Instant::now();
        let mut shutdown = self.shutdown.clone();
        let mut delay = self.policy.interval;
        let mut polls: u32 = 0;

        loop {
            if is_shutdown(&shutdown) {
                return Err(SyncError::Cancelled(format!(
                    "stopped waiting for indexer '{}'",
                    indexer
                )));
            }
            if let Some(timeout) = self.policy.timeout {
                if start.elapsed() >= timeout {
                    return Err(SyncError::Timeout {
                        indexer: indexer.to_string(),
                        elapsed: start.elapsed(),
                    });
                }
            }
            if let Some(max) = self.policy.max_attempts {
                if polls >= max {
                    return Err(SyncError::PollLimit {
                        indexer: indexer.to_string(),
                        attempts: polls,
                    });
                }
            }

            polls += 1;
            let status = self.controller.get_status(indexer).await?;
            let last = status.last_result.as_ref();
            let processed = last.map(|r| r.items_processed()).unwrap_or(0);
            let failed = last.map(|r| r.items_failed()).unwrap_or(0);

            match status.phase() {
                RunPhase::Finished(state) => {
                    let last = status.last_result.unwrap_or_default();
                    let result = SyncResult {
                        indexer: indexer.to_string(),
                        state,
                        items_processed: processed,
                        items_failed: failed,
                        polls,
                        elapsed: start.elapsed(),
                        error_message: last.error_message,
                        errors: last.errors,
                    };

                    if result.is_success() {
                        info!(indexer = %indexer, items = processed, polls, "Synchronized {} rows", processed);
                    } else {
                        warn!(
                            indexer = %indexer,
                            state = %result.state,
                            items = processed,
                            failed,
                            "Indexer run finished unsuccessfully"
                        );
                    }
                    if let Some(progress) = &self.progress {
                        progress.finish(&result);
                    }
                    return Ok(result);
                }
                RunPhase::Unrecognized(value) => {
                    return Err(SyncError::UnknownRunStatus {
                        indexer: indexer.to_string(),
                        status: value,
                    });
                }
                RunPhase::Waiting => {
                    info!(indexer = %indexer, poll = polls, "No run recorded yet, waiting");
                    if let Some(progress) = &self.progress {
                        progress.observe(RunState::NotStarted.as_str(), 0, 0);
                    }
                }
                RunPhase::Running => {
                    info!(indexer = %indexer, poll = polls, items = processed, failed, "Synchronization running");
                    if let Some(progress) = &self.progress {
                        progress.observe(RunState::InProgress.as_str(), processed, failed);
                    }
                }
            }

            let wait = match self.policy.timeout {
                Some(timeout) => delay.min(timeout.saturating_sub(start.elapsed())),
                None => delay,
            };
            pause(wait, &mut shutdown).await;
            delay = self.policy.next_delay(delay);
        }
    }
}

fn is_shutdown(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Sleep for `wait`, returning early if shutdown is signalled
async fn pause(wait: Duration, shutdown: &mut Option<watch::Receiver<bool>>) {
    let until = tokio::time::Instant::now() + wait;
    let Some(rx) = shutdown else {
        tokio::time::sleep_until(until).await;
        return;
    };

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(until) => return,
            changed = rx.changed() => {
                match changed {
                    Ok(()) if *rx.borrow_and_update() => return,
                    Ok(()) => continue,
                    // Sender gone: nobody can cancel any more
                    Err(_) => {
                        tokio::time::sleep_until(until).await;
                        return;
                    }
                }
            }
        }
    }
}

use crate::config::TrialConfig;
use crate::engines::evaluation::trial::TrialExecutor;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared stop request, checked at every suspension point
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    Completed,
    Cancelled,
}

/// Submits a working set and blocks until the trial reports completion.
/// There is no timeout; only cancellation ends the wait early.
#[derive(Debug, Clone, Copy)]
pub struct TrialCoordinator {
    poll_interval: Duration,
    settle: Duration,
}

impl TrialCoordinator {
    pub fn new(config: &TrialConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            settle: Duration::from_millis(config.settle_ms),
        }
    }

    pub fn run(
        &self,
        executor: &mut dyn TrialExecutor,
        working_set: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<TrialOutcome> {
        if cancel.is_cancelled() {
            return Ok(TrialOutcome::Cancelled);
        }
        executor.submit(working_set)?;

        if self.pause(self.settle, cancel) {
            executor.abort();
            return Ok(TrialOutcome::Cancelled);
        }

        loop {
            if cancel.is_cancelled() {
                log::info!("Trial wait cancelled");
                executor.abort();
                return Ok(TrialOutcome::Cancelled);
            }
            if !executor.trial_in_progress()? {
                return Ok(TrialOutcome::Completed);
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Sleep for `duration` in poll-sized slices. Returns true if cancelled.
    fn pause(&self, duration: Duration, cancel: &CancelToken) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if cancel.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

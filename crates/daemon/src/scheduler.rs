//! Polling scheduler for the sync daemon.
//!
//! Every poll tick the scheduler checks whether a pass is due and, if so,
//! runs it to completion before sleeping again, so at most one pass is ever
//! in flight. A pass is due when none has succeeded yet or when more than
//! the sync interval has elapsed since the last successful pass started.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info};

use zotsync_core::config::ScheduleConfig;
use zotsync_core::{PassStats, SyncPass};

use crate::signals::{is_shutdown_requested, ShutdownFlag};

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// No pass was due.
    Skipped,
    Succeeded(PassStats),
    /// The pass failed; the next tick will retry.
    Failed,
}

pub struct SyncScheduler {
    sync_interval: Duration,
    poll_interval: Duration,
    /// Start of the last pass that succeeded. Only a success moves it.
    last_successful_sync: Option<Instant>,
    passes_attempted: u64,
}

impl SyncScheduler {
    pub fn new(sync_interval: Duration, poll_interval: Duration) -> Self {
        Self {
            sync_interval,
            poll_interval,
            last_successful_sync: None,
            passes_attempted: 0,
        }
    }

    pub fn from_config(schedule: &ScheduleConfig) -> Self {
        Self::new(schedule.sync_interval(), schedule.poll_interval())
    }

    pub fn last_successful_sync(&self) -> Option<Instant> {
        self.last_successful_sync
    }

    pub fn passes_attempted(&self) -> u64 {
        self.passes_attempted
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_successful_sync {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.sync_interval,
        }
    }

    /// Run one pass if due.
    pub async fn tick<P: SyncPass + ?Sized>(&mut self, pass: &P) -> TickOutcome {
        let started = Instant::now();
        if !self.is_due(started) {
            debug!("sync pass not due yet");
            return TickOutcome::Skipped;
        }

        self.passes_attempted += 1;
        info!(pass = self.passes_attempted, "starting sync pass");

        match pass.run_pass().await {
            Ok(stats) => {
                self.last_successful_sync = Some(started);
                info!(
                    pass = self.passes_attempted,
                    transferred = stats.files_transferred,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "sync pass succeeded"
                );
                TickOutcome::Succeeded(stats)
            }
            Err(e) => {
                error!(
                    pass = self.passes_attempted,
                    error = %e,
                    "sync pass failed, retrying on next poll"
                );
                TickOutcome::Failed
            }
        }
    }

    /// Tick every poll interval until shutdown is requested.
    pub async fn run<P: SyncPass + ?Sized>(&mut self, pass: &P, shutdown: &ShutdownFlag) {
        info!(
            sync_interval_secs = self.sync_interval.as_secs(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "starting polling loop"
        );

        loop {
            if is_shutdown_requested(shutdown) {
                info!("shutdown requested, exiting polling loop");
                return;
            }

            self.tick(pass).await;

            // Sleep with early exit on shutdown
            let sleep_step = Duration::from_secs(1).min(self.poll_interval);
            let mut slept = Duration::ZERO;
            while slept < self.poll_interval {
                if is_shutdown_requested(shutdown) {
                    info!("shutdown requested during sleep, exiting");
                    return;
                }
                tokio::time::sleep(sleep_step).await;
                slept += sleep_step;
            }
        }
    }
}

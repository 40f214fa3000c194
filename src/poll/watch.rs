//! Watch mode: continuous polling reporting only changes.
//!
//! The first successful fetch seeds the snapshot; subsequent cycles emit
//! typed per-resource changes through the printer. Retryable fetch errors
//! print a retry notice and continue; fatal errors abort the loop.

use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{cancellable_delay, response_records, retry_delay, DelayOutcome, PollState};
use crate::diff::DiffEngine;
use crate::fetch::Fetcher;
use crate::output::Printer;
use crate::retry::BackoffConfig;

/// Configuration for a watch loop.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Base interval between successful polls.
    pub interval: Duration,
    /// Print the first snapshot in full instead of silently seeding.
    pub show_initial: bool,
    pub backoff: BackoffConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            show_initial: false,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Drives the fetch -> diff -> print cycle.
pub struct Watcher {
    fetcher: Box<dyn Fetcher>,
    printer: Box<dyn Printer>,
    config: WatchConfig,
    diff: DiffEngine,
    state: PollState,
    /// Resolved once at setup: whether the printer can render typed changes.
    change_capable: bool,
}

impl Watcher {
    pub fn new(
        fetcher: Box<dyn Fetcher>,
        mut printer: Box<dyn Printer>,
        config: WatchConfig,
    ) -> Result<Self> {
        config.backoff.validate()?;
        let change_capable = printer.changes().is_some();
        Ok(Self {
            fetcher,
            printer,
            config,
            diff: DiffEngine::new(),
            state: PollState::Idle,
            change_capable,
        })
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run the watch loop until cancelled or a fatal fetch error.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.state = PollState::Polling;
        let mut retry_attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                self.state = PollState::Cancelled;
                return Ok(());
            }

            let delay = match self.fetcher.fetch() {
                Ok(response) => {
                    retry_attempt = 0;
                    let records = response_records(response);
                    let seeded = self.diff.is_seeded();
                    let changes = self.diff.diff(&records);

                    if !seeded {
                        // Seeding cycle: the initial state is never
                        // reported as Added.
                        if self.config.show_initial {
                            self.printer.print_list(&records)?;
                        }
                    } else if !changes.is_empty() {
                        if self.change_capable {
                            if let Some(cp) = self.printer.changes() {
                                cp.print_changes(&changes)?;
                            }
                        } else {
                            for change in &changes {
                                self.printer.print(&change.resource)?;
                            }
                        }
                    }

                    self.config.interval
                }
                Err(err) => {
                    match retry_delay(&err, self.config.interval, retry_attempt, &self.config.backoff)
                    {
                        Some(delay) => {
                            warn!(
                                class = err.class().label(),
                                attempt = retry_attempt,
                                delay_ms = delay.as_millis() as u64,
                                "fetch failed, retrying: {}",
                                err
                            );
                            retry_attempt += 1;
                            delay
                        }
                        None => {
                            self.state = PollState::Failed;
                            return Err(anyhow!(err).context("watch aborted by fatal fetch error"));
                        }
                    }
                }
            };

            debug!(delay_ms = delay.as_millis() as u64, "watch cycle complete");
            if cancellable_delay(delay, cancel).await == DelayOutcome::Cancelled {
                self.state = PollState::Cancelled;
                return Ok(());
            }
        }
    }
}

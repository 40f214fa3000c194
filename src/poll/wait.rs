//! Wait mode: bounded polling until a record-count condition holds.
//!
//! Terminates with a [`WaitOutcome`] once the condition is satisfied, the
//! attempt budget is exhausted, the deadline passes, or the caller cancels.
//! Exhausted budgets and timeouts are graceful Failed outcomes, not errors;
//! only fatal fetch errors propagate.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{cancellable_delay, response_records, retry_delay, DelayOutcome, PollState};
use crate::condition::Condition;
use crate::fetch::Fetcher;
use crate::retry::BackoffConfig;

/// Configuration for a wait loop.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub condition: Condition,
    pub backoff: BackoffConfig,
    /// Give up after this many fetch attempts, if set.
    pub max_attempts: Option<u32>,
    /// Overall deadline, if set.
    pub timeout: Option<Duration>,
}

/// Terminal output of a wait cycle.
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    pub success: bool,
    pub attempts: u32,
    pub elapsed: Duration,
    pub record_count: usize,
    /// The records from the satisfying fetch (empty on failure).
    pub records: Vec<Value>,
    /// Set for graceful failures: attempt budget, timeout, cancellation.
    pub failure_reason: Option<String>,
}

/// Drives the fetch -> evaluate cycle toward a condition.
pub struct Waiter {
    fetcher: Box<dyn Fetcher>,
    config: WaitConfig,
    state: PollState,
}

impl Waiter {
    pub fn new(fetcher: Box<dyn Fetcher>, config: WaitConfig) -> Result<Self> {
        config.backoff.validate()?;
        Ok(Self {
            fetcher,
            config,
            state: PollState::Idle,
        })
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run the wait loop to completion.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<WaitOutcome> {
        self.state = PollState::Polling;
        let started = Instant::now();
        let deadline = self.config.timeout.map(|t| started + t);
        let mut attempts: u32 = 0;
        let mut retry_attempt: u32 = 0;

        // The initial delay is itself cancellable.
        if !self.config.backoff.initial_delay.is_zero() {
            let outcome = cancellable_delay(self.config.backoff.initial_delay, cancel).await;
            if outcome == DelayOutcome::Cancelled {
                return Ok(self.finish_cancelled(attempts, started));
            }
        }

        loop {
            if cancel.is_cancelled() {
                return Ok(self.finish_cancelled(attempts, started));
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(self.finish_failed(attempts, started, "timeout exceeded"));
                }
            }

            attempts += 1;
            let delay = match self.fetcher.fetch() {
                Ok(response) => {
                    retry_attempt = 0;
                    let records = response_records(response);
                    let count = records.len();

                    if self.config.condition.evaluate(count as u64) {
                        self.state = PollState::Succeeded;
                        return Ok(WaitOutcome {
                            success: true,
                            attempts,
                            elapsed: started.elapsed(),
                            record_count: count,
                            records,
                            failure_reason: None,
                        });
                    }

                    debug!(
                        attempts,
                        count,
                        condition = %self.config.condition,
                        "condition not yet satisfied"
                    );
                    self.config.backoff.next_delay(attempts.saturating_sub(1))
                }
                Err(err) => {
                    let base = self.config.backoff.min_interval;
                    match retry_delay(&err, base, retry_attempt, &self.config.backoff) {
                        Some(delay) => {
                            warn!(
                                class = err.class().label(),
                                attempts, "fetch failed, retrying: {}", err
                            );
                            retry_attempt += 1;
                            delay
                        }
                        None => {
                            self.state = PollState::Failed;
                            return Err(anyhow!(err).context("wait aborted by fatal fetch error"));
                        }
                    }
                }
            };

            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    return Ok(self.finish_failed(attempts, started, "maximum attempts reached"));
                }
            }

            // Never sleep past the deadline; the next iteration reports the
            // timeout.
            let delay = match deadline {
                Some(deadline) => delay.min(deadline.saturating_duration_since(Instant::now())),
                None => delay,
            };

            if cancellable_delay(delay, cancel).await == DelayOutcome::Cancelled {
                return Ok(self.finish_cancelled(attempts, started));
            }
        }
    }

    fn finish_failed(&mut self, attempts: u32, started: Instant, reason: &str) -> WaitOutcome {
        self.state = PollState::Failed;
        WaitOutcome {
            success: false,
            attempts,
            elapsed: started.elapsed(),
            record_count: 0,
            records: Vec::new(),
            failure_reason: Some(reason.to_string()),
        }
    }

    fn finish_cancelled(&mut self, attempts: u32, started: Instant) -> WaitOutcome {
        self.state = PollState::Cancelled;
        WaitOutcome {
            success: false,
            attempts,
            elapsed: started.elapsed(),
            record_count: 0,
            records: Vec::new(),
            failure_reason: Some("cancelled".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct ScriptedFetcher {
        script: Vec<Result<Option<Value>, FetchError>>,
        calls: Arc<Mutex<usize>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Option<Value>, FetchError>>) -> Self {
            Self {
                script,
                calls: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&mut self) -> Result<Option<Value>, FetchError> {
            let mut calls = self.calls.lock().unwrap();
            let idx = (*calls).min(self.script.len() - 1);
            *calls += 1;
            self.script[idx].clone()
        }

        fn description(&self) -> &str {
            "scripted"
        }
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            min_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2.0,
            initial_delay: Duration::ZERO,
        }
    }

    fn config(condition: &str) -> WaitConfig {
        WaitConfig {
            condition: condition.parse().unwrap(),
            backoff: fast_backoff(),
            max_attempts: Some(10),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_condition_satisfied_immediately() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Some(json!([{"id": 1}, {"id": 2}])))]);
        let mut waiter = Waiter::new(Box::new(fetcher), config("count-gte=2")).unwrap();

        let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.record_count, 2);
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.failure_reason.is_none());
        assert_eq!(waiter.state(), PollState::Succeeded);
    }

    #[tokio::test]
    async fn test_condition_satisfied_after_retries() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(Some(json!([]))),
            Ok(Some(json!([]))),
            Ok(Some(json!([{"id": 1}]))),
        ]);
        let mut waiter = Waiter::new(Box::new(fetcher), config("any")).unwrap();

        let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_max_attempts_is_graceful_failure() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Some(json!([])))]);
        let mut waiter = Waiter::new(
            Box::new(fetcher),
            WaitConfig {
                max_attempts: Some(3),
                ..config("any")
            },
        )
        .unwrap();

        let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.failure_reason.as_deref(), Some("maximum attempts reached"));
        assert_eq!(waiter.state(), PollState::Failed);
    }

    #[tokio::test]
    async fn test_timeout_is_graceful_failure() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Some(json!([])))]);
        let mut waiter = Waiter::new(
            Box::new(fetcher),
            WaitConfig {
                max_attempts: None,
                timeout: Some(Duration::from_millis(20)),
                ..config("any")
            },
        )
        .unwrap();

        let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failure_reason.as_deref(), Some("timeout exceeded"));
    }

    #[tokio::test]
    async fn test_backoff_sleep_does_not_overshoot_timeout() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Some(json!([])))]);
        let mut waiter = Waiter::new(
            Box::new(fetcher),
            WaitConfig {
                backoff: BackoffConfig {
                    min_interval: Duration::from_millis(500),
                    max_interval: Duration::from_secs(1),
                    multiplier: 2.0,
                    initial_delay: Duration::ZERO,
                },
                max_attempts: None,
                timeout: Some(Duration::from_millis(50)),
                ..config("any")
            },
        )
        .unwrap();

        let before = Instant::now();
        let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failure_reason.as_deref(), Some("timeout exceeded"));
        // The sleep between attempts is capped at the remaining deadline,
        // so the run finishes near the timeout rather than min_interval
        // later.
        assert!(
            before.elapsed() < Duration::from_millis(300),
            "run overshot the timeout: {:?}",
            before.elapsed()
        );
    }

    #[tokio::test]
    async fn test_cancellation_is_distinct_from_failure() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Some(json!([])))]);
        let mut waiter = Waiter::new(
            Box::new(fetcher),
            WaitConfig {
                max_attempts: None,
                ..config("any")
            },
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let outcome = waiter.run(&cancel).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failure_reason.as_deref(), Some("cancelled"));
        assert_eq!(waiter.state(), PollState::Cancelled);
    }

    #[tokio::test]
    async fn test_fatal_error_propagates() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::new("access denied"))]);
        let mut waiter = Waiter::new(Box::new(fetcher), config("any")).unwrap();

        let result = waiter.run(&CancellationToken::new()).await;
        assert!(result.is_err());
        assert_eq!(waiter.state(), PollState::Failed);
    }

    #[tokio::test]
    async fn test_transient_errors_count_toward_attempts() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::new("request timeout")),
            Ok(Some(json!([{"id": 1}]))),
        ]);
        let mut waiter = Waiter::new(Box::new(fetcher), config("any")).unwrap();

        let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_none_condition_succeeds_on_empty() {
        let fetcher = ScriptedFetcher::new(vec![Ok(None)]);
        let mut waiter = Waiter::new(Box::new(fetcher), config("none")).unwrap();

        let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.record_count, 0);
    }

    #[tokio::test]
    async fn test_initial_delay_is_cancellable() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Some(json!([{"id": 1}])))]);
        let calls = fetcher.calls.clone();
        let mut waiter = Waiter::new(
            Box::new(fetcher),
            WaitConfig {
                backoff: BackoffConfig {
                    initial_delay: Duration::from_secs(60),
                    ..fast_backoff()
                },
                ..config("any")
            },
        )
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = waiter.run(&cancel).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failure_reason.as_deref(), Some("cancelled"));
        assert_eq!(*calls.lock().unwrap(), 0, "no fetch before the initial delay");
    }
}

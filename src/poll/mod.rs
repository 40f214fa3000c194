//! Poll scheduling: the fetch -> evaluate -> render cycle.
//!
//! Three behavioral modes share one shape: a foreground event loop
//! multiplexing a periodic tick, external cancellation, and OS signals
//! (Live mode adds keystrokes and resize). Exactly one event is handled
//! per iteration, at most one fetch is ever in flight, and every
//! inter-attempt delay is a cancellable wait, never an uninterruptible
//! sleep.

pub mod live;
pub mod wait;
pub mod watch;

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::fetch::FetchError;
use crate::retry::{BackoffConfig, ErrorClass};

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Succeeded,
    Failed,
    Cancelled,
}

/// What ended a cancellable delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelayOutcome {
    Elapsed,
    Cancelled,
}

/// Sleep for `delay`, aborting early on cancellation or an OS
/// interrupt/terminate signal.
pub(crate) async fn cancellable_delay(
    delay: Duration,
    cancel: &CancellationToken,
) -> DelayOutcome {
    tokio::select! {
        _ = tokio::time::sleep(delay) => DelayOutcome::Elapsed,
        _ = cancel.cancelled() => DelayOutcome::Cancelled,
        _ = terminate_signal() => DelayOutcome::Cancelled,
    }
}

/// Wait for an OS interrupt or terminate signal.
pub(crate) async fn terminate_signal() {
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(_) => {
                // Signal registration failing leaves ctrl-c as the only
                // interrupt path.
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Decide the delay before retrying a failed fetch, or `None` to abort.
///
/// Transient errors follow the normal backoff schedule. Rate-limited
/// errors honor the collaborator's retry-after hint when present, else
/// double the base interval. Network errors always double the interval.
/// Fatal errors abort.
pub(crate) fn retry_delay(
    err: &FetchError,
    base_interval: Duration,
    attempt: u32,
    backoff: &BackoffConfig,
) -> Option<Duration> {
    match err.class() {
        ErrorClass::Transient => Some(backoff.next_delay(attempt)),
        ErrorClass::RateLimited => Some(err.retry_after().unwrap_or(base_interval * 2)),
        ErrorClass::NetworkError => Some(base_interval * 2),
        ErrorClass::Fatal => None,
    }
}

/// Flatten a fetch response into a record list.
///
/// `None` and JSON null are empty; an array contributes its elements; any
/// other value is a single record.
pub(crate) fn response_records(response: Option<Value>) -> Vec<Value> {
    match response {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # querywatch
//!
//! Live-refresh, change-detection, and terminal-visualization engine for
//! polling structured query results.
//!
//! The crate periodically re-executes a data fetch, decides what changed or
//! whether a condition now holds, and presents the result either as typed
//! change lines or as a fullscreen chart.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Scheduler (poll)                      │
//! │  ┌─────────┐   ┌─────────┐   ┌───────────┐    ┌────────────┐  │
//! │  │  fetch  │──▶│ extract │──▶│  render   │──▶ │  Terminal  │  │
//! │  │         │   │  diff   │   │  output   │    │   stdout   │  │
//! │  └────┬────┘   │condition│   └───────────┘    └────────────┘  │
//! │       │        └─────────┘                                    │
//! │       ▼                                                       │
//! │  ┌─────────┐                                                  │
//! │  │  retry  │◀── classify errors, compute backoff delays       │
//! │  └─────────┘                                                  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`fetch`]**: the [`Fetcher`] seam - any synchronous source of JSON
//!   responses, with file- and command-backed implementations
//! - **[`poll`]**: the three scheduling modes - [`Watcher`] (report changes
//!   forever), [`Waiter`] (block until a condition holds), [`LiveView`]
//!   (fullscreen auto-refreshing chart)
//! - **[`extract`]**: shape detection turning raw JSON into canonical
//!   [`TimeseriesData`]
//! - **[`diff`]**: snapshot comparison producing Added / Modified / Removed
//!   changes with per-field detail
//! - **[`condition`]**: the `count=N` / `count-gte=N` / `any` / `none`
//!   predicate grammar for Wait mode
//! - **[`retry`]**: error classification and exponential backoff
//! - **[`render`]**: pure chart renderers (braille bitmap, ASCII line,
//!   sparkline, bar) over ratatui text
//! - **[`output`]**: the [`Printer`] sink abstraction for Watch and Wait
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Re-run a command every 2s and print what changed
//! querywatch watch --exec 'curl -s localhost:8080/api/jobs'
//!
//! # Block until a file's record list is non-empty
//! querywatch wait --file results.json --for any
//!
//! # Fullscreen braille chart, refreshed every second
//! querywatch live --file metrics.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use querywatch::{FileFetcher, WaitConfig, Waiter};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let config = WaitConfig {
//!     condition: "count-gte=3".parse().unwrap(),
//!     backoff: Default::default(),
//!     max_attempts: Some(10),
//!     timeout: None,
//! };
//! let mut waiter = Waiter::new(Box::new(FileFetcher::new("results.json")), config).unwrap();
//! let outcome = waiter.run(&CancellationToken::new()).await.unwrap();
//! assert!(outcome.success);
//! # });
//! ```

pub mod condition;
pub mod diff;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod poll;
pub mod render;
pub mod retry;

// Re-export main types for convenience
pub use condition::{CompareOp, Condition, ConditionKind};
pub use diff::{Change, ChangeKind, DiffEngine, FieldChange};
pub use extract::{extract, NotTimeseries, Series, TimeseriesData};
pub use fetch::{CommandFetcher, FetchError, Fetcher, FileFetcher};
pub use output::{print_wait_records, ChangePrinter, JsonPrinter, OutputFormat, Printer};
pub use poll::live::{ChartKind, LiveConfig, LiveView};
pub use poll::wait::{WaitConfig, WaitOutcome, Waiter};
pub use poll::watch::{WatchConfig, Watcher};
pub use poll::PollState;
pub use render::{
    AsciiChartRenderer, BarChartRenderer, BrailleMode, BrailleRenderer, Geometry, Renderer,
    SparklineRenderer, Theme,
};
pub use retry::{BackoffConfig, ErrorClass};

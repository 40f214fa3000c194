use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use querywatch::condition::Condition;
use querywatch::fetch::{CommandFetcher, Fetcher, FileFetcher};
use querywatch::output::{print_wait_records, JsonPrinter, OutputFormat};
use querywatch::poll::live::{ChartKind, LiveConfig, LiveView};
use querywatch::poll::wait::{WaitConfig, Waiter};
use querywatch::poll::watch::{WatchConfig, Watcher};
use querywatch::render::Theme;
use querywatch::retry::BackoffConfig;

#[derive(Parser, Debug)]
#[command(name = "querywatch")]
#[command(about = "Poll a JSON data source and watch, wait on, or chart the results")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll continuously and print only what changed
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        /// Seconds between polls
        #[arg(short, long, default_value = "2")]
        interval: u64,

        /// Print the full first snapshot instead of silently seeding
        #[arg(long)]
        show_initial: bool,

        #[command(flatten)]
        backoff: BackoffArgs,
    },

    /// Poll until a record-count condition holds
    Wait {
        #[command(flatten)]
        source: SourceArgs,

        /// Condition to wait for: count=N, count-gte=N, count-gt=N,
        /// count-lte=N, count-lt=N, any, none
        #[arg(long = "for", value_name = "CONDITION")]
        condition: Condition,

        /// Give up after this many fetch attempts
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Overall deadline in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// How to print the satisfying records
        #[arg(short, long, value_enum, default_value = "json")]
        output: OutputArg,

        #[command(flatten)]
        backoff: BackoffArgs,
    },

    /// Fullscreen auto-refreshing chart of timeseries results
    Live {
        #[command(flatten)]
        source: SourceArgs,

        /// Seconds between refreshes
        #[arg(short, long, default_value = "1")]
        interval: u64,

        /// Chart style
        #[arg(short, long, value_enum, default_value = "braille")]
        chart: ChartArg,

        /// Accent theme (auto probes the terminal background)
        #[arg(long, value_enum, default_value = "auto")]
        theme: ThemeArg,

        #[command(flatten)]
        backoff: BackoffArgs,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Re-read this JSON file on every poll
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Re-run this shell command on every poll and decode its stdout
    #[arg(short, long, value_name = "COMMAND")]
    exec: Option<String>,
}

impl SourceArgs {
    fn fetcher(&self) -> Box<dyn Fetcher> {
        match (&self.file, &self.exec) {
            (Some(path), _) => Box::new(FileFetcher::new(path)),
            // The group guarantees exactly one is set.
            _ => Box::new(CommandFetcher::new(self.exec.clone().unwrap_or_default())),
        }
    }
}

#[derive(Args, Debug)]
struct BackoffArgs {
    /// Minimum retry delay in seconds
    #[arg(long, default_value = "1", value_name = "SECS")]
    min_interval: u64,

    /// Maximum retry delay in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    max_interval: u64,

    /// Exponential growth factor between retries
    #[arg(long, default_value = "2.0")]
    multiplier: f64,

    /// Seconds to sleep before the first poll
    #[arg(long, default_value = "0", value_name = "SECS")]
    initial_delay: u64,
}

impl BackoffArgs {
    fn config(&self) -> BackoffConfig {
        BackoffConfig {
            min_interval: Duration::from_secs(self.min_interval),
            max_interval: Duration::from_secs(self.max_interval),
            multiplier: self.multiplier,
            initial_delay: Duration::from_secs(self.initial_delay),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputArg {
    Json,
    Table,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Json => OutputFormat::Json,
            OutputArg::Table => OutputFormat::Table,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ChartArg {
    Braille,
    BrailleFilled,
    Ascii,
    Sparkline,
    Bars,
}

impl From<ChartArg> for ChartKind {
    fn from(arg: ChartArg) -> Self {
        match arg {
            ChartArg::Braille => ChartKind::Braille,
            ChartArg::BrailleFilled => ChartKind::BrailleFilled,
            ChartArg::Ascii => ChartKind::Ascii,
            ChartArg::Sparkline => ChartKind::Sparkline,
            ChartArg::Bars => ChartKind::Bars,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ThemeArg {
    Auto,
    Dark,
    Light,
}

impl ThemeArg {
    fn theme(self) -> Theme {
        match self {
            ThemeArg::Auto => Theme::auto_detect(),
            ThemeArg::Dark => Theme::dark(),
            ThemeArg::Light => Theme::light(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with printed records.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cancel = CancellationToken::new();

    match cli.command {
        Command::Watch {
            source,
            interval,
            show_initial,
            backoff,
        } => {
            let config = WatchConfig {
                interval: Duration::from_secs(interval),
                show_initial,
                backoff: backoff.config(),
            };
            let mut watcher =
                Watcher::new(source.fetcher(), Box::new(JsonPrinter::stdout()), config)?;
            watcher.run(&cancel).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Wait {
            source,
            condition,
            max_attempts,
            timeout,
            output,
            backoff,
        } => {
            let config = WaitConfig {
                condition,
                backoff: backoff.config(),
                max_attempts,
                timeout: timeout.map(Duration::from_secs),
            };
            let mut waiter = Waiter::new(source.fetcher(), config)?;
            let outcome = waiter.run(&cancel).await?;

            if outcome.success {
                let mut printer = JsonPrinter::stdout();
                print_wait_records(&outcome, output.into(), &mut printer)?;
                Ok(ExitCode::SUCCESS)
            } else {
                // Exhausted budgets and timeouts are graceful failures: a
                // reason and a nonzero exit, not an error trace.
                if let Some(reason) = &outcome.failure_reason {
                    eprintln!(
                        "wait failed after {} attempt(s) in {:.1}s: {}",
                        outcome.attempts,
                        outcome.elapsed.as_secs_f64(),
                        reason
                    );
                }
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Live {
            source,
            interval,
            chart,
            theme,
            backoff,
        } => {
            let config = LiveConfig {
                interval: Duration::from_secs(interval),
                chart: chart.into(),
                backoff: backoff.config(),
            };
            let mut view = LiveView::new(source.fetcher(), config, theme.theme())?;
            view.run(&cancel).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

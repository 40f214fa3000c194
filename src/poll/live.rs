//! Live mode: fullscreen re-rendering of the complete dataset every tick.
//!
//! One event loop multiplexes the periodic tick, external cancellation, OS
//! signals, raw keystrokes, and terminal resize. Raw mode and the alternate
//! screen are entered only when the output is interactive, and restored on
//! every exit path through a scoped guard plus a panic hook.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::tty::IsTty;
use crossterm::execute;
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{retry_delay, terminate_signal, PollState};
use crate::extract::{self, TimeseriesData};
use crate::fetch::Fetcher;
use crate::render::{
    AsciiChartRenderer, BarChartRenderer, BrailleMode, BrailleRenderer, Geometry, Renderer,
    SparklineRenderer, Theme,
};
use crate::retry::BackoffConfig;

/// Which visualization strategy Live mode uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Braille,
    BrailleFilled,
    Ascii,
    Sparkline,
    Bars,
}

impl ChartKind {
    fn renderer(self, theme: Theme) -> Box<dyn Renderer> {
        match self {
            ChartKind::Braille => Box::new(BrailleRenderer::with_theme(BrailleMode::Line, theme)),
            ChartKind::BrailleFilled => {
                Box::new(BrailleRenderer::with_theme(BrailleMode::Filled, theme))
            }
            ChartKind::Ascii => Box::new(AsciiChartRenderer::with_theme(theme)),
            ChartKind::Sparkline => Box::new(SparklineRenderer::with_theme(theme)),
            ChartKind::Bars => Box::new(BarChartRenderer::with_theme(theme)),
        }
    }
}

/// Configuration for a live view.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub interval: Duration,
    pub chart: ChartKind,
    pub backoff: BackoffConfig,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            chart: ChartKind::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// What the last poll cycle produced, kept only so a resize can redraw
/// without refetching.
enum LastResult {
    Nothing,
    Timeseries(TimeseriesData),
    /// Extraction failed; show the raw structured response instead.
    Raw(Value),
}

/// Scoped raw-mode + alternate-screen acquisition.
///
/// Restores the terminal on drop, so every exit path - normal completion,
/// cancellation, error, panic (via the hook) - leaves the terminal usable.
struct TerminalGuard;

impl TerminalGuard {
    fn acquire() -> Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen).context("enter alternate screen")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Drives the fullscreen fetch -> extract -> render cycle.
pub struct LiveView {
    fetcher: Box<dyn Fetcher>,
    config: LiveConfig,
    theme: Theme,
    state: PollState,
    last: LastResult,
    last_error: Option<String>,
}

impl LiveView {
    pub fn new(fetcher: Box<dyn Fetcher>, config: LiveConfig, theme: Theme) -> Result<Self> {
        config.backoff.validate()?;
        Ok(Self {
            fetcher,
            config,
            theme,
            state: PollState::Idle,
            last: LastResult::Nothing,
            last_error: None,
        })
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run the live view until a quit key, cancellation, or a signal.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        if !io::stdout().is_tty() {
            anyhow::bail!("live mode requires an interactive terminal");
        }

        let guard = TerminalGuard::acquire()?;

        // The guard restores the terminal on unwind as well.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic);
        }));

        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal, cancel).await;

        let _ = std::panic::take_hook();
        drop(guard);
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.state = PollState::Polling;
        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut retry_attempt: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once(&mut retry_attempt, &mut ticker);
                    self.draw(terminal)?;
                }
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                                || (key.code == KeyCode::Char('c')
                                    && key.modifiers.contains(KeyModifiers::CONTROL));
                            if quit {
                                self.state = PollState::Succeeded;
                                return Ok(());
                            }
                        }
                        Some(Ok(Event::Resize(_, _))) => {
                            // Redraw immediately with fresh geometry rather
                            // than waiting for the next tick.
                            self.draw(terminal)?;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("terminal event error: {}", e);
                        }
                        None => {
                            self.state = PollState::Cancelled;
                            return Ok(());
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    self.state = PollState::Cancelled;
                    return Ok(());
                }
                _ = terminate_signal() => {
                    self.state = PollState::Cancelled;
                    return Ok(());
                }
            }
        }
    }

    /// One fetch cycle. Errors are reported inline and never halt the loop;
    /// retryable classes stretch the next tick instead.
    fn poll_once(&mut self, retry_attempt: &mut u32, ticker: &mut tokio::time::Interval) {
        match self.fetcher.fetch() {
            Ok(response) => {
                *retry_attempt = 0;
                self.last_error = None;
                self.last = match response {
                    None => LastResult::Nothing,
                    Some(value) => match extract::extract(&value) {
                        Ok(data) => LastResult::Timeseries(data),
                        Err(_) => LastResult::Raw(value),
                    },
                };
            }
            Err(err) => {
                self.last_error = Some(format!("{} ({})", err, err.class().label()));
                if let Some(delay) =
                    retry_delay(&err, self.config.interval, *retry_attempt, &self.config.backoff)
                {
                    *retry_attempt += 1;
                    ticker.reset_after(delay);
                }
            }
        }
    }

    fn draw(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        // Borrow pieces up front: the draw closure cannot capture &mut self.
        let header = self.header_line();
        let chart = self.config.chart;
        let theme = self.theme.clone();
        let last = &self.last;

        terminal.draw(|frame| {
            let area = frame.area();
            // Header and blank line occupy the rows the budget reserves.
            let (chart_width, chart_height) =
                Geometry::new(area.width, area.height).chart_budget();

            let mut text = Text::from(vec![header, Line::default()]);
            let body = match last {
                LastResult::Nothing => {
                    Text::from(Line::styled("no data", theme.dim))
                }
                LastResult::Timeseries(data) => {
                    chart.renderer(theme.clone()).render(data, chart_width, chart_height)
                }
                LastResult::Raw(value) => raw_dump(value),
            };
            text.lines.extend(body.lines);

            frame.render_widget(Paragraph::new(text), area);
        })?;
        Ok(())
    }

    fn header_line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.fetcher.description()),
                self.theme.caption,
            ),
            Span::styled("q:quit", self.theme.dim),
        ];
        if let Some(err) = &self.last_error {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(format!("error: {}", err), self.theme.error));
        }
        Line::from(spans)
    }
}

/// Pretty-printed fallback for responses that are not timeseries data.
fn raw_dump(value: &Value) -> Text<'static> {
    let rendered =
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    Text::from(
        rendered
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chart_kind_dispatch() {
        // Every kind must produce a working renderer.
        let data = crate::render::testutil::data_with_values(vec![1.0, 2.0, 3.0]);
        for kind in [
            ChartKind::Braille,
            ChartKind::BrailleFilled,
            ChartKind::Ascii,
            ChartKind::Sparkline,
            ChartKind::Bars,
        ] {
            let text = kind.renderer(Theme::default()).render(&data, 40, 10);
            assert!(!text.lines.is_empty(), "{:?}", kind);
        }
    }

    #[test]
    fn test_chart_budget_fits_frame() {
        use crate::render::geometry::HEADER_ROWS;

        // The charts drawn into a frame use the shared budget, which
        // leaves room for the header rows above the plot.
        let (width, height) = Geometry::new(80, 24).chart_budget();
        let data = crate::render::testutil::data_with_values(vec![1.0, 9.0, 4.0, 7.0]);
        let text = ChartKind::Braille
            .renderer(Theme::default())
            .render(&data, width, height);
        assert_eq!(text.lines.len(), height as usize);
        assert!(height + HEADER_ROWS <= 24);
    }

    #[test]
    fn test_raw_dump_is_pretty_printed() {
        let text = raw_dump(&json!({"message": "hello", "code": 7}));
        assert!(text.lines.len() > 1);
        let flat: String = text
            .lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(flat.contains("\"message\": \"hello\""));
    }

    #[test]
    fn test_invalid_backoff_rejected_at_setup() {
        struct NullFetcher;
        impl Fetcher for NullFetcher {
            fn fetch(&mut self) -> Result<Option<Value>, crate::fetch::FetchError> {
                Ok(None)
            }
            fn description(&self) -> &str {
                "null"
            }
        }

        let result = LiveView::new(
            Box::new(NullFetcher),
            LiveConfig {
                backoff: BackoffConfig {
                    min_interval: Duration::from_secs(2),
                    max_interval: Duration::from_secs(1),
                    ..Default::default()
                },
                ..Default::default()
            },
            Theme::default(),
        );
        assert!(result.is_err());
    }
}

//! Sparkline and bar chart renderers.

use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};

use super::style::{gradient_color, series_color, Theme, BLOCK_GLYPHS};
use super::{resample, truncate_label, value_bounds, Renderer, MAX_LABEL_WIDTH, SUMMARY_GUTTER};
use crate::extract::TimeseriesData;

/// One compact glyph line per series.
#[derive(Debug, Default)]
pub struct SparklineRenderer {
    theme: Theme,
}

impl SparklineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(theme: Theme) -> Self {
        Self { theme }
    }
}

impl Renderer for SparklineRenderer {
    fn render(&self, data: &TimeseriesData, width: u16, _height: u16) -> Text<'static> {
        let label_width = MAX_LABEL_WIDTH;
        let spark_width = (width as usize)
            .saturating_sub(label_width + 1 + SUMMARY_GUTTER)
            .max(1);

        let (min, max) = value_bounds(data);
        let range = max - min;

        let mut lines = Vec::with_capacity(data.series.len());
        for (idx, series) in data.series.iter().enumerate() {
            let resampled = resample(&series.values, spark_width);
            let glyphs: String = resampled
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        ' '
                    } else {
                        let normalized = ((v - min) / range).clamp(0.0, 1.0);
                        let level = (normalized * (BLOCK_GLYPHS.len() - 1) as f64) as usize;
                        BLOCK_GLYPHS[level.min(BLOCK_GLYPHS.len() - 1)]
                    }
                })
                .collect();

            let label = format!(
                "{:<width$}",
                truncate_label(series.display_label()),
                width = label_width
            );
            let summary = format!(
                "{:>width$}",
                super::format_value(series.latest().unwrap_or(f64::NAN)),
                width = SUMMARY_GUTTER
            );

            lines.push(Line::from(vec![
                Span::styled(label, self.theme.legend),
                Span::raw(" "),
                Span::styled(glyphs, Style::default().fg(series_color(idx))),
                Span::styled(summary, self.theme.dim),
            ]));
        }

        Text::from(lines)
    }
}

/// One horizontal gradient bar per series, sized by the series mean.
#[derive(Debug, Default)]
pub struct BarChartRenderer {
    theme: Theme,
}

impl BarChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(theme: Theme) -> Self {
        Self { theme }
    }
}

/// Mean over the non-missing values of a series.
fn series_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

impl Renderer for BarChartRenderer {
    fn render(&self, data: &TimeseriesData, width: u16, _height: u16) -> Text<'static> {
        let label_width = MAX_LABEL_WIDTH;
        let bar_width = (width as usize)
            .saturating_sub(label_width + 1 + SUMMARY_GUTTER)
            .max(1);

        let means: Vec<f64> = data.series.iter().map(|s| series_mean(&s.values)).collect();

        // Global bounds shared across all series' means; the floor snaps to
        // zero when nothing is negative so bar lengths stay proportional.
        let finite: Vec<f64> = means.iter().copied().filter(|v| !v.is_nan()).collect();
        let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() {
            min = 0.0;
        }
        if min >= 0.0 {
            min = 0.0;
        }
        let range = if max > min { max - min } else { 1.0 };

        let mut lines = Vec::with_capacity(data.series.len());
        for (series, &mean) in data.series.iter().zip(&means) {
            let filled = if mean.is_nan() {
                0
            } else {
                (((mean - min) / range) * bar_width as f64).round() as usize
            };

            let label = format!(
                "{:<width$}",
                truncate_label(series.display_label()),
                width = label_width
            );
            let summary = format!(
                "{:>width$}",
                super::format_value(mean),
                width = SUMMARY_GUTTER
            );

            let mut spans = vec![Span::styled(label, self.theme.legend), Span::raw(" ")];
            // Gradient runs along the bar, banded by position.
            for pos in 0..filled.min(bar_width) {
                spans.push(Span::styled(
                    "█",
                    Style::default().fg(gradient_color(pos, bar_width)),
                ));
            }
            spans.push(Span::styled(summary, self.theme.dim));
            lines.push(Line::from(spans));
        }

        Text::from(lines)
    }
}

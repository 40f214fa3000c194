//! Multi-line ASCII chart with a labeled y-axis.

use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};

use super::style::{series_color, Theme};
use super::{
    resample, truncate_label, value_bounds, value_to_row, Renderer, SUMMARY_GUTTER,
};
use crate::extract::TimeseriesData;

/// Series beyond this count are not plotted.
const MAX_PLOTTED_SERIES: usize = 10;

/// Width of the y-axis label column, including the axis glyph.
const AXIS_WIDTH: usize = 9;

/// Renders series as a multi-row line chart with y-axis labels.
///
/// A single series gets a caption line; multiple series share one plot with
/// distinct colors and a legend.
#[derive(Debug, Default)]
pub struct AsciiChartRenderer {
    theme: Theme,
}

impl AsciiChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(theme: Theme) -> Self {
        Self { theme }
    }

    fn header_lines(&self, data: &TimeseriesData) -> Vec<Line<'static>> {
        if data.series.len() == 1 {
            let series = &data.series[0];
            let caption = truncate_label(series.display_label());
            let summary = format!(
                "{:>width$}",
                super::format_value(series.latest().unwrap_or(f64::NAN)),
                width = SUMMARY_GUTTER
            );
            return vec![Line::from(vec![
                Span::styled(caption, self.theme.caption),
                Span::styled(summary, self.theme.dim),
            ])];
        }

        let mut spans = Vec::new();
        for (idx, series) in data.series.iter().take(MAX_PLOTTED_SERIES).enumerate() {
            if idx > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(
                "── ",
                Style::default().fg(series_color(idx)),
            ));
            spans.push(Span::styled(
                truncate_label(series.display_label()),
                self.theme.legend,
            ));
        }
        vec![Line::from(spans)]
    }
}

/// A plotted grid cell: glyph plus owning series (for color).
#[derive(Clone, Copy)]
struct Cell {
    glyph: char,
    series: usize,
}

impl Renderer for AsciiChartRenderer {
    fn render(&self, data: &TimeseriesData, width: u16, height: u16) -> Text<'static> {
        let plot_width = (width as usize).saturating_sub(AXIS_WIDTH).max(2);
        let plot_height = (height as usize).saturating_sub(1).max(2);

        let (min, max) = value_bounds(data);
        let mut grid: Vec<Vec<Option<Cell>>> = vec![vec![None; plot_width]; plot_height];

        for (series_idx, series) in data.series.iter().take(MAX_PLOTTED_SERIES).enumerate() {
            let resampled = resample(&series.values, plot_width);
            let rows: Vec<Option<usize>> = resampled
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        None
                    } else {
                        Some(value_to_row(v, min, max, plot_height))
                    }
                })
                .collect();

            for col in 0..rows.len().min(plot_width) {
                let Some(row) = rows[col] else { continue };
                let prev = if col > 0 { rows[col - 1] } else { None };

                match prev {
                    None => {
                        grid[row][col] = Some(Cell {
                            glyph: '─',
                            series: series_idx,
                        });
                    }
                    Some(prev_row) if prev_row == row => {
                        grid[row][col] = Some(Cell {
                            glyph: '─',
                            series: series_idx,
                        });
                    }
                    Some(prev_row) => {
                        // Corner glyphs at both ends of the step, vertical
                        // bars in between.
                        let going_down = row > prev_row;
                        let (top, bottom) = if going_down {
                            (prev_row, row)
                        } else {
                            (row, prev_row)
                        };
                        grid[prev_row][col] = Some(Cell {
                            glyph: if going_down { '╮' } else { '╯' },
                            series: series_idx,
                        });
                        grid[row][col] = Some(Cell {
                            glyph: if going_down { '╰' } else { '╭' },
                            series: series_idx,
                        });
                        for r in (top + 1)..bottom {
                            grid[r][col] = Some(Cell {
                                glyph: '│',
                                series: series_idx,
                            });
                        }
                    }
                }
            }
        }

        let mut lines = self.header_lines(data);
        let range = max - min;
        for (row_idx, row) in grid.iter().enumerate() {
            let row_value = max - (row_idx as f64 / (plot_height - 1) as f64) * range;
            let mut spans = vec![Span::styled(
                format!("{:>width$} ┤", super::format_value(row_value), width = AXIS_WIDTH - 2),
                self.theme.dim,
            )];

            // Group consecutive cells of the same series into one span.
            let mut run = String::new();
            let mut run_series: Option<usize> = None;
            let flush = |spans: &mut Vec<Span<'static>>, run: &mut String, series: Option<usize>| {
                if run.is_empty() {
                    return;
                }
                let span = match series {
                    Some(idx) => Span::styled(
                        std::mem::take(run),
                        Style::default().fg(series_color(idx)),
                    ),
                    None => Span::raw(std::mem::take(run)),
                };
                spans.push(span);
            };

            for cell in row {
                let (glyph, series) = match cell {
                    Some(c) => (c.glyph, Some(c.series)),
                    None => (' ', None),
                };
                if series != run_series {
                    flush(&mut spans, &mut run, run_series);
                    run_series = series;
                }
                run.push(glyph);
            }
            flush(&mut spans, &mut run, run_series);

            lines.push(Line::from(spans));
        }

        Text::from(lines)
    }
}

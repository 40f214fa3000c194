//! Sub-character bitmap plotting via the Unicode braille block.
//!
//! Each terminal cell encodes a 2x4 sub-pixel block, giving a canvas of
//! `width * 2` columns by `height * 4` rows. The bit-to-dot mapping is a
//! compatibility contract and must match standard braille dot ordering
//! exactly.

use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};

use super::style::{gradient_color, Theme};
use super::{resample, value_bounds, value_to_row, Renderer};
use crate::extract::TimeseriesData;

/// Base code point for a braille cell with all dots clear.
const BRAILLE_BASE: u32 = 0x2800;

/// Bit offsets by dot index `dy + dx * 4`, for `dx in {0,1}`, `dy in {0..3}`.
const DOT_BITS: [u32; 8] = [0x01, 0x02, 0x04, 0x40, 0x08, 0x10, 0x20, 0x80];

/// A pixel grid owned by one render call and discarded after producing
/// output text.
#[derive(Debug)]
pub struct BrailleCanvas {
    width_cells: usize,
    height_rows: usize,
    pixels: Vec<bool>,
}

impl BrailleCanvas {
    pub fn new(width_cells: usize, height_rows: usize) -> Self {
        Self {
            width_cells,
            height_rows,
            pixels: vec![false; width_cells * 2 * height_rows * 4],
        }
    }

    /// Pixel grid width (`width_cells * 2`).
    pub fn pixel_width(&self) -> usize {
        self.width_cells * 2
    }

    /// Pixel grid height (`height_rows * 4`).
    pub fn pixel_height(&self) -> usize {
        self.height_rows * 4
    }

    /// Set one sub-pixel. Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, x: usize, y: usize) {
        let w = self.pixel_width();
        if x < w && y < self.pixel_height() {
            self.pixels[y * w + x] = true;
        }
    }

    fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[y * self.pixel_width() + x]
    }

    /// Encode one terminal cell from its 2x4 sub-pixel block.
    fn cell_char(&self, cell_x: usize, cell_y: usize) -> char {
        let mut bits = 0u32;
        for dx in 0..2 {
            for dy in 0..4 {
                if self.get(cell_x * 2 + dx, cell_y * 4 + dy) {
                    bits |= DOT_BITS[dy + dx * 4];
                }
            }
        }
        // All dot patterns are valid scalar values in the braille block.
        char::from_u32(BRAILLE_BASE | bits).unwrap_or(' ')
    }

    /// Render the canvas into one string per terminal row.
    pub fn rows(&self) -> Vec<String> {
        (0..self.height_rows)
            .map(|cell_y| {
                (0..self.width_cells)
                    .map(|cell_x| self.cell_char(cell_x, cell_y))
                    .collect()
            })
            .collect()
    }
}

/// Plot mode for the braille renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrailleMode {
    /// One pixel per column, connected with vertical runs.
    #[default]
    Line,
    /// Fill from the computed top row down to the canvas floor.
    Filled,
}

/// Renders series as a braille bitmap chart.
#[derive(Debug, Default)]
pub struct BrailleRenderer {
    mode: BrailleMode,
    theme: Theme,
}

impl BrailleRenderer {
    pub fn new(mode: BrailleMode) -> Self {
        Self {
            mode,
            theme: Theme::default(),
        }
    }

    pub fn with_theme(mode: BrailleMode, theme: Theme) -> Self {
        Self { mode, theme }
    }

    fn plot_series(&self, canvas: &mut BrailleCanvas, values: &[f64], min: f64, max: f64) {
        let px_w = canvas.pixel_width();
        let px_h = canvas.pixel_height();
        let resampled = resample(values, px_w);

        let mut prev_row: Option<usize> = None;
        for (col, &v) in resampled.iter().enumerate() {
            if v.is_nan() {
                prev_row = None;
                continue;
            }
            let row = value_to_row(v, min, max, px_h);

            match self.mode {
                BrailleMode::Line => {
                    canvas.set(col, row);
                    // Vertical run to the previous column's row, so steep
                    // slopes stay connected.
                    if let Some(prev) = prev_row {
                        let (lo, hi) = if prev < row { (prev, row) } else { (row, prev) };
                        for y in lo..=hi {
                            canvas.set(col, y);
                        }
                    }
                    prev_row = Some(row);
                }
                BrailleMode::Filled => {
                    for y in row..px_h {
                        canvas.set(col, y);
                    }
                }
            }
        }
    }
}

impl Renderer for BrailleRenderer {
    fn render(&self, data: &TimeseriesData, width: u16, height: u16) -> Text<'static> {
        let width = width.max(1) as usize;
        let height = height.max(1) as usize;
        // The caption takes the first line of the budget; the canvas gets
        // the rest, so the output is exactly `height` lines tall.
        let canvas_rows = height.saturating_sub(1).max(1);

        let (min, max) = value_bounds(data);
        let mut canvas = BrailleCanvas::new(width, canvas_rows);
        for series in &data.series {
            self.plot_series(&mut canvas, &series.values, min, max);
        }

        let caption = data
            .series
            .iter()
            .map(|s| super::truncate_label(s.display_label()))
            .collect::<Vec<_>>()
            .join(", ");
        let summary = format!(
            "{:>width$}",
            format!("{} – {}", super::format_value(min), super::format_value(max)),
            width = super::SUMMARY_GUTTER
        );

        let mut lines = Vec::with_capacity(height);
        lines.push(Line::from(vec![
            Span::styled(caption, self.theme.caption),
            Span::raw(" "),
            Span::styled(summary, self.theme.dim),
        ]));

        for (row_idx, row) in canvas.rows().into_iter().enumerate() {
            let style = Style::default().fg(gradient_color(row_idx, canvas_rows));
            lines.push(Line::from(Span::styled(row, style)));
        }

        Text::from(lines)
    }
}

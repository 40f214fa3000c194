//! Terminal visualization strategies.
//!
//! Every renderer maps canonical series plus geometry to styled text:
//! `render(data, width, height) -> Text`, pure and deterministic for
//! identical input. Renderers hold no shared mutable state.

mod ascii;
mod braille;
pub mod geometry;
mod resample;
mod spark;
pub mod style;

pub use ascii::AsciiChartRenderer;
pub use braille::{BrailleCanvas, BrailleMode, BrailleRenderer};
pub use geometry::Geometry;
pub use resample::resample;
pub use spark::{BarChartRenderer, SparklineRenderer};
pub use style::Theme;

use ratatui::text::Text;

use crate::extract::TimeseriesData;

/// Maximum legend label width before truncation.
pub const MAX_LABEL_WIDTH: usize = 25;

/// Constant-width gutter reserved for trailing numeric summaries.
pub const SUMMARY_GUTTER: usize = 12;

/// Common contract for all visualization strategies.
pub trait Renderer {
    fn render(&self, data: &TimeseriesData, width: u16, height: u16) -> Text<'static>;
}

/// Truncate a legend label to [`MAX_LABEL_WIDTH`] with an ellipsis.
pub fn truncate_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() <= MAX_LABEL_WIDTH {
        label.to_string()
    } else {
        let mut out: String = chars[..MAX_LABEL_WIDTH - 1].iter().collect();
        out.push('…');
        out
    }
}

/// Format a value for legend summaries (e.g. 1234 -> "1.2K").
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        return "-".to_string();
    }
    let abs = v.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", v / 1_000.0)
    } else if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

/// Min/max over all series values, skipping NaN holes.
///
/// When every value is missing or `max == min`, the range defaults to 1.
pub(crate) fn value_bounds(data: &TimeseriesData) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for series in &data.series {
        for &v in &series.values {
            if v.is_nan() {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
        }
    }

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max == min {
        return (min, min + 1.0);
    }
    (min, max)
}

/// Map a value to a row index: `(h-1) - round(((v-min)/(max-min)) * (h-1))`,
/// clamped to `[0, h-1]`. Row 0 is the top.
pub(crate) fn value_to_row(v: f64, min: f64, max: f64, height: usize) -> usize {
    let h = height.max(1);
    let range = if max == min { 1.0 } else { max - min };
    let normalized = ((v - min) / range).clamp(0.0, 1.0);
    let row = (h - 1) as f64 - (normalized * (h - 1) as f64).round();
    (row as usize).min(h - 1)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::TimeseriesData;
    use crate::extract::Series;
    use chrono::Utc;
    use std::time::Duration;

    pub(crate) fn data_with_values(values: Vec<f64>) -> TimeseriesData {
        let now = Utc::now();
        TimeseriesData {
            start: now,
            end: now,
            interval: Duration::from_secs(60),
            series: vec![Series {
                name: "test".to_string(),
                label: None,
                values,
            }],
        }
    }
}

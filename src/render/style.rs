//! Fixed color and glyph tables shared by the renderers.
//!
//! These are bit-exact contracts: downstream tooling keys off the 16-color
//! series palette, the 8-level block glyph set, and the positional gradient
//! bands. Treated as immutable configuration data injected into renderers,
//! never mutated.

use ratatui::style::{Color, Modifier, Style};

/// The 16 fixed terminal colors, in series-assignment order.
pub const SERIES_COLORS: [Color; 16] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::White,
    Color::DarkGray,
    Color::Gray,
    Color::Black,
];

/// The 8 block glyphs used by sparklines, lowest to highest.
pub const BLOCK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Color for the i-th series in a multi-series plot.
pub fn series_color(index: usize) -> Color {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

/// Positional 3-band gradient: top third, middle third, bottom third.
///
/// Purely positional, not value-driven.
pub fn gradient_color(position: usize, extent: usize) -> Color {
    let extent = extent.max(1);
    let band = position * 3 / extent;
    match band {
        0 => Color::Red,
        1 => Color::Yellow,
        _ => Color::Green,
    }
}

/// Accent styling for chart captions and legends.
///
/// Auto-detected from the terminal background; fixed series/gradient colors
/// are unaffected by the theme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub caption: Style,
    pub legend: Style,
    pub error: Style,
    pub dim: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            caption: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            legend: Style::default().fg(Color::Gray),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            dim: Style::default().add_modifier(Modifier::DIM),
        }
    }

    pub fn light() -> Self {
        Self {
            caption: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            legend: Style::default().fg(Color::DarkGray),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            dim: Style::default().add_modifier(Modifier::DIM),
        }
    }

    /// Auto-detect based on terminal background luminance.
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_colors_wrap() {
        assert_eq!(series_color(0), Color::Red);
        assert_eq!(series_color(16), Color::Red);
        assert_eq!(series_color(17), Color::Green);
    }

    #[test]
    fn test_gradient_bands_by_position() {
        // 9 rows: 0-2 top, 3-5 middle, 6-8 bottom.
        assert_eq!(gradient_color(0, 9), Color::Red);
        assert_eq!(gradient_color(2, 9), Color::Red);
        assert_eq!(gradient_color(3, 9), Color::Yellow);
        assert_eq!(gradient_color(5, 9), Color::Yellow);
        assert_eq!(gradient_color(6, 9), Color::Green);
        assert_eq!(gradient_color(8, 9), Color::Green);
    }

    #[test]
    fn test_gradient_handles_tiny_extent() {
        assert_eq!(gradient_color(0, 1), Color::Red);
        assert_eq!(gradient_color(0, 0), Color::Red);
    }

    #[test]
    fn test_block_glyph_count() {
        assert_eq!(BLOCK_GLYPHS.len(), 8);
        assert_eq!(BLOCK_GLYPHS[7], '█');
    }
}

//! Terminal geometry detection and render budgets.
//!
//! Live mode samples geometry fresh on every redraw; it is never cached
//! across a resize.

/// Minimum usable chart area.
pub const MIN_CHART_WIDTH: u16 = 10;
pub const MIN_CHART_HEIGHT: u16 = 4;

/// Rows reserved above the plot for caption and legend.
pub const HEADER_ROWS: u16 = 2;

/// Columns reserved on the left for axis labels.
pub const LABEL_GUTTER: u16 = 10;

/// A sampled terminal size with budget helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Sample the current terminal size, falling back to 80x24 when the
    /// output is not a terminal.
    pub fn detect() -> Self {
        match crossterm::terminal::size() {
            Ok((width, height)) => Self { width, height },
            Err(_) => Self {
                width: 80,
                height: 24,
            },
        }
    }

    /// The chart area after subtracting header rows and the label gutter,
    /// floored at the minimum usable size.
    pub fn chart_budget(&self) -> (u16, u16) {
        let width = self.width.saturating_sub(LABEL_GUTTER).max(MIN_CHART_WIDTH);
        let height = self.height.saturating_sub(HEADER_ROWS).max(MIN_CHART_HEIGHT);
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_subtracts_margins() {
        let geo = Geometry::new(80, 24);
        assert_eq!(geo.chart_budget(), (70, 22));
    }

    #[test]
    fn test_budget_floors_at_minimum() {
        let geo = Geometry::new(5, 2);
        assert_eq!(geo.chart_budget(), (MIN_CHART_WIDTH, MIN_CHART_HEIGHT));
    }
}

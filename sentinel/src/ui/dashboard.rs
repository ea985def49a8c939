//! Dashboard: six metric charts on a 3x2 grid.

use std::time::Instant;

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::chart::view::ChartView;
use crate::ui::chart::{draw_metric_chart, plot_area};

/// Panel rectangles in `MetricKind::ALL` order.
pub fn chart_panels(area: Rect) -> Vec<Rect> {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);
    rows.iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row)
                .to_vec()
        })
        .collect()
}

/// Draws every chart and returns their plot areas for mouse hit-testing.
pub fn draw_dashboard(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    charts: &[ChartView],
    focused: usize,
    now: Instant,
) -> Vec<Rect> {
    let panels = chart_panels(area);
    charts
        .iter()
        .zip(panels.iter())
        .enumerate()
        .map(|(i, (chart, panel))| {
            draw_metric_chart(f, *panel, chart, chart.domain(now), i == focused);
            plot_area(*panel)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_six_non_overlapping_panels() {
        let panels = chart_panels(Rect::new(0, 0, 120, 36));
        assert_eq!(panels.len(), 6);
        for (i, a) in panels.iter().enumerate() {
            for b in &panels[i + 1..] {
                assert!(!a.intersects(*b));
            }
        }
        assert_eq!(panels[1].y, panels[0].y);
        assert!(panels[2].y > panels[0].y);
    }
}

//! One metric chart panel: stats line, braille line plot over the animated domain,
//! axis labels, and the hover cursor with its tooltip.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

use crate::chart::view::{ChartStatus, ChartView};
use crate::chart::{to_ms, y_range, Domain};
use crate::ui::theme::{ACCENT, CURSOR, ERROR, FOCUS_BORDER, HOVER, MUTED};

const GUTTER: u16 = 9;

/// Plot rectangle inside a chart panel. Drawing and mouse hit-testing both use this,
/// so a terminal column maps to the same x the plot was drawn at.
pub fn plot_area(area: Rect) -> Rect {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    Rect {
        x: inner.x + GUTTER.min(inner.width),
        y: inner.y + 1,
        width: inner.width.saturating_sub(GUTTER),
        height: inner.height.saturating_sub(2),
    }
}

pub fn draw_metric_chart(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    chart: &ChartView,
    domain: Domain,
    focused: bool,
) {
    let kind = chart.kind();
    let border = if focused {
        Style::default().fg(FOCUS_BORDER)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(
            format!(" {} · {} ", kind.label(), chart.period()),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 3 || inner.width <= GUTTER + 2 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

    f.render_widget(Paragraph::new(stats_line(chart)), rows[0]);

    let plot = plot_area(area);
    let vis = chart.visible_points(&domain);

    match chart.status() {
        ChartStatus::Failed(msg) => {
            let text = Paragraph::new(vec![
                Line::from(Span::styled(format!("error: {msg}"), Style::default().fg(ERROR))),
                Line::from(Span::styled("press r to retry", Style::default().fg(MUTED))),
            ])
            .alignment(Alignment::Center);
            f.render_widget(text, plot);
            return;
        }
        ChartStatus::Loading if chart.points().is_empty() => {
            f.render_widget(
                Paragraph::new("loading…")
                    .style(Style::default().fg(MUTED))
                    .alignment(Alignment::Center),
                plot,
            );
            return;
        }
        _ if vis.is_empty() => {
            f.render_widget(
                Paragraph::new("no data in range")
                    .style(Style::default().fg(MUTED))
                    .alignment(Alignment::Center),
                plot,
            );
            return;
        }
        _ => {}
    }

    let Some(yr) = y_range(vis.iter().map(|p| p.usage)) else {
        return;
    };

    let line: Vec<(f64, f64)> = vis
        .iter()
        .map(|p| (to_ms(p.timestamp), p.usage))
        .collect();
    let hovered = chart
        .hovered()
        .filter(|p| domain.contains(to_ms(p.timestamp)));
    let cursor: Vec<(f64, f64)> = hovered
        .map(|p| {
            let x = to_ms(p.timestamp);
            vec![(x, yr.min), (x, yr.max)]
        })
        .unwrap_or_default();
    let marker: Vec<(f64, f64)> = hovered
        .map(|p| vec![(to_ms(p.timestamp), p.usage)])
        .unwrap_or_default();

    let datasets = vec![
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(CURSOR))
            .data(&cursor),
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(ACCENT))
            .data(&line),
        Dataset::default()
            .marker(Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(HOVER))
            .data(&marker),
    ];
    let widget = Chart::new(datasets)
        .x_axis(Axis::default().bounds([domain.start, domain.end]))
        .y_axis(Axis::default().bounds([yr.min, yr.max]));
    f.render_widget(widget, plot);

    // y labels in the gutter
    let gutter = Rect {
        x: inner.x,
        y: plot.y,
        width: GUTTER.saturating_sub(1),
        height: plot.height,
    };
    let mut labels = vec![Line::from(""); plot.height as usize];
    if let Some(first) = labels.first_mut() {
        *first = Line::from(short_value(kind.format_value(yr.max)));
    }
    if plot.height > 1 {
        if let Some(last) = labels.last_mut() {
            *last = Line::from(short_value(kind.format_value(yr.min)));
        }
    }
    f.render_widget(
        Paragraph::new(labels)
            .style(Style::default().fg(MUTED))
            .alignment(Alignment::Right),
        gutter,
    );

    // x labels under the plot
    let axis = Rect {
        x: plot.x,
        y: rows[2].y,
        width: plot.width,
        height: 1,
    };
    let fmt = if chart.period().hours() > 1.0 { "%H:%M" } else { "%H:%M:%S" };
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(axis);
    f.render_widget(
        Paragraph::new(domain.start_time().format(fmt).to_string())
            .style(Style::default().fg(MUTED)),
        halves[0],
    );
    f.render_widget(
        Paragraph::new(domain.end_time().format(fmt).to_string())
            .style(Style::default().fg(MUTED))
            .alignment(Alignment::Right),
        halves[1],
    );
}

fn stats_line(chart: &ChartView) -> Line<'static> {
    if let Some(p) = chart.hovered() {
        return Line::from(vec![
            Span::styled("▶ ", Style::default().fg(HOVER)),
            Span::raw(format!("{}  ", p.formatted_time)),
            Span::styled(
                p.formatted_usage.clone(),
                Style::default().fg(HOVER).add_modifier(Modifier::BOLD),
            ),
        ]);
    }
    let Some(stats) = chart.stats() else {
        return Line::from(Span::styled(
            "min - · max - · avg - · now -",
            Style::default().fg(MUTED),
        ));
    };
    let [min, avg, max, current] = stats.formatted(chart.kind());
    let label = |s: &'static str| Span::styled(s, Style::default().fg(MUTED));
    Line::from(vec![
        label("min "),
        Span::raw(min),
        label(" · max "),
        Span::raw(max),
        label(" · avg "),
        Span::raw(avg),
        label(" · now "),
        Span::styled(current, Style::default().add_modifier(Modifier::BOLD)),
    ])
}

fn short_value(s: String) -> String {
    crate::ui::util::truncate_middle(&s, (GUTTER - 1) as usize)
}

//! Analytics view: summary, performance report and anomaly cards for a selectable period.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Wrap},
};
use serde_json::Value;

use crate::types::AnalyticsPeriod;
use crate::ui::theme::{ACCENT, ERROR, MUTED, WARN};
use crate::ui::util::{flatten_json, truncate_middle};
use crate::ui::Loadable;

#[derive(Debug, Default)]
pub struct AnalyticsState {
    pub period: AnalyticsPeriod,
    pub summary: Loadable<Value>,
    pub report: Loadable<Value>,
    pub anomalies: Loadable<Vec<Value>>,
}

impl AnalyticsState {
    /// Whether nothing has been requested yet (first visit to the tab).
    pub fn untouched(&self) -> bool {
        matches!(self.summary, Loadable::Idle)
    }

    pub fn mark_loading(&mut self) {
        self.summary = Loadable::Loading;
        self.report = Loadable::Loading;
        self.anomalies = Loadable::Loading;
    }

    /// `true` when the key requires a reload.
    pub fn handle_key(&mut self, k: KeyEvent) -> bool {
        match k.code {
            KeyCode::Char('p') => {
                self.period = self.period.next();
                true
            }
            KeyCode::Char('r') => true,
            _ => false,
        }
    }
}

pub fn draw_analytics(f: &mut ratatui::Frame<'_>, area: Rect, st: &AnalyticsState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let period = st.period.as_str();
    draw_kv(f, top[0], &format!(" Summary · {period} "), &st.summary);
    draw_kv(f, top[1], &format!(" Performance report · {period} "), &st.report);
    draw_anomalies(f, rows[1], st);
}

fn placeholder<T>(state: &Loadable<T>) -> Option<Span<'static>> {
    match state {
        Loadable::Idle | Loadable::Loading => {
            Some(Span::styled("loading…", Style::default().fg(MUTED)))
        }
        Loadable::Failed(e) => Some(Span::styled(
            format!("error: {e}"),
            Style::default().fg(ERROR),
        )),
        Loadable::Ready(_) => None,
    }
}

fn draw_kv(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, state: &Loadable<Value>) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let value = match state {
        Loadable::Ready(v) => v,
        other => {
            let span = placeholder(other).unwrap_or_default();
            f.render_widget(Paragraph::new(Line::from(span)).block(block), area);
            return;
        }
    };
    let key_width = (area.width / 2).max(10);
    let rows: Vec<Row> = flatten_json(value)
        .into_iter()
        .map(|(k, v)| {
            Row::new(vec![
                Span::styled(truncate_middle(&k, key_width as usize), Style::default().fg(MUTED)),
                Span::raw(v),
            ])
        })
        .collect();
    if rows.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("no data", Style::default().fg(MUTED))).block(block),
            area,
        );
        return;
    }
    let table = Table::new(rows, [Constraint::Length(key_width), Constraint::Min(8)]).block(block);
    f.render_widget(table, area);
}

/// Headline for an anomaly card from whichever descriptive fields it carries.
pub fn anomaly_headline(a: &Value) -> String {
    let field = |k: &str| a.get(k).and_then(|v| v.as_str());
    let kind = field("type").or(field("metric")).unwrap_or("anomaly");
    match (field("severity"), field("message").or(field("description"))) {
        (Some(sev), Some(msg)) => format!("[{sev}] {kind}: {msg}"),
        (Some(sev), None) => format!("[{sev}] {kind}"),
        (None, Some(msg)) => format!("{kind}: {msg}"),
        (None, None) => kind.to_string(),
    }
}

fn draw_anomalies(f: &mut ratatui::Frame<'_>, area: Rect, st: &AnalyticsState) {
    let title = match &st.anomalies {
        Loadable::Ready(v) => format!(" Anomalies ({}) ", v.len()),
        _ => " Anomalies ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let items = match &st.anomalies {
        Loadable::Ready(v) => v,
        other => {
            let span = placeholder(other).unwrap_or_default();
            f.render_widget(Paragraph::new(Line::from(span)).block(block), area);
            return;
        }
    };
    if items.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("no anomalies detected", Style::default().fg(MUTED)))
                .block(block),
            area,
        );
        return;
    }
    let skip = ["type", "metric", "severity", "message", "description"];
    let mut lines = Vec::new();
    for a in items {
        let color = match a.get("severity").and_then(|v| v.as_str()) {
            Some("high") | Some("critical") => ERROR,
            Some("medium") | Some("warning") => WARN,
            _ => ACCENT,
        };
        lines.push(Line::from(Span::styled(
            anomaly_headline(a),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        let detail: Vec<String> = flatten_json(a)
            .into_iter()
            .filter(|(k, _)| !skip.contains(&k.as_str()))
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if !detail.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {}", detail.join("  ")),
                Style::default().fg(MUTED),
            )));
        }
    }
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

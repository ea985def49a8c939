//! Top header (tabs, metrics period, connectivity, clock sync) and the bottom key-hint line.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
};

use crate::time_sync::TimeSyncStatus;
use crate::types::Period;
use crate::ui::theme::{ACCENT, ERROR, MUTED, OK};
use crate::ui::util::sync_color;
use crate::ui::View;

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    view: View,
    period: Period,
    online: Option<bool>,
    sync: &TimeSyncStatus,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(48)])
        .split(area);

    let titles: Vec<Line> = View::ALL.iter().map(|v| Line::from(v.title())).collect();
    let selected = View::ALL.iter().position(|v| *v == view).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(MUTED))
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .divider("│");
    f.render_widget(tabs, cols[0]);

    let (dot, state) = match online {
        Some(true) => (Span::styled("● ", Style::default().fg(OK)), "online"),
        Some(false) => (Span::styled("● ", Style::default().fg(ERROR)), "offline"),
        None => (Span::styled("○ ", Style::default().fg(MUTED)), "connecting"),
    };
    let clock = if sync.is_valid {
        format!("clock {:+.0}s", sync.offset_seconds)
    } else {
        format!("clock {}", sync.status.label())
    };
    let status = Line::from(vec![
        Span::styled(format!("{period}  "), Style::default().fg(ACCENT)),
        dot,
        Span::raw(format!("{state}  ")),
        Span::styled(clock, Style::default().fg(sync_color(sync.status))),
    ]);
    f.render_widget(Paragraph::new(status).alignment(Alignment::Right), cols[1]);
}

pub fn key_hints(view: View, editing: bool) -> &'static str {
    if editing {
        return "type to edit · Enter search · Esc done";
    }
    match view {
        View::Dashboard => {
            "Tab view · 1/2/3 or +/- period · ↑↓ focus · ←→ inspect · c clear · r retry · q quit"
        }
        View::Analytics => "Tab view · p period · r refresh · q quit",
        View::Logs => {
            "Tab view · / search · l level · c container · x clear · ↑↓ scroll · r refresh · q quit"
        }
        View::AskAi => "Tab view · Enter send · Esc quit",
    }
}

pub fn draw_footer(f: &mut ratatui::Frame<'_>, area: Rect, view: View, editing: bool) {
    f.render_widget(
        Paragraph::new(key_hints(view, editing)).style(Style::default().fg(MUTED)),
        area,
    );
}

//! Logs view: live tail of recent entries, quick search with level/container filters,
//! and the log pipeline health line.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::types::{LogEntry, LogFilters, LogHealth, LogQuery, LogSearchResponse};
use crate::ui::theme::{ACCENT, ERROR, MUTED, OK, WARN};
use crate::ui::util::{level_color, truncate_middle};
use crate::ui::Loadable;

const DEFAULT_LEVELS: [&str; 4] = ["ERROR", "WARN", "INFO", "DEBUG"];

#[derive(Debug, Default)]
pub struct LogsState {
    pub recent: Loadable<Vec<LogEntry>>,
    pub search: Option<Loadable<LogSearchResponse>>,
    pub filters: Option<LogFilters>,
    pub health: Option<Result<LogHealth, String>>,
    pub query: String,
    pub editing: bool,
    pub level: Option<String>,
    pub container: Option<String>,
    pub scroll: usize,
}

/// What the app must do after a key was handled by the logs view.
#[derive(Debug, Clone, PartialEq)]
pub enum LogsAction {
    None,
    Search(LogQuery),
    ShowRecent,
    Refresh,
}

impl LogsState {
    pub fn search_active(&self) -> bool {
        self.search.is_some()
    }

    pub fn log_query(&self) -> LogQuery {
        LogQuery {
            q: Some(self.query.trim().to_string()).filter(|q| !q.is_empty()),
            level: self.level.clone(),
            container: self.container.clone(),
            ..LogQuery::default()
        }
    }

    fn has_criteria(&self) -> bool {
        !self.query.trim().is_empty() || self.level.is_some() || self.container.is_some()
    }

    /// Next filter value after `current`, wrapping back to "any".
    fn cycle(options: &[String], current: Option<&String>) -> Option<String> {
        match current.and_then(|c| options.iter().position(|o| o == c)) {
            None => options.first().cloned(),
            Some(i) => options.get(i + 1).cloned(),
        }
    }

    pub fn cycle_level(&mut self) {
        let levels: Vec<String> = match &self.filters {
            Some(f) if !f.log_levels.is_empty() => f.log_levels.clone(),
            _ => DEFAULT_LEVELS.iter().map(|s| s.to_string()).collect(),
        };
        self.level = Self::cycle(&levels, self.level.as_ref());
    }

    pub fn cycle_container(&mut self) {
        let containers = self
            .filters
            .as_ref()
            .map(|f| f.containers.clone())
            .unwrap_or_default();
        self.container = Self::cycle(&containers, self.container.as_ref());
    }

    fn after_filter_change(&mut self) -> LogsAction {
        self.scroll = 0;
        if self.has_criteria() {
            self.search = Some(Loadable::Loading);
            LogsAction::Search(self.log_query())
        } else {
            self.search = None;
            LogsAction::ShowRecent
        }
    }

    pub fn handle_key(&mut self, k: KeyEvent) -> LogsAction {
        if self.editing {
            match k.code {
                KeyCode::Char(c) => self.query.push(c),
                KeyCode::Backspace => {
                    self.query.pop();
                }
                KeyCode::Enter => {
                    self.editing = false;
                    return self.after_filter_change();
                }
                KeyCode::Esc => self.editing = false,
                _ => {}
            }
            return LogsAction::None;
        }
        match k.code {
            KeyCode::Char('/') => {
                self.editing = true;
                LogsAction::None
            }
            KeyCode::Char('l') => {
                self.cycle_level();
                self.after_filter_change()
            }
            KeyCode::Char('c') => {
                self.cycle_container();
                self.after_filter_change()
            }
            KeyCode::Char('x') => {
                self.query.clear();
                self.level = None;
                self.container = None;
                self.after_filter_change()
            }
            KeyCode::Char('r') => LogsAction::Refresh,
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                LogsAction::None
            }
            KeyCode::Down => {
                self.scroll = (self.scroll + 1).min(self.rows().len().saturating_sub(1));
                LogsAction::None
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                LogsAction::None
            }
            KeyCode::PageDown => {
                self.scroll = (self.scroll + 10).min(self.rows().len().saturating_sub(1));
                LogsAction::None
            }
            KeyCode::Home => {
                self.scroll = 0;
                LogsAction::None
            }
            _ => LogsAction::None,
        }
    }

    /// Entries currently on screen: search hits when a search is active, else the tail.
    pub fn rows(&self) -> &[LogEntry] {
        match &self.search {
            Some(Loadable::Ready(r)) => &r.documents,
            Some(_) => &[],
            None => match &self.recent {
                Loadable::Ready(v) => v,
                _ => &[],
            },
        }
    }
}

pub fn draw_logs(f: &mut ratatui::Frame<'_>, area: Rect, st: &LogsState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    draw_search_bar(f, rows[0], st);
    draw_entries(f, rows[1], st);
    draw_health(f, rows[2], st);
}

fn draw_search_bar(f: &mut ratatui::Frame<'_>, area: Rect, st: &LogsState) {
    let any = |v: &Option<String>| v.clone().unwrap_or_else(|| "any".into());
    let cursor = if st.editing { "▏" } else { "" };
    let query_style = if st.editing {
        Style::default().fg(ACCENT)
    } else {
        Style::default()
    };
    let line = Line::from(vec![
        Span::styled("query ", Style::default().fg(MUTED)),
        Span::styled(format!("{}{cursor}", st.query), query_style),
        Span::styled("   level ", Style::default().fg(MUTED)),
        Span::raw(any(&st.level)),
        Span::styled("   container ", Style::default().fg(MUTED)),
        Span::raw(any(&st.container)),
    ]);
    let title = if st.search_active() { " Search " } else { " Recent logs " };
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn draw_entries(f: &mut ratatui::Frame<'_>, area: Rect, st: &LogsState) {
    let (title, state_line) = match (&st.search, &st.recent) {
        (Some(Loadable::Ready(r)), _) => {
            let mut t = format!(" {} hits in {}ms ", r.total, r.took);
            if r.fallback {
                t.push_str("(fallback) ");
            }
            (t, None)
        }
        (Some(Loadable::Failed(e)), _) | (None, Loadable::Failed(e)) => {
            let msg = Span::styled(format!("error: {e}"), Style::default().fg(ERROR));
            (" Logs ".to_string(), Some(msg))
        }
        (Some(_), _) | (None, Loadable::Loading) | (None, Loadable::Idle) => {
            (" Logs ".to_string(), Some(Span::styled("loading…", Style::default().fg(MUTED))))
        }
        (None, Loadable::Ready(v)) => (format!(" {} recent ", v.len()), None),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    if let Some(span) = state_line {
        f.render_widget(Paragraph::new(Line::from(span)).block(block), area);
        return;
    }

    let entries = st.rows();
    if entries.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("no log entries", Style::default().fg(MUTED))).block(block),
            area,
        );
        return;
    }
    let width = area.width.saturating_sub(2) as usize;
    let lines: Vec<Line> = entries
        .iter()
        .skip(st.scroll)
        .map(|e| entry_line(e, width))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn entry_line(e: &LogEntry, width: usize) -> Line<'static> {
    let level = e.log_level.clone().unwrap_or_else(|| "-".into());
    let container = e.container.clone().unwrap_or_else(|| "-".into());
    // HH:MM:SS out of an ISO timestamp when possible
    let time = e
        .timestamp
        .get(11..19)
        .unwrap_or(e.timestamp.as_str())
        .to_string();
    let prefix = format!("{time} {level:<5} {} ", truncate_middle(&container, 16));
    let room = width.saturating_sub(prefix.chars().count()).max(8);
    Line::from(vec![
        Span::styled(time, Style::default().fg(MUTED)),
        Span::raw(" "),
        Span::styled(
            format!("{level:<5}"),
            Style::default()
                .fg(level_color(e.log_level.as_deref()))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(truncate_middle(&container, 16), Style::default().fg(ACCENT)),
        Span::raw(" "),
        Span::raw(truncate_middle(&e.message, room)),
    ])
}

fn draw_health(f: &mut ratatui::Frame<'_>, area: Rect, st: &LogsState) {
    let span = match &st.health {
        None => Span::styled("log pipeline: checking…", Style::default().fg(MUTED)),
        Some(Ok(h)) => {
            let color = match h.status.as_str() {
                "healthy" | "ok" | "green" => OK,
                "degraded" | "yellow" => WARN,
                _ => ERROR,
            };
            let text = match &h.message {
                Some(m) => format!("log pipeline: {} ({m})", h.status),
                None => format!("log pipeline: {}", h.status),
            };
            Span::styled(text, Style::default().fg(color))
        }
        Some(Err(e)) => Span::styled(format!("log pipeline: {e}"), Style::default().fg(ERROR)),
    };
    f.render_widget(Paragraph::new(Line::from(span)).wrap(Wrap { trim: true }), area);
}

//! Ask AI view: a chat transcript against the natural-language query endpoint.
//! One question is in flight at a time.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::types::ChatReply;
use crate::ui::theme::{ACCENT, ASSISTANT_MSG, ERROR, MUTED, USER_MSG};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub waiting: bool,
}

impl ChatState {
    /// Take the typed question. `None` while a reply is pending or the input is blank.
    pub fn submit(&mut self) -> Option<String> {
        if self.waiting || self.input.trim().is_empty() {
            return None;
        }
        let q = std::mem::take(&mut self.input).trim().to_string();
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            text: q.clone(),
        });
        self.waiting = true;
        Some(q)
    }

    pub fn on_reply(&mut self, reply: Result<ChatReply, String>) {
        self.waiting = false;
        let msg = match reply {
            Ok(r) => {
                let text = match r.processing_time_ms {
                    Some(ms) => format!("{}\n({ms:.0} ms)", r.text),
                    None => r.text,
                };
                ChatMessage {
                    role: ChatRole::Assistant,
                    text,
                }
            }
            Err(e) => ChatMessage {
                role: ChatRole::Error,
                text: e,
            },
        };
        self.messages.push(msg);
    }

    /// Returns the question to send, if Enter submitted one.
    pub fn handle_key(&mut self, k: KeyEvent) -> Option<String> {
        match k.code {
            KeyCode::Enter => return self.submit(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        None
    }
}

pub fn draw_ask_ai(f: &mut ratatui::Frame<'_>, area: Rect, st: &ChatState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let mut lines: Vec<Line> = Vec::new();
    if st.messages.is_empty() {
        lines.push(Line::from(Span::styled(
            "Ask about your system, e.g. \"why is cpu high?\"",
            Style::default().fg(MUTED),
        )));
    }
    for m in &st.messages {
        let (who, color) = match m.role {
            ChatRole::User => ("you", USER_MSG),
            ChatRole::Assistant => ("ai", ASSISTANT_MSG),
            ChatRole::Error => ("error", ERROR),
        };
        for (i, text) in m.text.lines().enumerate() {
            let tag = if i == 0 { format!("{who:>5} │ ") } else { "      │ ".to_string() };
            lines.push(Line::from(vec![
                Span::styled(tag, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(text.to_string(), Style::default().fg(color)),
            ]));
        }
        lines.push(Line::from(""));
    }
    if st.waiting {
        lines.push(Line::from(Span::styled("   ai │ thinking…", Style::default().fg(MUTED))));
    }

    // keep the tail in view
    let inner_h = rows[0].height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(inner_h);
    let transcript = Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL).title(" Ask AI "))
        .wrap(Wrap { trim: false });
    f.render_widget(transcript, rows[0]);

    let prompt_style = if st.waiting {
        Style::default().fg(MUTED)
    } else {
        Style::default().fg(ACCENT)
    };
    let input = Paragraph::new(Line::from(vec![
        Span::styled("> ", prompt_style),
        Span::raw(format!("{}▏", st.input)),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" Question (Enter to send) "));
    f.render_widget(input, rows[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn type_str(st: &mut ChatState, s: &str) {
        for c in s.chars() {
            st.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[test]
    fn one_question_in_flight() {
        let mut st = ChatState::default();
        assert_eq!(st.submit(), None);
        type_str(&mut st, "  cpu?  ");
        assert_eq!(
            st.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Some("cpu?".into())
        );
        assert!(st.waiting);
        type_str(&mut st, "again");
        assert_eq!(st.submit(), None);

        st.on_reply(Ok(ChatReply {
            text: "all good".into(),
            processing_time_ms: None,
        }));
        assert!(!st.waiting);
        assert_eq!(st.messages.len(), 2);
        assert_eq!(st.messages[1].role, ChatRole::Assistant);
        assert_eq!(st.submit(), Some("again".into()));
    }

    #[test]
    fn failures_land_in_the_transcript() {
        let mut st = ChatState {
            input: "hi".into(),
            ..ChatState::default()
        };
        st.submit();
        st.on_reply(Err("HTTP 500 from /api/nlp/query".into()));
        assert_eq!(st.messages[1].role, ChatRole::Error);
        assert!(!st.waiting);
    }
}

//! Shared UI theme constants.

use ratatui::style::Color;

pub const ACCENT: Color = Color::Cyan;
pub const MUTED: Color = Color::DarkGray;
pub const FOCUS_BORDER: Color = Color::Yellow;
pub const HOVER: Color = Color::Yellow;
pub const CURSOR: Color = Color::Rgb(90, 90, 100);
pub const ERROR: Color = Color::Red;
pub const OK: Color = Color::Green;
pub const WARN: Color = Color::Yellow;

pub const USER_MSG: Color = Color::Cyan;
pub const ASSISTANT_MSG: Color = Color::White;

//! Small UI helpers: truncation, JSON flattening, severity colors.

use ratatui::style::Color;
use serde_json::Value;

use crate::time_sync::SyncHealth;
use crate::ui::theme::{ERROR, MUTED, OK, WARN};

pub fn truncate_middle(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return "...".into();
    }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(len - right).collect();
    format!("{head}...{tail}")
}

pub fn level_color(level: Option<&str>) -> Color {
    match level.map(|l| l.to_ascii_uppercase()) {
        Some(l) if l.starts_with("ERR") || l == "CRITICAL" || l == "FATAL" => ERROR,
        Some(l) if l.starts_with("WARN") => WARN,
        Some(l) if l == "DEBUG" || l == "TRACE" => MUTED,
        _ => Color::Reset,
    }
}

pub fn sync_color(h: SyncHealth) -> Color {
    match h {
        SyncHealth::Good => OK,
        SyncHealth::Warning => WARN,
        SyncHealth::Error => ERROR,
        SyncHealth::Unknown => MUTED,
    }
}

/// Flatten a JSON blob into dotted key/value rows for table display.
pub fn flatten_json(v: &Value) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    flatten_into(v, String::new(), 0, &mut rows);
    rows
}

const MAX_DEPTH: usize = 4;

fn flatten_into(v: &Value, key: String, depth: usize, rows: &mut Vec<(String, String)>) {
    let join = |k: &str| {
        if key.is_empty() {
            k.to_string()
        } else {
            format!("{key}.{k}")
        }
    };
    match v {
        Value::Object(map) if depth < MAX_DEPTH => {
            for (k, child) in map {
                flatten_into(child, join(k), depth + 1, rows);
            }
        }
        Value::Array(items) if items.iter().all(|i| !i.is_object() && !i.is_array()) => {
            let joined: Vec<String> = items.iter().map(scalar).collect();
            rows.push((key, joined.join(", ")));
        }
        Value::Array(items) if depth < MAX_DEPTH => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(child, format!("{key}[{i}]"), depth + 1, rows);
            }
        }
        other => rows.push((key, scalar(other))),
    }
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.2}"),
            _ => n.to_string(),
        },
        Value::Null => "-".into(),
        other => other.to_string(),
    }
}

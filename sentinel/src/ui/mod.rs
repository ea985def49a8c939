//! UI module root: view tabs, shared load state, and the per-view panels.

pub mod analytics;
pub mod ask_ai;
pub mod chart;
pub mod dashboard;
pub mod header;
pub mod logs;
pub mod theme;
pub mod util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Analytics,
    Logs,
    AskAi,
}

impl View {
    pub const ALL: [View; 4] = [View::Dashboard, View::Analytics, View::Logs, View::AskAi];

    pub fn title(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Analytics => "Analytics",
            View::Logs => "Logs",
            View::AskAi => "Ask AI",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Remote data as the UI sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn from_result(r: Result<T, String>) -> Self {
        match r {
            Ok(v) => Loadable::Ready(v),
            Err(e) => Loadable::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_wrap_both_ways() {
        assert_eq!(View::AskAi.next(), View::Dashboard);
        assert_eq!(View::Dashboard.prev(), View::AskAi);
        assert_eq!(View::Analytics.next().prev(), View::Analytics);
    }
}

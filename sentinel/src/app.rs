//! App state and main loop: input handling, background fetches, refresh timers and drawing.

use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use serde_json::Value;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info};

use crate::api::{ApiClient, Probe};
use crate::chart::view::ChartView;
use crate::config::Settings;
use crate::series::{MetricKind, MetricService, ProcessedPoint};
use crate::time_sync::TimeSync;
use crate::types::{
    ChatReply, LogEntry, LogFilters, LogHealth, LogQuery, LogSearchResponse, Period,
};
use crate::ui::analytics::{draw_analytics, AnalyticsState};
use crate::ui::ask_ai::{draw_ask_ai, ChatState};
use crate::ui::dashboard::draw_dashboard;
use crate::ui::header::{draw_footer, draw_header};
use crate::ui::logs::{draw_logs, LogsAction, LogsState};
use crate::ui::{Loadable, View};

const FRAME: Duration = Duration::from_millis(33);

/// Results delivered from background tasks to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    Series {
        index: usize,
        seq: u64,
        result: Result<Vec<ProcessedPoint>, String>,
    },
    Summary(Result<Value, String>),
    Report(Result<Value, String>),
    Anomalies(Result<Vec<Value>, String>),
    RecentLogs(Result<Vec<LogEntry>, String>),
    Search(Result<LogSearchResponse, String>),
    Filters(Result<LogFilters, String>),
    LogHealth(Result<LogHealth, String>),
    Chat(Result<ChatReply, String>),
    Probe(Probe),
}

pub struct App {
    api: ApiClient,
    settings: Settings,

    pub view: View,
    should_quit: bool,

    // one service + chart per MetricKind::ALL entry
    period: Period,
    services: Vec<Arc<Mutex<MetricService>>>,
    pub charts: Vec<ChartView>,
    chart_tasks: Vec<Option<JoinHandle<()>>>,
    pub focused: usize,
    // cached by draw for mouse hover
    plot_areas: Vec<Rect>,

    time_sync: TimeSync,
    online: Option<bool>,

    pub analytics: AnalyticsState,
    pub logs: LogsState,
    pub chat: ChatState,
    search_task: Option<JoinHandle<()>>,

    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,

    // None = due on the next loop
    last_metrics_poll: Option<Instant>,
    last_logs_poll: Option<Instant>,
    last_probe: Option<Instant>,
}

fn due(last: Option<Instant>, every: Duration, now: Instant) -> bool {
    last.map_or(true, |t| now.duration_since(t) >= every)
}

impl App {
    pub fn new(api: ApiClient, settings: Settings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let ttl = settings.cache_ttl();
        let transition = settings.transition();
        let period = Period::default();
        let now = chrono::Utc::now();
        Self {
            api,
            settings,
            view: View::default(),
            should_quit: false,
            period,
            services: MetricKind::ALL
                .iter()
                .map(|k| Arc::new(Mutex::new(MetricService::new(*k, ttl))))
                .collect(),
            charts: MetricKind::ALL
                .iter()
                .map(|k| ChartView::new(*k, period, now, transition))
                .collect(),
            chart_tasks: MetricKind::ALL.iter().map(|_| None).collect(),
            focused: 0,
            plot_areas: Vec::new(),
            time_sync: TimeSync::new(),
            online: None,
            analytics: AnalyticsState::default(),
            logs: LogsState::default(),
            chat: ChatState::default(),
            search_task: None,
            tx,
            rx,
            last_metrics_poll: None,
            last_logs_poll: None,
            last_probe: None,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(backend = %self.api.base_url(), "starting ui");

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal).await;

        // Teardown
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, DisableMouseCapture, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        self.abort_all();
        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(k) if k.kind != KeyEventKind::Release => self.handle_key(k),
                    Event::Mouse(m) => self.handle_mouse(m),
                    _ => {}
                }
            }
            if self.should_quit {
                break;
            }

            while let Ok(ev) = self.rx.try_recv() {
                self.on_event(ev);
            }
            self.tick(Instant::now());

            terminal.draw(|f| self.draw(f))?;
            sleep(FRAME).await;
        }
        Ok(())
    }

    fn abort_all(&mut self) {
        for h in self.chart_tasks.iter_mut().filter_map(Option::take) {
            h.abort();
        }
        if let Some(h) = self.search_task.take() {
            h.abort();
        }
    }

    /// Timers: probe, metric refresh, log tail. Called once per frame.
    pub fn tick(&mut self, now: Instant) {
        if due(self.last_probe, self.settings.sync_check(), now) {
            self.last_probe = Some(now);
            self.spawn_probe();
        }
        if due(self.last_metrics_poll, self.settings.metrics_refresh(), now) {
            self.last_metrics_poll = Some(now);
            self.refresh_charts(false);
        }
        if self.view == View::Logs && due(self.last_logs_poll, self.settings.logs_refresh(), now) {
            self.last_logs_poll = Some(now);
            self.refresh_logs();
        }
        for chart in &mut self.charts {
            chart.tick(now);
        }
    }

    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Series { index, seq, result } => {
                let sync_now = self.time_sync.now();
                if let Some(chart) = self.charts.get_mut(index) {
                    chart.on_data(seq, result, sync_now);
                }
            }
            AppEvent::Summary(r) => self.analytics.summary = Loadable::from_result(r),
            AppEvent::Report(r) => self.analytics.report = Loadable::from_result(r),
            AppEvent::Anomalies(r) => self.analytics.anomalies = Loadable::from_result(r),
            AppEvent::RecentLogs(r) => self.logs.recent = Loadable::from_result(r),
            AppEvent::Search(r) => {
                // a search result after the user cleared the search is stale
                if self.logs.search.is_some() {
                    self.logs.search = Some(Loadable::from_result(r));
                }
            }
            AppEvent::Filters(r) => match r {
                Ok(f) => self.logs.filters = Some(f),
                Err(e) => debug!(error = %e, "log filters unavailable"),
            },
            AppEvent::LogHealth(r) => self.logs.health = Some(r),
            AppEvent::Chat(r) => self.chat.on_reply(r),
            AppEvent::Probe(p) => {
                if self.online != Some(p.online) {
                    info!(online = p.online, "backend connectivity changed");
                }
                self.online = Some(p.online);
                if let Some(server) = p.server_time {
                    self.time_sync.observe(server, p.local_time);
                }
            }
        }
    }

    // ---- input ----

    pub fn handle_key(&mut self, k: KeyEvent) {
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match k.code {
            KeyCode::Tab => return self.switch_view(self.view.next()),
            KeyCode::BackTab => return self.switch_view(self.view.prev()),
            _ => {}
        }
        // views that capture text get keys first
        match self.view {
            View::AskAi => {
                if k.code == KeyCode::Esc {
                    self.should_quit = true;
                } else if let Some(q) = self.chat.handle_key(k) {
                    self.spawn_chat(q);
                }
                return;
            }
            View::Logs if self.logs.editing => {
                let action = self.logs.handle_key(k);
                self.apply_logs_action(action);
                return;
            }
            _ => {}
        }
        if matches!(k.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
            self.should_quit = true;
            return;
        }
        match self.view {
            View::Dashboard => self.dashboard_key(k),
            View::Analytics => {
                if self.analytics.handle_key(k) {
                    self.load_analytics();
                }
            }
            View::Logs => {
                let action = self.logs.handle_key(k);
                self.apply_logs_action(action);
            }
            View::AskAi => {}
        }
    }

    fn dashboard_key(&mut self, k: KeyEvent) {
        let now = Instant::now();
        match k.code {
            KeyCode::Char('1') => self.set_period(Period::OneHour, now),
            KeyCode::Char('2') => self.set_period(Period::SixHours, now),
            KeyCode::Char('3') => self.set_period(Period::TwelveHours, now),
            KeyCode::Char('+') | KeyCode::Char('=') => self.set_period(self.period.longer(), now),
            KeyCode::Char('-') => self.set_period(self.period.shorter(), now),
            KeyCode::Up | KeyCode::Char('k') => {
                let n = self.charts.len();
                self.focused = (self.focused + n - 1) % n;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.focused = (self.focused + 1) % self.charts.len();
            }
            KeyCode::Left | KeyCode::Char('h') => self.charts[self.focused].step_hover(-1),
            KeyCode::Right | KeyCode::Char('l') => self.charts[self.focused].step_hover(1),
            KeyCode::Char('c') => {
                for c in &mut self.charts {
                    c.clear_hover();
                }
            }
            KeyCode::Char('r') => {
                for c in &mut self.charts {
                    c.follow_live();
                }
                self.last_metrics_poll = Some(now);
                self.refresh_charts(true);
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, m: MouseEvent) {
        if self.view != View::Dashboard {
            return;
        }
        let hit = self.plot_areas.iter().position(|r| {
            m.column >= r.x && m.column < r.x + r.width && m.row >= r.y && m.row < r.y + r.height
        });
        match (m.kind, hit) {
            (MouseEventKind::Moved | MouseEventKind::Drag(_), Some(i)) => {
                let area = self.plot_areas[i];
                let px = (m.column - area.x) as f64 + 0.5;
                let now = Instant::now();
                for (j, c) in self.charts.iter_mut().enumerate() {
                    if j == i {
                        c.hover_at(px, area.width as f64, area.height as f64, now);
                    } else {
                        c.clear_hover();
                    }
                }
            }
            (MouseEventKind::Moved, None) => {
                for c in &mut self.charts {
                    c.clear_hover();
                }
            }
            (MouseEventKind::Down(MouseButton::Left), Some(i)) => self.focused = i,
            _ => {}
        }
    }

    fn switch_view(&mut self, view: View) {
        self.view = view;
        match view {
            View::Analytics if self.analytics.untouched() => self.load_analytics(),
            View::Logs => {
                // tail is refreshed by the timer; filters and health once per visit
                self.last_logs_poll = None;
                self.spawn_log_meta();
            }
            _ => {}
        }
    }

    /// Change the metrics period for every chart and fetch the new range.
    pub fn set_period(&mut self, period: Period, now: Instant) {
        if period == self.period {
            return;
        }
        info!(from = %self.period, to = %period, "period change");
        self.period = period;
        for i in 0..self.charts.len() {
            if let Some(seq) = self.charts[i].request_period(period, now) {
                self.fetch_chart(i, seq, false);
            }
        }
    }

    /// Periodic or user-triggered reload. `force` drops cached ranges first.
    fn refresh_charts(&mut self, force: bool) {
        for i in 0..self.charts.len() {
            // the in-flight transition fetch is still authoritative
            if self.charts[i].is_animating() && !force {
                continue;
            }
            let seq = self.charts[i].next_request();
            self.fetch_chart(i, seq, force);
        }
    }

    fn fetch_chart(&mut self, index: usize, seq: u64, force: bool) {
        if let Some(h) = self.chart_tasks[index].take() {
            h.abort();
        }
        let svc = Arc::clone(&self.services[index]);
        let api = self.api.clone();
        let tx = self.tx.clone();
        let period = self.charts[index].period();
        self.chart_tasks[index] = Some(tokio::spawn(async move {
            let mut svc = svc.lock().await;
            if force {
                svc.clear_cache();
            }
            let result = svc.load(&api, period).await.map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Series { index, seq, result });
        }));
    }

    fn spawn_probe(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Probe(api.probe().await));
        });
    }

    fn load_analytics(&mut self) {
        self.analytics.mark_loading();
        let period = self.analytics.period;
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (summary, report, anomalies) = tokio::join!(
                api.analytics_summary(period),
                api.performance_report(period),
                api.anomalies(period),
            );
            let _ = tx.send(AppEvent::Summary(summary.map_err(|e| e.to_string())));
            let _ = tx.send(AppEvent::Report(report.map_err(|e| e.to_string())));
            let _ = tx.send(AppEvent::Anomalies(anomalies.map_err(|e| e.to_string())));
        });
    }

    fn refresh_logs(&mut self) {
        if self.logs.search_active() {
            return;
        }
        if matches!(self.logs.recent, Loadable::Idle) {
            self.logs.recent = Loadable::Loading;
        }
        let api = self.api.clone();
        let tx = self.tx.clone();
        let limit = self.settings.recent_log_limit;
        tokio::spawn(async move {
            let r = api.recent_logs(limit).await.map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::RecentLogs(r));
        });
    }

    fn spawn_log_meta(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (filters, health) = tokio::join!(api.log_filters(), api.log_health());
            let _ = tx.send(AppEvent::Filters(filters.map_err(|e| e.to_string())));
            let _ = tx.send(AppEvent::LogHealth(health.map_err(|e| e.to_string())));
        });
    }

    fn spawn_search(&mut self, q: LogQuery) {
        if let Some(h) = self.search_task.take() {
            h.abort();
        }
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.search_task = Some(tokio::spawn(async move {
            let r = api.search_logs(&q).await.map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Search(r));
        }));
    }

    fn apply_logs_action(&mut self, action: LogsAction) {
        match action {
            LogsAction::None => {}
            LogsAction::Search(q) => self.spawn_search(q),
            LogsAction::ShowRecent => {
                if let Some(h) = self.search_task.take() {
                    h.abort();
                }
                self.refresh_logs();
            }
            LogsAction::Refresh => {
                if self.logs.search_active() {
                    self.logs.search = Some(Loadable::Loading);
                    self.spawn_search(self.logs.log_query());
                } else {
                    self.refresh_logs();
                }
                self.spawn_log_meta();
            }
        }
    }

    fn spawn_chat(&self, query: String) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let r = api.ask(&query).await.map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Chat(r));
        });
    }

    // ---- drawing ----

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(6),    // body
                Constraint::Length(1), // key hints
            ])
            .split(area);

        draw_header(
            f,
            rows[0],
            self.view,
            self.period,
            self.online,
            &self.time_sync.status(),
        );

        match self.view {
            View::Dashboard => {
                self.plot_areas =
                    draw_dashboard(f, rows[1], &self.charts, self.focused, Instant::now());
            }
            View::Analytics => draw_analytics(f, rows[1], &self.analytics),
            View::Logs => draw_logs(f, rows[1], &self.logs),
            View::AskAi => draw_ask_ai(f, rows[1], &self.chat),
        }

        draw_footer(f, rows[2], self.view, self.view == View::Logs && self.logs.editing);
    }
}

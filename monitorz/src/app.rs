//! App state and main loop: input handling, reading the poller, and drawing.

use std::{io, sync::Arc, time::Duration};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::{oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::dashboard::DashboardView;
use crate::detail::{DetailFetcher, DetailState};
use crate::history::CpuHistory;
use crate::http::{AgentClient, DetailSource, MetricsSource};
use crate::poller::{PollState, Poller};
use crate::ui::{
    cards::draw_cards,
    cpu::{draw_cpu_avg_graph, draw_per_core_bars},
    detail::draw_detail,
    disks::draw_disks,
    header::draw_header,
    processes::{draw_process_table, draw_top_five, viewport_rows, ProcessTable, TableAction},
    raw::draw_raw,
    settings::{draw_settings, HealthStatus, SessionInfo},
    sidebar::{draw_sidebar, Section},
    status::{draw_error, draw_loading},
};

const TICK: Duration = Duration::from_millis(100);
const HISTORY_CAP: usize = 300;
const SIDEBAR_WIDTH: u16 = 18;

pub struct App {
    info: SessionInfo,
    state: PollState,
    rx: Option<watch::Receiver<PollState>>,

    detail: DetailFetcher,
    agent: Option<Arc<AgentClient>>,
    health: HealthStatus,
    health_rx: Option<oneshot::Receiver<HealthStatus>>,

    section: Section,
    table: ProcessTable,
    raw_scroll: u16,
    cpu_hist: CpuHistory,
    // cached by draw() for page-size math in key handling
    last_table_area: Option<Rect>,

    should_quit: bool,
}

impl App {
    pub fn new(info: SessionInfo, details: Arc<dyn DetailSource>) -> Self {
        Self {
            info,
            state: PollState::default(),
            rx: None,
            detail: DetailFetcher::new(details),
            agent: None,
            health: HealthStatus::Unknown,
            health_rx: None,
            section: Section::Dashboard,
            table: ProcessTable::default(),
            raw_scroll: 0,
            cpu_hist: CpuHistory::new(HISTORY_CAP),
            last_table_area: None,
            should_quit: false,
        }
    }

    /// App backed by a real agent; enables the health probe on the settings page.
    pub fn with_agent(info: SessionInfo, agent: Arc<AgentClient>) -> Self {
        let mut app = Self::new(info, agent.clone());
        app.agent = Some(agent);
        app
    }

    pub fn section(&self) -> Section {
        self.section
    }

    /// Key of the page on screen, as shown in the header.
    pub fn section_key(&self) -> &'static str {
        self.section.key()
    }

    pub fn detail(&self) -> &DetailState {
        self.detail.state()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub async fn run(&mut self, source: Arc<dyn MetricsSource>) -> Result<()> {
        let mut poller = Poller::new(source).interval_ms(self.info.interval_ms).start();
        self.rx = Some(poller.subscribe());
        info!(endpoint = %self.info.endpoint, interval_ms = self.info.interval_ms, "dashboard started");

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal).await;

        poller.stop();

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind == KeyEventKind::Press {
                        self.on_key(k);
                    }
                }
            }
            if self.should_quit {
                break;
            }

            self.sync();
            terminal.draw(|f| self.draw(f))?;

            sleep(TICK).await;
        }
        Ok(())
    }

    /// Pull in whatever the background tasks produced since the last tick.
    pub fn sync(&mut self) {
        let latest = self
            .rx
            .as_mut()
            .filter(|rx| rx.has_changed().unwrap_or(false))
            .map(|rx| rx.borrow_and_update().clone());
        if let Some(st) = latest {
            self.set_state(st);
        }

        self.detail.poll_results();

        if let Some(rx) = self.health_rx.as_mut() {
            match rx.try_recv() {
                Ok(h) => {
                    self.health = h;
                    self.health_rx = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.health_rx = None,
            }
        }
    }

    pub fn set_state(&mut self, st: PollState) {
        if st.error.is_none() {
            if let Some(cpu) = st.snapshot.as_ref().and_then(|m| m.cpu.as_ref()) {
                self.cpu_hist.record(st.seq, &cpu.usage_pct);
            }
        }
        self.state = st;
    }

    pub fn on_key(&mut self, k: KeyEvent) {
        // raw mode swallows SIGINT
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Esc => {
                if self.detail.state().is_idle() {
                    self.should_quit = true;
                } else {
                    self.detail.clear();
                }
                return;
            }
            KeyCode::Tab => return self.select(self.section.next()),
            KeyCode::BackTab => return self.select(self.section.prev()),
            KeyCode::Char(c @ '1'..='4') => {
                if let Some(s) = Section::from_digit(c) {
                    self.select(s);
                }
                return;
            }
            KeyCode::Char('r') => return self.check_health(),
            _ => {}
        }

        match self.section {
            Section::Processes => {
                let procs = self
                    .state
                    .snapshot
                    .as_ref()
                    .map(|m| m.top_processes.as_slice())
                    .unwrap_or_default();
                let page = self.last_table_area.map(viewport_rows).unwrap_or(10);
                if let TableAction::Open(pid) = self.table.handle_key(k, procs, page) {
                    self.detail.select(pid);
                }
            }
            Section::Drivers => match k.code {
                KeyCode::Up => self.raw_scroll = self.raw_scroll.saturating_sub(1),
                KeyCode::Down => self.raw_scroll = self.raw_scroll.saturating_add(1),
                KeyCode::PageUp => self.raw_scroll = self.raw_scroll.saturating_sub(10),
                KeyCode::PageDown => self.raw_scroll = self.raw_scroll.saturating_add(10),
                KeyCode::Home => self.raw_scroll = 0,
                _ => {}
            },
            _ => {}
        }
    }

    fn select(&mut self, s: Section) {
        if s != self.section {
            debug!(section = s.key(), "section selected");
            self.section = s;
        }
    }

    fn check_health(&mut self) {
        let Some(agent) = self.agent.clone() else {
            return;
        };
        if self.health_rx.is_some() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.health = HealthStatus::Checking;
        self.health_rx = Some(rx);
        tokio::spawn(async move {
            let status = match agent.health().await {
                Ok(h) => HealthStatus::Ok(match h.ts {
                    Some(ts) => format!("{} ({ts})", h.status),
                    None => h.status,
                }),
                Err(e) => HealthStatus::Down(e.to_string()),
            };
            let _ = tx.send(status);
        });
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        if self.state.loading {
            draw_loading(f, area);
            return;
        }
        if let Some(err) = &self.state.error {
            draw_error(f, area, err);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);
        draw_header(f, rows[0], self.section_key(), &self.info.endpoint, &self.state);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(rows[1]);
        draw_sidebar(f, body[0], self.section);

        let page = body[1];
        match self.section {
            Section::Dashboard => self.draw_dashboard(f, page),
            Section::Processes => self.draw_processes(f, page),
            Section::Drivers => {
                draw_raw(f, page, self.state.snapshot.as_deref(), &mut self.raw_scroll)
            }
            Section::Settings => draw_settings(f, page, &self.info, &self.health),
        }
    }

    fn draw_dashboard(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let m = self.state.snapshot.as_deref();
        let view = DashboardView::from_snapshot(m);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // cards
                Constraint::Length(8), // cpu
                Constraint::Min(5),    // top processes + disks
            ])
            .split(area);
        draw_cards(f, rows[0], &view);

        let cores = m
            .and_then(|m| m.cpu.as_ref())
            .map(|c| c.usage_pct.as_slice())
            .unwrap_or_default();
        let cpu_lr = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
            .split(rows[1]);
        draw_cpu_avg_graph(f, cpu_lr[0], &self.cpu_hist, cores);
        draw_per_core_bars(f, cpu_lr[1], cores, &self.cpu_hist);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        draw_top_five(f, bottom[0], &view);
        draw_disks(f, bottom[1], m.map(|m| m.disks.as_slice()).unwrap_or_default());
    }

    fn draw_processes(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let (table_area, detail_area) = if self.detail.state().is_idle() {
            (area, None)
        } else {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(area);
            (cols[0], Some(cols[1]))
        };

        self.last_table_area = Some(table_area);
        let procs = self
            .state
            .snapshot
            .as_ref()
            .map(|m| m.top_processes.as_slice())
            .unwrap_or_default();
        draw_process_table(f, table_area, procs, &mut self.table);

        if let Some(a) = detail_area {
            draw_detail(f, a, self.detail.state());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::types::{CpuInfo, MemoryInfo, MetricsSnapshot, ProcessDetail, ProcessSummary};
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;

    struct NoDetails;

    #[async_trait]
    impl DetailSource for NoDetails {
        async fn fetch_process(&self, _pid: u32) -> Result<ProcessDetail, FetchError> {
            Err(FetchError::Status(404))
        }
    }

    fn app() -> App {
        let info = SessionInfo {
            endpoint: "http://127.0.0.1:17820/".into(),
            interval_ms: 3000,
            ..Default::default()
        };
        App::new(info, Arc::new(NoDetails))
    }

    fn snapshot(n_procs: u32) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: "2024-05-01T12:00:00+00:00".into(),
            cpu: Some(CpuInfo {
                usage_pct: vec![42.345, 10.0],
                ..Default::default()
            }),
            memory: Some(MemoryInfo {
                used_pct: Some(61.27),
                ..Default::default()
            }),
            top_processes: (0..n_procs)
                .map(|i| ProcessSummary {
                    pid: 100 + i,
                    name: format!("worker-{i}"),
                    cpu_percent: 50.0 - i as f64,
                    memory_percent: 1.0,
                    username: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn loaded(m: MetricsSnapshot) -> PollState {
        PollState {
            snapshot: Some(Arc::new(m)),
            loading: false,
            seq: 1,
            ..Default::default()
        }
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn loading_screen_until_first_resolution() {
        let mut a = app();
        assert!(render(&mut a).contains("Loading metrics..."));
    }

    #[test]
    fn error_screen_shows_message() {
        let mut a = app();
        a.set_state(PollState {
            loading: false,
            error: Some("HTTP 500".into()),
            ..Default::default()
        });
        let screen = render(&mut a);
        assert!(screen.contains("Failed to load metrics"));
        assert!(screen.contains("HTTP 500"));
    }

    #[test]
    fn dashboard_shows_cards_and_at_most_five_processes() {
        let mut a = app();
        a.set_state(loaded(snapshot(7)));
        let screen = render(&mut a);
        assert!(screen.contains("42.3%"));
        assert!(screen.contains("61.3%"));
        for i in 0..5 {
            assert!(screen.contains(&format!("worker-{i}")), "worker-{i} missing");
        }
        assert!(!screen.contains("worker-5"));
        assert!(!screen.contains("worker-6"));
    }

    #[test]
    fn dashboard_empty_state() {
        let mut a = app();
        a.set_state(loaded(snapshot(0)));
        assert!(render(&mut a).contains("No processes listed."));
    }

    #[test]
    fn navigation_keys() {
        let mut a = app();
        a.on_key(key(KeyCode::Tab));
        assert_eq!(a.section(), Section::Processes);
        a.on_key(key(KeyCode::Char('4')));
        assert_eq!(a.section().key(), "config");
        a.on_key(key(KeyCode::BackTab));
        assert_eq!(a.section(), Section::Drivers);
        assert!(!a.should_quit());
        a.on_key(key(KeyCode::Char('q')));
        assert!(a.should_quit());
    }

    #[test]
    fn header_names_the_current_page() {
        let mut a = app();
        a.set_state(loaded(snapshot(1)));
        assert!(render(&mut a).contains("monitorz [dashboard]"));

        a.on_key(key(KeyCode::Tab));
        assert_eq!(a.section_key(), "processes");
        assert!(render(&mut a).contains("monitorz [processes]"));

        a.on_key(key(KeyCode::Char('4')));
        assert!(render(&mut a).contains("monitorz [config]"));
    }

    #[tokio::test]
    async fn enter_opens_detail_and_esc_closes_it() {
        let mut a = app();
        a.set_state(loaded(snapshot(3)));
        a.on_key(key(KeyCode::Char('2')));
        a.on_key(key(KeyCode::Enter));
        assert_eq!(a.detail(), &DetailState::Loading { pid: 100 });

        a.on_key(key(KeyCode::Esc));
        assert!(a.detail().is_idle());
        assert!(!a.should_quit());
        a.on_key(key(KeyCode::Esc));
        assert!(a.should_quit());
    }

    #[tokio::test]
    async fn failed_detail_is_rendered() {
        let mut a = app();
        a.set_state(loaded(snapshot(3)));
        a.on_key(key(KeyCode::Char('2')));
        a.on_key(key(KeyCode::Down));
        a.on_key(key(KeyCode::Enter));
        while a.detail().pid() == Some(101) && !matches!(a.detail(), DetailState::Failed { .. }) {
            tokio::task::yield_now().await;
            a.sync();
        }
        let screen = render(&mut a);
        assert!(screen.contains("Could not load process 101"));
        assert!(screen.contains("HTTP 404"));
    }
}

//! App state machine and screen routing.

use std::collections::BTreeSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, TableState};
use tokio::sync::mpsc;

use screcon_client::{ApiClient, CancellationToken};
use screcon_core::{
    Orchestrator, Phase, RunEvent, ScanRequest, default_selection, expand_selection, is_locked,
};
use screcon_types::Scan;

use super::event::UiEvent;
use super::screens;
use super::theme;

// ---------------------------------------------------------------------------
// Screen enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Scans,
    NewScan,
    Help,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Scans, Screen::NewScan, Screen::Help];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scans => "Scans",
            Self::NewScan => "New scan",
            Self::Help => "Help",
        }
    }
}

// ---------------------------------------------------------------------------
// Actions that screens can request
// ---------------------------------------------------------------------------

pub enum Action {
    Quit,
    SwitchScreen(Screen),
    Reload,
    /// Issue the delete for the pending confirmation overlay.
    ConfirmDelete(i64),
    StartScan,
    CancelRun,
}

// ---------------------------------------------------------------------------
// Detail tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailTab {
    Cves,
    Bannergrab,
    Whatweb,
    Subdomains,
    SmbShares,
}

impl DetailTab {
    pub const ALL: [DetailTab; 5] = [
        DetailTab::Cves,
        DetailTab::Bannergrab,
        DetailTab::Whatweb,
        DetailTab::Subdomains,
        DetailTab::SmbShares,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cves => "CVEs",
            Self::Bannergrab => "Bannergrab",
            Self::Whatweb => "WhatWeb",
            Self::Subdomains => "Subdomains",
            Self::SmbShares => "SMB Shares",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

// ---------------------------------------------------------------------------
// Per-screen state structs
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScansScreenState {
    pub selected_id: Option<i64>,
    pub table_state: TableState,
    pub cve_table_state: TableState,
    pub active_tab_idx: usize,
    pub confirm_delete: Option<(i64, String)>,
    pub deleting: bool,
    /// Last delete failure; shown in the status line without blocking
    /// anything else.
    pub status: Option<String>,
}

impl ScansScreenState {
    pub fn active_tab(&self) -> DetailTab {
        DetailTab::ALL[self.active_tab_idx % DetailTab::ALL.len()]
    }

    pub fn set_tab(&mut self, tab: DetailTab) {
        self.active_tab_idx = DetailTab::ALL.iter().position(|t| *t == tab).unwrap_or(0);
        self.cve_table_state = TableState::default();
    }
}

pub struct NewScanState {
    pub ip: String,
    pub timing: String,
    /// Kept normalized: always equal to its own dependency expansion.
    pub selected: BTreeSet<Phase>,
    /// 0 = target field, 1 = timing field, 2.. = phase checkboxes in
    /// [`Phase::CHOICES`] order.
    pub focused_field: usize,
    pub running: bool,
    pub log_lines: Vec<String>,
    pub error: Option<String>,
    pub total_steps: usize,
    pub done_steps: usize,
    pub current_step: Option<&'static str>,
    pub cancel: Option<CancellationToken>,
}

impl NewScanState {
    pub const FIELD_COUNT: usize = 2 + Phase::CHOICES.len();

    fn new(default_timing: u8) -> Self {
        Self {
            ip: String::new(),
            timing: default_timing.to_string(),
            selected: default_selection(),
            focused_field: 0,
            running: false,
            log_lines: Vec::new(),
            error: None,
            total_steps: 0,
            done_steps: 0,
            current_step: None,
            cancel: None,
        }
    }

    /// Toggle a checkbox, keeping the displayed set closed under the
    /// dependency expansion. Locked prerequisites cannot be unchecked.
    pub fn toggle(&mut self, phase: Phase) {
        if is_locked(&self.selected, phase) {
            return;
        }
        if !self.selected.remove(&phase) {
            self.selected.insert(phase);
        }
        self.selected = expand_selection(&self.selected);
    }

    pub fn log(&mut self, line: String) {
        self.log_lines.push(line);
        if self.log_lines.len() > 200 {
            self.log_lines.remove(0);
        }
    }

    pub fn progress_ratio(&self) -> f64 {
        if self.total_steps == 0 {
            0.0
        } else {
            self.done_steps as f64 / self.total_steps as f64
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    client: ApiClient,
    ui_tx: mpsc::Sender<UiEvent>,
    default_timing: u8,

    pub screen: Screen,
    pub scans: Vec<Scan>,
    pub loading: bool,
    pub load_error: Option<String>,

    pub scans_state: ScansScreenState,
    pub new_scan: NewScanState,
    pub help_scroll: u16,

    /// Cancels list/delete calls still in flight when the app quits.
    cancel: CancellationToken,
    pub should_quit: bool,
}

impl App {
    pub fn new(client: ApiClient, default_timing: u8, ui_tx: mpsc::Sender<UiEvent>) -> Self {
        Self {
            client,
            ui_tx,
            default_timing,
            screen: Screen::Scans,
            scans: Vec::new(),
            loading: false,
            load_error: None,
            scans_state: ScansScreenState::default(),
            new_scan: NewScanState::new(default_timing),
            help_scroll: 0,
            cancel: CancellationToken::new(),
            should_quit: false,
        }
    }

    /// Re-fetch the whole scan collection. The collection is only ever
    /// replaced wholesale, never patched.
    pub fn reload(&mut self) {
        self.loading = true;
        self.load_error = None;

        let client = self.client.clone();
        let tx = self.ui_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            match client.list_scans(&cancel).await {
                Ok(scans) => {
                    let _ = tx.send(UiEvent::ScansLoaded(scans)).await;
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    let _ = tx.send(UiEvent::LoadFailed(e.to_string())).await;
                }
            }
        });
    }

    fn delete_scan(&mut self, scan_id: i64) {
        self.scans_state.deleting = true;
        self.scans_state.status = None;

        let client = self.client.clone();
        let tx = self.ui_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            match client.delete_scan(scan_id, &cancel).await {
                Ok(()) => {
                    let _ = tx.send(UiEvent::Deleted).await;
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    let _ = tx.send(UiEvent::DeleteFailed(e.to_string())).await;
                }
            }
        });
    }

    /// Validate the new-scan form and kick off an orchestration run.
    fn start_scan(&mut self) {
        if self.new_scan.running {
            return;
        }

        let ip = self.new_scan.ip.trim().to_string();
        if ip.is_empty() {
            self.new_scan.error = Some("Target IP is required.".into());
            return;
        }
        let timing = match self.new_scan.timing.trim().parse::<u8>() {
            Ok(t) if t <= 5 => t,
            _ => {
                self.new_scan.error = Some("Timing must be a number from 0 to 5.".into());
                return;
            }
        };
        if self.new_scan.selected.is_empty() {
            self.new_scan.error = Some("Select at least one scan.".into());
            return;
        }

        self.new_scan.error = None;
        self.new_scan.log_lines.clear();
        self.new_scan.running = true;
        self.new_scan.total_steps = 0;
        self.new_scan.done_steps = 0;
        self.new_scan.current_step = None;

        let cancel = CancellationToken::new();
        self.new_scan.cancel = Some(cancel.clone());

        let request = ScanRequest {
            ip,
            timing,
            phases: self.new_scan.selected.clone(),
        };
        let client = self.client.clone();
        let (run_tx, mut run_rx) = mpsc::channel::<RunEvent>(64);

        // Bridge orchestrator events into the unified UI channel
        let forward = self.ui_tx.clone();
        tokio::spawn(async move {
            while let Some(evt) = run_rx.recv().await {
                if forward.send(UiEvent::Run(evt)).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            Orchestrator::run_streaming(&client, &request, run_tx, cancel).await;
        });
    }

    // The orchestrator reports the cancellation as a run log event, so
    // nothing is appended here.
    fn cancel_run(&mut self) {
        if let Some(cancel) = self.new_scan.cancel.take() {
            cancel.cancel();
        }
        self.new_scan.running = false;
    }

    // -----------------------------------------------------------------------
    // Event handling
    // -----------------------------------------------------------------------

    pub fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::ScansLoaded(mut scans) => {
                sort_scans(&mut scans);
                self.loading = false;
                self.load_error = None;
                self.scans = scans;
                self.scans_state.selected_id =
                    select_after_reload(self.scans_state.selected_id, &self.scans);
                self.sync_table_selection();
            }
            UiEvent::LoadFailed(msg) => {
                self.loading = false;
                self.load_error = Some(msg);
                self.scans.clear();
                self.scans_state.selected_id = None;
                self.sync_table_selection();
            }
            UiEvent::Deleted => {
                self.scans_state.deleting = false;
                self.reload();
            }
            UiEvent::DeleteFailed(msg) => {
                self.scans_state.deleting = false;
                self.scans_state.status = Some(msg);
            }
            UiEvent::Run(evt) => self.handle_run_event(evt),
        }
    }

    fn handle_run_event(&mut self, event: RunEvent) {
        let ns = &mut self.new_scan;
        match event {
            RunEvent::Started { total } => {
                ns.total_steps = total;
                ns.done_steps = 0;
                ns.current_step = None;
            }
            RunEvent::StepStarted { label } => ns.current_step = Some(label),
            RunEvent::Log(line) => ns.log(line),
            RunEvent::StepDone { completed, total } => {
                ns.done_steps = completed;
                ns.total_steps = total;
            }
            RunEvent::Completed { scan_id } => {
                ns.running = false;
                ns.cancel = None;
                self.scans_state.selected_id = Some(scan_id);
                self.scans_state.set_tab(DetailTab::Cves);
                self.screen = Screen::Scans;
                self.reload();
            }
            RunEvent::Failed(msg) => {
                ns.log(format!("ERROR: {msg}"));
                ns.error = Some(msg);
                ns.running = false;
                ns.cancel = None;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        // Global screen switching: F1-F3
        let global_screen = match key.code {
            KeyCode::F(1) => Some(Screen::Scans),
            KeyCode::F(2) => Some(Screen::NewScan),
            KeyCode::F(3) => Some(Screen::Help),
            _ => None,
        };
        if let Some(s) = global_screen {
            self.screen = s;
            return;
        }

        let actions = match self.screen {
            Screen::Scans => screens::scans::handle_key(key, &mut self.scans_state, &self.scans),
            Screen::NewScan => screens::newscan::handle_key(key, &mut self.new_scan),
            Screen::Help => screens::help::handle_key(key, &mut self.help_scroll),
        };

        for action in actions {
            self.apply_action(action);
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.quit(),
            Action::SwitchScreen(s) => self.screen = s,
            Action::Reload => self.reload(),
            Action::ConfirmDelete(scan_id) => self.delete_scan(scan_id),
            Action::StartScan => self.start_scan(),
            Action::CancelRun => self.cancel_run(),
        }
    }

    fn quit(&mut self) {
        self.cancel.cancel();
        if let Some(ref cancel) = self.new_scan.cancel {
            cancel.cancel();
        }
        self.should_quit = true;
    }

    /// Keep the list widget's highlighted row in sync with `selected_id`.
    fn sync_table_selection(&mut self) {
        let idx = self
            .scans_state
            .selected_id
            .and_then(|id| self.scans.iter().position(|s| s.scan_id == id));
        self.scans_state.table_state.select(idx);
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    pub fn render(&mut self, frame: &mut ratatui::Frame) {
        let size = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(6),
                Constraint::Length(1),
            ])
            .split(size);

        render_screen_bar(frame, chunks[0], self.screen);

        match self.screen {
            Screen::Scans => screens::scans::render(
                frame,
                chunks[1],
                &mut self.scans_state,
                &self.scans,
                self.loading,
                &self.load_error,
            ),
            Screen::NewScan => screens::newscan::render(frame, chunks[1], &mut self.new_scan),
            Screen::Help => screens::help::render(frame, chunks[1], self.help_scroll),
        }

        let hints = match self.screen {
            Screen::Scans => screens::scans::footer_hints(&self.scans_state),
            Screen::NewScan => screens::newscan::footer_hints(&self.new_scan),
            Screen::Help => screens::help::footer_hints(),
        };
        render_footer(frame, chunks[2], &hints);
    }
}

// ---------------------------------------------------------------------------
// Collection rules (pure, render-free)
// ---------------------------------------------------------------------------

/// Newest first. `created_at` is ISO-8601, so lexicographic comparison
/// matches chronological order.
pub fn sort_scans(scans: &mut [Scan]) {
    scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Selection rule after a wholesale reload: keep the previous id if it is
/// still present, otherwise the first of the freshly sorted collection,
/// otherwise nothing.
pub fn select_after_reload(prev: Option<i64>, scans: &[Scan]) -> Option<i64> {
    if let Some(id) = prev {
        if scans.iter().any(|s| s.scan_id == id) {
            return Some(id);
        }
    }
    scans.first().map(|s| s.scan_id)
}

// ---------------------------------------------------------------------------
// Shared widgets
// ---------------------------------------------------------------------------

fn render_screen_bar(frame: &mut ratatui::Frame, area: Rect, active: Screen) {
    let mut spans = Vec::new();
    for screen in Screen::ALL {
        let style = if screen == active {
            theme::TAB_ACTIVE
        } else {
            theme::TAB_INACTIVE
        };
        spans.push(Span::styled(format!(" {} ", screen.label()), style));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(
        format!("  SCRecon v{}", env!("CARGO_PKG_VERSION")),
        theme::TEXT_DIM,
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, hints: &[(&str, &str)]) {
    let mut spans = Vec::new();
    for (key, desc) in hints {
        spans.push(Span::styled(format!(" {key}"), theme::FOOTER_KEY));
        spans.push(Span::raw(format!(":{desc}  ")));
    }
    spans.push(Span::styled(" F1-F3", theme::FOOTER_KEY));
    spans.push(Span::raw(":screens"));
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(theme::FOOTER_BG),
        area,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

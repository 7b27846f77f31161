//! New-scan screen: target form, phase checkboxes, and the live run view
//! (progress gauge plus log pane).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};

use screcon_core::{Phase, is_locked};

use crate::tui::app::{Action, NewScanState, Screen};
use crate::tui::theme;

pub fn handle_key(key: KeyEvent, state: &mut NewScanState) -> Vec<Action> {
    if state.running {
        if key.code == KeyCode::Esc {
            return vec![Action::CancelRun];
        }
        return Vec::new();
    }

    match key.code {
        KeyCode::Esc => return vec![Action::SwitchScreen(Screen::Scans)],
        KeyCode::Enter => return vec![Action::StartScan],
        KeyCode::Tab | KeyCode::Down => {
            state.focused_field = (state.focused_field + 1) % NewScanState::FIELD_COUNT;
        }
        KeyCode::BackTab | KeyCode::Up => {
            state.focused_field =
                (state.focused_field + NewScanState::FIELD_COUNT - 1) % NewScanState::FIELD_COUNT;
        }
        KeyCode::Char(' ') => {
            if let Some(phase) = focused_phase(state.focused_field) {
                state.toggle(phase);
            }
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return Vec::new();
            }
            match state.focused_field {
                0 => state.ip.push(c),
                1 => {
                    if c.is_ascii_digit() {
                        state.timing.push(c);
                    }
                }
                _ => {}
            }
        }
        KeyCode::Backspace => match state.focused_field {
            0 => {
                state.ip.pop();
            }
            1 => {
                state.timing.pop();
            }
            _ => {}
        },
        _ => {}
    }
    Vec::new()
}

fn focused_phase(focused_field: usize) -> Option<Phase> {
    focused_field
        .checked_sub(2)
        .and_then(|i| Phase::CHOICES.get(i).copied())
}

pub fn footer_hints(state: &NewScanState) -> Vec<(&'static str, &'static str)> {
    if state.running {
        vec![("Esc", "cancel scan")]
    } else {
        vec![
            ("Tab", "next field"),
            ("Space", "toggle"),
            ("Enter", "start"),
            ("Esc", "back"),
        ]
    }
}

pub fn render(frame: &mut ratatui::Frame, area: Rect, state: &mut NewScanState) {
    let form_height = 7 + Phase::CHOICES.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(form_height),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    render_form(frame, chunks[0], state);

    if let Some(err) = &state.error {
        frame.render_widget(
            Paragraph::new(Span::styled(err.as_str(), theme::TEXT_ERROR)),
            chunks[1],
        );
    }

    render_progress(frame, chunks[2], state);
    render_log(frame, chunks[3], state);
}

fn render_form(frame: &mut ratatui::Frame, area: Rect, state: &NewScanState) {
    let block = Block::default().borders(Borders::ALL).title("New scan");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let field_style = |idx: usize| {
        if state.focused_field == idx && !state.running {
            theme::TEXT_ACCENT
        } else {
            theme::TEXT_DIM
        }
    };
    let cursor = |idx: usize| {
        if state.focused_field == idx && !state.running {
            "_"
        } else {
            ""
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Target IP  ", field_style(0)),
            Span::raw(state.ip.clone()),
            Span::styled(cursor(0), theme::TEXT_ACCENT),
        ]),
        Line::from(vec![
            Span::styled("Timing     ", field_style(1)),
            Span::raw(state.timing.clone()),
            Span::styled(cursor(1), theme::TEXT_ACCENT),
            Span::styled("  (0-5)", theme::TEXT_DIM),
        ]),
        Line::default(),
        Line::from(Span::styled("Scans", theme::TEXT_BOLD)),
    ];

    for (i, phase) in Phase::CHOICES.iter().enumerate() {
        let idx = i + 2;
        let checked = state.selected.contains(phase);
        let locked = is_locked(&state.selected, *phase);
        let marker = if checked { "[x]" } else { "[ ]" };

        let mut spans = vec![
            Span::styled(format!("{marker} "), field_style(idx)),
            Span::raw(phase.label()),
        ];
        if locked {
            spans.push(Span::styled("  (required)", theme::TEXT_DIM));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_progress(frame: &mut ratatui::Frame, area: Rect, state: &NewScanState) {
    let label = if state.running {
        match state.current_step {
            Some(step) => format!("{step}  ({}/{})", state.done_steps, state.total_steps),
            None => format!("{}/{}", state.done_steps, state.total_steps),
        }
    } else if state.total_steps > 0 && state.done_steps == state.total_steps {
        "done".to_string()
    } else {
        "idle".to_string()
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(ratatui::style::Style::new().fg(theme::GAUGE_FG).bg(theme::GAUGE_BG))
        .ratio(state.progress_ratio().clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, area);
}

fn render_log(frame: &mut ratatui::Frame, area: Rect, state: &NewScanState) {
    let block = Block::default().borders(Borders::ALL).title("Log");
    let visible = block.inner(area).height as usize;

    let start = state.log_lines.len().saturating_sub(visible);
    let items: Vec<ListItem> = state.log_lines[start..]
        .iter()
        .map(|line| {
            let style = if line.starts_with("ERROR") {
                theme::TEXT_ERROR
            } else {
                ratatui::style::Style::default()
            };
            ListItem::new(Span::styled(line.clone(), style))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

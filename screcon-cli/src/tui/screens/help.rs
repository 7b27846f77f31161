//! Static key reference.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::Action;
use crate::tui::theme;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Global",
        &[
            ("F1", "Scans screen"),
            ("F2", "New scan screen"),
            ("F3", "This help"),
            ("Ctrl+C", "Quit"),
        ],
    ),
    (
        "Scans",
        &[
            ("j / k, Down / Up", "Select scan"),
            ("Tab, 1-5", "Switch detail tab"),
            ("J / K", "Select CVE row"),
            ("d, Delete", "Delete selected scan (asks first)"),
            ("r", "Reload the scan list"),
            ("q", "Quit"),
        ],
    ),
    (
        "New scan",
        &[
            ("Tab / Shift+Tab", "Move between fields"),
            ("Space", "Toggle a scan checkbox"),
            ("Enter", "Start the scan"),
            ("Esc", "Cancel a running scan"),
        ],
    ),
];

pub fn handle_key(key: KeyEvent, scroll: &mut u16) -> Vec<Action> {
    match key.code {
        KeyCode::Char('q') => return vec![Action::Quit],
        KeyCode::Down | KeyCode::Char('j') => *scroll = scroll.saturating_add(1),
        KeyCode::Up | KeyCode::Char('k') => *scroll = scroll.saturating_sub(1),
        _ => {}
    }
    Vec::new()
}

pub fn footer_hints() -> Vec<(&'static str, &'static str)> {
    vec![("j/k", "scroll"), ("q", "quit")]
}

pub fn render(frame: &mut ratatui::Frame, area: Rect, scroll: u16) {
    let mut lines = Vec::new();
    for (title, entries) in SECTIONS {
        lines.push(Line::from(Span::styled(*title, theme::TEXT_BOLD)));
        for (key, desc) in *entries {
            lines.push(Line::from(vec![
                Span::styled(format!("  {key:<20}"), theme::FOOTER_KEY),
                Span::raw(*desc),
            ]));
        }
        lines.push(Line::default());
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .scroll((scroll, 0));
    frame.render_widget(widget, area);
}

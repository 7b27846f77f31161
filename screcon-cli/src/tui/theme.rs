//! Color constants and styling helpers for the TUI.

use ratatui::style::{Color, Modifier, Style};

// Tab bars (screen bar and detail tabs)
pub const TAB_ACTIVE: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const TAB_INACTIVE: Style = Style::new().fg(Color::DarkGray).bg(Color::Reset);

// Progress gauge
pub const GAUGE_FG: Color = Color::Green;
pub const GAUGE_BG: Color = Color::Black;

// Panels / tables
pub const LIST_HIGHLIGHT: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const TABLE_HEADER: Style = Style::new().add_modifier(Modifier::BOLD);

// Text
pub const TEXT_DIM: Style = Style::new().fg(Color::DarkGray);
pub const TEXT_ACCENT: Style = Style::new().fg(Color::Cyan);
pub const TEXT_ERROR: Style = Style::new().fg(Color::Red);
pub const TEXT_BOLD: Style = Style::new().add_modifier(Modifier::BOLD);

// Footer
pub const FOOTER_KEY: Style = Style::new().fg(Color::Yellow);
pub const FOOTER_BG: Style = Style::new().bg(Color::DarkGray);

// Delete confirmation overlay
pub const OVERLAY_BORDER: Style = Style::new().fg(Color::Red);

/// Style a CVSS base-severity label the way security tooling colors them.
pub fn severity_style(severity: Option<&str>) -> Style {
    match severity.map(str::to_ascii_uppercase).as_deref() {
        Some("CRITICAL") => Style::new().fg(Color::Red).add_modifier(Modifier::BOLD),
        Some("HIGH") => Style::new().fg(Color::Red),
        Some("MEDIUM") => Style::new().fg(Color::Yellow),
        Some("LOW") => Style::new().fg(Color::Green),
        _ => TEXT_DIM,
    }
}

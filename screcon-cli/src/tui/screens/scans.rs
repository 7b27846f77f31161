//! Scans screen: collection list on the left, per-scan detail tabs on the
//! right, plus the delete confirmation overlay.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};

use screcon_parse::{
    normalize_cvss, parse_banner_grab, parse_port_services, parse_smb_shares, parse_subdomains,
    sort_cves_by_cvss_desc,
};
use screcon_types::Scan;

use crate::tui::app::{Action, DetailTab, ScansScreenState};
use crate::tui::theme;

// ---------------------------------------------------------------------------
// Key handling
// ---------------------------------------------------------------------------

pub fn handle_key(key: KeyEvent, state: &mut ScansScreenState, scans: &[Scan]) -> Vec<Action> {
    // The confirmation overlay swallows everything except its own answers.
    if let Some((scan_id, _)) = state.confirm_delete.clone() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                state.confirm_delete = None;
                return vec![Action::ConfirmDelete(scan_id)];
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.confirm_delete = None;
            }
            _ => {}
        }
        return Vec::new();
    }

    match key.code {
        KeyCode::Char('q') => return vec![Action::Quit],
        KeyCode::Char('r') => return vec![Action::Reload],
        KeyCode::Down | KeyCode::Char('j') => move_selection(state, scans, 1),
        KeyCode::Up | KeyCode::Char('k') => move_selection(state, scans, -1),
        KeyCode::Tab => {
            state.set_tab(state.active_tab().next());
        }
        KeyCode::Char('J') | KeyCode::PageDown => move_cve_selection(state, scans, 1),
        KeyCode::Char('K') | KeyCode::PageUp => move_cve_selection(state, scans, -1),
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            state.set_tab(DetailTab::ALL[idx]);
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if !state.deleting
                && let Some(scan) = selected_scan(state, scans)
            {
                state.confirm_delete = Some((scan.scan_id, scan.ip.clone()));
            }
        }
        _ => {}
    }
    Vec::new()
}

fn selected_scan<'a>(state: &ScansScreenState, scans: &'a [Scan]) -> Option<&'a Scan> {
    state
        .selected_id
        .and_then(|id| scans.iter().find(|s| s.scan_id == id))
}

fn move_cve_selection(state: &mut ScansScreenState, scans: &[Scan], delta: i64) {
    if state.active_tab() != DetailTab::Cves {
        return;
    }
    let count = selected_scan(state, scans).map_or(0, Scan::cve_count);
    if count == 0 {
        return;
    }
    let current = state.cve_table_state.selected().unwrap_or(0) as i64;
    let next = (current + delta).clamp(0, count as i64 - 1) as usize;
    state.cve_table_state.select(Some(next));
}

fn move_selection(state: &mut ScansScreenState, scans: &[Scan], delta: i64) {
    if scans.is_empty() {
        return;
    }
    let current = state
        .selected_id
        .and_then(|id| scans.iter().position(|s| s.scan_id == id))
        .unwrap_or(0) as i64;
    let next = (current + delta).clamp(0, scans.len() as i64 - 1) as usize;
    state.selected_id = Some(scans[next].scan_id);
    state.table_state.select(Some(next));
    state.cve_table_state.select(None);
}

pub fn footer_hints(state: &ScansScreenState) -> Vec<(&'static str, &'static str)> {
    if state.confirm_delete.is_some() {
        vec![("y", "delete"), ("n", "keep")]
    } else {
        vec![
            ("j/k", "select"),
            ("J/K", "CVE row"),
            ("Tab/1-5", "detail tab"),
            ("d", "delete"),
            ("r", "reload"),
            ("q", "quit"),
        ]
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    state: &mut ScansScreenState,
    scans: &[Scan],
    loading: bool,
    load_error: &Option<String>,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(40)])
        .split(area);

    render_list(frame, columns[0], state, scans, loading, load_error);
    render_detail(frame, columns[1], state, scans);

    if let Some((_, ref ip)) = state.confirm_delete {
        render_confirm_overlay(frame, area, ip);
    }
}

fn render_list(
    frame: &mut ratatui::Frame,
    area: Rect,
    state: &mut ScansScreenState,
    scans: &[Scan],
    loading: bool,
    load_error: &Option<String>,
) {
    let title = if loading {
        "Scans (loading...)".to_string()
    } else {
        format!("Scans ({})", scans.len())
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some(err) = load_error {
        let msg = Paragraph::new(Line::from(Span::styled(err.as_str(), theme::TEXT_ERROR)))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(msg, area);
        return;
    }
    if scans.is_empty() {
        let msg = Paragraph::new(Span::styled("No scans yet. Press F2.", theme::TEXT_DIM))
            .block(block);
        frame.render_widget(msg, area);
        return;
    }

    let rows: Vec<Row> = scans
        .iter()
        .map(|s| {
            let cves = s.cve_count();
            let cve_cell = if cves > 0 {
                Cell::from(cves.to_string()).style(theme::TEXT_ERROR)
            } else {
                Cell::from("-").style(theme::TEXT_DIM)
            };
            Row::new(vec![
                Cell::from(s.ip.clone()),
                Cell::from(date_part(&s.created_at).to_string()).style(theme::TEXT_DIM),
                cve_cell,
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(15),
            Constraint::Length(10),
            Constraint::Length(5),
        ],
    )
    .header(Row::new(vec!["Target", "Date", "CVEs"]).style(theme::TABLE_HEADER))
    .block(block)
    .row_highlight_style(theme::LIST_HIGHLIGHT);

    frame.render_stateful_widget(table, area, &mut state.table_state);

    if let Some(status) = &state.status
        && area.height > 2
    {
        let line = Rect::new(area.x + 1, area.y + area.height - 2, area.width - 2, 1);
        frame.render_widget(
            Paragraph::new(Span::styled(status.as_str(), theme::TEXT_ERROR)),
            line,
        );
    }
}

/// `created_at` is ISO-8601; the date is its first 10 characters.
fn date_part(created_at: &str) -> &str {
    created_at.get(..10).unwrap_or(created_at)
}

fn render_detail(
    frame: &mut ratatui::Frame,
    area: Rect,
    state: &mut ScansScreenState,
    scans: &[Scan],
) {
    let block = Block::default().borders(Borders::ALL).title("Detail");
    let Some(scan) = selected_scan(state, scans).cloned() else {
        frame.render_widget(
            Paragraph::new(Span::styled("Select a scan.", theme::TEXT_DIM)).block(block),
            area,
        );
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(inner);

    // Target card
    let card = vec![
        Line::from(vec![
            Span::styled(scan.ip.clone(), theme::TEXT_BOLD),
            Span::styled(format!("  scan #{}", scan.scan_id), theme::TEXT_DIM),
            Span::styled(format!("  T{}", scan.timing), theme::TEXT_DIM),
        ]),
        Line::from(Span::styled(scan.created_at.clone(), theme::TEXT_DIM)),
    ];
    frame.render_widget(Paragraph::new(card), rows[0]);

    // Detail tab bar
    let mut spans = Vec::new();
    for tab in DetailTab::ALL {
        let style = if tab == state.active_tab() {
            theme::TAB_ACTIVE
        } else {
            theme::TAB_INACTIVE
        };
        spans.push(Span::styled(format!(" {} ", tab.label()), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), rows[1]);

    match state.active_tab() {
        DetailTab::Cves => render_cves_tab(frame, rows[2], state, &scan),
        DetailTab::Bannergrab => render_banner_tab(frame, rows[2], &scan),
        DetailTab::Whatweb => render_whatweb_tab(frame, rows[2], &scan),
        DetailTab::Subdomains => render_subdomains_tab(frame, rows[2], &scan),
        DetailTab::SmbShares => render_smb_tab(frame, rows[2], &scan),
    }
}

fn render_cves_tab(
    frame: &mut ratatui::Frame,
    area: Rect,
    state: &mut ScansScreenState,
    scan: &Scan,
) {
    let Some(lookup) = scan.cves.as_ref() else {
        render_absent(frame, area, "No CVE lookup for this scan.");
        return;
    };
    if lookup.cves.is_empty() {
        render_absent(frame, area, "No CVEs found.");
        return;
    }

    let mut entries: Vec<_> = lookup
        .cves
        .iter()
        .map(|(id, details)| (id.clone(), details.clone()))
        .collect();
    sort_cves_by_cvss_desc(&mut entries);

    let rows: Vec<Row> = entries
        .iter()
        .map(|(id, details)| {
            let cvss = normalize_cvss(details);
            let score = cvss
                .score
                .map_or_else(|| "-".to_string(), |s| format!("{s:.1}"));
            let version = cvss
                .version
                .map_or_else(|| "-".to_string(), |v| v.to_string());
            let severity = cvss.severity.as_deref().unwrap_or("-").to_string();
            let modules = scan
                .metamodules
                .as_ref()
                .map_or(0, |m| m.modules_for(id).len());
            let description = details
                .description_en
                .as_deref()
                .unwrap_or("-")
                .replace('\n', " ");
            Row::new(vec![
                Cell::from(id.clone()).style(theme::TEXT_ACCENT),
                Cell::from(score),
                Cell::from(version).style(theme::TEXT_DIM),
                Cell::from(severity.clone()).style(theme::severity_style(Some(&severity))),
                Cell::from(if modules > 0 {
                    modules.to_string()
                } else {
                    "-".into()
                }),
                Cell::from(description),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Length(9),
            Constraint::Length(4),
            Constraint::Min(20),
        ],
    )
    .header(
        Row::new(vec!["CVE", "Score", "Ver", "Severity", "MSF", "Description"])
            .style(theme::TABLE_HEADER),
    )
    .row_highlight_style(theme::LIST_HIGHLIGHT);

    if state.cve_table_state.selected().is_none() {
        state.cve_table_state.select(Some(0));
    }
    let highlighted = state
        .cve_table_state
        .selected()
        .and_then(|i| entries.get(i));
    let vector = highlighted.and_then(|(_, details)| normalize_cvss(details).vector);
    let cve_id = highlighted.map(|(id, _)| id.clone());
    let modules = cve_id
        .as_deref()
        .and_then(|id| scan.metamodules.as_ref().map(|m| m.modules_for(id)))
        .unwrap_or(&[]);

    if modules.is_empty() && vector.is_none() {
        frame.render_stateful_widget(table, area, &mut state.cve_table_state);
        return;
    }

    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(8)])
        .split(area);
    frame.render_stateful_widget(table, halves[0], &mut state.cve_table_state);
    render_cve_detail_pane(
        frame,
        halves[1],
        cve_id.as_deref().unwrap_or(""),
        vector.as_deref(),
        modules,
    );
}

/// CVSS vector and Metasploit modules for the highlighted CVE.
fn render_cve_detail_pane(
    frame: &mut ratatui::Frame,
    area: Rect,
    cve_id: &str,
    vector: Option<&str>,
    modules: &[screcon_types::MetamoduleResult],
) {
    let block = Block::default()
        .borders(Borders::TOP)
        .title(cve_id.to_string());

    let mut lines = Vec::new();
    if let Some(vector) = vector {
        lines.push(Line::from(vec![
            Span::styled("Vector  ", theme::TEXT_DIM),
            Span::raw(vector.to_string()),
        ]));
    }
    if !modules.is_empty() {
        lines.push(Line::from(Span::styled(
            "Metasploit modules",
            theme::TEXT_BOLD,
        )));
    }
    for module in modules {
        let mut header = vec![
            Span::styled(module.display_name().to_string(), theme::TEXT_ACCENT),
            Span::styled(format!("  [{}]", module.module_type), theme::TEXT_DIM),
        ];
        if let Some(rank) = &module.rank {
            header.push(Span::styled(format!("  rank: {rank}"), theme::TEXT_DIM));
        }
        if let Some(date) = &module.disclosure_date {
            header.push(Span::styled(format!("  disclosed: {date}"), theme::TEXT_DIM));
        }
        lines.push(Line::from(header));
        if !module.module_refname.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {}", module.module_refname),
                theme::TEXT_DIM,
            )));
        }
        if let Some(desc) = &module.description {
            lines.push(Line::from(format!("  {}", desc.replace('\n', " "))));
        }
    }

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_banner_tab(frame: &mut ratatui::Frame, area: Rect, scan: &Scan) {
    let banners = parse_banner_grab(scan.bannergrab_raw());
    let ports = parse_port_services(scan.portscan_raw());
    if banners.is_empty() && ports.is_empty() {
        render_absent(frame, area, "No banner or port data for this scan.");
        return;
    }

    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(port_table_height(ports.len()))])
        .split(area);

    let banner_rows: Vec<Row> = banners
        .iter()
        .map(|b| {
            Row::new(vec![
                Cell::from(port_cell(b.port)),
                Cell::from(b.service.clone()),
                Cell::from(b.product.clone()),
                Cell::from(b.version.clone()),
            ])
        })
        .collect();
    let banner_table = Table::new(
        banner_rows,
        [
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Min(16),
            Constraint::Length(14),
        ],
    )
    .header(Row::new(vec!["Port", "Service", "Product", "Version"]).style(theme::TABLE_HEADER))
    .block(Block::default().borders(Borders::BOTTOM).title("Banners"));
    frame.render_widget(banner_table, halves[0]);

    let port_rows: Vec<Row> = ports
        .iter()
        .map(|p| Row::new(vec![Cell::from(port_cell(p.port)), Cell::from(p.service.clone())]))
        .collect();
    let port_table = Table::new(port_rows, [Constraint::Length(6), Constraint::Min(14)])
        .header(Row::new(vec!["Port", "Service"]).style(theme::TABLE_HEADER))
        .block(Block::default().title("Open ports"));
    frame.render_widget(port_table, halves[1]);
}

/// Rows plus header and border. A full-range port scan can exceed `u16`,
/// so the count saturates; the layout clamps to the area anyway.
fn port_table_height(rows: usize) -> u16 {
    rows.saturating_add(3).min(u16::MAX as usize) as u16
}

fn port_cell(port: Option<u32>) -> String {
    port.map_or_else(|| "n/a".to_string(), |p| p.to_string())
}

fn render_whatweb_tab(frame: &mut ratatui::Frame, area: Rect, scan: &Scan) {
    let Some(report) = scan.whatweb.as_ref().filter(|r| !r.is_empty()) else {
        render_absent(frame, area, "No WhatWeb report for this scan.");
        return;
    };

    let mut lines = Vec::new();
    let field = |label: &str, value: &Option<String>| {
        Line::from(vec![
            Span::styled(format!("{label:<10}"), theme::TEXT_DIM),
            Span::raw(value.as_deref().unwrap_or("-").to_string()),
        ])
    };
    lines.push(field("Target", &report.report_for));
    lines.push(field("Status", &report.status));
    lines.push(field("Title", &report.title));
    lines.push(field("IP", &report.ip));
    lines.push(field("Country", &report.country));

    if !report.summary_plugins.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Plugins", theme::TEXT_BOLD)));
        for plugin in &report.summary_plugins {
            lines.push(Line::from(vec![
                Span::styled(format!("  {}: ", plugin.name), theme::TEXT_ACCENT),
                Span::raw(plugin.summary_values.join(", ")),
            ]));
        }
    }

    if !report.detected_plugins.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Detected plugins", theme::TEXT_BOLD)));
        for (name, value) in &report.detected_plugins {
            lines.push(Line::from(Span::styled(
                format!("  {name}"),
                theme::TEXT_ACCENT,
            )));
            if let Some(map) = value.as_object() {
                for (key, v) in map {
                    let rendered = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                    lines.push(Line::from(vec![
                        Span::styled(format!("    {key}: "), theme::TEXT_DIM),
                        Span::raw(rendered),
                    ]));
                }
            } else {
                let rendered = value
                    .as_str()
                    .map_or_else(|| value.to_string(), str::to_string);
                lines.push(Line::from(format!("    {rendered}")));
            }
        }
    }

    if !report.http_headers.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("HTTP headers", theme::TEXT_BOLD)));
        for (name, value) in &report.http_headers {
            let rendered = value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_string);
            lines.push(Line::from(vec![
                Span::styled(format!("  {name}: "), theme::TEXT_DIM),
                Span::raw(rendered),
            ]));
        }
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn render_subdomains_tab(frame: &mut ratatui::Frame, area: Rect, scan: &Scan) {
    let rows = parse_subdomains(scan.subdomains_raw());
    if rows.is_empty() {
        render_absent(frame, area, "No subdomain data for this scan.");
        return;
    }

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| Row::new(vec![Cell::from(r.path.clone()), Cell::from(r.status.clone())]))
        .collect();
    let table = Table::new(table_rows, [Constraint::Min(30), Constraint::Length(10)])
        .header(Row::new(vec!["Path", "Status"]).style(theme::TABLE_HEADER));
    frame.render_widget(table, area);
}

fn render_smb_tab(frame: &mut ratatui::Frame, area: Rect, scan: &Scan) {
    let rows = parse_smb_shares(scan.smbshares_raw());
    if rows.is_empty() {
        render_absent(frame, area, "No SMB shares for this scan.");
        return;
    }

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.name.clone()),
                Cell::from(r.share_type.clone()),
                Cell::from(r.comment.clone()),
                Cell::from(r.path.clone()),
                Cell::from(r.anonymous_access.clone()),
            ])
        })
        .collect();
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Min(14),
            Constraint::Min(14),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Share", "Type", "Comment", "Path", "Anon"]).style(theme::TABLE_HEADER),
    );
    frame.render_widget(table, area);
}

fn render_absent(frame: &mut ratatui::Frame, area: Rect, message: &str) {
    frame.render_widget(
        Paragraph::new(Span::styled(message.to_string(), theme::TEXT_DIM)),
        area,
    );
}

fn render_confirm_overlay(frame: &mut ratatui::Frame, area: Rect, ip: &str) {
    let width = (area.width * 3 / 5).clamp(30, 60).min(area.width);
    let height = 5u16.min(area.height);
    let overlay = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, overlay);
    let body = vec![
        Line::from(format!("Delete the scan for {ip}?")),
        Line::default(),
        Line::from(vec![
            Span::styled("y", theme::FOOTER_KEY),
            Span::raw(" delete    "),
            Span::styled("n", theme::FOOTER_KEY),
            Span::raw(" keep"),
        ]),
    ];
    let widget = Paragraph::new(body).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::OVERLAY_BORDER)
            .title("Confirm delete"),
    );
    frame.render_widget(widget, overlay);
}

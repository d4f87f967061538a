//! Process detail pane.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use serde_json::Value;

use crate::dashboard::one_decimal;
use crate::detail::DetailState;
use crate::types::ProcessDetail;
use crate::ui::theme::{ACCENT, ERROR, MUTED};
use crate::ui::util::human;

const MAX_FILES: usize = 8;

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<12}"), Style::default().fg(MUTED)),
        Span::raw(value),
    ])
}

fn scalar(v: &Value) -> String {
    match v {
        Value::Number(n) => match n.as_u64() {
            Some(b) => human(b),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn detail_lines(d: &ProcessDetail) -> Vec<Line<'_>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} ({})", d.name, d.pid),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        field("CPU", format!("{}%", one_decimal(d.cpu_percent))),
        field("Memory", format!("{}%", one_decimal(d.memory_percent))),
    ];
    if let Some(s) = &d.status {
        lines.push(field("Status", s.clone()));
    }
    if let Some(t) = d.threads {
        lines.push(field("Threads", t.to_string()));
    }
    if let Some(u) = &d.username {
        lines.push(field("User", u.clone()));
    }
    for (title, map) in [("Memory info", &d.memory_info), ("I/O", &d.io_counters)] {
        if let Some(map) = map {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(title, Style::default().fg(ACCENT))));
            for (k, v) in map {
                lines.push(field(k, scalar(v)));
            }
        }
    }
    if let Some(files) = &d.open_files {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Open files ({})", files.len()),
            Style::default().fg(ACCENT),
        )));
        for f in files.iter().take(MAX_FILES) {
            lines.push(Line::from(format!("  {f}")));
        }
        if files.len() > MAX_FILES {
            lines.push(Line::from(format!("  ... {} more", files.len() - MAX_FILES)));
        }
    }
    if let Some(conns) = &d.connections {
        lines.push(field("Connections", conns.len().to_string()));
    }
    lines
}

/// Draws over `area`; nothing is drawn while idle.
pub fn draw_detail(f: &mut ratatui::Frame<'_>, area: Rect, state: &DetailState) {
    let lines: Vec<Line> = match state {
        DetailState::Idle => return,
        DetailState::Loading { pid } => vec![Line::from(format!("Loading process {pid}..."))],
        DetailState::Loaded(d) => detail_lines(d),
        DetailState::Failed { pid, error } => vec![
            Line::from(Span::styled(
                format!("Could not load process {pid}"),
                Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
            )),
            Line::from(error.clone()),
        ],
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Process detail (Esc: close)");
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

//! Settings page: what this session is connected to and how.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::{ERROR, MUTED};

/// Agent health as last probed with `r`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HealthStatus {
    #[default]
    Unknown,
    Checking,
    Ok(String),
    Down(String),
}

#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    pub endpoint: String,
    pub interval_ms: u64,
    pub profile: Option<String>,
    pub log_dir: Option<String>,
}

fn row<'a>(label: &'a str, value: Span<'a>) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<14}"), Style::default().fg(MUTED)),
        value,
    ])
}

pub fn draw_settings(f: &mut ratatui::Frame<'_>, area: Rect, info: &SessionInfo, health: &HealthStatus) {
    let health_span = match health {
        HealthStatus::Unknown => Span::styled("not checked (press r)", Style::default().fg(MUTED)),
        HealthStatus::Checking => Span::raw("checking..."),
        HealthStatus::Ok(s) => Span::raw(s.clone()),
        HealthStatus::Down(e) => Span::styled(e.clone(), Style::default().fg(ERROR)),
    };
    let lines = vec![
        row("Endpoint", Span::raw(info.endpoint.clone())),
        row("Interval", Span::raw(format!("{} ms", info.interval_ms))),
        row(
            "Profile",
            Span::raw(info.profile.clone().unwrap_or_else(|| "-".into())),
        ),
        row(
            "Log dir",
            Span::raw(info.log_dir.clone().unwrap_or_else(|| "-".into())),
        ),
        row("Agent health", health_span),
    ];
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Settings"));
    f.render_widget(p, area);
}

//! Whole-screen loading and error views.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Paragraph, Wrap},
};

use crate::ui::theme::{ERROR, MUTED};

pub const LOADING: &str = "Loading metrics...";
pub const FAILED: &str = "Failed to load metrics";

fn centered(area: Rect, height: u16) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    rows[1]
}

pub fn draw_loading(f: &mut ratatui::Frame<'_>, area: Rect) {
    let p = Paragraph::new(Line::from(LOADING).style(Style::default().fg(MUTED)))
        .alignment(Alignment::Center);
    f.render_widget(p, centered(area, 1));
}

pub fn draw_error(f: &mut ratatui::Frame<'_>, area: Rect, message: &str) {
    let lines = vec![
        Line::from(FAILED).style(Style::default().fg(ERROR).add_modifier(Modifier::BOLD)),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("Retrying on the next poll. q: quit").style(Style::default().fg(MUTED)),
    ];
    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(p, centered(area, 4));
}

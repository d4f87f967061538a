//! The three headline cards: CPU, memory and first disk.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Gauge},
};

use crate::dashboard::DashboardView;
use crate::ui::theme::{CPU, DISK, MEMORY};

pub fn draw_cards(f: &mut ratatui::Frame<'_>, area: Rect, v: &DashboardView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let cards = [
        ("CPU", v.cpu_card(), v.ratios[0], CPU),
        ("Memory", v.memory_card(), v.ratios[1], MEMORY),
        ("Disk", v.disk_card(), v.ratios[2], DISK),
    ];
    for ((title, value, ratio, color), slot) in cards.into_iter().zip(cols.iter()) {
        draw_card(f, *slot, title, value, ratio, color);
    }
}

fn draw_card(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, value: String, ratio: f64, color: Color) {
    let g = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title.to_string()),
        )
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(value);
    f.render_widget(g, area);
}

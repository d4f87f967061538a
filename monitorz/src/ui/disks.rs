//! Disk cards with per-mount gauge and title line.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::dashboard::one_decimal;
use crate::types::DiskInfo;
use crate::ui::util::{fill_color, human, inner, truncate_middle};

fn used_pct(d: &DiskInfo) -> f64 {
    match (d.used_pct, d.used, d.total) {
        (Some(p), _, _) => p,
        (None, Some(used), Some(total)) if total > 0 => used as f64 / total as f64 * 100.0,
        _ => 0.0,
    }
}

pub fn draw_disks(f: &mut ratatui::Frame<'_>, area: Rect, disks: &[DiskInfo]) {
    f.render_widget(Block::default().borders(Borders::ALL).title("Disks"), area);
    let inner = inner(area);
    if disks.is_empty() {
        f.render_widget(Paragraph::new("No disks reported."), inner);
        return;
    }
    if inner.height < 3 {
        return;
    }

    let per_disk_h = 3u16;
    let max_cards = (inner.height / per_disk_h).min(disks.len() as u16) as usize;
    let constraints: Vec<Constraint> = (0..max_cards)
        .map(|_| Constraint::Length(per_disk_h))
        .collect();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (d, slot) in disks.iter().zip(rows.iter()) {
        let pct = used_pct(d).clamp(0.0, 100.0);
        let name = if d.mountpoint.is_empty() { &d.device } else { &d.mountpoint };
        let sizes = match (d.used, d.total) {
            (Some(u), Some(t)) => format!("{} / {}", human(u), human(t)),
            _ => String::new(),
        };
        let title = format!(
            "{}  {}  ({}%)",
            truncate_middle(name, (slot.width.saturating_sub(6)) as usize / 2),
            sizes,
            one_decimal(pct),
        );

        let card = Block::default().borders(Borders::ALL).title(title);
        f.render_widget(card, *slot);

        let inner_card = inner_rect(*slot);
        if inner_card.height == 0 {
            continue;
        }
        let g = Gauge::default()
            .ratio(pct / 100.0)
            .label("")
            .gauge_style(Style::default().fg(fill_color(pct)));
        f.render_widget(g, inner_card);
    }
}

fn inner_rect(slot: Rect) -> Rect {
    let r = inner(slot);
    Rect { height: r.height.min(1), ..r }
}

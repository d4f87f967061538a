//! Drivers page: opaque snapshot sections dumped as pretty JSON.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::types::MetricsSnapshot;
use crate::ui::theme::{ACCENT, MUTED};

pub fn raw_lines(m: &MetricsSnapshot) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (name, value) in m.raw_sections() {
        lines.push(Line::from(Span::styled(
            name.to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        lines.extend(text.lines().map(|l| Line::from(format!("  {l}"))));
        lines.push(Line::from(""));
    }
    lines
}

/// Furthest the view can scroll; very long dumps saturate instead of wrapping.
fn max_scroll(line_count: usize, area_height: u16) -> u16 {
    u16::try_from(line_count)
        .unwrap_or(u16::MAX)
        .saturating_sub(area_height.saturating_sub(2))
}

pub fn draw_raw(f: &mut ratatui::Frame<'_>, area: Rect, m: Option<&MetricsSnapshot>, scroll: &mut u16) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Drivers & hardware (Up/Down: scroll)");
    let lines = m.map(raw_lines).unwrap_or_default();
    if lines.is_empty() {
        let p = Paragraph::new(Span::styled(
            "The agent reported no driver or hardware data.",
            Style::default().fg(MUTED),
        ))
        .block(block);
        f.render_widget(p, area);
        return;
    }
    *scroll = (*scroll).min(max_scroll(lines.len(), area.height));
    f.render_widget(Paragraph::new(lines).block(block).scroll((*scroll, 0)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_titled_and_pretty_printed() {
        let m: MetricsSnapshot = serde_json::from_str(
            r#"{"drivers": {"nvidia": "550.1"}, "hw": null}"#,
        )
        .unwrap();
        let text: Vec<String> = raw_lines(&m).iter().map(|l| l.to_string()).collect();
        assert_eq!(text[0], "drivers");
        assert!(text.iter().any(|l| l.contains("\"nvidia\": \"550.1\"")));
        assert!(!text.iter().any(|l| l == "hw"));
    }

    #[test]
    fn scroll_limit_saturates_on_huge_dumps() {
        assert_eq!(max_scroll(30, 12), 20);
        assert_eq!(max_scroll(5, 12), 0);
        // 70_000 would wrap to 4_464 as a u16
        assert_eq!(max_scroll(70_000, 12), u16::MAX - 10);
        assert_eq!(max_scroll(usize::MAX, 0), u16::MAX);
    }
}

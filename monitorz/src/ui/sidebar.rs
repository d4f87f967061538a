//! Static navigation menu on the left edge.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::{ACCENT, MUTED, SELECTED_BG};

pub const APP_TITLE: &str = "MachineMonitorZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Dashboard,
    Processes,
    Drivers,
    Settings,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Dashboard,
        Section::Processes,
        Section::Drivers,
        Section::Settings,
    ];

    /// Stable key reported to the app when the section is picked.
    pub fn key(self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Processes => "processes",
            Section::Drivers => "drivers",
            Section::Settings => "config",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Processes => "Processes",
            Section::Drivers => "Drivers",
            Section::Settings => "Settings",
        }
    }

    fn index(self) -> usize {
        Section::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn next(self) -> Section {
        Section::ALL[(self.index() + 1) % Section::ALL.len()]
    }

    pub fn prev(self) -> Section {
        let n = Section::ALL.len();
        Section::ALL[(self.index() + n - 1) % n]
    }

    /// `1`..`4` jump straight to a section.
    pub fn from_digit(c: char) -> Option<Section> {
        let i = c.to_digit(10)? as usize;
        Section::ALL.get(i.checked_sub(1)?).copied()
    }
}

pub fn draw_sidebar(f: &mut ratatui::Frame<'_>, area: Rect, active: Section) {
    let mut lines = vec![
        Line::from(Span::styled(
            APP_TITLE,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (i, s) in Section::ALL.iter().enumerate() {
        let label = format!(" {} {} ", i + 1, s.title());
        let style = if *s == active {
            Style::default()
                .fg(ACCENT)
                .bg(SELECTED_BG)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        lines.push(Line::from(Span::styled(label, style)));
    }
    let block = Block::default().borders(Borders::RIGHT);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

//! Process table with selection, sorting and a scrollbar, plus the dashboard's top-5 list.

use std::cmp::Ordering;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::dashboard::{one_decimal, DashboardView};
use crate::types::ProcessSummary;
use crate::ui::theme::{MUTED, SB_ARROW, SB_THUMB, SB_TRACK, SELECTED_BG};
use crate::ui::util::{inner, load_color};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcSortBy {
    #[default]
    CpuDesc,
    MemDesc,
}

const COLS: [Constraint; 5] = [
    Constraint::Length(8),      // PID
    Constraint::Percentage(40), // Name
    Constraint::Length(8),      // CPU %
    Constraint::Length(8),      // Mem %
    Constraint::Min(8),         // User
];

/// Keyboard-driven table state. `selected` indexes the sorted order.
#[derive(Debug, Default, Clone)]
pub struct ProcessTable {
    pub selected: usize,
    pub offset: usize,
    pub sort_by: ProcSortBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    None,
    Moved,
    Resorted,
    /// Enter on a row: fetch its detail.
    Open(u32),
}

/// Row order for the current sort, descending.
pub fn sorted_indices(procs: &[ProcessSummary], sort_by: ProcSortBy) -> Vec<usize> {
    let mut idxs: Vec<usize> = (0..procs.len()).collect();
    let key = |p: &ProcessSummary| match sort_by {
        ProcSortBy::CpuDesc => p.cpu_percent,
        ProcSortBy::MemDesc => p.memory_percent,
    };
    idxs.sort_by(|&a, &b| {
        key(&procs[b])
            .partial_cmp(&key(&procs[a]))
            .unwrap_or(Ordering::Equal)
    });
    idxs
}

impl ProcessTable {
    pub fn handle_key(&mut self, key: KeyEvent, procs: &[ProcessSummary], page: usize) -> TableAction {
        let total = procs.len();
        let page = page.max(1);
        let before = self.selected;
        match key.code {
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = self.selected.saturating_add(1),
            KeyCode::PageUp => self.selected = self.selected.saturating_sub(page),
            KeyCode::PageDown => self.selected = self.selected.saturating_add(page),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = total.saturating_sub(1),
            KeyCode::Char('c') => return self.resort(ProcSortBy::CpuDesc),
            KeyCode::Char('m') => return self.resort(ProcSortBy::MemDesc),
            KeyCode::Enter => {
                let idxs = sorted_indices(procs, self.sort_by);
                return match idxs.get(self.selected) {
                    Some(&ix) => TableAction::Open(procs[ix].pid),
                    None => TableAction::None,
                };
            }
            _ => return TableAction::None,
        }
        self.clamp(total, page);
        if self.selected == before {
            TableAction::None
        } else {
            TableAction::Moved
        }
    }

    fn resort(&mut self, by: ProcSortBy) -> TableAction {
        if self.sort_by == by {
            return TableAction::None;
        }
        self.sort_by = by;
        self.selected = 0;
        self.offset = 0;
        TableAction::Resorted
    }

    /// Keep the selection in range and inside the viewport.
    pub fn clamp(&mut self, total: usize, viewport: usize) {
        let viewport = viewport.max(1);
        self.selected = self.selected.min(total.saturating_sub(1));
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + viewport {
            self.offset = self.selected + 1 - viewport;
        }
        self.offset = self.offset.min(total.saturating_sub(viewport));
    }
}

/// Visible data rows for a table drawn in `area` (borders and header excluded).
pub fn viewport_rows(area: Rect) -> usize {
    area.height.saturating_sub(3) as usize
}

pub fn draw_process_table(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    procs: &[ProcessSummary],
    table: &mut ProcessTable,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Processes ({} listed, c/m: sort, Enter: details)", procs.len()));
    f.render_widget(block, area);

    let inner = inner(area);
    if inner.height < 1 || inner.width < 3 {
        return;
    }
    // reserve 2 columns for the scrollbar
    let content = Rect {
        width: inner.width.saturating_sub(2),
        ..inner
    };

    let idxs = sorted_indices(procs, table.sort_by);
    let total_rows = idxs.len();
    let viewport = viewport_rows(area);
    table.clamp(total_rows, viewport);
    let offset = table.offset;

    let rows = idxs
        .iter()
        .enumerate()
        .skip(offset)
        .take(viewport)
        .map(|(pos, &ix)| {
            let p = &procs[ix];
            let mem_fg = match p.memory_percent {
                x if x < 5.0 => Color::Blue,
                x if x < 20.0 => Color::Magenta,
                _ => Color::Red,
            };
            let style = if pos == table.selected {
                Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(p.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(p.name.clone()),
                Cell::from(format!("{:>5}", one_decimal(p.cpu_percent.clamp(0.0, 100.0))))
                    .style(Style::default().fg(load_color(p.cpu_percent))),
                Cell::from(format!("{:>5}", one_decimal(p.memory_percent))).style(Style::default().fg(mem_fg)),
                Cell::from(p.username.clone().unwrap_or_default()),
            ])
            .style(style)
        });

    let cpu_hdr = match table.sort_by {
        ProcSortBy::CpuDesc => "CPU % •",
        _ => "CPU %",
    };
    let mem_hdr = match table.sort_by {
        ProcSortBy::MemDesc => "Mem % •",
        _ => "Mem %",
    };
    let header = Row::new(vec!["PID", "Name", cpu_hdr, mem_hdr, "User"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let t = Table::new(rows, COLS.to_vec()).header(header).column_spacing(1);
    f.render_widget(t, content);

    let scroll_area = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    draw_scrollbar(f, scroll_area, total_rows, viewport, offset);
}

fn draw_scrollbar(f: &mut ratatui::Frame<'_>, area: Rect, total: usize, viewport: usize, offset: usize) {
    if area.height < 3 {
        return;
    }
    let track = (area.height - 2) as usize;
    let total = total.max(1);
    let view = viewport.clamp(1, total);
    let max_off = total.saturating_sub(view);

    let thumb_len = (track * view).div_ceil(total).clamp(1, track);
    let thumb_top = if max_off == 0 {
        0
    } else {
        ((track - thumb_len) * offset.min(max_off) + max_off / 2) / max_off
    };

    let mut lines: Vec<Line> = Vec::with_capacity(area.height as usize);
    lines.push(Line::from(Span::styled("▲", Style::default().fg(SB_ARROW))));
    for i in 0..track {
        if i >= thumb_top && i < thumb_top + thumb_len {
            lines.push(Line::from(Span::styled("█", Style::default().fg(SB_THUMB))));
        } else {
            lines.push(Line::from(Span::styled("│", Style::default().fg(SB_TRACK))));
        }
    }
    lines.push(Line::from(Span::styled("▼", Style::default().fg(SB_ARROW))));
    f.render_widget(Paragraph::new(lines), area);
}

/// Overview list: at most five rows, or the empty-state message.
pub fn draw_top_five(f: &mut ratatui::Frame<'_>, area: Rect, view: &DashboardView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Top processes (updated at {})", view.updated));
    if let Some(msg) = view.empty_message() {
        let p = Paragraph::new(Span::styled(msg, Style::default().fg(MUTED))).block(block);
        f.render_widget(p, area);
        return;
    }
    let rows = view.top.iter().map(|p| {
        Row::new(vec![
            Cell::from(p.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
            Cell::from(p.name.clone()),
            Cell::from(p.cpu.clone()),
        ])
    });
    let t = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(8),
        ],
    )
    .header(Row::new(vec!["PID", "Name", "CPU"]).style(Style::default().fg(Color::Cyan)))
    .block(block);
    f.render_widget(t, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn proc(pid: u32, cpu: f64, mem: f64) -> ProcessSummary {
        ProcessSummary {
            pid,
            name: format!("p{pid}"),
            cpu_percent: cpu,
            memory_percent: mem,
            username: None,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn sorts_descending_by_column() {
        let procs = vec![proc(1, 5.0, 50.0), proc(2, 80.0, 1.0), proc(3, 20.0, 10.0)];
        assert_eq!(sorted_indices(&procs, ProcSortBy::CpuDesc), vec![1, 2, 0]);
        assert_eq!(sorted_indices(&procs, ProcSortBy::MemDesc), vec![0, 2, 1]);
    }

    #[test]
    fn enter_opens_the_selected_sorted_row() {
        let procs = vec![proc(1, 5.0, 50.0), proc(2, 80.0, 1.0), proc(3, 20.0, 10.0)];
        let mut t = ProcessTable::default();
        assert_eq!(t.handle_key(key(KeyCode::Down), &procs, 10), TableAction::Moved);
        assert_eq!(t.handle_key(key(KeyCode::Enter), &procs, 10), TableAction::Open(3));

        assert_eq!(t.handle_key(key(KeyCode::Char('m')), &procs, 10), TableAction::Resorted);
        assert_eq!(t.selected, 0);
        assert_eq!(t.handle_key(key(KeyCode::Enter), &procs, 10), TableAction::Open(1));
    }

    #[test]
    fn selection_stays_in_range_and_in_view() {
        let procs: Vec<_> = (0..20).map(|i| proc(i, i as f64, 0.0)).collect();
        let mut t = ProcessTable::default();
        t.handle_key(key(KeyCode::End), &procs, 5);
        assert_eq!(t.selected, 19);
        assert_eq!(t.offset, 15);
        assert_eq!(t.handle_key(key(KeyCode::Down), &procs, 5), TableAction::None);
        t.handle_key(key(KeyCode::Home), &procs, 5);
        assert_eq!((t.selected, t.offset), (0, 0));
        assert_eq!(t.handle_key(key(KeyCode::Enter), &[], 5), TableAction::None);
    }

    #[test]
    fn table_cells_round_ties_up() {
        use ratatui::{backend::TestBackend, Terminal};

        let procs = vec![proc(7, 12.25, 0.75)];
        let mut t = ProcessTable::default();
        let mut term = Terminal::new(TestBackend::new(80, 8)).unwrap();
        term.draw(|f| draw_process_table(f, f.area(), &procs, &mut t))
            .unwrap();
        let text: String = term
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("12.3"), "{text}");
        assert!(text.contains("0.8"), "{text}");
        assert!(!text.contains("12.2"), "{text}");
    }
}

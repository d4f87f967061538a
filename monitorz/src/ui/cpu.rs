//! CPU average sparkline + per-core mini bars.

use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline},
};

use crate::dashboard::one_decimal;
use crate::history::CpuHistory;
use crate::ui::theme::CPU;
use crate::ui::util::{inner, load_color};

pub fn draw_cpu_avg_graph(f: &mut ratatui::Frame<'_>, area: Rect, hist: &CpuHistory, cores: &[f64]) {
    let title = if cores.is_empty() {
        "CPU avg".to_string()
    } else {
        let avg = cores.iter().sum::<f64>() / cores.len() as f64;
        format!("CPU avg (now: {:>5}%)", one_decimal(avg))
    };
    let max_points = area.width.saturating_sub(2) as usize;
    let start = hist.avg.len().saturating_sub(max_points);
    let data: Vec<u64> = hist.avg.iter().skip(start).copied().collect();
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .max(100)
        .style(Style::default().fg(CPU));
    f.render_widget(spark, area);
}

pub fn draw_per_core_bars(f: &mut ratatui::Frame<'_>, area: Rect, cores: &[f64], hist: &CpuHistory) {
    f.render_widget(Block::default().borders(Borders::ALL).title("Per-core"), area);
    let inner = inner(area);
    if inner.height == 0 || cores.is_empty() {
        return;
    }

    let show_n = (inner.height as usize).min(cores.len());
    let constraints: Vec<Constraint> = (0..show_n).map(|_| Constraint::Length(1)).collect();
    let vchunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, rect) in vchunks.iter().enumerate() {
        let hchunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(6), Constraint::Length(12)])
            .split(*rect);

        let curr = cores[i].clamp(0.0, 100.0);
        // trend against ~10 polls ago
        let older = hist.core_ago(i, 10).map(|v| v as f64).unwrap_or(curr);
        let trend = if curr > older + 0.2 {
            "↑"
        } else if curr + 0.2 < older {
            "↓"
        } else {
            "╌"
        };
        let fg = load_color(curr);

        let data: Vec<u64> = hist
            .per_core
            .get(i)
            .map(|d| {
                let start = d.len().saturating_sub(hchunks[0].width as usize);
                d.iter().skip(start).copied().collect()
            })
            .unwrap_or_default();
        let spark = Sparkline::default()
            .data(&data)
            .max(100)
            .style(Style::default().fg(fg));
        f.render_widget(spark, hchunks[0]);

        let label = format!("cpu{i:<2}{trend}{:>5}%", one_decimal(curr));
        let line = Line::from(Span::styled(
            label,
            Style::default().fg(fg).add_modifier(Modifier::BOLD),
        ));
        f.render_widget(Paragraph::new(line).right_aligned(), hchunks[1]);
    }
}

//! Dashboard view-model: the figures the overview page shows, derived from a snapshot.

use chrono::{DateTime, Local};

use crate::types::MetricsSnapshot;

/// How many processes the overview lists.
pub const TOP_N: usize = 5;

pub const EMPTY_PROCESSES: &str = "No processes listed.";

#[derive(Debug, Clone, PartialEq)]
pub struct TopProcessRow {
    pub pid: u32,
    pub name: String,
    pub cpu: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// First core reading, one decimal, "0" when absent.
    pub cpu: String,
    pub memory: String,
    /// First disk, one decimal, "0" when absent.
    pub disk: String,
    /// The same three figures as gauge ratios in 0.0..=1.0.
    pub ratios: [f64; 3],
    pub updated: String,
    pub top: Vec<TopProcessRow>,
}

/// One decimal place, rounding like JavaScript's `toFixed(1)`.
///
/// Both round the exact binary value, so `0.15` (stored just below the tie)
/// stays `0.1` either way. They differ on exact ties: `{:.1}` goes to even
/// while `toFixed` goes away from zero, so `12.25` must print `12.3`. A value
/// is an exact tie only when its fraction is `.25` or `.75`.
pub fn one_decimal(x: f64) -> String {
    let quarters = x.abs() * 4.0;
    if quarters < 1e15 && quarters.fract() == 0.0 && quarters % 2.0 == 1.0 {
        let tenths = (x.abs() * 10.0 + 0.5).floor() as u64;
        let sign = if x < 0.0 { "-" } else { "" };
        return format!("{sign}{}.{}", tenths / 10, tenths % 10);
    }
    format!("{x:.1}")
}

/// One decimal, or "0" when the figure is missing.
pub fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(x) => one_decimal(x),
        None => "0".into(),
    }
}

fn ratio(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite())
        .map(|x| (x / 100.0).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// "Updated at" label: the snapshot timestamp in local `HH:MM:SS`, falling
/// back to the raw text if it does not parse and to `now` if there is none.
pub fn updated_label(ts: &str, now: DateTime<Local>) -> String {
    let ts = ts.trim();
    if ts.is_empty() {
        return now.format("%H:%M:%S").to_string();
    }
    match DateTime::parse_from_rfc3339(ts) {
        Ok(t) => t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => ts.to_string(),
    }
}

impl DashboardView {
    pub fn from_snapshot(m: Option<&MetricsSnapshot>) -> Self {
        Self::from_snapshot_at(m, Local::now())
    }

    pub fn from_snapshot_at(m: Option<&MetricsSnapshot>, now: DateTime<Local>) -> Self {
        let cpu = m
            .and_then(|m| m.cpu.as_ref())
            .and_then(|c| c.usage_pct.first().copied());
        let memory = m.and_then(|m| m.memory.as_ref()).and_then(|mem| mem.used_pct);
        let disk = m.and_then(|m| m.disks.first()).and_then(|d| d.used_pct);

        let top = m
            .map(|m| {
                m.top_processes
                    .iter()
                    .take(TOP_N)
                    .map(|p| TopProcessRow {
                        pid: p.pid,
                        name: p.name.clone(),
                        cpu: format!("{}%", one_decimal(p.cpu_percent)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cpu: fmt_pct(cpu),
            memory: fmt_pct(memory),
            disk: fmt_pct(disk),
            ratios: [ratio(cpu), ratio(memory), ratio(disk)],
            updated: updated_label(m.map(|m| m.timestamp.as_str()).unwrap_or(""), now),
            top,
        }
    }

    pub fn cpu_card(&self) -> String {
        format!("{}%", self.cpu)
    }

    pub fn memory_card(&self) -> String {
        format!("{}%", self.memory)
    }

    pub fn disk_card(&self) -> String {
        format!("{}%", self.disk)
    }

    /// The empty-state message, when there is nothing to list.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.top.is_empty().then_some(EMPTY_PROCESSES)
    }

    /// Plain-text rendering for `--once`.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Updated at {}\n", self.updated));
        out.push_str(&format!("CPU     {:>7}\n", self.cpu_card()));
        out.push_str(&format!("Memory  {:>7}\n", self.memory_card()));
        out.push_str(&format!("Disk    {:>7}\n", self.disk_card()));
        out.push_str("Top processes:\n");
        match self.empty_message() {
            Some(msg) => {
                out.push_str("  ");
                out.push_str(msg);
                out.push('\n');
            }
            None => {
                for p in &self.top {
                    out.push_str(&format!("  {:<7} {:<24} {:>7}\n", p.pid, p.name, p.cpu));
                }
            }
        }
        out
    }
}

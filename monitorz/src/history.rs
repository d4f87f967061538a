//! Bounded CPU history for the dashboard sparklines.
//!
//! Snapshots replace each other wholesale; the only thing the UI keeps across
//! them is this short trail of CPU readings, recorded once per applied poll.

use std::collections::VecDeque;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

fn to_pct(v: f64) -> u64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0).round() as u64
    } else {
        0
    }
}

pub struct CpuHistory {
    /// Mean across cores, 0..=100.
    pub avg: VecDeque<u64>,
    /// One trail per core; reset when the core count changes.
    pub per_core: Vec<VecDeque<u64>>,
    cap: usize,
    last_seq: u64,
}

impl CpuHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            avg: VecDeque::with_capacity(cap),
            per_core: Vec::new(),
            cap,
            last_seq: 0,
        }
    }

    /// Record the readings of poll `seq`. Re-recording the same poll is a no-op.
    pub fn record(&mut self, seq: u64, usage_pct: &[f64]) -> bool {
        if seq == 0 || seq == self.last_seq || usage_pct.is_empty() {
            return false;
        }
        self.last_seq = seq;

        let mean = usage_pct.iter().sum::<f64>() / usage_pct.len() as f64;
        push_capped(&mut self.avg, to_pct(mean), self.cap);

        if self.per_core.len() != usage_pct.len() {
            self.per_core = (0..usage_pct.len())
                .map(|_| VecDeque::with_capacity(self.cap))
                .collect();
        }
        for (dq, v) in self.per_core.iter_mut().zip(usage_pct) {
            push_capped(dq, to_pct(*v), self.cap);
        }
        true
    }

    /// Reading `back` polls ago for `core`, if we have it.
    pub fn core_ago(&self, core: usize, back: usize) -> Option<u64> {
        self.per_core.get(core)?.iter().rev().nth(back).copied()
    }
}

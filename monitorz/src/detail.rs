//! On-demand process detail: one request per selection, latest selection wins.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::http::DetailSource;
use crate::types::ProcessDetail;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DetailState {
    #[default]
    Idle,
    Loading { pid: u32 },
    Loaded(ProcessDetail),
    Failed { pid: u32, error: String },
}

impl DetailState {
    pub fn pid(&self) -> Option<u32> {
        match self {
            DetailState::Idle => None,
            DetailState::Loading { pid } | DetailState::Failed { pid, .. } => Some(*pid),
            DetailState::Loaded(d) => Some(d.pid),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DetailState::Idle)
    }
}

struct Completion {
    seq: u64,
    pid: u32,
    result: Result<ProcessDetail, FetchError>,
}

pub struct DetailFetcher {
    source: Arc<dyn DetailSource>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    latest: u64,
    state: DetailState,
}

impl DetailFetcher {
    pub fn new(source: Arc<dyn DetailSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            tx,
            rx,
            latest: 0,
            state: DetailState::Idle,
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Request details for `pid`, replacing whatever is shown now.
    /// Must be called from within a tokio runtime.
    pub fn select(&mut self, pid: u32) {
        self.latest += 1;
        let seq = self.latest;
        self.state = DetailState::Loading { pid };
        debug!(pid, seq, "fetching process detail");

        let source = self.source.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_process(pid).await;
            // receiver gone means the dashboard is shutting down
            let _ = tx.send(Completion { seq, pid, result });
        });
    }

    /// Close the detail pane; a pending request is ignored when it lands.
    pub fn clear(&mut self) {
        self.latest += 1;
        self.state = DetailState::Idle;
    }

    /// Apply every completion that has arrived. Returns true if the state changed.
    pub fn poll_results(&mut self) -> bool {
        let mut changed = false;
        while let Ok(c) = self.rx.try_recv() {
            changed |= self.apply(c);
        }
        changed
    }

    /// Wait for the next completion and apply it. Returns true if it was
    /// applied, false if it belonged to a superseded selection.
    pub async fn next_result(&mut self) -> bool {
        match self.rx.recv().await {
            Some(c) => self.apply(c),
            None => false,
        }
    }

    fn apply(&mut self, c: Completion) -> bool {
        if c.seq != self.latest {
            debug!(pid = c.pid, seq = c.seq, "dropping superseded process detail");
            return false;
        }
        self.state = match c.result {
            Ok(d) => match d.error.as_deref() {
                // The agent reports missing or inaccessible processes in-band.
                Some(msg) if !msg.is_empty() => {
                    warn!(pid = c.pid, error = msg, "agent could not describe process");
                    DetailState::Failed {
                        pid: c.pid,
                        error: msg.to_string(),
                    }
                }
                _ => DetailState::Loaded(d),
            },
            Err(e) => {
                warn!(pid = c.pid, error = %e, "process detail request failed");
                DetailState::Failed {
                    pid: c.pid,
                    error: e.to_string(),
                }
            }
        };
        true
    }
}

//! Metrics poller: one fetch right away, then one per interval, until stopped.
//!
//! The timer never waits for the previous request. Every request carries a
//! sequence number and a completion is only published when it is newer than
//! the last one published, so a slow response can not overwrite fresher data.
//! At most [`MAX_IN_FLIGHT`] requests are outstanding: a tick that finds the
//! limit reached is skipped, unless the oldest request has been waiting for
//! [`STALL_AFTER`] (or one interval, if longer), in which case it is aborted
//! and reported as a failure. Consumers read the published [`PollState`]
//! through a watch channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::error::FetchError;
use crate::http::MetricsSource;
use crate::types::MetricsSnapshot;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

// tokio's interval rejects a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Requests allowed to be outstanding at once.
pub const MAX_IN_FLIGHT: usize = 2;

/// How long the oldest outstanding request may block new ones.
pub const STALL_AFTER: Duration = Duration::from_secs(10);

/// What views get to see.
#[derive(Debug, Clone)]
pub struct PollState {
    /// Last successfully parsed snapshot.
    pub snapshot: Option<Arc<MetricsSnapshot>>,
    /// True until the first response (success or failure) has been applied.
    pub loading: bool,
    /// Message of the last failure; cleared by the next success.
    pub error: Option<String>,
    /// Local time the current snapshot was applied.
    pub updated_at: Option<DateTime<Local>>,
    /// Sequence number of the last applied response (0 = none yet).
    pub seq: u64,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            snapshot: None,
            loading: true,
            error: None,
            updated_at: None,
            seq: 0,
        }
    }
}

struct Shared {
    tx: watch::Sender<PollState>,
    alive: AtomicBool,
    issued: AtomicU64,
    in_flight: AtomicUsize,
    // last applied seq; also serializes apply() against stop()
    applied: Mutex<u64>,
}

impl Shared {
    fn lock_applied(&self) -> MutexGuard<'_, u64> {
        self.applied.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_seq(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Publish a completion. Returns false when it was dropped.
    fn apply(&self, seq: u64, res: Result<MetricsSnapshot, FetchError>) -> bool {
        let mut applied = self.lock_applied();
        if !self.alive.load(Ordering::Acquire) {
            trace!(seq, "poller stopped; dropping response");
            return false;
        }
        if seq <= *applied {
            debug!(seq, applied = *applied, "dropping out-of-order response");
            return false;
        }
        *applied = seq;

        match res {
            Ok(m) => {
                trace!(seq, ts = %m.timestamp, "snapshot applied");
                self.tx.send_modify(|st| {
                    st.snapshot = Some(Arc::new(m));
                    st.error = None;
                    st.loading = false;
                    st.updated_at = Some(Local::now());
                    st.seq = seq;
                });
            }
            Err(e) => {
                warn!(seq, error = %e, "metrics poll failed");
                self.tx.send_modify(|st| {
                    st.error = Some(e.to_string());
                    st.loading = false;
                    st.seq = seq;
                });
            }
        }
        true
    }
}

/// Counts one outstanding request; released when the request task ends or is aborted.
struct InFlight(Arc<Shared>);

impl InFlight {
    fn acquire(shared: Arc<Shared>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        Self(shared)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

struct Outstanding {
    seq: u64,
    since: Instant,
    task: JoinHandle<()>,
}

/// Poller configuration. Call [`Poller::start`] to get a running handle.
pub struct Poller {
    source: Arc<dyn MetricsSource>,
    interval: Duration,
}

impl Poller {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self {
            source,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn interval(mut self, every: Duration) -> Self {
        self.interval = every;
        self
    }

    pub fn interval_ms(self, ms: u64) -> Self {
        self.interval(Duration::from_millis(ms))
    }

    /// Spawn the timer task. Must be called from within a tokio runtime.
    pub fn start(self) -> PollerHandle {
        let every = self.interval.max(MIN_INTERVAL);
        let (tx, _rx) = watch::channel(PollState::default());
        let shared = Arc::new(Shared {
            tx,
            alive: AtomicBool::new(true),
            issued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            applied: Mutex::new(0),
        });

        let source = self.source;
        let task_shared = shared.clone();
        let stall = STALL_AFTER.max(every);
        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut outstanding: VecDeque<Outstanding> = VecDeque::with_capacity(MAX_IN_FLIGHT);
            loop {
                // first tick completes immediately
                ticker.tick().await;
                if !task_shared.alive.load(Ordering::Acquire) {
                    break;
                }
                outstanding.retain(|o| !o.task.is_finished());
                if outstanding.len() >= MAX_IN_FLIGHT {
                    match outstanding.front() {
                        Some(oldest) if oldest.since.elapsed() >= stall => {
                            if let Some(oldest) = outstanding.pop_front() {
                                warn!(seq = oldest.seq, "abandoning unanswered metrics request");
                                oldest.task.abort();
                                task_shared.apply(oldest.seq, Err(FetchError::Stalled(stall)));
                            }
                        }
                        _ => {
                            debug!(outstanding = outstanding.len(), "agent busy; skipping tick");
                            continue;
                        }
                    }
                }

                let seq = task_shared.next_seq();
                trace!(seq, "issuing metrics request");
                let source = source.clone();
                let guard = InFlight::acquire(task_shared.clone());
                // Not awaited here: a slow agent must not hold back the timer.
                let task = tokio::spawn(async move {
                    let res = source.fetch_metrics().await;
                    guard.0.apply(seq, res);
                });
                outstanding.push_back(Outstanding {
                    seq,
                    since: Instant::now(),
                    task,
                });
            }
        });
        debug!(interval_ms = every.as_millis() as u64, "poller started");

        PollerHandle {
            shared,
            task: Some(task),
            interval: every,
        }
    }
}

/// Owned handle to a running poller. Dropping it stops the poller.
pub struct PollerHandle {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
    interval: Duration,
}

impl PollerHandle {
    /// Snapshot of the current state.
    pub fn state(&self) -> PollState {
        self.shared.tx.borrow().clone()
    }

    /// A receiver that is notified on every applied response.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.shared.tx.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of requests issued so far.
    pub fn issued(&self) -> u64 {
        self.shared.issued.load(Ordering::Relaxed)
    }

    /// Requests currently waiting on the agent.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    /// Stop the timer. Requests already in flight keep running, but their
    /// results are discarded; once this returns the state no longer changes.
    pub fn stop(&mut self) {
        {
            let _applied = self.shared.lock_applied();
            self.shared.alive.store(false, Ordering::Release);
        }
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("poller stopped");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{advance, sleep};

    struct Step {
        delay: Duration,
        result: Result<MetricsSnapshot, FetchError>,
    }

    /// Replays a script of (delay, result) steps, then keeps answering "idle".
    #[derive(Default)]
    struct Scripted {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Step>>,
    }

    impl Scripted {
        fn new(steps: Vec<(u64, Result<MetricsSnapshot, FetchError>)>) -> Arc<Self> {
            let script = steps
                .into_iter()
                .map(|(ms, result)| Step {
                    delay: Duration::from_millis(ms),
                    result,
                })
                .collect();
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetricsSource for Scripted {
        async fn fetch_metrics(&self) -> Result<MetricsSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(s) => {
                    if !s.delay.is_zero() {
                        sleep(s.delay).await;
                    }
                    s.result
                }
                None => Ok(snap("idle")),
            }
        }
    }

    /// Accepts every request and never answers.
    #[derive(Default)]
    struct Hung {
        live: AtomicUsize,
    }

    struct Live<'a>(&'a AtomicUsize);

    impl Drop for Live<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MetricsSource for Hung {
        async fn fetch_metrics(&self) -> Result<MetricsSnapshot, FetchError> {
            self.live.fetch_add(1, Ordering::SeqCst);
            let _live = Live(&self.live);
            std::future::pending().await
        }
    }

    fn snap(tag: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: tag.to_string(),
            ..Default::default()
        }
    }

    fn ts(st: &PollState) -> Option<&str> {
        st.snapshot.as_ref().map(|m| m.timestamp.as_str())
    }

    // Let spawned tasks run without moving the paused clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_on_interval() {
        let src = Scripted::new(vec![]);
        let handle = Poller::new(src.clone()).interval_ms(3000).start();
        settle().await;
        assert_eq!(src.calls(), 1, "exactly one fetch on start");

        advance(Duration::from_millis(2999)).await;
        settle().await;
        assert_eq!(src.calls(), 1);

        advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(src.calls(), 2);

        for _ in 0..2 {
            advance(Duration::from_millis(3000)).await;
            settle().await;
        }
        assert_eq!(src.calls(), 4);
        assert_eq!(handle.issued(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped_not_rejected() {
        let src = Scripted::new(vec![]);
        let handle = Poller::new(src.clone()).interval_ms(0).start();
        assert_eq!(handle.interval(), MIN_INTERVAL);
        settle().await;
        assert_eq!(src.calls(), 1);
        advance(Duration::from_millis(5)).await;
        settle().await;
        assert!(src.calls() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_only_until_first_resolution() {
        let src = Scripted::new(vec![
            (500, Err(FetchError::Transport("boom".into()))),
            (0, Ok(snap("a"))),
        ]);
        let handle = Poller::new(src.clone()).interval_ms(1000).start();
        settle().await;
        let st = handle.state();
        assert!(st.loading);
        assert!(st.snapshot.is_none() && st.error.is_none());

        advance(Duration::from_millis(500)).await;
        settle().await;
        let st = handle.state();
        assert!(!st.loading, "failure also ends loading");
        assert_eq!(st.error.as_deref(), Some("boom"));

        advance(Duration::from_millis(500)).await;
        settle().await;
        let st = handle.state();
        assert!(!st.loading);
        assert_eq!(ts(&st), Some("a"));
        assert!(st.error.is_none(), "success clears the error");
    }

    #[tokio::test(start_paused = true)]
    async fn http_status_failure_keeps_previous_snapshot() {
        let src = Scripted::new(vec![
            (0, Ok(snap("first"))),
            (0, Err(FetchError::Status(500))),
        ]);
        let handle = Poller::new(src.clone()).interval_ms(1000).start();
        settle().await;
        assert_eq!(ts(&handle.state()), Some("first"));

        advance(Duration::from_millis(1000)).await;
        settle().await;
        let st = handle.state();
        assert_eq!(st.error.as_deref(), Some("HTTP 500"));
        assert_eq!(ts(&st), Some("first"));
        assert!(st.updated_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_surfaces_message_text() {
        let src = Scripted::new(vec![(
            0,
            Err(FetchError::Transport("connection refused".into())),
        )]);
        let handle = Poller::new(src).start();
        settle().await;
        let st = handle.state();
        assert_eq!(st.error.as_deref(), Some("connection refused"));
        assert!(st.snapshot.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn no_updates_after_stop() {
        let src = Scripted::new(vec![(1000, Ok(snap("late")))]);
        let mut handle = Poller::new(src.clone()).interval_ms(3000).start();
        let mut rx = handle.subscribe();
        settle().await;
        assert_eq!(src.calls(), 1, "request is in flight");

        handle.stop();
        assert!(!handle.is_running());

        // the in-flight request resolves after teardown
        advance(Duration::from_millis(10_000)).await;
        settle().await;
        assert!(!rx.has_changed().unwrap_or(false));
        let st = rx.borrow_and_update().clone();
        assert!(st.loading);
        assert!(st.snapshot.is_none());
        assert_eq!(src.calls(), 1, "timer stopped too");
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_polling() {
        let src = Scripted::new(vec![]);
        let handle = Poller::new(src.clone()).interval_ms(100).start();
        settle().await;
        drop(handle);
        advance(Duration::from_millis(1000)).await;
        settle().await;
        assert_eq!(src.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn older_response_never_overwrites_newer() {
        // #1 is slow, #2 is fast and completes first
        let src = Scripted::new(vec![(500, Ok(snap("one"))), (10, Ok(snap("two")))]);
        let handle = Poller::new(src.clone()).interval_ms(100).start();
        settle().await;

        advance(Duration::from_millis(100)).await;
        settle().await;
        advance(Duration::from_millis(10)).await;
        settle().await;
        let st = handle.state();
        assert_eq!(ts(&st), Some("two"));
        assert_eq!(st.seq, 2);

        advance(Duration::from_millis(400)).await;
        settle().await;
        let st = handle.state();
        assert_ne!(ts(&st), Some("one"), "stale response was applied");
        assert!(st.seq >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_agent_keeps_outstanding_requests_bounded() {
        let src = Arc::new(Hung::default());
        let handle = Poller::new(src.clone()).interval_ms(1000).start();
        settle().await;
        for _ in 0..200 {
            advance(Duration::from_millis(1000)).await;
            settle().await;
            assert!(handle.in_flight() <= MAX_IN_FLIGHT, "{} outstanding", handle.in_flight());
            assert!(src.live.load(Ordering::SeqCst) <= MAX_IN_FLIGHT);
        }
        assert!(handle.issued() > MAX_IN_FLIGHT as u64, "polling carried on");
        let st = handle.state();
        assert!(!st.loading);
        assert_eq!(st.error.as_deref(), Some("agent did not respond within 10s"));
    }

    #[tokio::test(start_paused = true)]
    async fn busy_agent_skips_ticks_until_a_slot_frees() {
        let src = Scripted::new(vec![(2500, Ok(snap("a"))), (2500, Ok(snap("b")))]);
        let handle = Poller::new(src.clone()).interval_ms(1000).start();
        settle().await;
        advance(Duration::from_millis(1000)).await;
        settle().await;
        assert_eq!(src.calls(), 2);
        assert_eq!(handle.in_flight(), 2);

        advance(Duration::from_millis(1000)).await;
        settle().await;
        assert_eq!(src.calls(), 2, "tick skipped while the limit is reached");

        advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(ts(&handle.state()), Some("a"));
        assert_eq!(handle.in_flight(), 1);

        advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(src.calls(), 3);
        assert!(handle.state().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_are_notified() {
        let src = Scripted::new(vec![(0, Ok(snap("a")))]);
        let handle = Poller::new(src).interval_ms(1000).start();
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(ts(&rx.borrow_and_update()), Some("a"));
    }
}

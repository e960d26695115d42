//! Refresh scheduler - the single poll loop feeding the hub.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::hub::SubscriptionHub;
use crate::source::SnapshotFetcher;

/// Default tick period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A fetch was already in flight; nothing happened.
    Skipped,
    /// The fetch succeeded and was published under this sequence number.
    Published(u64),
    /// The fetch failed; the previous snapshot stays latest.
    Failed,
}

/// Counters describing scheduler activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub skipped: u64,
    pub failures: u64,
    pub published: u64,
}

/// Owns the fetcher, the hub and the in-flight flag; shared by the timer
/// task and every per-tick fetch task.
#[derive(Debug)]
struct Poller {
    fetcher: Arc<dyn SnapshotFetcher>,
    hub: Arc<SubscriptionHub>,
    in_flight: AtomicBool,
    ticks: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
    published: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl Poller {
    /// Claim the in-flight flag, or `None` if a fetch is already running.
    fn claim(self: &Arc<Self>) -> Option<InFlightGuard> {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!("fetch still in flight, skipping tick");
            return None;
        }
        Some(InFlightGuard {
            poller: self.clone(),
        })
    }

    /// Run one claimed fetch to completion.
    async fn run(&self, _guard: InFlightGuard) -> TickOutcome {
        match self.fetcher.fetch_snapshot().await {
            Ok(snapshot) => {
                let sequence = self.hub.publish(snapshot);
                self.published.fetch_add(1, Ordering::Relaxed);
                *self.last_error.lock() = None;
                TickOutcome::Published(sequence)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(source = self.fetcher.description(), error = %e, "snapshot fetch failed");
                *self.last_error.lock() = Some(e.to_string());
                TickOutcome::Failed
            }
        }
    }

    /// Claim and run a fetch as its own task. Returns false if skipped.
    fn spawn_tick(self: &Arc<Self>) -> bool {
        let Some(guard) = self.claim() else {
            return false;
        };
        let poller = self.clone();
        tokio::spawn(async move {
            poller.run(guard).await;
        });
        true
    }

    async fn tick(self: &Arc<Self>) -> TickOutcome {
        match self.claim() {
            Some(guard) => self.run(guard).await,
            None => TickOutcome::Skipped,
        }
    }
}

/// Clears the in-flight flag when dropped, on every exit path of a fetch
/// including cancellation of its task.
struct InFlightGuard {
    poller: Arc<Poller>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.poller.in_flight.store(false, Ordering::Release);
    }
}

/// Periodically fetches a snapshot and publishes it to the hub.
///
/// There is one timer no matter how many consumers exist; consumers attach
/// to the hub, never to the scheduler. If a fetch is still running when the
/// next tick fires, that tick is skipped rather than queued.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use fleetwatch::{FileSource, RefreshScheduler, SubscriptionHub};
///
/// # tokio_test::block_on(async {
/// let hub = Arc::new(SubscriptionHub::new());
/// let scheduler = RefreshScheduler::new(
///     Arc::new(FileSource::new("fleet.json")),
///     hub.clone(),
///     Duration::from_secs(5),
/// );
/// scheduler.start();
/// # });
/// ```
#[derive(Debug)]
pub struct RefreshScheduler {
    poller: Arc<Poller>,
    interval: Duration,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl RefreshScheduler {
    /// Create a stopped scheduler. A zero interval is raised to one millisecond.
    pub fn new(
        fetcher: Arc<dyn SnapshotFetcher>,
        hub: Arc<SubscriptionHub>,
        interval: Duration,
    ) -> Self {
        Self {
            poller: Arc::new(Poller {
                fetcher,
                hub,
                in_flight: AtomicBool::new(false),
                ticks: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                published: AtomicU64::new(0),
                last_error: Mutex::new(None),
            }),
            interval: interval.max(Duration::from_millis(1)),
            stop_tx: Mutex::new(None),
        }
    }

    /// Start the timer on the current tokio runtime.
    ///
    /// The first tick fires immediately. Calling `start` while running does
    /// nothing; returns whether a timer was started.
    pub fn start(&self) -> bool {
        let mut slot = self.stop_tx.lock();
        if slot.is_some() {
            return false;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let poller = self.poller.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    // A stop must win over a tick that is due at the same time.
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = timer.tick() => {
                        poller.spawn_tick();
                    }
                }
            }
            debug!("refresh timer exited");
        });

        info!(
            source = self.poller.fetcher.description(),
            interval_ms = interval.as_millis() as u64,
            "refresh scheduler started"
        );
        *slot = Some(stop_tx);
        true
    }

    /// Stop the timer. A fetch already in flight still completes and publishes.
    pub fn stop(&self) {
        if let Some(stop_tx) = self.stop_tx.lock().take() {
            let _ = stop_tx.send(true);
            info!("refresh scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.lock().is_some()
    }

    /// Run one tick inline, honouring the in-flight flag.
    pub async fn tick(&self) -> TickOutcome {
        self.poller.tick().await
    }

    /// Start a fetch in the background now, outside the timer.
    ///
    /// Must be called within a tokio runtime. Returns false if a fetch was
    /// already in flight.
    pub fn trigger(&self) -> bool {
        self.poller.spawn_tick()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.poller.hub
    }

    pub fn is_fetching(&self) -> bool {
        self.poller.in_flight.load(Ordering::Acquire)
    }

    /// Message of the most recent failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.poller.last_error.lock().clone()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.poller.ticks.load(Ordering::Relaxed),
            skipped: self.poller.skipped.load(Ordering::Relaxed),
            failures: self.poller.failures.load(Ordering::Relaxed),
            published: self.poller.published.load(Ordering::Relaxed),
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Roster store - the latest known node list on its own slow timer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use fleetwatch_types::{Roster, Snapshot};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::source::{FetchError, RosterProvider};

/// Default roster refresh period.
pub const DEFAULT_ROSTER_REFRESH: Duration = Duration::from_secs(60);

/// Holds the most recently fetched roster.
///
/// Roster changes become visible eventually; they are not synchronized with
/// snapshot delivery. Without a provider, or before the first successful
/// fetch, [`effective`](Self::effective) falls back to the ids present in a
/// snapshot.
#[derive(Debug)]
pub struct RosterStore {
    provider: Option<Arc<dyn RosterProvider>>,
    current: RwLock<Option<Arc<Roster>>>,
    last_error: Mutex<Option<String>>,
    interval: Duration,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl RosterStore {
    pub fn new(provider: Option<Arc<dyn RosterProvider>>, interval: Duration) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
            last_error: Mutex::new(None),
            interval: interval.max(Duration::from_millis(1)),
            stop_tx: Mutex::new(None),
        }
    }

    /// A store that always holds `roster`.
    pub fn fixed(roster: Roster) -> Self {
        let store = Self::new(None, DEFAULT_ROSTER_REFRESH);
        *store.current.write() = Some(Arc::new(roster));
        store
    }

    /// Fetch the roster once. A failure keeps the previous roster.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let Some(provider) = &self.provider else {
            return Ok(());
        };

        match provider.fetch_roster().await {
            Ok(roster) => {
                debug!(nodes = roster.len(), "roster refreshed");
                *self.current.write() = Some(Arc::new(roster));
                *self.last_error.lock() = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "roster fetch failed");
                *self.last_error.lock() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Start periodic refresh on the current tokio runtime.
    ///
    /// The timer holds only a weak reference; it ends when the store is dropped.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.provider.is_none() {
            return false;
        }
        let mut slot = self.stop_tx.lock();
        if slot.is_some() {
            return false;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let store: Weak<Self> = Arc::downgrade(self);
        let interval = self.interval;

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let Some(strong) = store.upgrade() else { break };
                        let _ = strong.refresh().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "roster refresh started");
        *slot = Some(stop_tx);
        true
    }

    pub fn stop(&self) {
        if let Some(stop_tx) = self.stop_tx.lock().take() {
            let _ = stop_tx.send(true);
        }
    }

    /// The fetched roster, if any fetch has succeeded.
    pub fn current(&self) -> Option<Arc<Roster>> {
        self.current.read().clone()
    }

    /// The roster to display against `snapshot`.
    ///
    /// Uses the fetched roster when it is non-empty; otherwise synthesizes
    /// bare entries from the snapshot's ids.
    pub fn effective(&self, snapshot: Option<&Snapshot>) -> Arc<Roster> {
        match self.current() {
            Some(roster) if !roster.is_empty() => roster,
            _ => Arc::new(snapshot.map(Roster::from_snapshot).unwrap_or_default()),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl Drop for RosterStore {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleetwatch_types::NodeInfo;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Default)]
    struct Flaky {
        calls: AtomicU64,
    }

    #[async_trait]
    impl RosterProvider for Flaky {
        async fn fetch_roster(&self) -> Result<Roster, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                return Err(FetchError::Status(503));
            }
            Ok(Roster::new(vec![NodeInfo::new(format!("node-{n}"))]))
        }
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_roster() {
        let store = RosterStore::new(
            Some(Arc::new(Flaky::default()) as Arc<dyn RosterProvider>),
            DEFAULT_ROSTER_REFRESH,
        );
        assert!(store.current().is_none());

        store.refresh().await.unwrap();
        assert!(store.current().unwrap().contains("node-0"));

        assert_eq!(store.refresh().await, Err(FetchError::Status(503)));
        assert!(store.current().unwrap().contains("node-0"));
        assert!(store.last_error().is_some());

        store.refresh().await.unwrap();
        assert!(store.current().unwrap().contains("node-2"));
        assert!(store.last_error().is_none());
    }

    #[test]
    fn effective_falls_back_to_snapshot_ids() {
        let store = RosterStore::new(None, DEFAULT_ROSTER_REFRESH);
        let snapshot = Snapshot::builder().online("a").record("b", |r| r).build();

        let roster = store.effective(Some(&snapshot));
        assert_eq!(roster.len(), 2);
        assert!(store.effective(None).is_empty());
    }

    #[test]
    fn fixed_roster_wins_over_snapshot() {
        let store = RosterStore::fixed(Roster::new(vec![NodeInfo::new("x")]));
        let snapshot = Snapshot::builder().online("a").build();
        let roster = store.effective(Some(&snapshot));
        assert_eq!(roster.len(), 1);
        assert!(roster.contains("x"));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_refreshes_periodically() {
        let provider = Arc::new(Flaky::default());
        let store = Arc::new(RosterStore::new(
            Some(provider.clone() as Arc<dyn RosterProvider>),
            Duration::from_secs(60),
        ));

        assert!(store.start());
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        store.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn start_without_provider_is_a_no_op() {
        let store = Arc::new(RosterStore::new(None, DEFAULT_ROSTER_REFRESH));
        assert!(!store.start());
    }
}

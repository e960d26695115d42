//! Live-data synchronization core.
//!
//! One process-wide [`SubscriptionHub`] holds the latest fleet [`Snapshot`]
//! and fans it out to consumers. One [`RefreshScheduler`] feeds it. Each
//! open detail view owns an [`EntityHistoryBuffer`] through a
//! [`HistoryView`] for exactly as long as the view is open.
//!
//! ```text
//! RefreshScheduler ──fetch──▶ SnapshotFetcher
//!        │
//!        └──publish──▶ SubscriptionHub ──▶ aggregation (reads latest)
//!                             │
//!                             └──────────▶ HistoryView ─▶ EntityHistoryBuffer
//! ```
//!
//! [`LiveData`] bundles these together with the [`RosterStore`].

mod history;
mod hub;
mod roster;
mod scheduler;
mod view;

pub use history::{EntityHistoryBuffer, IngestOutcome, Metric, DEFAULT_HISTORY_CAPACITY};
pub use hub::{Subscription, SubscriptionHub};
pub use roster::{RosterStore, DEFAULT_ROSTER_REFRESH};
pub use scheduler::{RefreshScheduler, SchedulerStats, TickOutcome, DEFAULT_REFRESH_INTERVAL};
pub use view::HistoryView;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fleetwatch_types::{Roster, Snapshot};

use crate::source::{HistoryFetcher, PingFetcher, Sources};

/// Tuning for [`LiveData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveOptions {
    pub refresh_interval: Duration,
    pub roster_refresh: Duration,
    pub history_capacity: usize,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            roster_refresh: DEFAULT_ROSTER_REFRESH,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// The live core for one process: hub, scheduler and roster.
///
/// Construct once at startup and share by reference; consumers get `Arc`
/// clones of the hub. Dropping it stops both timers.
#[derive(Debug)]
pub struct LiveData {
    hub: Arc<SubscriptionHub>,
    scheduler: RefreshScheduler,
    roster: Arc<RosterStore>,
    history: Option<Arc<dyn HistoryFetcher>>,
    ping: Option<Arc<dyn PingFetcher>>,
    description: String,
    options: LiveOptions,
}

impl LiveData {
    pub fn new(sources: Sources, options: LiveOptions) -> Self {
        let hub = Arc::new(SubscriptionHub::new());
        let description = sources.description().to_string();
        let scheduler = RefreshScheduler::new(sources.snapshot, hub.clone(), options.refresh_interval);
        let roster = Arc::new(RosterStore::new(sources.roster, options.roster_refresh));

        Self {
            hub,
            scheduler,
            roster,
            history: sources.history,
            ping: sources.ping,
            description,
            options,
        }
    }

    /// Start the snapshot and roster timers.
    pub fn start(&self) {
        self.scheduler.start();
        self.roster.start();
    }

    pub fn stop(&self) {
        self.scheduler.stop();
        self.roster.stop();
    }

    /// Fetch roster and snapshot once, without timers.
    ///
    /// Used for one-shot runs such as export. A roster failure is tolerated.
    pub async fn refresh_once(&self) -> TickOutcome {
        let _ = self.roster.refresh().await;
        self.scheduler.tick().await
    }

    pub fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.hub
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn roster_store(&self) -> &Arc<RosterStore> {
        &self.roster
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.hub.latest()
    }

    /// Roster to use against the latest snapshot.
    pub fn roster(&self) -> Arc<Roster> {
        self.roster.effective(self.hub.latest().as_deref())
    }

    pub fn ping_fetcher(&self) -> Option<Arc<dyn PingFetcher>> {
        self.ping.clone()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> LiveOptions {
        self.options
    }

    /// A future that activates a history view for `entity_id`.
    ///
    /// The future owns everything it needs, so it can be spawned. The view
    /// is seeded when a history fetcher is available.
    pub fn open_history(&self, entity_id: impl Into<String>) -> impl Future<Output = HistoryView> + Send + 'static {
        let hub = self.hub.clone();
        let history = self.history.clone();
        let capacity = self.options.history_capacity;
        let entity_id = entity_id.into();

        async move {
            match history {
                Some(fetcher) => {
                    HistoryView::activate_seeded(&hub, fetcher.as_ref(), &entity_id, capacity).await
                }
                None => HistoryView::activate(&hub, &entity_id, capacity),
            }
        }
    }
}

impl Drop for LiveData {
    fn drop(&mut self) {
        self.stop();
    }
}

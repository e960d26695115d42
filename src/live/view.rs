//! Scoped history views.
//!
//! A [`HistoryView`] is the lifetime of one node's history buffer: it seeds
//! the buffer, subscribes it to the hub, and unsubscribes when dropped.

use std::sync::Arc;

use fleetwatch_types::Snapshot;
use parking_lot::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::history::EntityHistoryBuffer;
use super::hub::{Subscription, SubscriptionHub};
use crate::source::HistoryFetcher;

/// A node's history buffer bound to the hub for as long as the view lives.
#[derive(Debug)]
pub struct HistoryView {
    buffer: Arc<Mutex<EntityHistoryBuffer>>,
    subscription: Subscription,
}

impl HistoryView {
    /// Activate a view with an empty buffer.
    ///
    /// The hub's current latest snapshot, if any, is ingested right away so
    /// the view does not wait a full tick for its first point.
    pub fn activate(hub: &Arc<SubscriptionHub>, entity_id: &str, capacity: usize) -> Self {
        Self::attach(hub, EntityHistoryBuffer::new(entity_id, capacity))
    }

    /// Activate a view seeded from a bulk history fetch.
    ///
    /// The seed is fetched before subscribing so that live records always
    /// land after it. A failed seed is logged and the view starts empty.
    pub async fn activate_seeded(
        hub: &Arc<SubscriptionHub>,
        history: &dyn HistoryFetcher,
        entity_id: &str,
        capacity: usize,
    ) -> Self {
        let buffer = match history.fetch_history(entity_id, capacity).await {
            Ok(records) => EntityHistoryBuffer::seeded(entity_id, capacity, records),
            Err(e) => {
                warn!(entity = entity_id, error = %e, "history seed failed, starting empty");
                EntityHistoryBuffer::new(entity_id, capacity)
            }
        };
        Self::attach(hub, buffer)
    }

    fn attach(hub: &Arc<SubscriptionHub>, buffer: EntityHistoryBuffer) -> Self {
        let entity = buffer.entity_id().to_string();
        let seeded = buffer.len();
        let buffer = Arc::new(Mutex::new(buffer));

        let sink = buffer.clone();
        let subscription = hub.subscribe_seeded(
            move |snapshot: &Arc<Snapshot>| {
                sink.lock().ingest(snapshot);
            },
            |latest| {
                buffer.lock().ingest(latest);
            },
        );

        info!(entity = %entity, seeded, subscriber = subscription.id(), "history view activated");
        Self {
            buffer,
            subscription,
        }
    }

    /// Lock the buffer for reading.
    pub fn buffer(&self) -> MutexGuard<'_, EntityHistoryBuffer> {
        self.buffer.lock()
    }

    pub fn entity_id(&self) -> String {
        self.buffer.lock().entity_id().to_string()
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Deactivate explicitly; dropping the view does the same.
    pub fn close(self) {}
}

impl Drop for HistoryView {
    fn drop(&mut self) {
        if self.subscription.unsubscribe() {
            info!(entity = %self.buffer.lock().entity_id(), "history view closed");
        }
    }
}

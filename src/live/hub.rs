//! Subscription hub - the process-wide latest snapshot and its consumers.
//!
//! The hub is a plain observer registry. Consumers register a callback and
//! get back a [`Subscription`] handle; every [`SubscriptionHub::publish`]
//! replaces the latest snapshot and then delivers it synchronously to each
//! registered callback.
//!
//! ## Delivery guarantees
//!
//! - Publishes are serialized: every subscriber sees snapshots in publish order.
//!   A callback may publish; that snapshot is queued and delivered after the
//!   current fan-out completes.
//! - Within one publish, subscribers are called in registration order.
//! - A panicking callback is contained and logged; the others still run.
//! - Unsubscribing takes effect immediately, even in the middle of a fan-out.

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use fleetwatch_types::Snapshot;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{trace, warn};

type Callback = Box<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

struct Subscriber {
    active: AtomicBool,
    callback: Callback,
}

#[derive(Debug, Clone)]
struct Published {
    snapshot: Arc<Snapshot>,
    sequence: u64,
    at: Instant,
}

/// Registry of snapshot consumers plus the latest published snapshot.
///
/// Construct once, share by `Arc`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use fleetwatch::SubscriptionHub;
/// use fleetwatch_types::Snapshot;
///
/// let hub = Arc::new(SubscriptionHub::new());
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = seen.clone();
/// let subscription = hub.subscribe(move |_snapshot| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// hub.publish(Snapshot::new());
/// subscription.unsubscribe();
/// hub.publish(Snapshot::new());
///
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// assert_eq!(hub.sequence(), 2);
/// ```
pub struct SubscriptionHub {
    subscribers: Mutex<BTreeMap<u64, Arc<Subscriber>>>,
    next_id: AtomicU64,
    latest: RwLock<Option<Published>>,
    /// Held for the whole publish; the flag is set while a fan-out runs.
    publish_lock: ReentrantMutex<Cell<bool>>,
    pending: Mutex<VecDeque<(Arc<Snapshot>, u64)>>,
    delivery_panics: AtomicU64,
}

impl SubscriptionHub {
    /// Create an empty hub with no latest snapshot.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            latest: RwLock::new(None),
            publish_lock: ReentrantMutex::new(Cell::new(false)),
            pending: Mutex::new(VecDeque::new()),
            delivery_panics: AtomicU64::new(0),
        }
    }

    /// Register a callback for future snapshots.
    ///
    /// The callback is not invoked with the current latest snapshot; late
    /// joiners read [`latest`](Self::latest) themselves. Callbacks run on
    /// the publishing thread and must not block.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let subscriber = Arc::new(Subscriber {
            active: AtomicBool::new(true),
            callback: Box::new(callback),
        });
        self.subscribers.lock().insert(id, subscriber.clone());
        trace!(subscriber = id, "subscribed");

        Subscription {
            id,
            subscriber,
            hub: Arc::downgrade(self),
        }
    }

    /// Subscribe, then hand the current latest snapshot to `init` before any
    /// later publish can reach the new callback.
    ///
    /// Lets a late joiner catch up from [`latest`](Self::latest) without a
    /// publish slipping in between its catch-up and its first delivery.
    pub fn subscribe_seeded<F, I>(self: &Arc<Self>, callback: F, init: I) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
        I: FnOnce(&Arc<Snapshot>),
    {
        let _serial = self.publish_lock.lock();
        let subscription = self.subscribe(callback);
        if let Some(latest) = self.latest() {
            init(&latest);
        }
        subscription
    }

    /// Release a subscription.
    ///
    /// Returns `true` if this call removed it, `false` if it was already
    /// released or belongs to another hub.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        if !std::ptr::eq(subscription.hub.as_ptr(), self) {
            return false;
        }
        subscription.unsubscribe()
    }

    fn remove(&self, id: u64) {
        self.subscribers.lock().remove(&id);
        trace!(subscriber = id, "unsubscribed");
    }

    /// Replace the latest snapshot and deliver it to every subscriber.
    ///
    /// Returns the sequence number of this publish, starting at 1. Called
    /// from inside a callback, it updates the latest snapshot at once but
    /// delivery waits until the running fan-out has reached everyone.
    pub fn publish(&self, snapshot: Snapshot) -> u64 {
        let fanning_out = self.publish_lock.lock();

        let snapshot = Arc::new(snapshot);
        let sequence = {
            let mut latest = self.latest.write();
            let sequence = latest.as_ref().map_or(1, |p| p.sequence + 1);
            *latest = Some(Published {
                snapshot: snapshot.clone(),
                sequence,
                at: Instant::now(),
            });
            sequence
        };
        self.pending.lock().push_back((snapshot, sequence));

        if fanning_out.replace(true) {
            trace!(sequence, "queued nested publish");
            return sequence;
        }
        loop {
            let next = self.pending.lock().pop_front();
            let Some((snapshot, sequence)) = next else {
                break;
            };
            self.deliver(&snapshot, sequence);
        }
        fanning_out.set(false);

        sequence
    }

    fn deliver(&self, snapshot: &Arc<Snapshot>, sequence: u64) {
        // Deliver outside the registry lock so callbacks may (un)subscribe.
        let targets: Vec<(u64, Arc<Subscriber>)> = self
            .subscribers
            .lock()
            .iter()
            .map(|(id, s)| (*id, s.clone()))
            .collect();

        for (id, subscriber) in targets {
            if !subscriber.active.load(Ordering::Acquire) {
                continue;
            }
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(snapshot)));
            if delivered.is_err() {
                self.delivery_panics.fetch_add(1, Ordering::Relaxed);
                warn!(subscriber = id, sequence, "subscriber panicked during delivery");
            }
        }

        trace!(sequence, nodes = snapshot.len(), "published snapshot");
    }

    /// The most recently published snapshot, if any.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().as_ref().map(|p| p.snapshot.clone())
    }

    /// Number of publishes so far.
    pub fn sequence(&self) -> u64 {
        self.latest.read().as_ref().map_or(0, |p| p.sequence)
    }

    /// When the latest snapshot was published.
    pub fn last_published_at(&self) -> Option<Instant> {
        self.latest.read().as_ref().map(|p| p.at)
    }

    /// Time since the latest publish.
    pub fn age(&self) -> Option<Duration> {
        self.last_published_at().map(|at| at.elapsed())
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Total callback panics contained so far.
    pub fn delivery_panics(&self) -> u64 {
        self.delivery_panics.load(Ordering::Relaxed)
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("subscribers", &self.subscriber_count())
            .field("sequence", &self.sequence())
            .finish()
    }
}

/// One consumer's registration with a [`SubscriptionHub`].
///
/// Releasing is idempotent. Dropping the handle releases it.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    id: u64,
    subscriber: Arc<Subscriber>,
    hub: Weak<SubscriptionHub>,
}

impl Subscription {
    /// Registration id, unique within its hub.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the subscription still receives snapshots.
    pub fn is_active(&self) -> bool {
        self.subscriber.active.load(Ordering::Acquire)
    }

    /// Stop delivery. Returns `true` only for the call that released it.
    pub fn unsubscribe(&self) -> bool {
        if !self.subscriber.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
        true
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn snapshot_with(id: &str) -> Snapshot {
        Snapshot::builder().online(id).build()
    }

    fn recorder(hub: &Arc<SubscriptionHub>) -> (Subscription, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hub_ref = Arc::downgrade(hub);
        let sub = hub.subscribe(move |_| {
            let seq = hub_ref.upgrade().map_or(0, |h| h.sequence());
            sink.lock().push(seq);
        });
        (sub, seen)
    }

    #[test]
    fn latest_is_none_before_first_publish() {
        let hub = SubscriptionHub::new();
        assert!(hub.latest().is_none());
        assert_eq!(hub.sequence(), 0);
        assert!(hub.age().is_none());
    }

    #[test]
    fn every_subscriber_gets_each_publish_once_in_order() {
        let hub = Arc::new(SubscriptionHub::new());
        let (_a, seen_a) = recorder(&hub);
        let (_b, seen_b) = recorder(&hub);

        for _ in 0..3 {
            hub.publish(Snapshot::new());
        }

        assert_eq!(*seen_a.lock(), vec![1, 2, 3]);
        assert_eq!(*seen_b.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn latest_tracks_most_recent_publish() {
        let hub = SubscriptionHub::new();
        hub.publish(snapshot_with("a"));
        hub.publish(snapshot_with("b"));

        let latest = hub.latest().unwrap();
        assert!(latest.is_online("b"));
        assert!(!latest.is_online("a"));
        assert!(hub.last_published_at().is_some());
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let hub = Arc::new(SubscriptionHub::new());
        let (sub, seen) = recorder(&hub);

        hub.publish(Snapshot::new());
        assert!(hub.unsubscribe(&sub));
        assert!(!hub.unsubscribe(&sub));
        assert!(!sub.unsubscribe());
        hub.publish(Snapshot::new());

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!sub.is_active());
    }

    #[test]
    fn dropping_handle_unsubscribes() {
        let hub = Arc::new(SubscriptionHub::new());
        let (sub, seen) = recorder(&hub);
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        hub.publish(Snapshot::new());

        assert_eq!(hub.subscriber_count(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let hub = Arc::new(SubscriptionHub::new());
        let other = Arc::new(SubscriptionHub::new());
        let sub = other.subscribe(|_| {});

        assert!(!hub.unsubscribe(&sub));
        assert!(sub.is_active());
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let hub = Arc::new(SubscriptionHub::new());
        let _bad = hub.subscribe(|_| panic!("boom"));
        let (_good, seen) = recorder(&hub);

        hub.publish(Snapshot::new());
        hub.publish(Snapshot::new());

        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(hub.delivery_panics(), 2);
    }

    #[test]
    fn unsubscribe_during_fan_out_takes_effect_immediately() {
        let hub = Arc::new(SubscriptionHub::new());
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = victim.clone();
        let _killer = hub.subscribe(move |_| {
            if let Some(sub) = slot.lock().take() {
                sub.unsubscribe();
            }
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        *victim.lock() = Some(hub.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        hub.publish(Snapshot::new());
        hub.publish(Snapshot::new());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn subscribe_during_fan_out_waits_for_next_publish() {
        let hub = Arc::new(SubscriptionHub::new());
        let late: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let late_calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&hub);
        let slot = late.clone();
        let counter = late_calls.clone();
        let _joiner = hub.subscribe(move |_| {
            let mut slot = slot.lock();
            if slot.is_none() {
                if let Some(hub) = weak.upgrade() {
                    let counter = counter.clone();
                    *slot = Some(hub.subscribe(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }));
                }
            }
        });

        hub.publish(Snapshot::new());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        hub.publish(Snapshot::new());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_from_callback_is_delivered_after_current_fan_out() {
        let hub = Arc::new(SubscriptionHub::new());
        let marks = |snapshot: &Arc<Snapshot>| snapshot.online.iter().next().cloned().unwrap_or_default();

        let first_seen = Arc::new(Mutex::new(Vec::new()));
        let sink = first_seen.clone();
        let weak = Arc::downgrade(&hub);
        let _republisher = hub.subscribe(move |snapshot| {
            let mark = marks(snapshot);
            if mark == "S1" {
                if let Some(hub) = weak.upgrade() {
                    assert_eq!(hub.publish(snapshot_with("S2")), 2);
                }
            }
            sink.lock().push(mark);
        });

        let second_seen = Arc::new(Mutex::new(Vec::new()));
        let sink = second_seen.clone();
        let _observer = hub.subscribe(move |snapshot| sink.lock().push(marks(snapshot)));

        assert_eq!(hub.publish(snapshot_with("S1")), 1);

        assert_eq!(*first_seen.lock(), vec!["S1", "S2"]);
        assert_eq!(*second_seen.lock(), vec!["S1", "S2"]);
        assert!(hub.latest().unwrap().is_online("S2"));
        assert_eq!(hub.sequence(), 2);

        hub.publish(snapshot_with("S3"));
        assert_eq!(*second_seen.lock(), vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn seeded_subscriber_starts_from_latest() {
        let hub = Arc::new(SubscriptionHub::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _empty = hub.subscribe_seeded(|_| {}, move |_| sink.lock().push(0));
        assert!(seen.lock().is_empty());

        hub.publish(snapshot_with("a"));
        let sink = seen.clone();
        let init = seen.clone();
        let _sub = hub.subscribe_seeded(
            move |s| sink.lock().push(s.online.len() as u64 + 1),
            move |s| init.lock().push(s.online.len() as u64),
        );
        hub.publish(Snapshot::new());

        assert_eq!(*seen.lock(), vec![1, 1]);
    }

    #[test]
    fn handle_outliving_hub_is_harmless() {
        let hub = Arc::new(SubscriptionHub::new());
        let sub = hub.subscribe(|_| {});
        drop(hub);
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn concurrent_publishers_are_observed_in_sequence_order() {
        let hub = Arc::new(SubscriptionHub::new());
        let (_sub, seen) = recorder(&hub);

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let hub = hub.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        hub.publish(Snapshot::new());
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 100);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }
}

//! # fleetwatch
//!
//! A terminal dashboard and library for watching a fleet of monitored servers.
//!
//! The core of the crate is a small live-data layer: one refresh scheduler
//! polls the monitoring server, one subscription hub holds the latest fleet
//! snapshot and fans it out, and per-node history buffers exist only while a
//! view of that node is open.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐  │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│  │
//! │  │ (state) │    │(derived) │    │(render) │    │         │  │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘  │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  ┌─────────┐    ┌──────────┐                                │
//! │  │  live   │───▶│  source  │◀── HttpSource | FileSource     │
//! │  │ (sync)  │    │ (fetch)  │                                │
//! │  └─────────┘    └──────────┘                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`live`]**: [`SubscriptionHub`], [`RefreshScheduler`], history buffers
//!   and scoped [`HistoryView`]s
//! - **[`source`]**: fetcher traits with HTTP and file implementations
//! - **[`data`]**: pure derivations (status cards, health, filtering, formatting)
//! - **[`config`]**: layered settings
//! - **[`export`]**: JSON export of the current state
//! - **[`app`]**, **[`events`]**, **[`ui`]**: the terminal application
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a monitoring server
//! fleetwatch --endpoint http://10.0.0.5:25774
//!
//! # Watch a snapshot file that something else keeps rewriting
//! fleetwatch --file fleet.json --roster-file nodes.json
//!
//! # One-shot export
//! fleetwatch --export fleet-state.json
//! ```
//!
//! ### Subscribing to snapshots
//!
//! ```
//! use std::sync::Arc;
//! use fleetwatch::SubscriptionHub;
//! use fleetwatch_types::Snapshot;
//!
//! let hub = Arc::new(SubscriptionHub::new());
//! let subscription = hub.subscribe(|snapshot: &Arc<Snapshot>| {
//!     println!("{} nodes online", snapshot.online_count());
//! });
//!
//! hub.publish(Snapshot::builder().online("node-1").build());
//! assert_eq!(hub.sequence(), 1);
//!
//! subscription.unsubscribe();
//! assert_eq!(hub.subscriber_count(), 0);
//! ```
//!
//! ### Tracking one node's history
//!
//! ```
//! use fleetwatch::live::{EntityHistoryBuffer, IngestOutcome};
//! use fleetwatch_types::Snapshot;
//!
//! let mut buffer = EntityHistoryBuffer::new("node-1", 3);
//! let snapshot = Snapshot::builder()
//!     .record("node-1", |r| r.timestamp_secs(10).cpu(42.0))
//!     .build();
//!
//! assert!(buffer.ingest(&snapshot).is_appended());
//! assert_eq!(buffer.ingest(&snapshot), IngestOutcome::Duplicate);
//! ```
//!
//! ### Polling a server
//!
//! ```no_run
//! use fleetwatch::live::{LiveData, LiveOptions};
//! use fleetwatch::source::{HttpSource, Sources};
//!
//! # tokio_test::block_on(async {
//! let http = HttpSource::builder().endpoint("http://127.0.0.1:25774").build().unwrap();
//! let live = LiveData::new(Sources::http(http), LiveOptions::default());
//! live.start();
//!
//! let view = live.open_history("node-uuid").await;
//! println!("{} records", view.buffer().len());
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod export;
pub mod live;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use data::{FleetData, FleetSummary, HealthStatus, Thresholds};
pub use live::{HistoryView, LiveData, RefreshScheduler, SubscriptionHub, TickOutcome};
pub use source::{
    FetchError, FileRoster, FileSource, HistoryFetcher, HttpSource, PingFetcher, RosterProvider,
    SnapshotFetcher, Sources,
};

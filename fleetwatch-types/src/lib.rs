//! # fleetwatch-types
//!
//! Core types for fleet telemetry. This crate defines the data model shared by
//! the fleetwatch synchronization core, its adapters and its front-end.
//!
//! ## Overview
//!
//! - [`Snapshot`]: one fetched, immutable fleet-wide sample - the set of online
//!   node ids plus the latest [`Record`] per node
//! - [`Record`]: one node's telemetry at one logical timestamp (`updated_at`)
//! - [`Roster`] / [`NodeInfo`]: the slowly changing list of known nodes with
//!   their static metadata
//! - [`PingReport`]: ping task statistics returned by the records RPC
//!
//! ## Features
//!
//! - `serde`: JSON serialization via serde. Numeric measurement fields are
//!   decoded leniently: a missing, `null` or malformed value becomes zero
//!   instead of failing the whole snapshot. An unreadable `updated_at`
//!   becomes the Unix epoch.
//!
//! ## Example
//!
//! ```rust
//! use fleetwatch_types::Snapshot;
//!
//! let snapshot = Snapshot::builder()
//!     .online("node-a")
//!     .record("node-a", |r| r.timestamp_secs(1_700_000_000).cpu(12.5).net_rate(2048, 1024))
//!     .record("node-b", |r| r.timestamp_secs(1_700_000_000))
//!     .build();
//!
//! assert_eq!(snapshot.online_count(), 1);
//! assert_eq!(snapshot.online_records().count(), 1);
//! ```

#[cfg(feature = "serde")]
mod lenient;
mod node;
mod ping;
mod record;
mod snapshot;

pub use node::*;
pub use ping::*;
pub use record::*;
pub use snapshot::*;

/// Logical timestamp carried by every [`Record`].
///
/// Records of one node are ordered and deduplicated by this value.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

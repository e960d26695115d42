//! Derived views over the roster and the latest snapshot.
//!
//! Everything here is a pure function of a [`Roster`](fleetwatch_types::Roster)
//! and an optional [`Snapshot`](fleetwatch_types::Snapshot); nothing holds
//! state between publishes.
//!
//! ## Submodules
//!
//! - [`aggregate`]: fleet-wide counts and throughput sums ([`FleetSummary`])
//! - [`fleet`]: health-annotated rows for the node and region tables
//! - [`filter`]: group selection and free-text search
//! - [`format`]: byte, speed and duration formatting
//! - [`health`]: threshold-based node classification
//! - [`ping`]: ping loss and volatility summary
//!
//! ```text
//! Roster + Snapshot
//!        │
//!        ▼
//! FleetData::from_snapshot()
//!        │
//!        ├──▶ NodeRow (with health computed from Thresholds)
//!        ├──▶ RegionRow
//!        └──▶ FleetSummary
//! ```

pub mod aggregate;
pub mod filter;
pub mod fleet;
pub mod format;
pub mod health;
pub mod ping;

pub use aggregate::{FleetSummary, Throughput};
pub use filter::{groups, GroupSelection, NodeFilter};
pub use fleet::{FleetData, NodeRow, RegionRow};
pub use health::{HealthStatus, Level, NodeHealth, Thresholds};
pub use ping::PingStats;

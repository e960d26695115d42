//! Fetcher abstractions for fleet telemetry.
//!
//! The live core only knows these traits. Implementations talk to the
//! monitoring server over HTTP ([`HttpSource`]) or read JSON files from disk
//! ([`FileSource`], [`FileRoster`]).

mod error;
mod file;
mod http;

pub use error::FetchError;
pub use file::{FileRoster, FileSource, StaticRoster};
pub use http::{HttpSource, HttpSourceBuilder, DEFAULT_ENDPOINT};

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use fleetwatch_types::{PingReport, Record, Roster, Snapshot};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Performs one request and returns a full fleet-wide snapshot.
///
/// # Example
///
/// ```no_run
/// use fleetwatch::{FileSource, SnapshotFetcher};
///
/// # tokio_test::block_on(async {
/// let source = FileSource::new("fleet.json");
/// let snapshot = source.fetch_snapshot().await.unwrap();
/// println!("{} nodes online", snapshot.online_count());
/// # });
/// ```
#[async_trait]
pub trait SnapshotFetcher: Send + Sync + Debug {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError>;

    /// Human-readable description of the source, shown in the status bar.
    fn description(&self) -> &str;
}

/// Bulk history for one node, used to seed a history buffer.
#[async_trait]
pub trait HistoryFetcher: Send + Sync + Debug {
    /// Fetch at most the last `window` records of `entity_id`, oldest first.
    async fn fetch_history(&self, entity_id: &str, window: usize) -> Result<Vec<Record>, FetchError>;
}

/// Supplier of the node roster.
#[async_trait]
pub trait RosterProvider: Send + Sync + Debug {
    async fn fetch_roster(&self) -> Result<Roster, FetchError>;
}

/// Ping statistics for one node over the last `hours` hours.
#[async_trait]
pub trait PingFetcher: Send + Sync + Debug {
    async fn fetch_ping(&self, uuid: &str, hours: u32) -> Result<PingReport, FetchError>;
}

/// The set of fetchers the application runs against.
///
/// Only the snapshot fetcher is mandatory. Without a roster provider the
/// roster is synthesized from snapshot ids.
#[derive(Debug, Clone)]
pub struct Sources {
    pub snapshot: Arc<dyn SnapshotFetcher>,
    pub roster: Option<Arc<dyn RosterProvider>>,
    pub history: Option<Arc<dyn HistoryFetcher>>,
    pub ping: Option<Arc<dyn PingFetcher>>,
}

impl Sources {
    /// Use one HTTP source for everything.
    pub fn http(source: HttpSource) -> Self {
        let source = Arc::new(source);
        Self {
            snapshot: source.clone(),
            roster: Some(source.clone()),
            history: Some(source.clone()),
            ping: Some(source),
        }
    }

    /// Read snapshots (and optionally the roster) from files.
    pub fn file(source: FileSource, roster: Option<FileRoster>) -> Self {
        Self {
            snapshot: Arc::new(source),
            roster: roster.map(|r| Arc::new(r) as Arc<dyn RosterProvider>),
            history: None,
            ping: None,
        }
    }

    /// Description of the snapshot source.
    pub fn description(&self) -> &str {
        self.snapshot.description()
    }
}

/// `{status, message, data}` wrapper used by the server's REST endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, FetchError> {
        if self.status != "success" {
            return Err(FetchError::Parse(format!(
                "server reported status '{}': {}",
                self.status, self.message
            )));
        }
        self.data
            .ok_or_else(|| FetchError::Parse("response has no data".to_string()))
    }
}

/// Decode a body that must be an envelope.
fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice::<Envelope<T>>(body)?.into_data()
}

/// Decode a body that is either an envelope or the bare payload.
fn decode_enveloped_or_bare<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let is_envelope = value
        .as_object()
        .map(|o| o.contains_key("status") && o.contains_key("data"))
        .unwrap_or(false);

    if is_envelope {
        serde_json::from_value::<Envelope<T>>(value)?.into_data()
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_success_yields_data() {
        let snapshot: Snapshot =
            decode_envelope(br#"{"status":"success","message":"","data":{"online":["a"]}}"#).unwrap();
        assert!(snapshot.is_online("a"));
    }

    #[test]
    fn envelope_error_status_is_parse_error() {
        let err = decode_envelope::<Snapshot>(br#"{"status":"error","message":"denied","data":null}"#)
            .unwrap_err();
        match err {
            FetchError::Parse(msg) => assert!(msg.contains("denied")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn envelope_without_data_is_parse_error() {
        let err = decode_envelope::<Snapshot>(br#"{"status":"success"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn bare_payload_is_accepted() {
        let roster: Roster = decode_enveloped_or_bare(br#"[{"uuid":"a"},{"uuid":"b"}]"#).unwrap();
        assert_eq!(roster.len(), 2);

        let roster: Roster =
            decode_enveloped_or_bare(br#"{"status":"success","data":[{"uuid":"a"}]}"#).unwrap();
        assert_eq!(roster.len(), 1);
    }
}

//! HTTP adapter for the monitoring server's REST and JSON-RPC API.
//!
//! ## Endpoints
//!
//! - `GET /api/clients`: live snapshot (online ids plus latest record per node)
//! - `GET /api/recent/{uuid}`: recent records of one node
//! - `GET /api/nodes`: the node roster
//! - `POST /api/rpc2`: JSON-RPC 2.0, used for `common:getRecords` ping statistics
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use fleetwatch::{HttpSource, SnapshotFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpSource::builder()
//!         .endpoint("http://127.0.0.1:25774")
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let snapshot = source.fetch_snapshot().await?;
//!     println!("{} of {} nodes online", snapshot.online_count(), snapshot.len());
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fleetwatch_types::{PingReport, Record, Roster, Snapshot};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    decode_envelope, FetchError, HistoryFetcher, PingFetcher, RosterProvider, SnapshotFetcher,
};

/// Default server address.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:25774";

/// Fetcher backed by the monitoring server's HTTP API.
#[derive(Debug)]
pub struct HttpSource {
    client: Client,
    endpoint: String,
    description: String,
    rpc_id: AtomicU64,
}

impl HttpSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> HttpSourceBuilder {
        HttpSourceBuilder::default()
    }

    /// Base URL without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get_enveloped<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url(path);
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        decode_envelope(&body)
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<R, FetchError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.rpc_id.fetch_add(1, Ordering::Relaxed),
        };
        let url = self.url("/api/rpc2");
        debug!(%url, method, "RPC");

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let reply: RpcResponse<R> = serde_json::from_slice(&body)?;
        if let Some(err) = reply.error {
            return Err(FetchError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        reply
            .result
            .ok_or_else(|| FetchError::Parse(format!("{method} returned no result")))
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        self.get_enveloped("/api/clients").await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[async_trait]
impl HistoryFetcher for HttpSource {
    async fn fetch_history(&self, entity_id: &str, window: usize) -> Result<Vec<Record>, FetchError> {
        let path = format!("/api/recent/{}", path_segment(entity_id));
        let mut records: Vec<Record> = self.get_enveloped(&path).await?;
        if records.len() > window {
            records.drain(..records.len() - window);
        }
        Ok(records)
    }
}

#[async_trait]
impl RosterProvider for HttpSource {
    async fn fetch_roster(&self) -> Result<Roster, FetchError> {
        self.get_enveloped("/api/nodes").await
    }
}

#[async_trait]
impl PingFetcher for HttpSource {
    async fn fetch_ping(&self, uuid: &str, hours: u32) -> Result<PingReport, FetchError> {
        let params = RecordsParams {
            uuid,
            kind: "ping",
            hours,
        };
        self.call("common:getRecords", params).await
    }
}

/// Builder for [`HttpSource`].
#[derive(Debug, Default)]
pub struct HttpSourceBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl HttpSourceBuilder {
    /// Set the server base URL (e.g., "http://127.0.0.1:25774").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<HttpSource, FetchError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fleetwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(HttpSource {
            client,
            description: format!("http: {endpoint}"),
            endpoint,
            rpc_id: AtomicU64::new(1),
        })
    }
}

// Percent-encode characters that would break a single path segment
fn path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Debug, Serialize)]
struct RecordsParams<'a> {
    uuid: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    hours: u32,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

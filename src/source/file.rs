//! File-based fetchers.
//!
//! Read snapshot and roster JSON from disk, either bare or wrapped in the
//! server's `{status, data}` envelope. Useful for offline inspection and for
//! driving the dashboard from a script that rewrites the file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fleetwatch_types::{Roster, Snapshot};

use super::{decode_enveloped_or_bare, FetchError, RosterProvider, SnapshotFetcher};

/// A snapshot fetcher that re-reads a JSON file on every fetch.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotFetcher for FileSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let body = tokio::fs::read(&self.path).await?;
        decode_enveloped_or_bare(&body)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// A roster provider that reads a JSON array of nodes from a file.
#[derive(Debug)]
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RosterProvider for FileRoster {
    async fn fetch_roster(&self) -> Result<Roster, FetchError> {
        let body = tokio::fs::read(&self.path).await?;
        decode_enveloped_or_bare(&body)
    }
}

/// A roster provider with a fixed roster.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster(Roster);

impl StaticRoster {
    pub fn new(roster: Roster) -> Self {
        Self(roster)
    }
}

#[async_trait]
impl RosterProvider for StaticRoster {
    async fn fetch_roster(&self) -> Result<Roster, FetchError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_types::NodeInfo;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "online": ["node-a"],
            "data": {
                "node-a": {
                    "cpu": {"usage": 21.0},
                    "network": {"up": 100, "down": 200, "totalUp": 1000, "totalDown": 2000},
                    "updated_at": "2025-03-01T12:00:00Z"
                }
            }
        }"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/fleet.json");
        assert_eq!(source.path(), Path::new("/tmp/fleet.json"));
        assert_eq!(source.description(), "file: /tmp/fleet.json");
    }

    #[tokio::test]
    async fn test_file_source_reads_bare_snapshot() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let source = FileSource::new(file.path());
        let snapshot = source.fetch_snapshot().await.unwrap();
        assert!(snapshot.is_online("node-a"));
        assert_eq!(snapshot.record("node-a").unwrap().network.total_down, 2000);
    }

    #[tokio::test]
    async fn test_file_source_reads_envelope() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"status":"success","message":"","data":{}}}"#, sample_json()).unwrap();

        let source = FileSource::new(file.path());
        let snapshot = source.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.online_count(), 1);
    }

    #[tokio::test]
    async fn test_file_source_rereads_on_every_fetch() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), sample_json()).unwrap();

        let source = FileSource::new(file.path());
        assert_eq!(source.fetch_snapshot().await.unwrap().online_count(), 1);

        std::fs::write(file.path(), r#"{"online": [], "data": {}}"#).unwrap();
        assert_eq!(source.fetch_snapshot().await.unwrap().online_count(), 0);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileSource::new("/nonexistent/path/fleet.json");
        let err = source.fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[tokio::test]
    async fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let source = FileSource::new(file.path());
        let err = source.fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_file_roster() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"[{{"uuid":"a","name":"Alpha","region":"DE"}},{{"uuid":"b","name":"Beta","region":"US"}}]"#
        )
        .unwrap();

        let roster = FileRoster::new(file.path()).fetch_roster().await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get("b").unwrap().region, "US");
    }

    #[tokio::test]
    async fn test_static_roster() {
        let roster = Roster::new(vec![NodeInfo::new("x")]);
        let provider = StaticRoster::new(roster.clone());
        assert_eq!(provider.fetch_roster().await.unwrap(), roster);
    }
}

//! Layered settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional config file (`--config`, TOML / YAML / JSON by extension)
//! 3. environment variables prefixed `FLEETWATCH_`, nested with `__`
//!    (e.g. `FLEETWATCH_THRESHOLDS__CPU__WARNING=70`)
//! 4. command-line flags
//!
//! ```toml
//! endpoint = "http://10.0.0.5:25774"
//! refresh_interval_ms = 2000
//!
//! [thresholds.cpu]
//! warning = 70
//! critical = 90
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::Thresholds;
use crate::live::LiveOptions;
use crate::source::{FileRoster, FileSource, HttpSource, Sources, DEFAULT_ENDPOINT};

/// Values from the command line that take precedence over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub file: Option<PathBuf>,
    pub roster_file: Option<PathBuf>,
    pub refresh_interval_ms: Option<u64>,
    pub history_capacity: Option<u64>,
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the monitoring server.
    pub endpoint: String,
    /// Read snapshots from this file instead of the server.
    pub file: Option<PathBuf>,
    /// Roster file to pair with `file`.
    pub roster_file: Option<PathBuf>,
    pub refresh_interval_ms: u64,
    pub roster_refresh_ms: u64,
    pub history_capacity: usize,
    pub request_timeout_ms: u64,
    /// Window for ping statistics.
    pub ping_hours: u32,
    pub thresholds: Thresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            file: None,
            roster_file: None,
            refresh_interval_ms: 5000,
            roster_refresh_ms: 60_000,
            history_capacity: 150,
            request_timeout_ms: 10_000,
            ping_hours: 24,
            thresholds: Thresholds::default(),
        }
    }
}

impl Settings {
    /// Load and validate settings from all layers.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder
            .add_source(
                Environment::with_prefix("FLEETWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("endpoint", overrides.endpoint.clone())?
            .set_override_option("file", overrides.file.as_ref().map(|p| p.display().to_string()))?
            .set_override_option("roster_file", overrides.roster_file.as_ref().map(|p| p.display().to_string()))?
            .set_override_option("refresh_interval_ms", overrides.refresh_interval_ms)?
            .set_override_option("history_capacity", overrides.history_capacity)?;

        let settings: Settings = builder
            .build()
            .context("failed to load configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the live core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            bail!("refresh_interval_ms must be greater than zero");
        }
        if self.roster_refresh_ms == 0 {
            bail!("roster_refresh_ms must be greater than zero");
        }
        if self.history_capacity == 0 {
            bail!("history_capacity must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        if self.file.is_none() && self.endpoint.trim().is_empty() {
            bail!("either an endpoint or a snapshot file is required");
        }
        if self.roster_file.is_some() && self.file.is_none() {
            bail!("roster_file requires file");
        }
        self.thresholds.validate().map_err(anyhow::Error::msg)
    }

    pub fn live_options(&self) -> LiveOptions {
        LiveOptions {
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            roster_refresh: Duration::from_millis(self.roster_refresh_ms),
            history_capacity: self.history_capacity,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Build the adapters these settings describe.
    pub fn sources(&self) -> Result<Sources> {
        match &self.file {
            Some(path) => Ok(Sources::file(
                FileSource::new(path),
                self.roster_file.as_ref().map(FileRoster::new),
            )),
            None => {
                let http = HttpSource::builder()
                    .endpoint(&self.endpoint)
                    .timeout(self.request_timeout())
                    .build()
                    .with_context(|| format!("failed to create client for {}", self.endpoint))?;
                Ok(Sources::http(http))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(ext: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_any_source() {
        let settings = Settings::load(None, &Overrides::default()).unwrap();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.live_options(), LiveOptions::default());
        assert_eq!(settings.ping_hours, 24);
    }

    #[test]
    fn file_values_and_nested_thresholds() {
        let file = write_config(
            ".toml",
            r#"
endpoint = "http://10.0.0.5:25774"
history_capacity = 30

[thresholds.cpu]
warning = 70.0
critical = 90.0
"#,
        );

        let settings = Settings::load(Some(file.path()), &Overrides::default()).unwrap();
        assert_eq!(settings.endpoint, "http://10.0.0.5:25774");
        assert_eq!(settings.history_capacity, 30);
        assert_eq!(settings.thresholds.cpu.warning, 70.0);
        assert_eq!(settings.thresholds.ram, Thresholds::default().ram);
    }

    #[test]
    fn overrides_win_over_file() {
        let file = write_config(".toml", "refresh_interval_ms = 2000\n");
        let overrides = Overrides {
            refresh_interval_ms: Some(750),
            file: Some(PathBuf::from("snapshot.json")),
            ..Default::default()
        };

        let settings = Settings::load(Some(file.path()), &overrides).unwrap();
        assert_eq!(settings.refresh_interval_ms, 750);
        assert_eq!(settings.file, Some(PathBuf::from("snapshot.json")));
    }

    #[test]
    fn zero_capacity_rejected() {
        let overrides = Overrides {
            history_capacity: Some(0),
            ..Default::default()
        };
        let err = Settings::load(None, &overrides).unwrap_err();
        assert!(err.to_string().contains("history_capacity"));
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let file = write_config(".toml", "[thresholds.disk]\nwarning = 99.0\ncritical = 90.0\n");
        let err = Settings::load(Some(file.path()), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("thresholds.disk"));
    }

    #[test]
    fn roster_file_needs_snapshot_file() {
        let settings = Settings {
            roster_file: Some(PathBuf::from("nodes.json")),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/fleetwatch.toml")), &Overrides::default());
        assert!(err.is_err());
    }

    #[test]
    fn file_settings_build_file_sources() {
        let settings = Settings {
            file: Some(PathBuf::from("snapshot.json")),
            ..Default::default()
        };
        let sources = settings.sources().unwrap();
        assert!(sources.description().starts_with("file: "));
        assert!(sources.history.is_none());
    }
}

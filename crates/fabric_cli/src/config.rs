//! Service configuration file.

use fabric_agent::AgentConfig;
use fabric_sync_engine::{SyncConfig, DEFAULT_SYNC_INTERVAL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default journal location, relative to the working directory.
pub const DEFAULT_JOURNAL_PATH: &str = "fabric-journal.json";

/// Everything `fabricsync` needs to run, loaded from a JSON file.
///
/// Every field is optional in the file. Command-line flags are applied on
/// top with [`ServiceConfig::with_journal_path`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Journal document path.
    pub journal_path: PathBuf,
    /// Fabric controller connection.
    pub agent: AgentConfig,
    /// Seconds between periodic passes.
    pub sync_interval_secs: u64,
    /// Seconds to wait for the worker on shutdown. `None` waits forever.
    pub stop_timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            journal_path: PathBuf::from(DEFAULT_JOURNAL_PATH),
            agent: AgentConfig::default(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            stop_timeout_secs: Some(10),
        }
    }
}

impl ServiceConfig {
    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        Self::from_json(&text).map_err(|e| format!("invalid config {}: {e}", path.display()).into())
    }

    /// Parses a configuration document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Overrides the journal path when one is given.
    pub fn with_journal_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.journal_path = path;
        }
        self
    }

    /// Builds the engine configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_sync_interval(Duration::from_secs(self.sync_interval_secs.max(1)))
            .with_stop_timeout(self.stop_timeout_secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ServiceConfig::from_json("{}").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = ServiceConfig::from_json(
            r#"{
                "journal_path": "/var/lib/fabricsync/journal.json",
                "agent": { "address": "fm01", "username": "admin" },
                "stop_timeout_secs": null
            }"#,
        )
        .unwrap();

        assert_eq!(config.journal_path, PathBuf::from("/var/lib/fabricsync/journal.json"));
        assert_eq!(config.agent.address, "fm01");
        assert_eq!(config.agent.username.as_deref(), Some("admin"));
        assert_eq!(config.agent.binary, "opafmvf");
        assert_eq!(config.sync_interval_secs, 20);
        assert_eq!(config.sync_config().stop_timeout, None);
    }

    #[test]
    fn flag_overrides_file() {
        let config = ServiceConfig::default().with_journal_path(Some("other.json".into()));
        assert_eq!(config.journal_path, PathBuf::from("other.json"));

        let config = config.with_journal_path(None);
        assert_eq!(config.journal_path, PathBuf::from("other.json"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServiceConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }

    #[test]
    fn sync_config_uses_interval() {
        let config = ServiceConfig {
            sync_interval_secs: 5,
            ..ServiceConfig::default()
        };
        let sync = config.sync_config();
        assert_eq!(sync.sync_interval, Duration::from_secs(5));
        assert_eq!(sync.stop_timeout, Some(Duration::from_secs(10)));
    }
}

//! Configuration for the sync engine.

use std::time::Duration;

/// Default interval of the periodic sync worker.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(20);

/// Configuration for the sync engine and its periodic worker.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between periodic wakes.
    pub sync_interval: Duration,
    /// How long `stop` waits for the worker to exit; `None` waits forever.
    pub stop_timeout: Option<Duration>,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            stop_timeout: Some(Duration::from_secs(10)),
            thread_name: "fabric-sync".to_string(),
        }
    }

    /// Sets the periodic wake interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the stop timeout.
    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Sets the worker thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Periodic wake timer.

use crate::engine::Wake;
use crate::error::{SyncError, SyncResult};
use crate::wake::WakeSignal;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wakes a shared engine on a fixed interval.
///
/// The worker never runs passes itself: it only signals the engine it was
/// given, so wakes lost to a crash and entries left behind by an interrupted
/// pass are picked up within one interval. The first wake is sent as soon as
/// the worker starts.
pub struct PeriodicSyncWorker<W> {
    target: Arc<W>,
    interval: Duration,
    thread_name: String,
    shutdown: Arc<WakeSignal>,
    ticks: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<W: Wake + 'static> PeriodicSyncWorker<W> {
    /// Creates a stopped worker that wakes `target` every `interval`.
    pub fn new(target: Arc<W>, interval: Duration) -> Self {
        Self {
            target,
            interval,
            thread_name: "fabric-sync-timer".to_string(),
            shutdown: Arc::new(WakeSignal::new()),
            ticks: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Sets the timer thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Returns the wake interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns how many wakes have been sent.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Returns true while the timer thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the timer.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] if the timer is already running,
    /// or an error if the thread cannot be spawned.
    pub fn start(&self) -> SyncResult<()> {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(SyncError::AlreadyRunning("periodic sync worker"));
        }
        if let Some(finished) = handle.take() {
            if finished.join().is_err() {
                warn!("Previous periodic sync worker exited abnormally");
            }
        }

        self.shutdown.clear();
        let target = Arc::clone(&self.target);
        let shutdown = Arc::clone(&self.shutdown);
        let ticks = Arc::clone(&self.ticks);
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || loop {
                target.wake();
                ticks.fetch_add(1, Ordering::SeqCst);
                if shutdown.wait_timeout(interval) {
                    debug!("Periodic sync worker exiting");
                    break;
                }
            })
            .map_err(SyncError::Spawn)?;
        *handle = Some(spawned);

        info!("Periodic sync worker started, interval {:?}", self.interval);
        Ok(())
    }

    /// Stops the timer. Does nothing if it is not running.
    pub fn stop(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        self.shutdown.set();
        if handle.join().is_err() {
            warn!("Periodic sync worker exited abnormally");
        }
        info!("Periodic sync worker stopped");
    }
}

impl<W> Drop for PeriodicSyncWorker<W> {
    fn drop(&mut self) {
        if self.handle.get_mut().is_some() {
            self.shutdown.set();
        }
    }
}

impl<W> std::fmt::Debug for PeriodicSyncWorker<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicSyncWorker")
            .field("interval", &self.interval)
            .field("ticks", &self.ticks.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

//! Engine and timer wired together.

use crate::config::SyncConfig;
use crate::engine::{StopOutcome, SyncEngine};
use crate::error::SyncResult;
use crate::periodic::PeriodicSyncWorker;
use crate::producer::Producer;
use fabric_agent::FabricExecutor;
use fabric_journal::JournalStore;
use std::sync::Arc;
use tracing::info;

/// A sync engine and the periodic worker that keeps it live.
///
/// Both share one engine instance; producers reach it through
/// [`SyncService::engine`] or [`SyncService::producer`].
#[derive(Debug)]
pub struct SyncService<S, E> {
    config: SyncConfig,
    engine: Arc<SyncEngine<S, E>>,
    periodic: PeriodicSyncWorker<SyncEngine<S, E>>,
}

impl<S, E> SyncService<S, E>
where
    S: JournalStore + 'static,
    E: FabricExecutor + 'static,
{
    /// Creates a stopped service.
    pub fn new(config: SyncConfig, store: Arc<S>, executor: Arc<E>) -> Self {
        let engine = Arc::new(SyncEngine::new(config.clone(), store, executor));
        let periodic = PeriodicSyncWorker::new(Arc::clone(&engine), config.sync_interval)
            .with_thread_name(format!("{}-timer", config.thread_name));
        Self {
            config,
            engine,
            periodic,
        }
    }

    /// Returns the shared engine.
    pub fn engine(&self) -> &Arc<SyncEngine<S, E>> {
        &self.engine
    }

    /// Returns the periodic worker.
    pub fn periodic(&self) -> &PeriodicSyncWorker<SyncEngine<S, E>> {
        &self.periodic
    }

    /// Returns a producer that records into the journal and wakes the engine.
    pub fn producer(&self) -> Producer<S, SyncEngine<S, E>> {
        Producer::new(Arc::clone(self.engine.store()), Arc::clone(&self.engine))
    }

    /// Starts the engine, then the periodic worker.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned, or
    /// [`SyncError::AlreadyRunning`](crate::SyncError::AlreadyRunning) if the
    /// service is already started.
    pub fn start(&self) -> SyncResult<()> {
        self.engine.start()?;
        self.periodic.start()?;
        info!("Sync service started");
        Ok(())
    }

    /// Stops the periodic worker, then the engine.
    pub fn stop(&self) -> StopOutcome {
        self.periodic.stop();
        let outcome = self.engine.stop(self.config.stop_timeout);
        info!("Sync service stopped: {:?}", outcome);
        outcome
    }

    /// Returns true while the engine worker is alive.
    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}

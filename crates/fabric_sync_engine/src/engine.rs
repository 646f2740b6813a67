//! The reconciliation engine.

use crate::config::SyncConfig;
use crate::error::{MalformedEntry, SyncError, SyncResult};
use crate::planner::{BatchOutcome, BatchPlan, BatchPlanner};
use crate::wake::WakeSignal;
use chrono::{DateTime, Utc};
use fabric_agent::{FabricCommand, FabricExecutor, FabricOperation};
use fabric_journal::{keys, EntryState, JournalEntry, JournalStore, Operation, ResourceType};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How a call to [`SyncEngine::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No worker was running.
    NotRunning,
    /// The worker exited.
    Stopped,
    /// The worker was still finishing a pass when the timeout elapsed.
    TimedOut,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Pending entries seen.
    pub pending: usize,
    /// Waiting entries seen.
    pub waiting: usize,
    /// Entries moved to `completed`.
    pub completed: usize,
    /// Entries moved to `failed`, malformed ones included.
    pub failed: usize,
    /// Entries moved to `failed` because their payload is unusable.
    pub malformed: usize,
    /// Entries left in place for a later pass.
    pub deferred: usize,
    /// Fabric commands issued, commit and reload included.
    pub commands: usize,
    /// Whether the pass ended with commit and reload.
    pub committed: bool,
    /// Pass-level failure, if the pass ended early.
    pub error: Option<String>,
    /// Wall time of the pass.
    pub duration: Duration,
}

/// Cumulative engine statistics.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes run, by the worker or `sync_once`.
    pub passes: u64,
    /// Entries moved to `completed`.
    pub entries_completed: u64,
    /// Entries moved to `failed`.
    pub entries_failed: u64,
    /// Fabric commands issued.
    pub commands_issued: u64,
    /// Commit and reload sequences issued.
    pub commits_issued: u64,
    /// Panics caught at the worker boundary.
    pub panics: u64,
    /// End of the last pass.
    pub last_pass_at: Option<DateTime<Utc>>,
    /// Last pass-level error.
    pub last_error: Option<String>,
}

/// Something that can request a reconciliation pass.
pub trait Wake: Send + Sync {
    /// Requests a pass; never blocks.
    fn wake(&self);
}

/// A [`Wake`] that does nothing, for recording entries without an engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWake;

impl Wake for NoWake {
    fn wake(&self) {}
}

/// Drains pending and waiting journal entries into the fabric controller.
///
/// The engine owns a single worker thread. Each [`wake`](SyncEngine::wake)
/// asks for one pass; wakes that arrive before the worker picks up the
/// signal collapse into that same pass, which always re-reads the journal.
///
/// # Example
///
/// ```rust
/// use fabric_agent::MockExecutor;
/// use fabric_journal::MemoryJournal;
/// use fabric_sync_engine::{SyncConfig, SyncEngine};
/// use std::sync::Arc;
///
/// let engine = SyncEngine::new(
///     SyncConfig::default(),
///     Arc::new(MemoryJournal::new()),
///     Arc::new(MockExecutor::new()),
/// );
/// let report = engine.sync_once();
/// assert_eq!(report.commands, 0);
/// ```
pub struct SyncEngine<S, E> {
    config: SyncConfig,
    inner: Arc<EngineInner<S, E>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct EngineInner<S, E> {
    store: Arc<S>,
    executor: Arc<E>,
    signal: WakeSignal,
    exited: WakeSignal,
    stopping: AtomicBool,
    pass_lock: Mutex<()>,
    stats: RwLock<SyncStats>,
}

impl<S, E> SyncEngine<S, E>
where
    S: JournalStore + 'static,
    E: FabricExecutor + 'static,
{
    /// Creates a stopped engine.
    pub fn new(config: SyncConfig, store: Arc<S>, executor: Arc<E>) -> Self {
        Self {
            config,
            inner: Arc::new(EngineInner {
                store,
                executor,
                signal: WakeSignal::new(),
                exited: WakeSignal::new(),
                stopping: AtomicBool::new(false),
                pass_lock: Mutex::new(()),
                stats: RwLock::new(SyncStats::default()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the journal store.
    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Returns the fabric executor.
    pub fn executor(&self) -> &Arc<E> {
        &self.inner.executor
    }

    /// Starts the worker thread. Does nothing if it is already running.
    ///
    /// After a stop that timed out, this waits for the previous worker to
    /// finish its pass before starting a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start(&self) -> SyncResult<()> {
        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            if !handle.is_finished() && !self.inner.stopping.load(Ordering::SeqCst) {
                *worker = Some(handle);
                debug!("Sync engine already running");
                return Ok(());
            }
            if handle.join().is_err() {
                warn!("Previous sync worker exited abnormally");
            }
        }

        self.inner.stopping.store(false, Ordering::SeqCst);
        self.inner.exited.clear();

        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || inner.run_worker())
            .map_err(SyncError::Spawn)?;
        *worker = Some(handle);

        info!("Sync engine started");
        Ok(())
    }

    /// Stops the worker thread.
    ///
    /// The worker is woken so it notices the request without waiting for the
    /// next wake. After the join attempt an `abort` is sent to the controller
    /// to kill anything an interrupted command left behind. With a timeout,
    /// the worker may still be finishing its pass when this returns
    /// [`StopOutcome::TimedOut`]; [`is_running`](SyncEngine::is_running)
    /// reports when it is gone.
    pub fn stop(&self, timeout: Option<Duration>) -> StopOutcome {
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return StopOutcome::NotRunning;
        };

        self.inner.stopping.store(true, Ordering::SeqCst);
        self.inner.signal.set();

        let exited = match timeout {
            Some(timeout) => handle.is_finished() || self.inner.exited.wait_timeout(timeout),
            None => true,
        };

        let outcome = if exited {
            if handle.join().is_err() {
                warn!("Sync worker exited abnormally");
            }
            info!("Sync engine stopped");
            StopOutcome::Stopped
        } else {
            warn!("Sync worker did not exit within {:?}", timeout);
            *worker = Some(handle);
            StopOutcome::TimedOut
        };
        drop(worker);

        self.inner.abort();
        outcome
    }

    /// Returns true while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Requests a reconciliation pass.
    pub fn wake(&self) {
        self.inner.signal.set();
    }

    /// Runs one pass on the calling thread.
    ///
    /// Waits for a pass already in progress on the worker to finish first.
    pub fn sync_once(&self) -> PassReport {
        self.inner.run_pass()
    }

    /// Returns cumulative statistics.
    pub fn stats(&self) -> SyncStats {
        self.inner.stats.read().clone()
    }
}

impl<S, E> Wake for SyncEngine<S, E>
where
    S: JournalStore + 'static,
    E: FabricExecutor + 'static,
{
    fn wake(&self) {
        SyncEngine::wake(self);
    }
}

impl<S, E> Drop for SyncEngine<S, E> {
    fn drop(&mut self) {
        if self.worker.get_mut().is_some() {
            self.inner.stopping.store(true, Ordering::SeqCst);
            self.inner.signal.set();
        }
    }
}

impl<S, E> std::fmt::Debug for SyncEngine<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("stats", &*self.inner.stats.read())
            .finish_non_exhaustive()
    }
}

impl<S, E> EngineInner<S, E>
where
    S: JournalStore,
    E: FabricExecutor,
{
    fn run_worker(&self) {
        debug!("Sync worker running");
        loop {
            self.signal.wait();
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }

            if panic::catch_unwind(AssertUnwindSafe(|| self.run_pass())).is_err() {
                error!("Sync pass panicked; waiting for the next wake");
                self.stats.write().panics += 1;
            }
        }
        debug!("Sync worker exiting");
        self.exited.set();
    }

    fn abort(&self) {
        let abort = FabricCommand::Management(FabricOperation::Abort);
        match self.executor.execute(&abort) {
            Ok(status) => debug!("Abort returned {}", status),
            Err(e) => warn!("Abort after stop failed: {}", e),
        }
    }

    fn run_pass(&self) -> PassReport {
        let _pass = self.pass_lock.lock();
        let started = Instant::now();
        let mut report = PassReport::default();
        debug!("Sync pass started");

        if let Err(e) = self.reconcile(&mut report) {
            error!("Sync pass ended early: {}", e);
            report.error = Some(e.to_string());
        }
        report.duration = started.elapsed();

        {
            let mut stats = self.stats.write();
            stats.passes += 1;
            stats.entries_completed += report.completed as u64;
            stats.entries_failed += report.failed as u64;
            stats.commands_issued += report.commands as u64;
            if report.committed {
                stats.commits_issued += 1;
            }
            stats.last_pass_at = Some(Utc::now());
            if let Some(e) = &report.error {
                stats.last_error = Some(e.clone());
            }
        }

        debug!(
            "Sync pass finished in {:?}: {} completed, {} failed, {} deferred, {} commands",
            report.duration, report.completed, report.failed, report.deferred, report.commands
        );
        report
    }

    fn reconcile(&self, report: &mut PassReport) -> SyncResult<()> {
        let pending = self.store.entries_by_state(EntryState::Pending)?;
        let waiting = self.store.entries_by_state(EntryState::Waiting)?;
        report.pending = pending.len();
        report.waiting = waiting.len();

        let mut commit_required = false;
        for entry in &pending {
            if let Err(e) = self.process_pending(entry, report, &mut commit_required) {
                warn!("Failed to sync {}, will retry: {}", entry.key(), e);
                report.deferred += 1;
            }
        }

        let (outcome, batched) = self.process_waiting(&waiting, report);
        commit_required |= report_batches(report, &outcome);

        // Owed even when the batch step failed part way.
        let committed = if commit_required {
            self.commit_and_reload(report)
        } else {
            Ok(())
        };
        batched.and(committed)
    }

    fn process_pending(
        &self,
        entry: &JournalEntry,
        report: &mut PassReport,
        commit_required: &mut bool,
    ) -> SyncResult<()> {
        if entry.resource_type != ResourceType::Network {
            warn!("Pending {} left unchanged; only networks are processed individually", entry.key());
            report.deferred += 1;
            return Ok(());
        }

        let command = match network_command(entry) {
            Ok(command) => command,
            Err(malformed) => return self.reject(entry, &malformed, report),
        };

        if command.operation() == FabricOperation::Delete {
            *commit_required = true;
        }
        report.commands += 1;
        let status = self.executor.execute(&command)?;

        if status.is_success() {
            if self.store.update_state(entry, EntryState::Completed)? {
                info!("Network {}: '{}' completed", entry.resource_uuid, command);
                report.completed += 1;
            } else {
                superseded(entry, &command, report);
            }
        } else {
            let diagnostic = format!("'{command}' returned {status}");
            if self.store.record_failure(entry, &diagnostic)? {
                warn!("Network {}: {}", entry.resource_uuid, diagnostic);
                report.failed += 1;
            } else {
                superseded(entry, &command, report);
            }
        }
        Ok(())
    }

    fn process_waiting(
        &self,
        waiting: &[JournalEntry],
        report: &mut PassReport,
    ) -> (BatchOutcome, SyncResult<()>) {
        let mut outcome = BatchOutcome::default();
        if waiting.is_empty() {
            return (outcome, Ok(()));
        }

        let plan = BatchPlan::from_entries(waiting);
        for (entry, malformed) in plan.malformed() {
            if let Err(e) = self.reject(entry, malformed, report) {
                warn!("Failed to reject {}: {}", entry.key(), e);
            }
        }
        report.deferred += plan.skipped();

        let result = BatchPlanner::apply_into(
            &plan,
            self.store.as_ref(),
            self.executor.as_ref(),
            &mut outcome,
        );
        (outcome, result)
    }

    fn reject(
        &self,
        entry: &JournalEntry,
        malformed: &MalformedEntry,
        report: &mut PassReport,
    ) -> SyncResult<()> {
        if self.store.record_failure(entry, &malformed.reason)? {
            error!("{}", malformed);
            report.malformed += 1;
            report.failed += 1;
        } else {
            debug!("{} superseded before it could be rejected", entry.key());
            report.deferred += 1;
        }
        Ok(())
    }

    fn commit_and_reload(&self, report: &mut PassReport) -> SyncResult<()> {
        for op in [FabricOperation::Commit, FabricOperation::Reload] {
            report.commands += 1;
            let status = self.executor.execute(&FabricCommand::Management(op))?;
            if !status.is_success() {
                warn!("Fabric {} returned {}", op, status);
            }
        }
        info!("Fabric configuration committed and reloaded");
        report.committed = true;
        Ok(())
    }
}

/// Folds batch results into the report; returns true if a commit is owed.
///
/// Any successful batch owes a commit, even one whose entries were all
/// superseded.
fn report_batches(report: &mut PassReport, outcome: &BatchOutcome) -> bool {
    report.completed += outcome.applied;
    report.failed += outcome.failed;
    report.deferred += outcome.deferred + outcome.superseded;
    report.commands += outcome.commands;
    outcome.successful_batches > 0
}

/// The command ran but a producer replaced the entry meanwhile; the new
/// operation is picked up by the next pass.
fn superseded(entry: &JournalEntry, command: &FabricCommand, report: &mut PassReport) {
    info!(
        "{} was superseded while '{}' ran; left for the next pass",
        entry.key(),
        command
    );
    report.deferred += 1;
}

fn network_command(entry: &JournalEntry) -> Result<FabricCommand, MalformedEntry> {
    let operation = match entry.operation() {
        Some(Ok(op)) => op,
        Some(Err(op)) => return Err(MalformedEntry::new(entry.key(), op)),
        None => return Err(MalformedEntry::new(entry.key(), "missing operation")),
    };

    let name = entry
        .data
        .get_str(keys::FABRIC_ID)
        .ok_or_else(|| MalformedEntry::new(entry.key(), "missing fabric_id"))?
        .to_string();

    match operation {
        Operation::Create => {
            let key = entry
                .data
                .get_u64(keys::PARTITION_KEY)
                .ok_or_else(|| MalformedEntry::new(entry.key(), "missing partition key"))?;
            Ok(FabricCommand::Create { name, key })
        }
        Operation::Delete => Ok(FabricCommand::Delete { name }),
        Operation::Bind => Err(MalformedEntry::new(
            entry.key(),
            "bind is not a network operation",
        )),
    }
}

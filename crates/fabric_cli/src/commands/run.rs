//! Long-running service command.

use crate::config::ServiceConfig;
use fabric_agent::RemoteShellExecutor;
use fabric_journal::FileJournal;
use fabric_sync_engine::{StopOutcome, SyncService};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the sync service until Ctrl-C, then stops it.
pub fn run(config: &ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileJournal::open_with_create_dirs(&config.journal_path)?;
    let executor = RemoteShellExecutor::new(config.agent.clone());
    let service = SyncService::new(config.sync_config(), Arc::new(store), Arc::new(executor));

    service.start()?;
    info!(
        "Sync service running: journal {:?}, controller {}, interval {}s",
        config.journal_path, config.agent.address, config.sync_interval_secs
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;

    info!("Interrupted; stopping sync service");
    match service.stop() {
        StopOutcome::TimedOut => warn!("Sync worker did not exit in time; abandoning it"),
        outcome => info!("Sync service stopped ({:?})", outcome),
    }

    let stats = service.engine().stats();
    println!(
        "✓ {} passes, {} completed, {} failed, {} commits",
        stats.passes, stats.entries_completed, stats.entries_failed, stats.commits_issued
    );
    Ok(())
}

//! One-shot reconciliation pass.

use crate::config::ServiceConfig;
use fabric_agent::RemoteShellExecutor;
use fabric_journal::FileJournal;
use fabric_sync_engine::{PassReport, SyncEngine};
use std::sync::Arc;
use tracing::info;

/// Runs a single pass against the configured controller and prints its report.
///
/// The engine worker is never started, so no abort is issued afterwards.
pub fn run(config: &ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileJournal::open_with_create_dirs(&config.journal_path)?;
    let executor = RemoteShellExecutor::new(config.agent.clone());
    let engine = SyncEngine::new(config.sync_config(), Arc::new(store), Arc::new(executor));

    info!("Running one pass against {}", config.agent.address);
    let report = engine.sync_once();
    print!("{}", render(&report));

    match report.error {
        Some(error) => Err(format!("pass ended early: {}", error).into()),
        None => Ok(()),
    }
}

fn render(report: &PassReport) -> String {
    let mut out = String::new();
    out.push_str("Sync Pass\n");
    out.push_str("=========\n");
    out.push_str(&format!("  Pending:   {}\n", report.pending));
    out.push_str(&format!("  Waiting:   {}\n", report.waiting));
    out.push_str(&format!("  Completed: {}\n", report.completed));
    out.push_str(&format!("  Failed:    {} ({} malformed)\n", report.failed, report.malformed));
    out.push_str(&format!("  Deferred:  {}\n", report.deferred));
    out.push_str(&format!("  Commands:  {}\n", report.commands));
    out.push_str(&format!("  Committed: {}\n", if report.committed { "yes" } else { "no" }));
    out.push_str(&format!("  Duration:  {:?}\n", report.duration));
    if let Some(error) = &report.error {
        out.push_str(&format!("  Error:     {}\n", error));
    }
    out
}

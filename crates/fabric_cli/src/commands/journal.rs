//! Producer commands.
//!
//! These record resource changes in the journal without a running engine.
//! A `fabricsync run` process picks them up on its next periodic pass.

use fabric_journal::{keys, FileJournal, JournalEntry};
use fabric_sync_engine::{NoWake, Producer};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn producer(journal_path: &Path) -> Result<Producer<FileJournal, NoWake>, Box<dyn std::error::Error>> {
    let store = FileJournal::open_with_create_dirs(journal_path)?;
    Ok(Producer::new(Arc::new(store), Arc::new(NoWake)))
}

fn report(what: &str, id: &str, entry: Option<JournalEntry>) {
    match entry {
        Some(entry) => {
            info!("Journaled {} {}", what, id);
            println!(
                "✓ {} {} recorded as {} ({})",
                entry.resource_type,
                entry.resource_uuid,
                entry.state,
                entry.data.get_str(keys::OPERATION).unwrap_or("?")
            );
        }
        None => println!("- {} {} ignored", what, id),
    }
}

/// Journals a new network.
pub fn network_create(journal_path: &Path, id: &str, fabric_id: &str, key: u64) -> CliResult {
    let entry = producer(journal_path)?.network_created(id, fabric_id, key)?;
    report("network create", id, Some(entry));
    Ok(())
}

/// Journals the deletion of a network.
pub fn network_delete(journal_path: &Path, id: &str) -> CliResult {
    let entry = producer(journal_path)?.network_deleted(id)?;
    report("network delete", id, entry);
    Ok(())
}

/// Journals a new port.
pub fn port_create(journal_path: &Path, id: &str, network_id: &str, member: Option<&str>) -> CliResult {
    let entry = producer(journal_path)?.port_created(id, network_id, member)?;
    report("port create", id, entry);
    Ok(())
}

/// Journals that a port was bound.
pub fn port_bind(journal_path: &Path, id: &str) -> CliResult {
    let entry = producer(journal_path)?.port_bound(id)?;
    report("port bind", id, entry);
    Ok(())
}

/// Journals the deletion of a port.
pub fn port_delete(journal_path: &Path, id: &str) -> CliResult {
    let entry = producer(journal_path)?.port_deleted(id)?;
    report("port delete", id, entry);
    Ok(())
}

//! Journal fixtures and seeding helpers.

use fabric_journal::{
    keys, EntryState, FileJournal, JournalEntry, JournalStore, Operation, Payload, ResourceType,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary directory holding one journal document.
///
/// The journal can be opened, dropped, and opened again to model a process
/// restart; the directory lives as long as this value.
pub struct TestJournal {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TestJournal {
    /// Creates a fresh temporary directory for a journal.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("journal.json");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the journal document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the journal. Only one handle may be open at a time.
    pub fn open(&self) -> Arc<FileJournal> {
        Arc::new(FileJournal::open(&self.path).expect("Failed to open journal"))
    }
}

impl Default for TestJournal {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a network payload.
pub fn network_payload(operation: Operation, fabric_id: &str, key: u64) -> Payload {
    Payload::new(operation)
        .with(keys::FABRIC_ID, fabric_id)
        .with(keys::PARTITION_KEY, key)
}

/// Builds a port payload.
pub fn port_payload(operation: Operation, network_id: &str, member: &str) -> Payload {
    Payload::new(operation)
        .with(keys::NETWORK_ID, network_id)
        .with(keys::MEMBER, member)
}

/// Records a pending network entry whose fabric name is `vf-<id>` and key is 10.
pub fn seed_network<S: JournalStore + ?Sized>(store: &S, id: &str, operation: Operation) -> JournalEntry {
    store
        .record_entry(
            id,
            ResourceType::Network,
            network_payload(operation, &format!("vf-{id}"), 10),
            EntryState::Pending,
        )
        .expect("Failed to seed network")
}

/// Records a waiting port entry.
pub fn seed_port<S: JournalStore + ?Sized>(
    store: &S,
    id: &str,
    network_id: &str,
    operation: Operation,
    member: &str,
) -> JournalEntry {
    store
        .record_entry(
            id,
            ResourceType::Port,
            port_payload(operation, network_id, member),
            EntryState::Waiting,
        )
        .expect("Failed to seed port")
}

/// Returns the state of an entry, if it exists.
pub fn state_of<S: JournalStore + ?Sized>(
    store: &S,
    id: &str,
    resource_type: ResourceType,
) -> Option<EntryState> {
    store
        .get_entry(id, resource_type)
        .expect("Failed to read entry")
        .map(|entry| entry.state)
}

/// Returns the number of entries in each state, in [`EntryState::ALL`] order.
pub fn state_counts<S: JournalStore + ?Sized>(store: &S) -> [usize; 4] {
    let mut counts = [0; 4];
    for entry in store.all_entries().expect("Failed to read journal") {
        if let Some(slot) = EntryState::ALL.iter().position(|s| *s == entry.state) {
            counts[slot] += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_journal::MemoryJournal;

    #[test]
    fn test_journal_reopen() {
        let dir = TestJournal::new();
        {
            let journal = dir.open();
            seed_network(journal.as_ref(), "n1", Operation::Create);
        }

        let journal = dir.open();
        assert_eq!(state_of(journal.as_ref(), "n1", ResourceType::Network), Some(EntryState::Pending));
        assert!(dir.path().exists());
    }

    #[test]
    fn seeding_helpers() {
        let journal = MemoryJournal::new();
        seed_network(&journal, "n1", Operation::Delete);
        seed_port(&journal, "p1", "n1", Operation::Bind, "g1");

        let entry = journal.get_entry("n1", ResourceType::Network).unwrap().unwrap();
        assert_eq!(entry.data.get_str(keys::FABRIC_ID), Some("vf-n1"));
        assert_eq!(state_counts(&journal), [1, 1, 0, 0]);
    }
}

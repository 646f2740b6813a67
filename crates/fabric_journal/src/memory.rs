//! In-memory journal store.

use crate::entry::{EntryState, JournalEntry, Payload, ResourceType};
use crate::error::JournalResult;
use crate::store::JournalStore;
use crate::table::JournalTable;
use parking_lot::RwLock;

/// An in-memory journal.
///
/// This store keeps all entries in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Deployments that rebuild the journal on startup
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use fabric_journal::{EntryState, JournalStore, MemoryJournal, Operation, Payload, ResourceType};
///
/// let journal = MemoryJournal::new();
/// let entry = journal
///     .record_entry("p1", ResourceType::Port, Payload::new(Operation::Bind), EntryState::Waiting)
///     .unwrap();
/// journal.update_state(&entry, EntryState::Completed).unwrap();
///
/// let stored = journal.get_entry("p1", ResourceType::Port).unwrap().unwrap();
/// assert_eq!(stored.state, EntryState::Completed);
/// assert_eq!(stored.revision_number, 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryJournal {
    table: RwLock<JournalTable>,
}

impl MemoryJournal {
    /// Creates a new empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Returns true if the journal holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JournalStore for MemoryJournal {
    fn record_entry(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> JournalResult<JournalEntry> {
        self.table
            .write()
            .insert(resource_uuid, resource_type, data, state)
    }

    fn get_entry(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
    ) -> JournalResult<Option<JournalEntry>> {
        Ok(self.table.read().get(resource_uuid, resource_type))
    }

    fn entries_by_state(&self, state: EntryState) -> JournalResult<Vec<JournalEntry>> {
        Ok(self.table.read().by_state(state))
    }

    fn update_state(&self, entry: &JournalEntry, state: EntryState) -> JournalResult<bool> {
        self.table
            .write()
            .set_state(&entry.key(), entry.revision_number, state, None)
    }

    fn update_states_bulk(
        &self,
        state: EntryState,
        resource_type: ResourceType,
        revisions: &[(String, u64)],
    ) -> JournalResult<usize> {
        Ok(self.table.write().set_states(state, resource_type, revisions))
    }

    fn record_failure(&self, entry: &JournalEntry, diagnostic: &str) -> JournalResult<bool> {
        self.table.write().set_state(
            &entry.key(),
            entry.revision_number,
            EntryState::Failed,
            Some(diagnostic),
        )
    }

    fn supersede(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> JournalResult<Option<JournalEntry>> {
        Ok(self
            .table
            .write()
            .replace(resource_uuid, resource_type, data, state))
    }

    fn all_entries(&self) -> JournalResult<Vec<JournalEntry>> {
        Ok(self.table.read().all())
    }
}

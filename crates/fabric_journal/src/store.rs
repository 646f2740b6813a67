//! Journal store trait definition.

use crate::entry::{EntryState, JournalEntry, Payload, ResourceType};
use crate::error::JournalResult;

/// Durable keyed storage of journal entries, queryable by state.
///
/// # Invariants
///
/// - `(resource_uuid, resource_type)` is unique
/// - Every update bumps `revision_number` and refreshes `updated_at`
/// - Entries are never removed
/// - Stores must be `Send + Sync`; producers and the sync engine share one
///
/// # Implementors
///
/// - [`super::MemoryJournal`] - For testing
/// - [`super::FileJournal`] - For persistent storage
pub trait JournalStore: Send + Sync {
    /// Records a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::AlreadyExists`](crate::JournalError::AlreadyExists)
    /// if an entry with the same key exists.
    fn record_entry(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> JournalResult<JournalEntry>;

    /// Looks up an entry by key.
    fn get_entry(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
    ) -> JournalResult<Option<JournalEntry>>;

    /// Returns every entry in `state`, oldest first.
    fn entries_by_state(&self, state: EntryState) -> JournalResult<Vec<JournalEntry>>;

    /// Moves one entry to `state`, provided it is still at the revision of
    /// `entry`.
    ///
    /// Returns `false` without writing when the entry was superseded after
    /// `entry` was read. Clears the stored diagnostic unless `state` is
    /// `Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotFound`](crate::JournalError::NotFound) if the
    /// entry does not exist.
    fn update_state(&self, entry: &JournalEntry, state: EntryState) -> JournalResult<bool>;

    /// Moves every listed entry of `resource_type` to `state` in one operation.
    ///
    /// Each entry is given as `(resource_uuid, revision_number)` and is only
    /// changed while still at that revision. Unknown identifiers are ignored.
    /// Returns the number of entries changed.
    fn update_states_bulk(
        &self,
        state: EntryState,
        resource_type: ResourceType,
        revisions: &[(String, u64)],
    ) -> JournalResult<usize>;

    /// Moves an entry to `Failed` and stores a diagnostic.
    ///
    /// Same revision rule as [`JournalStore::update_state`].
    fn record_failure(&self, entry: &JournalEntry, diagnostic: &str) -> JournalResult<bool>;

    /// Replaces the payload and state of an existing entry.
    ///
    /// This is the producer path for superseding a previous operation, e.g. a
    /// delete superseding a create. Returns `None` if no entry exists.
    fn supersede(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> JournalResult<Option<JournalEntry>>;

    /// Returns every entry, oldest first.
    fn all_entries(&self) -> JournalResult<Vec<JournalEntry>>;
}

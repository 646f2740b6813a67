//! Producer side of the journal.
//!
//! Resource lifecycle hooks record what they want the fabric to look like,
//! then wake the engine. Producers never execute fabric commands and only
//! create entries or supersede existing ones.

use crate::engine::Wake;
use crate::error::SyncResult;
use fabric_journal::{keys, EntryState, JournalEntry, JournalStore, Operation, Payload, ResourceType};
use std::sync::Arc;
use tracing::debug;

/// Records resource mutations into the journal.
#[derive(Debug)]
pub struct Producer<S, W> {
    store: Arc<S>,
    waker: Arc<W>,
}

impl<S, W> Clone for Producer<S, W> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            waker: Arc::clone(&self.waker),
        }
    }
}

impl<S: JournalStore, W: Wake> Producer<S, W> {
    /// Creates a producer writing into `store` and waking `waker`.
    pub fn new(store: Arc<S>, waker: Arc<W>) -> Self {
        Self { store, waker }
    }

    /// Records a network to be created on the fabric.
    ///
    /// # Errors
    ///
    /// Returns an error if the network is already journaled or the store fails.
    pub fn network_created(&self, id: &str, fabric_id: &str, key: u64) -> SyncResult<JournalEntry> {
        let payload = Payload::new(Operation::Create)
            .with(keys::FABRIC_ID, fabric_id)
            .with(keys::PARTITION_KEY, key);
        let entry = self
            .store
            .record_entry(id, ResourceType::Network, payload, EntryState::Pending)?;
        debug!("Journaled create of network {}", id);
        self.waker.wake();
        Ok(entry)
    }

    /// Supersedes a journaled network with a delete.
    ///
    /// Returns `None` without waking when the network was never journaled.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn network_deleted(&self, id: &str) -> SyncResult<Option<JournalEntry>> {
        self.supersede(id, ResourceType::Network, Operation::Delete, EntryState::Pending)
    }

    /// Records a port so that a later bind can be batched.
    ///
    /// Ports without a member are not attached to the fabric and are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is already journaled or the store fails.
    pub fn port_created(
        &self,
        id: &str,
        network_id: &str,
        member: Option<&str>,
    ) -> SyncResult<Option<JournalEntry>> {
        let Some(member) = member.filter(|m| !m.is_empty()) else {
            debug!("Port {} has no fabric member; not journaled", id);
            return Ok(None);
        };
        let payload = Payload::new(Operation::Create)
            .with(keys::NETWORK_ID, network_id)
            .with(keys::MEMBER, member);
        let entry = self
            .store
            .record_entry(id, ResourceType::Port, payload, EntryState::Waiting)?;
        debug!("Journaled port {} on network {}", id, network_id);
        Ok(Some(entry))
    }

    /// Queues a journaled port for binding in the next batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn port_bound(&self, id: &str) -> SyncResult<Option<JournalEntry>> {
        self.supersede(id, ResourceType::Port, Operation::Bind, EntryState::Waiting)
    }

    /// Queues a journaled port for removal in the next batch.
    ///
    /// Ports without a member were never added and are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn port_deleted(&self, id: &str) -> SyncResult<Option<JournalEntry>> {
        let has_member = self
            .store
            .get_entry(id, ResourceType::Port)?
            .is_some_and(|entry| entry.data.get_str(keys::MEMBER).is_some());
        if !has_member {
            debug!("Port {} has no journaled member; nothing to remove", id);
            return Ok(None);
        }
        self.supersede(id, ResourceType::Port, Operation::Delete, EntryState::Waiting)
    }

    /// Rewrites the operation of an existing entry, keeping its attributes.
    fn supersede(
        &self,
        id: &str,
        resource_type: ResourceType,
        operation: Operation,
        state: EntryState,
    ) -> SyncResult<Option<JournalEntry>> {
        let Some(existing) = self.store.get_entry(id, resource_type)? else {
            debug!("No journaled {} {}; {} ignored", resource_type, id, operation);
            return Ok(None);
        };

        let mut payload = existing.data;
        payload.set(keys::OPERATION, operation.as_str());
        let entry = self.store.supersede(id, resource_type, payload, state)?;
        if entry.is_some() {
            debug!("Journaled {} of {} {}", operation, resource_type, id);
            self.waker.wake();
        }
        Ok(entry)
    }
}

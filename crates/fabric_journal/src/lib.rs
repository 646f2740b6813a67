//! # Fabric Journal
//!
//! Durable record of the desired state of fabric resources.
//!
//! Every mutation of a network or port elsewhere in the system is written
//! here as a [`JournalEntry`] before the fabric controller is touched. The
//! sync engine later drains outstanding entries and reconciles them with the
//! controller.
//!
//! ## Design Principles
//!
//! - An entry is keyed by `(resource_uuid, resource_type)` and never duplicated
//! - Producers only create entries or supersede them; the sync engine owns
//!   every other state transition
//! - Entries are never deleted; terminal entries stay until superseded
//! - Stores must be `Send + Sync` so producers and the engine can share them
//!
//! ## Available Stores
//!
//! - [`MemoryJournal`] - For testing and ephemeral deployments
//! - [`FileJournal`] - JSON document on disk, rewritten atomically
//!
//! ## Example
//!
//! ```rust
//! use fabric_journal::{EntryState, JournalStore, MemoryJournal, Operation, Payload, ResourceType};
//!
//! let journal = MemoryJournal::new();
//! let payload = Payload::new(Operation::Create)
//!     .with("fabric_id", "net1")
//!     .with("key", 10);
//! journal
//!     .record_entry("uuid-1", ResourceType::Network, payload, EntryState::Pending)
//!     .unwrap();
//!
//! let pending = journal.entries_by_state(EntryState::Pending).unwrap();
//! assert_eq!(pending.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entry;
mod error;
mod file;
mod memory;
mod store;
mod table;

pub use entry::{
    keys, EntryKey, EntryState, JournalEntry, Operation, Payload, ResourceType,
};
pub use error::{JournalError, JournalResult};
pub use file::FileJournal;
pub use memory::MemoryJournal;
pub use store::JournalStore;

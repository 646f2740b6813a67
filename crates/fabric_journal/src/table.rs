//! Unlocked entry table shared by the store implementations.

use crate::entry::{EntryKey, EntryState, JournalEntry, Payload, ResourceType};
use crate::error::{JournalError, JournalResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current on-disk document version.
pub(crate) const DOCUMENT_VERSION: u32 = 1;

/// Serialized form of a journal.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JournalDocument {
    pub version: u32,
    pub entries: Vec<JournalEntry>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct JournalTable {
    entries: BTreeMap<EntryKey, JournalEntry>,
}

impl JournalTable {
    pub fn from_document(document: JournalDocument) -> JournalResult<Self> {
        if document.version != DOCUMENT_VERSION {
            return Err(JournalError::Corrupted(format!(
                "unsupported journal version {}",
                document.version
            )));
        }

        let mut entries = BTreeMap::new();
        for entry in document.entries {
            let key = entry.key();
            if entries.insert(key.clone(), entry).is_some() {
                return Err(JournalError::Corrupted(format!("duplicate entry {key}")));
            }
        }
        Ok(Self { entries })
    }

    pub fn to_document(&self) -> JournalDocument {
        JournalDocument {
            version: DOCUMENT_VERSION,
            entries: self.sorted(|_| true),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(
        &mut self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> JournalResult<JournalEntry> {
        let key = EntryKey::new(resource_uuid, resource_type);
        if self.entries.contains_key(&key) {
            return Err(JournalError::AlreadyExists {
                resource_uuid: resource_uuid.to_string(),
                resource_type,
            });
        }

        let entry = JournalEntry::new(resource_uuid, resource_type, data, state);
        self.entries.insert(key, entry.clone());
        Ok(entry)
    }

    pub fn get(&self, resource_uuid: &str, resource_type: ResourceType) -> Option<JournalEntry> {
        self.entries
            .get(&EntryKey::new(resource_uuid, resource_type))
            .cloned()
    }

    pub fn by_state(&self, state: EntryState) -> Vec<JournalEntry> {
        self.sorted(|entry| entry.state == state)
    }

    pub fn all(&self) -> Vec<JournalEntry> {
        self.sorted(|_| true)
    }

    /// Moves the entry to `state` if it is still at `revision`.
    ///
    /// Returns `false`, leaving the entry alone, when it has been updated
    /// since `revision` was read.
    pub fn set_state(
        &mut self,
        key: &EntryKey,
        revision: u64,
        state: EntryState,
        diagnostic: Option<&str>,
    ) -> JournalResult<bool> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| JournalError::NotFound {
                resource_uuid: key.resource_uuid.clone(),
                resource_type: key.resource_type,
            })?;
        if entry.revision_number != revision {
            return Ok(false);
        }

        entry.state = state;
        entry.last_error = match (state, diagnostic) {
            (EntryState::Failed, Some(diagnostic)) => Some(diagnostic.to_string()),
            (EntryState::Failed, None) => entry.last_error.take(),
            _ => None,
        };
        touch(entry);
        Ok(true)
    }

    pub fn set_states(
        &mut self,
        state: EntryState,
        resource_type: ResourceType,
        revisions: &[(String, u64)],
    ) -> usize {
        let mut changed = 0;
        for (uuid, revision) in revisions {
            let Some(entry) = self
                .entries
                .get_mut(&EntryKey::new(uuid.as_str(), resource_type))
            else {
                continue;
            };
            if entry.revision_number != *revision {
                continue;
            }
            entry.state = state;
            if state != EntryState::Failed {
                entry.last_error = None;
            }
            touch(entry);
            changed += 1;
        }
        changed
    }

    pub fn replace(
        &mut self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> Option<JournalEntry> {
        let entry = self
            .entries
            .get_mut(&EntryKey::new(resource_uuid, resource_type))?;
        entry.data = data;
        entry.state = state;
        entry.last_error = None;
        touch(entry);
        Some(entry.clone())
    }

    fn sorted(&self, filter: impl Fn(&JournalEntry) -> bool) -> Vec<JournalEntry> {
        let mut selected: Vec<JournalEntry> = self
            .entries
            .values()
            .filter(|entry| filter(entry))
            .cloned()
            .collect();
        selected.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.key().cmp(&b.key()))
        });
        selected
    }
}

fn touch(entry: &mut JournalEntry) {
    entry.revision_number += 1;
    entry.updated_at = Utc::now();
}

//! File-backed journal store.

use crate::entry::{EntryState, JournalEntry, Payload, ResourceType};
use crate::error::{JournalError, JournalResult};
use crate::store::JournalStore;
use crate::table::{JournalDocument, JournalTable};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A journal persisted as a single JSON document.
///
/// Every mutation rewrites the document to a temporary file in the same
/// directory, syncs it, and renames it over the previous version, so a crash
/// leaves either the old or the new journal on disk, never a mix.
///
/// # Ownership
///
/// Opening takes an exclusive advisory lock on `<path>.lock`. A second open of
/// the same journal, from this or any other process, fails with
/// [`JournalError::Locked`] until the first handle is dropped. This keeps a
/// single sync engine per journal.
///
/// # Example
///
/// ```no_run
/// use fabric_journal::{EntryState, FileJournal, JournalStore, Operation, Payload, ResourceType};
/// use std::path::Path;
///
/// let journal = FileJournal::open(Path::new("journal.json")).unwrap();
/// journal
///     .record_entry("n1", ResourceType::Network, Payload::new(Operation::Create), EntryState::Pending)
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    table: RwLock<JournalTable>,
    _lock: File,
}

impl FileJournal {
    /// Opens or creates a journal at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is held elsewhere, the file cannot be
    /// read, or its contents are not a valid journal document.
    pub fn open(path: &Path) -> JournalResult<Self> {
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path(path))?;
        lock.try_lock_exclusive()
            .map_err(|_| JournalError::Locked(path.to_path_buf()))?;

        let table = match fs::read(path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => JournalTable::default(),
            Ok(bytes) => {
                let document: JournalDocument = serde_json::from_slice(&bytes)
                    .map_err(|e| JournalError::Corrupted(e.to_string()))?;
                JournalTable::from_document(document)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => JournalTable::default(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened journal {:?} with {} entries", path, table.len());

        Ok(Self {
            path: path.to_path_buf(),
            table: RwLock::new(table),
            _lock: lock,
        })
    }

    /// Opens or creates a journal, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the journal cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> JournalResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the journal document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
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

    /// Applies `change` to a copy of the table and installs it once persisted.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut JournalTable) -> JournalResult<T>,
    ) -> JournalResult<T> {
        let mut table = self.table.write();
        let mut next = table.clone();
        let result = change(&mut next)?;
        self.persist(&next)?;
        *table = next;
        Ok(result)
    }

    fn persist(&self, table: &JournalTable) -> JournalResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &table.to_document())?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| JournalError::Io(e.error))?;
        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

impl JournalStore for FileJournal {
    fn record_entry(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> JournalResult<JournalEntry> {
        self.mutate(|table| table.insert(resource_uuid, resource_type, data, state))
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
        self.mutate(|table| table.set_state(&entry.key(), entry.revision_number, state, None))
    }

    fn update_states_bulk(
        &self,
        state: EntryState,
        resource_type: ResourceType,
        revisions: &[(String, u64)],
    ) -> JournalResult<usize> {
        self.mutate(|table| Ok(table.set_states(state, resource_type, revisions)))
    }

    fn record_failure(&self, entry: &JournalEntry, diagnostic: &str) -> JournalResult<bool> {
        self.mutate(|table| {
            table.set_state(
                &entry.key(),
                entry.revision_number,
                EntryState::Failed,
                Some(diagnostic),
            )
        })
    }

    fn supersede(
        &self,
        resource_uuid: &str,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> JournalResult<Option<JournalEntry>> {
        self.mutate(|table| Ok(table.replace(resource_uuid, resource_type, data, state)))
    }

    fn all_entries(&self) -> JournalResult<Vec<JournalEntry>> {
        Ok(self.table.read().all())
    }
}

//! Batch planning for waiting port entries.
//!
//! Waiting ports are grouped by parent network and direction so that every
//! group costs exactly one controller command, whatever its size.

use crate::error::{MalformedEntry, SyncResult};
use fabric_agent::{FabricCommand, FabricExecutor};
use fabric_journal::{keys, EntryState, JournalEntry, JournalStore, Operation, ResourceType};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Direction of a membership batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BatchKind {
    /// Members are added to the network (`bind`).
    Add,
    /// Members are removed from the network (`delete`).
    Remove,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Add => f.write_str("add"),
            BatchKind::Remove => f.write_str("remove"),
        }
    }
}

/// Ports sharing a network and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Target network.
    pub network_id: String,
    /// Direction.
    pub kind: BatchKind,
    /// Member identifiers, in entry order, without duplicates.
    pub members: Vec<String>,
    /// Port entries covered by this batch, with the revision each was
    /// planned at.
    pub entries: Vec<(String, u64)>,
}

impl Batch {
    /// Returns the single controller command for this batch.
    pub fn command(&self) -> FabricCommand {
        let name = self.network_id.clone();
        let members = self.members.clone();
        match self.kind {
            BatchKind::Add => FabricCommand::Add { name, members },
            BatchKind::Remove => FabricCommand::Remove { name, members },
        }
    }
}

/// The batches derived from a set of waiting entries.
#[derive(Debug, Default)]
pub struct BatchPlan {
    batches: Vec<Batch>,
    malformed: Vec<(JournalEntry, MalformedEntry)>,
    skipped: usize,
}

impl BatchPlan {
    /// Partitions waiting entries into batches.
    ///
    /// Ports still in their `create` operation have no binding to apply yet
    /// and are skipped, as are non-port entries. Entries that cannot be
    /// planned are returned through [`BatchPlan::malformed`].
    pub fn from_entries(entries: &[JournalEntry]) -> Self {
        let mut groups: BTreeMap<(String, BatchKind), Batch> = BTreeMap::new();
        let mut plan = BatchPlan::default();

        for entry in entries {
            if entry.resource_type != ResourceType::Port {
                warn!("Ignoring waiting {} entry; only ports are batched", entry.key());
                plan.skipped += 1;
                continue;
            }

            let (kind, network_id, member) = match plan_port(entry) {
                Ok(Some(planned)) => planned,
                Ok(None) => {
                    plan.skipped += 1;
                    continue;
                }
                Err(malformed) => {
                    plan.malformed.push((entry.clone(), malformed));
                    continue;
                }
            };

            let batch = groups
                .entry((network_id.to_string(), kind))
                .or_insert_with(|| Batch {
                    network_id: network_id.to_string(),
                    kind,
                    members: Vec::new(),
                    entries: Vec::new(),
                });
            if !batch.members.iter().any(|m| m == member) {
                batch.members.push(member.to_string());
            }
            batch
                .entries
                .push((entry.resource_uuid.clone(), entry.revision_number));
        }

        plan.batches = groups.into_values().collect();
        plan
    }

    /// Returns the batches, ordered by network then direction.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Returns entries that could not be planned, with the reason.
    pub fn malformed(&self) -> &[(JournalEntry, MalformedEntry)] {
        &self.malformed
    }

    /// Returns the number of entries left out of the plan but still valid.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns true if the plan issues no commands.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

fn plan_port(entry: &JournalEntry) -> Result<Option<(BatchKind, &str, &str)>, MalformedEntry> {
    let kind = match entry.operation() {
        None => return Err(MalformedEntry::new(entry.key(), "missing operation")),
        Some(Err(op)) => return Err(MalformedEntry::new(entry.key(), op)),
        Some(Ok(Operation::Create)) => return Ok(None),
        Some(Ok(Operation::Bind)) => BatchKind::Add,
        Some(Ok(Operation::Delete)) => BatchKind::Remove,
    };

    let network_id = entry
        .data
        .get_str(keys::NETWORK_ID)
        .ok_or_else(|| MalformedEntry::new(entry.key(), "missing network_id"))?;
    let member = entry
        .data
        .get_str(keys::MEMBER)
        .ok_or_else(|| MalformedEntry::new(entry.key(), "missing member"))?;
    Ok(Some((kind, network_id, member)))
}

/// Counts of entries handled by [`BatchPlanner::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Entries whose batch succeeded and are now `completed`.
    pub applied: usize,
    /// Entries whose batch returned a non-zero status and are now `failed`.
    pub failed: usize,
    /// Entries whose batch could not be delivered; still `waiting`.
    pub deferred: usize,
    /// Entries superseded while their batch ran; left for the next pass.
    pub superseded: usize,
    /// Batches whose command returned success.
    pub successful_batches: usize,
    /// Commands issued.
    pub commands: usize,
}

/// Issues batch commands and records their outcome in the journal.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchPlanner;

impl BatchPlanner {
    /// Applies every batch of `plan`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be updated. Batches applied
    /// before the failure are lost from the returned value; use
    /// [`BatchPlanner::apply_into`] to keep them.
    pub fn apply<S, E>(plan: &BatchPlan, store: &S, executor: &E) -> SyncResult<BatchOutcome>
    where
        S: JournalStore + ?Sized,
        E: FabricExecutor + ?Sized,
    {
        let mut outcome = BatchOutcome::default();
        Self::apply_into(plan, store, executor, &mut outcome)?;
        Ok(outcome)
    }

    /// Applies every batch of `plan`, accumulating into `outcome`.
    ///
    /// A batch whose command fails to reach the controller is deferred and
    /// the remaining batches still run. A journal error stops immediately;
    /// `outcome` then reflects the batches handled so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be updated.
    pub fn apply_into<S, E>(
        plan: &BatchPlan,
        store: &S,
        executor: &E,
        outcome: &mut BatchOutcome,
    ) -> SyncResult<()>
    where
        S: JournalStore + ?Sized,
        E: FabricExecutor + ?Sized,
    {
        for batch in plan.batches() {
            let command = batch.command();
            let count = batch.entries.len();
            debug!("Issuing batch '{}' for {} ports", command, count);
            outcome.commands += 1;

            let status = match executor.execute(&command) {
                Ok(status) => status,
                Err(e) => {
                    warn!("Batch '{}' not delivered, will retry: {}", command, e);
                    outcome.deferred += count;
                    continue;
                }
            };

            let state = if status.is_success() {
                EntryState::Completed
            } else {
                EntryState::Failed
            };
            let changed = store.update_states_bulk(state, ResourceType::Port, &batch.entries)?;
            let superseded = count.saturating_sub(changed);
            if superseded > 0 {
                debug!(
                    "{} ports of batch '{}' were superseded; left for the next pass",
                    superseded, command
                );
                outcome.superseded += superseded;
            }

            if status.is_success() {
                info!("{} {} ports on network {}", batch.kind, changed, batch.network_id);
                outcome.successful_batches += 1;
                outcome.applied += changed;
            } else {
                warn!("Batch '{}' returned {}; marked {} ports failed", command, status, changed);
                outcome.failed += changed;
            }
        }
        Ok(())
    }
}

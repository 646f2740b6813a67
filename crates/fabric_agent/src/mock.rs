//! Scriptable executor for tests.

use crate::command::{FabricCommand, FabricOperation};
use crate::error::{FabricError, FabricResult};
use crate::executor::{CommandStatus, FabricExecutor};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// A mock executor for testing.
///
/// Records every command it receives and answers with a scripted status per
/// operation (success by default). Channel failures can be queued per
/// operation; each queued failure is consumed by the next matching command,
/// which is still recorded.
#[derive(Debug, Default)]
pub struct MockExecutor {
    commands: Mutex<Vec<FabricCommand>>,
    statuses: Mutex<HashMap<FabricOperation, CommandStatus>>,
    failures: Mutex<HashMap<FabricOperation, VecDeque<String>>>,
}

impl MockExecutor {
    /// Creates a mock that answers every command with success.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status returned for an operation.
    pub fn set_status(&self, operation: FabricOperation, status: CommandStatus) {
        self.statuses.lock().insert(operation, status);
    }

    /// Makes the next command with this operation fail with a channel error.
    pub fn fail_next(&self, operation: FabricOperation, message: impl Into<String>) {
        self.failures
            .lock()
            .entry(operation)
            .or_default()
            .push_back(message.into());
    }

    /// Returns every command received so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<FabricCommand> {
        self.commands.lock().clone()
    }

    /// Returns how many commands with this operation were received.
    #[must_use]
    pub fn count(&self, operation: FabricOperation) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|cmd| cmd.operation() == operation)
            .count()
    }

    /// Forgets recorded commands. Scripted statuses are kept.
    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl FabricExecutor for MockExecutor {
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus> {
        let operation = command.operation();
        self.commands.lock().push(command.clone());

        if let Some(message) = self
            .failures
            .lock()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(FabricError::Channel(message));
        }

        Ok(self
            .statuses
            .lock()
            .get(&operation)
            .copied()
            .unwrap_or(CommandStatus::SUCCESS))
    }
}

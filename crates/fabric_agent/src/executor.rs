//! Executor contract for fabric commands.

use crate::command::FabricCommand;
use crate::error::FabricResult;
use std::fmt;

/// Exit status reported by the fabric controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandStatus(pub i32);

impl CommandStatus {
    /// The command succeeded.
    pub const SUCCESS: CommandStatus = CommandStatus(0);
    /// The command failed.
    pub const FAILURE: CommandStatus = CommandStatus(1);
    /// The target of the command does not exist.
    pub const NOT_FOUND: CommandStatus = CommandStatus(2);

    /// Returns true if the status is zero.
    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw exit code.
    pub fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.0)
    }
}

/// Runs commands against the fabric controller.
///
/// Implementations issue one command at a time and block until the
/// controller reports an exit status. An `Err` means the command could not be
/// delivered or its result is unknown; the controller's own verdict is always
/// a [`CommandStatus`].
pub trait FabricExecutor: Send + Sync {
    /// Executes a command and returns the controller's exit status.
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus>;
}

impl<E: FabricExecutor + ?Sized> FabricExecutor for std::sync::Arc<E> {
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus> {
        (**self).execute(command)
    }
}

impl<E: FabricExecutor + ?Sized> FabricExecutor for Box<E> {
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus> {
        (**self).execute(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_constants() {
        assert!(CommandStatus::SUCCESS.is_success());
        assert!(!CommandStatus::FAILURE.is_success());
        assert!(!CommandStatus::NOT_FOUND.is_success());
        assert_eq!(CommandStatus::NOT_FOUND.code(), 2);
        assert_eq!(CommandStatus(127).to_string(), "status 127");
    }
}

//! Error types for fabric commands.

use std::io;
use thiserror::Error;

/// Result type for fabric operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors that can occur while building or executing fabric commands.
#[derive(Error, Debug)]
pub enum FabricError {
    /// The controller does not know this command.
    #[error("fabric agent doesn't recognize the command '{0}'")]
    UnknownCommand(String),

    /// A command was built without a required argument.
    #[error("'{operation}' requires {argument}")]
    MissingArgument {
        /// Operation name.
        operation: &'static str,
        /// Description of the missing argument.
        argument: &'static str,
    },

    /// An argument could not be parsed.
    #[error("invalid argument for '{operation}': {message}")]
    InvalidArgument {
        /// Operation name.
        operation: &'static str,
        /// What was wrong.
        message: String,
    },

    /// The command channel could not be started.
    #[error("unable to reach fabric agent: {0}")]
    Spawn(#[from] io::Error),

    /// The channel ended without reporting an exit status.
    #[error("fabric command terminated without exit status: {0}")]
    Terminated(String),

    /// Injected or backend-specific channel failure.
    #[error("fabric channel error: {0}")]
    Channel(String),
}

impl FabricError {
    /// Returns true if the failure concerns the channel rather than the
    /// command, so the same command may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FabricError::Spawn(_) | FabricError::Terminated(_) | FabricError::Channel(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(FabricError::Channel("connection reset".into()).is_transient());
        assert!(FabricError::Terminated("signal 9".into()).is_transient());
        assert!(FabricError::Spawn(io::Error::new(io::ErrorKind::NotFound, "ssh")).is_transient());
        assert!(!FabricError::UnknownCommand("explode".into()).is_transient());
        assert!(!FabricError::MissingArgument {
            operation: "add",
            argument: "at least one member"
        }
        .is_transient());
    }

    #[test]
    fn error_display() {
        let err = FabricError::UnknownCommand("explode".into());
        assert_eq!(err.to_string(), "fabric agent doesn't recognize the command 'explode'");
    }
}

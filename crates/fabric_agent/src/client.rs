//! Convenience client over an executor.

use crate::command::{FabricCommand, FabricOperation};
use crate::error::{FabricError, FabricResult};
use crate::executor::{CommandStatus, FabricExecutor};
use std::fmt;
use std::sync::Arc;

/// Binding state of a member in a virtual fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    /// The member belongs to the fabric.
    Up,
    /// The member is absent, or the query failed.
    Down,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Up => f.write_str("UP"),
            PortStatus::Down => f.write_str("DOWN"),
        }
    }
}

/// Queries and management calls against the fabric controller.
#[derive(Debug)]
pub struct FabricAgentClient<E> {
    executor: Arc<E>,
}

impl<E: FabricExecutor> FabricAgentClient<E> {
    /// Creates a client over a shared executor.
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    /// Returns the underlying executor.
    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    /// Reports whether `member` is bound to the fabric `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query could not be delivered.
    pub fn port_status(&self, name: &str, member: &str) -> FabricResult<PortStatus> {
        let status = self.executor.execute(&FabricCommand::IsMember {
            name: name.to_string(),
            members: vec![member.to_string()],
        })?;
        Ok(if status.is_success() {
            PortStatus::Up
        } else {
            PortStatus::Down
        })
    }

    /// Reports whether the fabric `name` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query could not be delivered.
    pub fn fabric_exists(&self, name: &str) -> FabricResult<bool> {
        let status = self.executor.execute(&FabricCommand::Exist {
            name: name.to_string(),
        })?;
        Ok(status.is_success())
    }

    /// Runs a management command (`commit`, `reload`, `restart`, `reset`, `abort`).
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidArgument`] for operations that need a
    /// target, or an error if the command could not be delivered.
    pub fn management(&self, operation: FabricOperation) -> FabricResult<CommandStatus> {
        if !operation.is_management() {
            return Err(FabricError::InvalidArgument {
                operation: operation.as_str(),
                message: "not a management command".to_string(),
            });
        }
        self.executor.execute(&FabricCommand::Management(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[test]
    fn port_status_follows_ismember() {
        let executor = Arc::new(MockExecutor::new());
        let client = FabricAgentClient::new(Arc::clone(&executor));

        assert_eq!(client.port_status("n1", "g1").unwrap(), PortStatus::Up);
        executor.set_status(FabricOperation::IsMember, CommandStatus::FAILURE);
        assert_eq!(client.port_status("n1", "g1").unwrap(), PortStatus::Down);
        assert_eq!(PortStatus::Up.to_string(), "UP");

        assert_eq!(
            executor.commands()[0],
            FabricCommand::IsMember {
                name: "n1".into(),
                members: vec!["g1".into()]
            }
        );
    }

    #[test]
    fn fabric_exists() {
        let executor = Arc::new(MockExecutor::new());
        let client = FabricAgentClient::new(Arc::clone(&executor));
        executor.set_status(FabricOperation::Exist, CommandStatus::NOT_FOUND);
        assert!(!client.fabric_exists("n1").unwrap());
    }

    #[test]
    fn management_rejects_targeted_operations() {
        let executor = Arc::new(MockExecutor::new());
        let client = FabricAgentClient::new(Arc::clone(&executor));

        assert!(client.management(FabricOperation::Add).is_err());
        assert!(client.management(FabricOperation::Restart).unwrap().is_success());
        assert_eq!(executor.count(FabricOperation::Restart), 1);
        assert_eq!(executor.count(FabricOperation::Add), 0);
    }
}

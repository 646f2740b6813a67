//! # Fabric Agent
//!
//! Command model and executors for the external fabric controller.
//!
//! This crate provides:
//! - Typed fabric commands and their controller command lines
//! - The [`FabricExecutor`] contract (one synchronous command at a time)
//! - A remote-shell executor that runs commands through the system `ssh`
//! - A scriptable mock executor for tests
//! - A small client for queries and management commands
//!
//! ## Status codes
//!
//! Every command returns a [`CommandStatus`]; `0` is success. Failures of the
//! channel itself (the command could not be dispatched, or ended without an
//! exit code) are [`FabricError`] values, never a status.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod command;
mod error;
mod executor;
mod mock;
mod remote;

pub use client::{FabricAgentClient, PortStatus};
pub use command::{FabricCommand, FabricOperation};
pub use error::{FabricError, FabricResult};
pub use executor::{CommandStatus, FabricExecutor};
pub use mock::MockExecutor;
pub use remote::{AgentConfig, RemoteShellExecutor};

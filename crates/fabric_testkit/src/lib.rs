//! # Fabric Testkit
//!
//! Test utilities for the fabric sync workspace.
//!
//! This crate provides:
//! - Journal fixtures and entry seeding helpers
//! - Property-based generators for waiting port sets
//! - Polling helpers for assertions on background threads
//!
//! ## Usage
//!
//! ```rust
//! use fabric_journal::{EntryState, MemoryJournal, Operation, ResourceType};
//! use fabric_testkit::prelude::*;
//!
//! let journal = MemoryJournal::new();
//! seed_port(&journal, "p1", "n1", Operation::Bind, "g1");
//! assert_eq!(state_of(&journal, "p1", ResourceType::Port), Some(EntryState::Waiting));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod wait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::wait::*;
}

pub use fixtures::*;
pub use generators::*;
pub use wait::*;

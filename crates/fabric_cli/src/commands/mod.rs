//! CLI command implementations.

pub mod agent;
pub mod journal;
pub mod list;
pub mod run;
pub mod sync_once;

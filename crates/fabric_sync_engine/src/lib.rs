//! # Fabric Sync Engine
//!
//! Reconciles the fabric journal with the fabric controller.
//!
//! This crate provides:
//! - A coalescing wake signal
//! - The batch planner for waiting port entries
//! - The sync engine and its single worker thread
//! - A periodic worker that keeps reconciliation live
//! - Producer helpers that record resource mutations
//!
//! ## Architecture
//!
//! Producers write journal entries and call `wake()`. The engine's worker
//! runs one pass per wake:
//! 1. Pending network entries are executed one at a time
//! 2. Waiting port entries are batched per network and direction
//! 3. Commit and reload run once if anything changed on the fabric
//!
//! ## Key Invariants
//!
//! - One engine per journal, one worker per engine
//! - At most one fabric command in flight
//! - Wakes coalesce; a pass always re-reads the journal
//! - Failures never escape a pass; unresolved entries wait for the next wake

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod periodic;
mod planner;
mod producer;
mod service;
mod wake;

pub use config::{SyncConfig, DEFAULT_SYNC_INTERVAL};
pub use engine::{NoWake, PassReport, StopOutcome, SyncEngine, SyncStats, Wake};
pub use error::{MalformedEntry, SyncError, SyncResult};
pub use periodic::PeriodicSyncWorker;
pub use planner::{Batch, BatchKind, BatchOutcome, BatchPlan, BatchPlanner};
pub use producer::Producer;
pub use service::SyncService;
pub use wake::WakeSignal;

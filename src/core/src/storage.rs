//! Storage subsystem
//!
//! This module provides the durable state of the watcher and the means to persist it.
//!
//! Components:
//! - `port_hits`: per-port session counters (lifetime and run-scoped).
//! - `history`: the bounded, duration-ranked archive of ended sessions.
//! - `types`: `EndedSession` and the top-level `StatsDocument`.
//! - `storage_trait`: the `StatsStorage` trait defining load/save/snapshot.
//! - `file_storage`: filesystem-backed implementation with atomic replace semantics.

pub mod file_storage;
pub mod history;
pub mod port_hits;
pub mod storage_trait;
pub mod types;

pub use file_storage::FileStorage;
pub use history::HistoryArchive;
pub use port_hits::PortHits;
pub use storage_trait::StatsStorage;
pub use types::{EndedSession, StatsDocument};

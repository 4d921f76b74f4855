//! Entry Stores
//!
//! The append-only persistence boundary of the audit chain. A store holds
//! committed entries for exactly one chain; independent chains use
//! independent store instances and never contend with each other.

pub mod memory;
pub mod sql;

use async_trait::async_trait;

use crate::entry::AuditEntry;
use crate::error::Result;

pub use memory::MemoryStore;
pub use sql::SqlStore;

/// Outcome of a conditional commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The entry is durably committed and is now the chain tail.
    Committed,
    /// Another writer advanced the tail first; the entry was discarded.
    Conflict,
}

/// Append-only entry store for a single chain.
///
/// Implementations must guarantee that `commit_conditional` is atomic:
/// either the whole entry becomes visible as the new tail, or nothing
/// does. Entries are never updated or deleted through this interface.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// The entry with the highest sequence, or `None` for an empty chain.
    async fn read_tail(&self) -> Result<Option<AuditEntry>>;

    /// Entries with `from <= sequence <= to`, ascending. Either bound may
    /// be omitted to leave that side open.
    async fn read_range(&self, from: Option<i64>, to: Option<i64>) -> Result<Vec<AuditEntry>>;

    /// Commit `entry` only if the chain tail still has sequence
    /// `expected_prev_sequence` (0 for an empty chain). Returns
    /// [`CommitOutcome::Conflict`] if another writer got there first.
    async fn commit_conditional(
        &self,
        entry: &AuditEntry,
        expected_prev_sequence: i64,
    ) -> Result<CommitOutcome>;
}

//! In-memory entry store.
//!
//! Backs tests and lightweight embedding. Also exposes tampering hooks so
//! integrity tests can manipulate committed rows the way a hostile DBA
//! would; nothing in the crate calls them outside of tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entry::AuditEntry;
use crate::error::Result;
use crate::store::{CommitOutcome, EntryStore};

/// Entry store holding the chain in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Copy of every committed entry, ascending by sequence.
    pub async fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn read_tail(&self) -> Result<Option<AuditEntry>> {
        Ok(self.entries.read().await.last().cloned())
    }

    async fn read_range(&self, from: Option<i64>, to: Option<i64>) -> Result<Vec<AuditEntry>> {
        let from = from.unwrap_or(i64::MIN);
        let to = to.unwrap_or(i64::MAX);
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.sequence >= from && e.sequence <= to)
            .cloned()
            .collect())
    }

    async fn commit_conditional(
        &self,
        entry: &AuditEntry,
        expected_prev_sequence: i64,
    ) -> Result<CommitOutcome> {
        let mut entries = self.entries.write().await;
        let tail_sequence = entries.last().map(|e| e.sequence).unwrap_or(0);
        if tail_sequence != expected_prev_sequence {
            return Ok(CommitOutcome::Conflict);
        }
        entries.push(entry.clone());
        Ok(CommitOutcome::Committed)
    }
}

/// Tampering hooks for integrity tests. Real stores have no mutation path;
/// these simulate direct manipulation of the underlying rows.
impl MemoryStore {
    /// Mutate the committed entry with the given sequence in place.
    pub async fn tamper_with<F>(&self, sequence: i64, mutate: F) -> bool
    where
        F: FnOnce(&mut AuditEntry),
    {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.sequence == sequence) {
            Some(entry) => {
                mutate(entry);
                true
            }
            None => false,
        }
    }

    /// Delete the committed entry with the given sequence.
    pub async fn delete_row(&self, sequence: i64) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.sequence != sequence);
        entries.len() != before
    }
}

//! Sequenced Append Path
//!
//! The single logical write path of the chain. Every append reads the
//! current tail, links the new entry against it, and commits with a
//! conditional write; losing the commit race means re-reading the tail
//! and retrying. A naive read-then-insert would let two concurrent
//! writers fork the chain (two entries sharing one predecessor), which
//! the verifier could not tell apart from legitimate history.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::entry::AuditEntry;
use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use crate::hash::GENESIS_HASH;
use crate::store::{CommitOutcome, EntryStore};

/// Default bound on commit attempts per append call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default base delay between retries; grows linearly with the attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// Appends events to the chain, one linked entry per call.
pub struct SequencedAppender<S: EntryStore> {
    store: Arc<S>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<S: EntryStore> SequencedAppender<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = retry_backoff;
        self
    }

    /// Record one event as the next entry of the chain.
    ///
    /// The commit timestamp is frozen on entry and kept across retries;
    /// only the linkage against the tail is recomputed. Returns the
    /// committed entry, or [`AuditError::AppendConflict`] once the retry
    /// bound is exhausted; in that case the event was NOT recorded and
    /// the caller must treat the triggering action as failed.
    pub async fn append(&self, event: &AuditEvent) -> Result<AuditEntry> {
        let timestamp = Utc::now();

        for attempt in 1..=self.max_attempts {
            let tail = self.store.read_tail().await?;
            let (prev_sequence, prev_chain_hash) = match &tail {
                Some(tail) => (tail.sequence, tail.chain_hash.as_str()),
                None => (0, GENESIS_HASH),
            };

            let entry = AuditEntry::link(event, prev_sequence + 1, timestamp, prev_chain_hash)?;

            match self.store.commit_conditional(&entry, prev_sequence).await? {
                CommitOutcome::Committed => {
                    debug!(attempt, "Appended audit entry: {}", entry.summary());
                    return Ok(entry);
                }
                CommitOutcome::Conflict => {
                    warn!(
                        attempt,
                        sequence = entry.sequence,
                        "Append lost the commit race, re-reading tail"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_backoff * attempt).await;
                    }
                }
            }
        }

        Err(AuditError::AppendConflict {
            attempts: self.max_attempts,
        })
    }
}

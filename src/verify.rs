//! Chain Verification
//!
//! Replays stored entries in ascending sequence order, recomputing every
//! digest and comparing against the stored values. A broken chain is a
//! normal, reportable outcome, never an error; the verifier only errors
//! when the store itself cannot be read.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entry::AuditEntry;
use crate::error::Result;
use crate::hash::GENESIS_HASH;
use crate::store::EntryStore;

/// Which check an entry failed. Each reason implies a different
/// remediation, so they are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakReason {
    /// The stored payload no longer reproduces the stored leaf hash: a
    /// field inside the entry was edited after commit.
    PayloadMismatch,
    /// The entry does not link to its predecessor: an entry was deleted,
    /// inserted or reordered, or the genesis sentinel is missing.
    LinkageMismatch,
    /// The stored chain hash does not match the recomputed one: the chain
    /// fields themselves were rewritten.
    ChainHashMismatch,
}

impl BreakReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PayloadMismatch => "payload mismatch",
            Self::LinkageMismatch => "linkage mismatch",
            Self::ChainHashMismatch => "chain hash mismatch",
        }
    }
}

/// Result of a verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub valid: bool,
    pub entries_checked: usize,
    /// Sequence of the first entry that failed a check.
    pub first_broken_sequence: Option<i64>,
    pub reason: Option<BreakReason>,
}

impl VerificationReport {
    fn clean(entries_checked: usize) -> Self {
        Self {
            valid: true,
            entries_checked,
            first_broken_sequence: None,
            reason: None,
        }
    }

    fn broken(sequence: i64, reason: BreakReason, entries_checked: usize) -> Self {
        Self {
            valid: false,
            entries_checked,
            first_broken_sequence: Some(sequence),
            reason: Some(reason),
        }
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        if self.valid {
            format!("Chain valid ({} entries checked)", self.entries_checked)
        } else {
            format!(
                "Chain BROKEN at sequence {}: {} ({} entries checked)",
                self.first_broken_sequence.unwrap_or(0),
                self.reason.map(|r| r.as_str()).unwrap_or("unknown"),
                self.entries_checked
            )
        }
    }
}

/// Replays a stored range of entries and certifies chain integrity.
pub struct ChainVerifier<S: EntryStore> {
    store: Arc<S>,
}

impl<S: EntryStore> ChainVerifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Verify the entire chain from genesis.
    pub async fn verify_all(&self) -> Result<VerificationReport> {
        self.verify(None, None).await
    }

    /// Verify a bounded range of sequences, inclusive on both ends.
    ///
    /// A range starting past sequence 1 anchors linkage on the stored
    /// chain hash of the entry immediately before the range (checkpoint
    /// semantics): that predecessor is trusted, everything inside the
    /// range is recomputed. Verification stops at the first failing entry.
    pub async fn verify(&self, from: Option<i64>, to: Option<i64>) -> Result<VerificationReport> {
        let start = from.unwrap_or(1).max(1);

        // Linkage anchor: the genesis sentinel, or the checkpoint entry
        // right before the range. None means the range cannot be anchored
        // and its first entry must fail linkage.
        let expected_prev = if start == 1 {
            Some(GENESIS_HASH.to_string())
        } else {
            self.store
                .read_range(Some(start - 1), Some(start - 1))
                .await?
                .pop()
                .map(|anchor| anchor.chain_hash)
        };

        let entries = self.store.read_range(Some(start), to).await?;
        debug!(start, ?to, count = entries.len(), "Replaying chain range");

        let report = check_entries(&entries, start, expected_prev);
        if report.valid {
            info!("Chain verification passed: {}", report.summary());
        } else {
            info!("Chain verification FAILED: {}", report.summary());
        }
        Ok(report)
    }
}

/// Walk entries in ascending sequence order and apply the three checks to
/// each: payload integrity, linkage to the predecessor, chain hash
/// integrity. Pure function over already-read entries.
fn check_entries(
    entries: &[AuditEntry],
    start: i64,
    anchor: Option<String>,
) -> VerificationReport {
    let mut expected_sequence = start;
    let mut expected_prev = anchor;
    let mut checked = 0usize;

    for entry in entries {
        // Payload tampering: the stored fields must reproduce the leaf.
        // Canonicalization of a stored entry can only fail if the row is
        // corrupt beyond JSON, which is payload tampering too.
        match entry.compute_leaf_hash() {
            Ok(leaf) if leaf == entry.leaf_hash => {}
            _ => {
                return VerificationReport::broken(
                    entry.sequence,
                    BreakReason::PayloadMismatch,
                    checked,
                );
            }
        }

        // Linkage: gapless sequence and prev pointing at the predecessor's
        // stored chain hash (the sentinel for the first entry).
        let linked = entry.sequence == expected_sequence
            && expected_prev.as_deref() == Some(entry.prev_chain_hash.as_str());
        if !linked {
            return VerificationReport::broken(
                entry.sequence,
                BreakReason::LinkageMismatch,
                checked,
            );
        }

        // Chain hash: must equal the recomputation from its own inputs.
        if entry.chain_hash != entry.compute_chain_hash(&entry.leaf_hash) {
            return VerificationReport::broken(
                entry.sequence,
                BreakReason::ChainHashMismatch,
                checked,
            );
        }

        checked += 1;
        expected_sequence = entry.sequence + 1;
        expected_prev = Some(entry.chain_hash.clone());
    }

    VerificationReport::clean(checked)
}

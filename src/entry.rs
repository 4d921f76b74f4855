//! Audit Entries
//!
//! The persisted, immutable record of one administrative action, carrying
//! the hash-chain fields that make retroactive edits detectable.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canonical::canonicalize;
use crate::error::Result;
use crate::event::{classify_device, AuditEvent};
use crate::hash;

/// One immutable row of the audit chain.
///
/// `sequence` is the authoritative order; `timestamp` is informational
/// only and never participates in chain ordering. The payload fields
/// (everything between `timestamp` and `leaf_hash`) are frozen at commit
/// time and re-hashed verbatim during verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: i64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub metadata: Value,
    pub ip: String,
    pub user_agent: String,
    pub device: String,
    pub leaf_hash: String,
    pub prev_chain_hash: String,
    pub chain_hash: String,
}

impl AuditEntry {
    /// Freeze an event into a linked entry.
    ///
    /// `timestamp` is the commit-time clock reading, truncated to
    /// microseconds so the canonical form survives a store round trip.
    /// The entry's `chain_hash` is a pure function of `prev_chain_hash`
    /// and the canonical payload; nothing else influences it.
    pub fn link(
        event: &AuditEvent,
        sequence: i64,
        timestamp: DateTime<Utc>,
        prev_chain_hash: &str,
    ) -> Result<Self> {
        let context = event.context.clone().unwrap_or_default();
        let user_agent = context.user_agent_or_unknown().to_string();

        let mut entry = Self {
            sequence,
            timestamp,
            actor: event.actor.clone(),
            action: event.action.clone(),
            target_type: event.target_type.clone(),
            target_id: event.target_id.clone(),
            metadata: event.metadata.clone().unwrap_or_else(|| json!({})),
            ip: context.ip_or_unknown().to_string(),
            device: classify_device(&user_agent).to_string(),
            user_agent,
            leaf_hash: String::new(),
            prev_chain_hash: prev_chain_hash.to_string(),
            chain_hash: String::new(),
        };

        entry.leaf_hash = entry.compute_leaf_hash()?;
        entry.chain_hash = hash::chain_hash(&entry.prev_chain_hash, &entry.leaf_hash);
        Ok(entry)
    }

    /// The frozen payload as a structured value, exactly as hashed.
    pub fn payload_value(&self) -> Value {
        json!({
            "timestamp": canonical_timestamp(&self.timestamp),
            "actor": self.actor,
            "action": self.action,
            "target_type": self.target_type,
            "target_id": self.target_id,
            "metadata": self.metadata,
            "ip": self.ip,
            "user_agent": self.user_agent,
            "device": self.device,
        })
    }

    /// Recompute the leaf digest from the stored payload fields.
    pub fn compute_leaf_hash(&self) -> Result<String> {
        let canonical = canonicalize(&self.payload_value())?;
        Ok(hash::leaf_hash(&canonical))
    }

    /// Recompute the chain digest from the stored prev hash and a leaf digest.
    pub fn compute_chain_hash(&self, leaf_hash: &str) -> String {
        hash::chain_hash(&self.prev_chain_hash, leaf_hash)
    }

    /// Whether this is the first entry of its chain.
    pub fn is_genesis(&self) -> bool {
        self.prev_chain_hash == hash::GENESIS_HASH
    }

    /// One-line description for log output.
    pub fn summary(&self) -> String {
        format!(
            "#{} {} by {} on {}:{}",
            self.sequence,
            self.action,
            self.actor,
            self.target_type,
            self.target_id.as_deref().unwrap_or("-")
        )
    }
}

/// Canonical form of an entry timestamp: RFC 3339 UTC at microsecond
/// precision. Fixed for the life of the chain; a different rendering of
/// the same instant would change the leaf hash.
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

//! SQLite-backed entry store.
//!
//! One row per entry, one logical chain per store instance. The
//! `(chain_id, sequence)` primary key is the conflict detector: a stale
//! writer inserting the same next sequence hits a unique violation, which
//! surfaces as [`CommitOutcome::Conflict`] for the appender to retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::entry::{canonical_timestamp, AuditEntry};
use crate::error::{AuditError, Result};
use crate::store::{CommitOutcome, EntryStore};

/// SQL schema, applied by [`SqlStore::run_migrations`].
pub const AUDIT_ENTRIES_SCHEMA: &str = include_str!("../../migrations/001_audit_entries.sql");

const ENTRY_COLUMNS: &str = "sequence, timestamp, actor, action, target_type, target_id, \
     metadata, ip, user_agent, device, leaf_hash, prev_chain_hash, chain_hash";

/// Entry store backed by a SQLite database via sqlx.
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
    chain_id: String,
}

impl SqlStore {
    /// Wrap an existing pool, scoped to one chain.
    pub fn new(pool: SqlitePool, chain_id: impl Into<String>) -> Self {
        Self {
            pool,
            chain_id: chain_id.into(),
        }
    }

    /// Connect to a database URL, e.g. `sqlite://audit.db?mode=rwc`.
    pub async fn connect(database_url: &str, chain_id: impl Into<String>) -> Result<Self> {
        let pool = SqlitePoolOptions::new().connect(database_url).await?;
        Ok(Self::new(pool, chain_id))
    }

    /// Fresh in-memory database, for tests and experiments.
    ///
    /// Capped at one connection: every pooled connection would otherwise
    /// get its own empty memory database.
    pub async fn connect_in_memory(chain_id: impl Into<String>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool, chain_id);
        store.run_migrations().await?;
        Ok(store)
    }

    /// Apply the entry schema. Idempotent.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(AUDIT_ENTRIES_SCHEMA).execute(&self.pool).await?;
        info!("Audit entry schema applied");
        Ok(())
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_entry(row: &SqliteRow) -> Result<AuditEntry> {
        let timestamp: String = row.try_get("timestamp")?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| AuditError::StoreUnavailable(format!("Corrupt timestamp column: {}", e)))?;

        let metadata: String = row.try_get("metadata")?;
        let metadata = serde_json::from_str(&metadata)
            .map_err(|e| AuditError::StoreUnavailable(format!("Corrupt metadata column: {}", e)))?;

        Ok(AuditEntry {
            sequence: row.try_get("sequence")?,
            timestamp,
            actor: row.try_get("actor")?,
            action: row.try_get("action")?,
            target_type: row.try_get("target_type")?,
            target_id: row.try_get("target_id")?,
            metadata,
            ip: row.try_get("ip")?,
            user_agent: row.try_get("user_agent")?,
            device: row.try_get("device")?,
            leaf_hash: row.try_get("leaf_hash")?,
            prev_chain_hash: row.try_get("prev_chain_hash")?,
            chain_hash: row.try_get("chain_hash")?,
        })
    }
}

#[async_trait]
impl EntryStore for SqlStore {
    async fn read_tail(&self) -> Result<Option<AuditEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM audit_entries WHERE chain_id = ? \
             ORDER BY sequence DESC LIMIT 1",
            ENTRY_COLUMNS
        ))
        .bind(&self.chain_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn read_range(&self, from: Option<i64>, to: Option<i64>) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM audit_entries \
             WHERE chain_id = ? AND sequence >= ? AND sequence <= ? \
             ORDER BY sequence ASC",
            ENTRY_COLUMNS
        ))
        .bind(&self.chain_id)
        .bind(from.unwrap_or(i64::MIN))
        .bind(to.unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn commit_conditional(
        &self,
        entry: &AuditEntry,
        expected_prev_sequence: i64,
    ) -> Result<CommitOutcome> {
        debug_assert_eq!(entry.sequence, expected_prev_sequence + 1);

        let result = sqlx::query(
            "INSERT INTO audit_entries \
             (chain_id, sequence, timestamp, actor, action, target_type, target_id, \
              metadata, ip, user_agent, device, leaf_hash, prev_chain_hash, chain_hash) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.chain_id)
        .bind(entry.sequence)
        .bind(canonical_timestamp(&entry.timestamp))
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(&entry.target_id)
        .bind(entry.metadata.to_string())
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(&entry.device)
        .bind(&entry.leaf_hash)
        .bind(&entry.prev_chain_hash)
        .bind(&entry.chain_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(CommitOutcome::Committed),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!(
                    chain_id = %self.chain_id,
                    sequence = entry.sequence,
                    "Sequence already taken, commit lost the race"
                );
                Ok(CommitOutcome::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuditEvent;
    use crate::hash::GENESIS_HASH;
    use serde_json::json;

    fn entry(sequence: i64, prev: &str) -> AuditEntry {
        let event = AuditEvent::new("admin-1", "payout.approve", "payout")
            .with_target_id("po-551")
            .with_metadata(json!({"amount_cents": 125000, "currency": "EUR"}));
        AuditEntry::link(&event, sequence, Utc::now(), prev).unwrap()
    }

    #[tokio::test]
    async fn test_commit_and_round_trip() {
        let store = SqlStore::connect_in_memory("default").await.unwrap();

        let first = entry(1, GENESIS_HASH);
        assert_eq!(
            store.commit_conditional(&first, 0).await.unwrap(),
            CommitOutcome::Committed
        );

        let stored = store.read_tail().await.unwrap().unwrap();
        assert_eq!(stored.sequence, 1);
        assert_eq!(stored.metadata, first.metadata);
        assert_eq!(stored.chain_hash, first.chain_hash);

        // The stored row must re-hash to the same leaf digest
        assert_eq!(stored.compute_leaf_hash().unwrap(), first.leaf_hash);
    }

    #[tokio::test]
    async fn test_duplicate_sequence_is_conflict() {
        let store = SqlStore::connect_in_memory("default").await.unwrap();

        let first = entry(1, GENESIS_HASH);
        store.commit_conditional(&first, 0).await.unwrap();

        let rival = entry(1, GENESIS_HASH);
        assert_eq!(
            store.commit_conditional(&rival, 0).await.unwrap(),
            CommitOutcome::Conflict
        );

        let all = store.read_range(None, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].chain_hash, first.chain_hash);
    }

    #[tokio::test]
    async fn test_chains_are_isolated() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let tenant_a = SqlStore::new(pool.clone(), "tenant-a");
        tenant_a.run_migrations().await.unwrap();
        let tenant_b = SqlStore::new(pool, "tenant-b");

        let first = entry(1, GENESIS_HASH);
        tenant_a.commit_conditional(&first, 0).await.unwrap();

        assert!(tenant_b.read_tail().await.unwrap().is_none());
        // Same sequence on another chain is not a conflict
        let other = entry(1, GENESIS_HASH);
        assert_eq!(
            tenant_b.commit_conditional(&other, 0).await.unwrap(),
            CommitOutcome::Committed
        );
    }

    #[tokio::test]
    async fn test_read_range_bounds() {
        let store = SqlStore::connect_in_memory("default").await.unwrap();

        let mut prev = GENESIS_HASH.to_string();
        for seq in 1..=4 {
            let e = entry(seq, &prev);
            prev = e.chain_hash.clone();
            store.commit_conditional(&e, seq - 1).await.unwrap();
        }

        let middle = store.read_range(Some(2), Some(3)).await.unwrap();
        assert_eq!(
            middle.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }
}

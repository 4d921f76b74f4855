//! Audit Chain Facade
//!
//! Bundles the appender and verifier over one store, which is how the
//! surrounding service layer consumes the engine: one `AuditChain` per
//! logical chain, `append` on every administrative action, `verify` from
//! integrity jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::appender::SequencedAppender;
use crate::config::AuditConfig;
use crate::entry::AuditEntry;
use crate::error::Result;
use crate::event::AuditEvent;
use crate::store::{EntryStore, SqlStore};
use crate::verify::{ChainVerifier, VerificationReport};

/// Append and verification handle for one audit chain.
pub struct AuditChain<S: EntryStore> {
    store: Arc<S>,
    appender: SequencedAppender<S>,
    verifier: ChainVerifier<S>,
}

impl<S: EntryStore> AuditChain<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            appender: SequencedAppender::new(store.clone()),
            verifier: ChainVerifier::new(store.clone()),
            store,
        }
    }

    /// Override the append retry policy.
    pub fn with_retry_policy(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.appender = SequencedAppender::new(self.store.clone())
            .with_retry_policy(max_attempts, retry_backoff);
        self
    }

    /// Record one administrative action. See [`SequencedAppender::append`].
    pub async fn append(&self, event: &AuditEvent) -> Result<AuditEntry> {
        self.appender.append(event).await
    }

    /// Verify a bounded range of the chain. See [`ChainVerifier::verify`].
    pub async fn verify(&self, from: Option<i64>, to: Option<i64>) -> Result<VerificationReport> {
        self.verifier.verify(from, to).await
    }

    /// Verify the entire chain from genesis.
    pub async fn verify_all(&self) -> Result<VerificationReport> {
        self.verifier.verify_all().await
    }

    /// The current tail entry, if any.
    pub async fn tail(&self) -> Result<Option<AuditEntry>> {
        self.store.read_tail().await
    }

    /// Entries whose timestamp falls within `[start, end]`, for display
    /// and range queries. Timestamps are informational; the returned
    /// order is still by sequence.
    pub async fn entries_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>> {
        let entries = self.store.read_range(None, None).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .collect())
    }

    /// Entries recording a specific action.
    pub async fn entries_by_action(&self, action: &str) -> Result<Vec<AuditEntry>> {
        let entries = self.store.read_range(None, None).await?;
        Ok(entries.into_iter().filter(|e| e.action == action).collect())
    }

    /// Entries recorded by a specific actor.
    pub async fn entries_by_actor(&self, actor: &str) -> Result<Vec<AuditEntry>> {
        let entries = self.store.read_range(None, None).await?;
        Ok(entries.into_iter().filter(|e| e.actor == actor).collect())
    }
}

impl AuditChain<SqlStore> {
    /// Open the configured database, apply the schema, and build a chain
    /// handle with the configured retry policy.
    pub async fn from_config(config: &AuditConfig) -> Result<Self> {
        let store = SqlStore::connect(&config.database_url, config.chain_id.clone()).await?;
        store.run_migrations().await?;
        Ok(Self::new(store).with_retry_policy(
            config.max_append_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        ))
    }
}

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AuditError, Result};

/// Runtime configuration, loaded from the environment with defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub database_url: String,
    pub chain_id: String,
    pub max_append_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl AuditConfig {
    pub fn load() -> Result<Self> {
        let database_url = env::var("AUDIT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://audit.db?mode=rwc".to_string());

        let chain_id = env::var("AUDIT_CHAIN_ID").unwrap_or_else(|_| "default".to_string());

        let max_append_attempts = env::var("AUDIT_MAX_APPEND_ATTEMPTS")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .map_err(|e| AuditError::Config(format!("AUDIT_MAX_APPEND_ATTEMPTS: {}", e)))?;

        let retry_backoff_ms = env::var("AUDIT_RETRY_BACKOFF_MS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| AuditError::Config(format!("AUDIT_RETRY_BACKOFF_MS: {}", e)))?;

        Ok(AuditConfig {
            database_url,
            chain_id,
            max_append_attempts,
            retry_backoff_ms,
        })
    }
}

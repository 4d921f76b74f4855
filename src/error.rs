use thiserror::Error;

/// Error taxonomy for the audit chain.
///
/// Verification outcomes (payload/linkage/chain-hash mismatches) are not
/// errors; a broken chain is reported as data by the verifier. Only
/// infrastructure and caller problems surface here.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The payload cannot be canonicalized. Caller error, not retried.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Another writer kept winning the commit race until the retry bound
    /// was exhausted. Transient; safe for the caller to retry.
    #[error("Append conflict: lost the commit race {attempts} times")]
    AppendConflict { attempts: u32 },

    /// The persistence layer cannot be reached or failed mid-operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration error at startup.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(format!("JSON serialization error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

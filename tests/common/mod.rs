//! Shared helpers for integration tests.

use audit_chain::{AuditChain, AuditEvent, MemoryStore, RequestContext};
use serde_json::json;
use std::sync::Arc;

/// Chain over a fresh in-memory store, with the store handle kept out for
/// direct tampering.
pub fn memory_chain() -> (AuditChain<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (AuditChain::from_arc(store.clone()), store)
}

/// A representative administrative action.
pub fn sample_event(n: i64) -> AuditEvent {
    AuditEvent::new(format!("admin-{}", n % 3), "kyc.approve", "kyc_case")
        .with_target_id(format!("case-{}", n))
        .with_metadata(json!({
            "tier": n % 2 + 1,
            "documents": ["passport", "utility_bill"],
            "notes": "reviewed manually",
        }))
        .with_context(RequestContext::new(
            Some("203.0.113.7".to_string()),
            Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/126.0".to_string()),
        ))
}

/// Append `n` sample entries.
pub async fn fill_chain(chain: &AuditChain<MemoryStore>, n: i64) {
    for i in 1..=n {
        chain
            .append(&sample_event(i))
            .await
            .expect("append should succeed");
    }
}

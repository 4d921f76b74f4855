//! Audit Events
//!
//! Input types for the append path: the administrative action being
//! recorded and the request context it arrived with. Events are transient;
//! the appender freezes them into immutable entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An administrative action to be recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Identifier of the administrator performing the action.
    pub actor: String,
    /// Namespaced action name, e.g. `"kyc.approve"` or `"user.suspend"`.
    pub action: String,
    /// Kind of object acted on, e.g. `"user"` or `"payout"`.
    pub target_type: String,
    /// Identifier of the acted-on object, when there is one.
    pub target_id: Option<String>,
    /// Free-form structured context for the action.
    pub metadata: Option<Value>,
    /// Request context of the triggering call, when available.
    pub context: Option<RequestContext>,
}

impl AuditEvent {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            target_type: target_type.into(),
            target_id: None,
            metadata: None,
            context: None,
        }
    }

    pub fn with_target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Client-side context of the request that triggered the action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }

    /// IP as recorded in the entry payload.
    pub fn ip_or_unknown(&self) -> &str {
        self.ip.as_deref().unwrap_or("unknown")
    }

    /// User agent as recorded in the entry payload.
    pub fn user_agent_or_unknown(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("unknown")
    }
}

/// Classify a user agent string into a coarse device class.
///
/// The class is frozen into the hashed payload, so the mapping must stay
/// stable: mobile, tablet, desktop or unknown.
pub fn classify_device(user_agent: &str) -> &'static str {
    if user_agent == "unknown" || user_agent.is_empty() {
        return "unknown";
    }

    let ua = user_agent.to_lowercase();

    if ua.contains("tablet") || ua.contains("ipad") {
        return "tablet";
    }
    if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        return "mobile";
    }
    "desktop"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = AuditEvent::new("admin-7", "user.suspend", "user")
            .with_target_id("user-42")
            .with_metadata(json!({"reason": "chargeback fraud"}))
            .with_context(RequestContext::new(
                Some("203.0.113.9".to_string()),
                Some("Mozilla/5.0".to_string()),
            ));

        assert_eq!(event.actor, "admin-7");
        assert_eq!(event.action, "user.suspend");
        assert_eq!(event.target_id.as_deref(), Some("user-42"));
        assert!(event.metadata.is_some());
        assert!(event.context.is_some());
    }

    #[test]
    fn test_classify_device() {
        assert_eq!(
            classify_device("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"),
            "mobile"
        );
        assert_eq!(classify_device("Mozilla/5.0 (iPad; CPU OS 17_0)"), "tablet");
        assert_eq!(
            classify_device("Mozilla/5.0 (X11; Linux x86_64) Firefox/126.0"),
            "desktop"
        );
        assert_eq!(classify_device("unknown"), "unknown");
        assert_eq!(classify_device(""), "unknown");
    }

    #[test]
    fn test_android_tablet_is_tablet() {
        // Android tablets carry both markers; tablet wins
        assert_eq!(
            classify_device("Mozilla/5.0 (Linux; Android 14; Tablet) Mobile"),
            "tablet"
        );
    }

    #[test]
    fn test_context_defaults() {
        let ctx = RequestContext::default();
        assert_eq!(ctx.ip_or_unknown(), "unknown");
        assert_eq!(ctx.user_agent_or_unknown(), "unknown");
    }
}

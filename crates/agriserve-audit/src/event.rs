//! Audit events.
//!
//! An event is an immutable fact about one access attempt. It is written
//! once and never updated or deleted by this crate; retention belongs to
//! whoever owns the store.

use agriserve_rbac::RequestContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use uuid::Uuid;

/// What kind of access an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// PII was revealed to the caller.
    PiiQuery,
    /// The assistant ran a structured query.
    SqlQuery,
    /// The assistant ran a vector search.
    VectorQuery,
    /// PII was masked because access was denied.
    PiiDenied,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PiiQuery => "pii_query",
            AuditAction::SqlQuery => "sql_query",
            AuditAction::VectorQuery => "vector_query",
            AuditAction::PiiDenied => "pii_denied",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One access attempt, as handed to the audit store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Caller id. `None` for unauthenticated attempts, which are still logged.
    pub actor_id: Option<String>,
    /// Active role as asserted, including roles outside the closed set.
    pub actor_role: Option<String>,
    pub action: AuditAction,
    /// Logical resource name, usually a table.
    pub resource: String,
    /// The specific record accessed, when known.
    pub target_id: Option<String>,
    /// Structured metadata, always a JSON object.
    pub data_scope: Value,
    pub ip_address: Option<String>,
    pub request_id: Option<String>,
}

impl AuditEvent {
    /// Creates an event with no actor and an empty scope.
    pub fn new(action: AuditAction, resource: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            actor_role: None,
            action,
            resource: resource.into(),
            target_id: None,
            data_scope: json!({}),
            ip_address: None,
            request_id: None,
        }
    }

    /// Creates an event attributed to the caller in `ctx`.
    pub fn from_context(
        ctx: &RequestContext,
        action: AuditAction,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: ctx.caller_id.clone(),
            actor_role: Some(ctx.active_role.as_str().to_string()),
            ip_address: ctx.ip_address.clone(),
            request_id: (!ctx.request_id.is_empty()).then(|| ctx.request_id.clone()),
            ..Self::new(action, resource)
        }
    }

    pub fn with_target(mut self, target_id: Option<&str>) -> Self {
        self.target_id = target_id.map(str::to_string);
        self
    }

    /// Sets the scope. Anything other than an object is wrapped as
    /// `{"value": ...}` so the stored scope is always an object.
    pub fn with_scope(mut self, scope: Value) -> Self {
        self.data_scope = match scope {
            Value::Object(_) => scope,
            other => json!({ "value": other }),
        };
        self
    }
}

/// An event after insertion, with the fields the store assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAuditEvent {
    pub id: Uuid,
    pub inserted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl StoredAuditEvent {
    /// Assigns a fresh id and the current time.
    pub fn assign(event: AuditEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            inserted_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agriserve_rbac::Role;

    #[test]
    fn test_action_wire_names() {
        for action in [
            AuditAction::PiiQuery,
            AuditAction::SqlQuery,
            AuditAction::VectorQuery,
            AuditAction::PiiDenied,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_from_context_copies_correlation_data() {
        let ctx = RequestContext::authenticated("user-1", Role::Provider)
            .with_request_id("req-42")
            .with_ip_address("10.0.0.7");

        let event = AuditEvent::from_context(&ctx, AuditAction::PiiQuery, "user_profiles")
            .with_target(Some("user-1"));

        assert_eq!(event.actor_id.as_deref(), Some("user-1"));
        assert_eq!(event.actor_role.as_deref(), Some("provider"));
        assert_eq!(event.request_id.as_deref(), Some("req-42"));
        assert_eq!(event.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(event.target_id.as_deref(), Some("user-1"));
        assert_eq!(event.data_scope, json!({}));
    }

    #[test]
    fn test_unauthenticated_attempt_has_no_actor() {
        let event = AuditEvent::from_context(
            &RequestContext::guest(""),
            AuditAction::PiiDenied,
            "user_profiles",
        );
        assert_eq!(event.actor_id, None);
        assert_eq!(event.actor_role.as_deref(), Some("guest"));
        assert_eq!(event.request_id, None);
    }

    #[test]
    fn test_scope_is_always_an_object() {
        let event = AuditEvent::new(AuditAction::SqlQuery, "bookings").with_scope(json!(3));
        assert_eq!(event.data_scope, json!({"value": 3}));
    }

    #[test]
    fn test_stored_event_flattens() {
        let stored = StoredAuditEvent::assign(AuditEvent::new(AuditAction::PiiDenied, "x"));
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["action"], json!("pii_denied"));
        assert_eq!(value["resource"], json!("x"));
        assert!(value["id"].is_string());

        let back: StoredAuditEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, stored);
    }
}

//! Per-request caller context.

use crate::roles::{Role, RoleClaim};
use serde::{Deserialize, Serialize};

/// Describes the caller for the duration of one request.
///
/// Built by the auth layer before the core is invoked. Decisions read
/// `active_role` as the sole authority; `roles` is informational and is
/// never consulted to widen access.
///
/// Every field defaults to its most restrictive value when deserialized
/// from a partial document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    /// Unique caller identifier. `None` means unauthenticated.
    pub caller_id: Option<String>,

    /// Every role the caller holds.
    pub roles: Vec<RoleClaim>,

    /// The role in effect for this request.
    pub active_role: RoleClaim,

    /// Whether the auth layer authenticated this request.
    ///
    /// Independent of `caller_id`; access needs both.
    pub is_authenticated: bool,

    /// Correlation identifier propagated to audit records.
    pub request_id: String,

    /// Source IP address, propagated to audit records only.
    pub ip_address: Option<String>,
}

impl RequestContext {
    /// Creates an unauthenticated guest context.
    pub fn guest(request_id: impl Into<String>) -> Self {
        Self {
            caller_id: None,
            roles: vec![RoleClaim::Known(Role::Guest)],
            active_role: RoleClaim::Known(Role::Guest),
            is_authenticated: false,
            request_id: request_id.into(),
            ip_address: None,
        }
    }

    /// Creates an authenticated context acting as `role`.
    pub fn authenticated(caller_id: impl Into<String>, role: impl Into<RoleClaim>) -> Self {
        let role = role.into();
        Self {
            caller_id: Some(caller_id.into()),
            roles: vec![role.clone()],
            active_role: role,
            is_authenticated: true,
            request_id: String::new(),
            ip_address: None,
        }
    }

    /// Switches the active role. Added to `roles` if not already held.
    pub fn with_role(mut self, role: impl Into<RoleClaim>) -> Self {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role.clone());
        }
        self.active_role = role;
        self
    }

    /// Replaces the set of held roles without touching the active role.
    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleClaim>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Returns the caller id, if any.
    pub fn caller_id(&self) -> Option<&str> {
        self.caller_id.as_deref()
    }

    /// Returns the active role if it is in the closed set.
    pub fn known_role(&self) -> Option<Role> {
        self.active_role.known()
    }
}

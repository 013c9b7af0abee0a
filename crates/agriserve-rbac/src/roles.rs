//! Role definitions for the assistant access-control core.
//!
//! The set of roles is closed:
//! - Guest: browsing without an account
//! - Farmer: rents equipment and hires labour
//! - Provider: lists equipment for rent
//! - Labour: offers work on the platform
//! - Admin: platform operator (full access)
//!
//! The auth layer hands roles over as strings. [`RoleClaim`] keeps anything
//! outside the closed set as [`RoleClaim::Unknown`] so that decisions can
//! deny it instead of guessing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role in the access control system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Anonymous visitor. Can only read public catalog tables.
    Guest,

    /// Farmer renting equipment or hiring labour.
    ///
    /// **Permissions:**
    /// - Own bookings, payments, notifications
    /// - Own profile PII
    Farmer,

    /// Equipment provider.
    ///
    /// **Permissions:**
    /// - Own listings, earnings, bookings against them
    /// - Own profile PII
    Provider,

    /// Labourer offering services.
    Labour,

    /// Platform administrator.
    ///
    /// **Permissions:**
    /// - All PII and payment data
    /// - Admin-only tables (audit logs)
    Admin,
}

impl Role {
    /// Every known role, in declaration order.
    pub const ALL: [Role; 5] = [
        Role::Guest,
        Role::Farmer,
        Role::Provider,
        Role::Labour,
        Role::Admin,
    ];

    /// Returns the wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Farmer => "farmer",
            Role::Provider => "provider",
            Role::Labour => "labour",
            Role::Admin => "admin",
        }
    }

    /// Parses a wire name. Matching is exact: `"Admin"` is not `"admin"`.
    pub fn parse(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == name)
    }

    /// Returns whether this role bypasses ownership checks.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role as asserted by the auth layer.
///
/// Serializes as a plain string. Strings outside the closed role set are
/// kept verbatim in [`RoleClaim::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleClaim {
    /// One of the closed set of roles.
    Known(Role),
    /// Anything else. Every decision denies this.
    Unknown(String),
}

impl RoleClaim {
    /// Returns the role if it is in the closed set.
    pub fn known(&self) -> Option<Role> {
        match self {
            RoleClaim::Known(role) => Some(*role),
            RoleClaim::Unknown(_) => None,
        }
    }

    /// Returns the claim exactly as asserted.
    pub fn as_str(&self) -> &str {
        match self {
            RoleClaim::Known(role) => role.as_str(),
            RoleClaim::Unknown(raw) => raw,
        }
    }
}

impl Default for RoleClaim {
    fn default() -> Self {
        RoleClaim::Known(Role::Guest)
    }
}

impl From<Role> for RoleClaim {
    fn from(role: Role) -> Self {
        RoleClaim::Known(role)
    }
}

impl From<&str> for RoleClaim {
    fn from(raw: &str) -> Self {
        match Role::parse(raw) {
            Some(role) => RoleClaim::Known(role),
            None => RoleClaim::Unknown(raw.to_string()),
        }
    }
}

impl From<String> for RoleClaim {
    fn from(raw: String) -> Self {
        match Role::parse(&raw) {
            Some(role) => RoleClaim::Known(role),
            None => RoleClaim::Unknown(raw),
        }
    }
}

impl From<RoleClaim> for String {
    fn from(claim: RoleClaim) -> Self {
        match claim {
            RoleClaim::Known(role) => role.as_str().to_string(),
            RoleClaim::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for RoleClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

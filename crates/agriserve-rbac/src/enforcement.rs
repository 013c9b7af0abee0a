//! Decision functions for PII, payment and admin data.
//!
//! Every function is total and side-effect free. The first check in each
//! one rejects an active role outside the closed set, so a malformed context
//! can only ever route to a denial.

use crate::context::RequestContext;
use crate::decision::Decision;
use crate::roles::Role;

/// Resolves the active role, or returns the fail-closed denial.
pub(crate) fn known_role(ctx: &RequestContext) -> Result<Role, Decision> {
    ctx.known_role()
        .ok_or_else(|| Decision::deny(format!("unknown role '{}'", ctx.active_role)))
}

/// Decides whether the caller may see PII owned by `target_owner_id`.
///
/// Rules, first match wins:
/// 1. unknown role: deny
/// 2. unauthenticated: deny, naming `phone`, `email`, `location` as masked
/// 3. authenticated without a caller id: deny
/// 4. admin: allow
/// 5. target is the caller: allow
/// 6. target is someone else: deny, naming the masked fields
/// 7. no target: deny
///
/// Omitting the target never grants broad access to a non-admin.
pub fn can_access_pii(ctx: &RequestContext, target_owner_id: Option<&str>) -> Decision {
    let role = match known_role(ctx) {
        Ok(role) => role,
        Err(denied) => return denied,
    };

    if !ctx.is_authenticated {
        return Decision::deny_masking("unauthenticated: PII access denied");
    }

    let Some(caller_id) = ctx.caller_id() else {
        return Decision::deny("missing identity on authenticated context");
    };

    if role.is_admin() {
        return Decision::allow("admin full access");
    }

    match target_owner_id {
        Some(target) if target == caller_id => Decision::allow("own data"),
        Some(_) => Decision::deny_masking("cross-user access denied"),
        None => Decision::deny("insufficient context to grant access"),
    }
}

/// Decides whether the caller may see payment records owned by
/// `target_owner_id`.
///
/// Payments are all-or-nothing, so denials carry no masked fields.
pub fn can_access_payments(ctx: &RequestContext, target_owner_id: Option<&str>) -> Decision {
    let role = match known_role(ctx) {
        Ok(role) => role,
        Err(denied) => return denied,
    };

    let caller_id = match ctx.caller_id() {
        Some(id) if ctx.is_authenticated => id,
        _ => return Decision::deny("unauthenticated: payment access denied"),
    };

    if role.is_admin() {
        return Decision::allow("admin full payment access");
    }

    match target_owner_id {
        Some(target) if target == caller_id => Decision::allow("own payment access"),
        _ => Decision::deny("cross-user payment access denied"),
    }
}

/// Decides whether the caller may read admin-only data.
pub fn can_access_admin_data(ctx: &RequestContext) -> Decision {
    match known_role(ctx) {
        Ok(Role::Admin) => Decision::allow("admin data access"),
        Ok(_) => Decision::deny("non-admin cannot access admin data"),
        Err(denied) => denied,
    }
}

//! Property-based tests using proptest.
//!
//! Checks the access-control invariants over arbitrary contexts, targets
//! and records.

use crate::context::RequestContext;
use crate::enforcement::{can_access_admin_data, can_access_payments, can_access_pii};
use crate::masking::{LOCATION_HIDDEN, PHONE_MASKED_SUFFIX, PiiKind, mask_value};
use crate::pii::{DEFAULT_SENSITIVE_FIELDS, Record, apply_pii_policy};
use crate::roles::{Role, RoleClaim};
use crate::tables::{Table, can_query_table};
use proptest::prelude::*;
use serde_json::Value;

fn any_known_role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn non_admin_role() -> impl Strategy<Value = Role> {
    prop::sample::select(vec![Role::Guest, Role::Farmer, Role::Provider, Role::Labour])
}

fn unknown_role() -> impl Strategy<Value = String> {
    "[A-Za-z_ ]{0,12}".prop_filter("must be outside the closed role set", |raw| {
        Role::parse(raw).is_none()
    })
}

fn user_id() -> impl Strategy<Value = String> {
    "(user|admin)-[0-9]{1,4}"
}

fn any_table_name() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(Table::ALL.to_vec()).prop_map(|t| t.name().to_string()),
        "[a-z_]{1,20}",
    ]
}

fn context(
    caller_id: Option<String>,
    role: RoleClaim,
    is_authenticated: bool,
) -> RequestContext {
    RequestContext {
        caller_id,
        roles: vec![role.clone()],
        active_role: role,
        is_authenticated,
        request_id: "prop-req".to_string(),
        ip_address: None,
    }
}

fn field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(DEFAULT_SENSITIVE_FIELDS.to_vec()).prop_map(str::to_string),
        "f_[a-z]{1,8}",
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        ".{0,24}".prop_map(Value::String),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

fn record() -> impl Strategy<Value = Record> {
    prop::collection::btree_map(field_name(), json_value(), 0..8)
        .prop_map(|fields| fields.into_iter().collect())
}

proptest! {
    #[test]
    fn unknown_role_is_denied_everywhere(
        raw in unknown_role(),
        caller in prop::option::of(user_id()),
        authenticated in any::<bool>(),
        target in prop::option::of(user_id()),
        table in any_table_name(),
    ) {
        let ctx = context(caller, RoleClaim::Unknown(raw), authenticated);

        prop_assert!(!can_access_pii(&ctx, target.as_deref()).allowed);
        prop_assert!(!can_access_payments(&ctx, target.as_deref()).allowed);
        prop_assert!(!can_access_admin_data(&ctx).allowed);
        prop_assert!(!can_query_table(&ctx, &table).allowed);
    }

    #[test]
    fn unauthenticated_is_denied_pii_and_payments(
        role in any_known_role(),
        caller in prop::option::of(user_id()),
        target in prop::option::of(user_id()),
    ) {
        let ctx = context(caller, role.into(), false);

        prop_assert!(!can_access_pii(&ctx, target.as_deref()).allowed);
        prop_assert!(!can_access_payments(&ctx, target.as_deref()).allowed);
    }

    #[test]
    fn admin_is_allowed_any_target(
        caller in user_id(),
        target in prop::option::of(user_id()),
    ) {
        let ctx = context(Some(caller), Role::Admin.into(), true);

        prop_assert!(can_access_pii(&ctx, target.as_deref()).allowed);
        prop_assert!(can_access_payments(&ctx, target.as_deref()).allowed);
        prop_assert!(can_access_admin_data(&ctx).allowed);
    }

    #[test]
    fn ownership_is_symmetric(
        role in non_admin_role(),
        caller in user_id(),
        other in user_id(),
    ) {
        prop_assume!(caller != other);
        let ctx = context(Some(caller.clone()), role.into(), true);

        prop_assert!(can_access_pii(&ctx, Some(&caller)).allowed);
        prop_assert!(!can_access_pii(&ctx, Some(&other)).allowed);
        prop_assert!(!can_access_admin_data(&ctx).allowed);
    }

    #[test]
    fn masked_phone_reveals_at_most_the_prefix(phone in ".{0,20}") {
        let masked = match mask_value(PiiKind::Phone, &Value::String(phone.clone())) {
            Value::String(s) => s,
            other => return Err(TestCaseError::fail(format!("non-string mask {other:?}"))),
        };
        let len = phone.chars().count();

        if len < PHONE_MASKED_SUFFIX {
            prop_assert_eq!(masked, "***");
        } else {
            let visible: String = phone.chars().take(len - PHONE_MASKED_SUFFIX).collect();
            prop_assert_eq!(masked, format!("{visible}XXXXX"));
        }
    }

    #[test]
    fn masked_email_reveals_only_first_char_and_domain(
        local in "[a-z0-9.]{0,12}",
        domain in "[a-z]{1,10}\\.[a-z]{2,3}",
    ) {
        let email = format!("{local}@{domain}");
        let masked = mask_value(PiiKind::Email, &Value::String(email));
        let expected = match local.chars().next() {
            Some(first) => format!("{first}***@{domain}"),
            None => format!("***@{domain}"),
        };
        prop_assert_eq!(masked, Value::String(expected));
    }

    #[test]
    fn masked_location_is_exactly_the_placeholder(value in ".{0,40}") {
        prop_assert_eq!(
            mask_value(PiiKind::Location, &Value::String(value)),
            Value::String(LOCATION_HIDDEN.to_string())
        );
    }

    #[test]
    fn non_sensitive_fields_pass_through(
        input in record(),
        caller in prop::option::of(user_id()),
        target in prop::option::of(user_id()),
    ) {
        let ctx = context(caller, Role::Farmer.into(), true);
        let result = apply_pii_policy(&input, &ctx, target.as_deref());

        prop_assert_eq!(result.sanitized.len(), input.len());
        for (field, value) in &input {
            if !DEFAULT_SENSITIVE_FIELDS.contains(&field.as_str()) {
                prop_assert_eq!(&result.sanitized[field], value);
            }
        }
    }

    #[test]
    fn audit_required_iff_sensitive_field_present(
        input in record(),
        role in any_known_role(),
        authenticated in any::<bool>(),
    ) {
        let ctx = context(Some("user-1".to_string()), role.into(), authenticated);
        let result = apply_pii_policy(&input, &ctx, Some("user-2"));

        let has_sensitive = input
            .keys()
            .any(|field| DEFAULT_SENSITIVE_FIELDS.contains(&field.as_str()));
        prop_assert_eq!(result.audit_required, has_sensitive);

        // Denied sensitive fields are all reported as masked.
        if !result.access_granted() {
            prop_assert_eq!(result.masked_fields, result.sensitive_present);
        }
    }
}

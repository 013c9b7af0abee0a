//! PII redaction policy.
//!
//! Produces a safe-to-return copy of a record. Only fields recognized as
//! sensitive are ever masked; every other field passes through untouched and
//! nothing is dropped.
//!
//! ```
//! use agriserve_rbac::{RequestContext, apply_pii_policy};
//! use serde_json::json;
//!
//! let record = json!({"phone": "9876543210", "name": "Asha"});
//! let record = record.as_object().unwrap();
//!
//! let result = apply_pii_policy(record, &RequestContext::guest("req-1"), Some("user-7"));
//! assert_eq!(result.sanitized["phone"], json!("98765XXXXX"));
//! assert_eq!(result.sanitized["name"], json!("Asha"));
//! assert_eq!(result.masked_fields, vec!["phone".to_string()]);
//! assert!(result.audit_required);
//! ```

use crate::context::RequestContext;
use crate::decision::Decision;
use crate::enforcement::can_access_pii;
use crate::masking::{PiiKind, mask_value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A data record: field name to JSON value.
pub type Record = Map<String, Value>;

/// Field names treated as sensitive by default.
pub const DEFAULT_SENSITIVE_FIELDS: [&str; 8] = [
    "phone",
    "phone_number",
    "email",
    "location",
    "latitude",
    "longitude",
    "gps",
    "coordinates",
];

static DEFAULT_POLICY: Lazy<PiiPolicy> = Lazy::new(PiiPolicy::default);

/// A sensitive field registration with an explicit masking kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveField {
    pub name: String,
    pub kind: PiiKind,
}

/// The set of sensitive field names and how each one is masked.
///
/// The default set tags each name with [`PiiKind::infer`]. Further fields
/// can be registered with an explicit kind so that masking does not depend
/// on what the name happens to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiPolicy {
    fields: BTreeMap<String, PiiKind>,
}

impl Default for PiiPolicy {
    fn default() -> Self {
        Self {
            fields: DEFAULT_SENSITIVE_FIELDS
                .iter()
                .map(|name| ((*name).to_string(), PiiKind::infer(name)))
                .collect(),
        }
    }
}

/// Outcome of applying the policy to one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PiiPolicyResult {
    /// Copy of the input with denied sensitive fields masked.
    pub sanitized: Record,
    /// Names of fields masked in this call.
    pub masked_fields: Vec<String>,
    /// Whether this access must be audited.
    ///
    /// True iff the record carries at least one sensitive field, whatever
    /// the decision was.
    pub audit_required: bool,
    /// Sensitive field names present in the input.
    pub sensitive_present: Vec<String>,
    /// The decision consulted for the sensitive fields, if there were any.
    pub decision: Option<Decision>,
}

impl PiiPolicyResult {
    /// Returns whether the sensitive fields were revealed.
    pub fn access_granted(&self) -> bool {
        self.decision.as_ref().is_some_and(|d| d.allowed)
    }
}

impl PiiPolicy {
    /// Creates a policy with no sensitive fields.
    pub fn empty() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Registers a sensitive field with an explicit masking kind.
    ///
    /// Re-registering an existing name replaces its kind.
    pub fn with_field(mut self, name: impl Into<String>, kind: PiiKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Registers several fields at once.
    pub fn with_fields<I>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = SensitiveField>,
    {
        fields
            .into_iter()
            .fold(self, |policy, field| policy.with_field(field.name, field.kind))
    }

    /// Returns the masking kind if `field` is sensitive.
    pub fn kind_of(&self, field: &str) -> Option<PiiKind> {
        self.fields.get(field).copied()
    }

    pub fn is_sensitive(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates over the registered fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, PiiKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Sanitizes `record` for the caller described by `ctx`.
    ///
    /// `target_owner_id` is the owner of the record, when known. Without it
    /// only an admin sees sensitive values.
    pub fn apply(
        &self,
        record: &Record,
        ctx: &RequestContext,
        target_owner_id: Option<&str>,
    ) -> PiiPolicyResult {
        let sensitive_present: Vec<String> = record
            .keys()
            .filter(|field| self.is_sensitive(field))
            .cloned()
            .collect();

        let audit_required = !sensitive_present.is_empty();

        // The decision depends only on ctx and target, so one evaluation
        // covers every sensitive field in the record.
        let decision = audit_required.then(|| can_access_pii(ctx, target_owner_id));
        let reveal = decision.as_ref().is_some_and(|d| d.allowed);

        let mut sanitized = Record::new();
        let mut masked_fields = Vec::new();

        for (field, value) in record {
            match self.kind_of(field) {
                Some(kind) if !reveal => {
                    sanitized.insert(field.clone(), mask_value(kind, value));
                    masked_fields.push(field.clone());
                }
                _ => {
                    sanitized.insert(field.clone(), value.clone());
                }
            }
        }

        debug_assert_eq!(sanitized.len(), record.len(), "no field may be dropped");

        PiiPolicyResult {
            sanitized,
            masked_fields,
            audit_required,
            sensitive_present,
            decision,
        }
    }
}

/// Sanitizes `record` using the default sensitive field set.
pub fn apply_pii_policy(
    record: &Record,
    ctx: &RequestContext,
    target_owner_id: Option<&str>,
) -> PiiPolicyResult {
    DEFAULT_POLICY.apply(record, ctx, target_owner_id)
}

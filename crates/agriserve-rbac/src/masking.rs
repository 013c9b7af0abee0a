//! Masked representations of sensitive field values.
//!
//! | Kind     | Input              | Masked              |
//! |----------|--------------------|---------------------|
//! | Phone    | `9876543210`       | `98765XXXXX`        |
//! | Phone    | `1234`             | `***`               |
//! | Email    | `john@example.com` | `j***@example.com`  |
//! | Email    | `not-an-email`     | `***@***.***`       |
//! | Location | anything           | `[Location Hidden]` |
//! | any      | non-string value   | `[Hidden]`          |
//!
//! Masking never fails: a value that does not look like its kind falls back
//! to a fixed placeholder.
//!
//! ```
//! use agriserve_rbac::masking::{PiiKind, mask_value};
//! use serde_json::json;
//!
//! assert_eq!(mask_value(PiiKind::Phone, &json!("9876543210")), json!("98765XXXXX"));
//! assert_eq!(mask_value(PiiKind::Email, &json!("asha@example.in")), json!("a***@example.in"));
//! assert_eq!(mask_value(PiiKind::Location, &json!(12.97)), json!("[Hidden]"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder for sensitive values that are not strings.
pub const HIDDEN: &str = "[Hidden]";

/// Placeholder for every location-like value.
pub const LOCATION_HIDDEN: &str = "[Location Hidden]";

/// Placeholder for email values without an `@`.
pub const EMAIL_FALLBACK: &str = "***@***.***";

/// Placeholder for phone values too short to partially reveal.
pub const SHORT_PHONE: &str = "***";

/// Number of trailing phone characters replaced with `X`.
pub const PHONE_MASKED_SUFFIX: usize = 5;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// How a sensitive field is masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiKind {
    /// Partially revealed: all but the last five characters.
    Phone,
    /// Partially revealed: first local-part character and the domain.
    Email,
    /// Never revealed. Partial coordinates can still identify a farm.
    Location,
}

impl PiiKind {
    /// Infers the kind from a field name.
    ///
    /// Names containing `phone` are phones, names containing `email` are
    /// emails, everything else is treated as location data.
    pub fn infer(field_name: &str) -> PiiKind {
        if field_name.contains("phone") {
            PiiKind::Phone
        } else if field_name.contains("email") {
            PiiKind::Email
        } else {
            PiiKind::Location
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiKind::Phone => "phone",
            PiiKind::Email => "email",
            PiiKind::Location => "location",
        }
    }
}

// ---------------------------------------------------------------------------
// Masking
// ---------------------------------------------------------------------------

/// Returns the masked representation of `value`.
pub fn mask_value(kind: PiiKind, value: &Value) -> Value {
    let Value::String(text) = value else {
        return Value::String(HIDDEN.to_string());
    };

    let masked = match kind {
        PiiKind::Phone => mask_phone(text),
        PiiKind::Email => mask_email(text),
        PiiKind::Location => LOCATION_HIDDEN.to_string(),
    };

    Value::String(masked)
}

/// Masks a phone number: `9876543210` -> `98765XXXXX`.
pub fn mask_phone(text: &str) -> String {
    let len = text.chars().count();
    if len < PHONE_MASKED_SUFFIX {
        return SHORT_PHONE.to_string();
    }

    let visible: String = text.chars().take(len - PHONE_MASKED_SUFFIX).collect();
    let masked = format!("{visible}{}", "X".repeat(PHONE_MASKED_SUFFIX));

    debug_assert_eq!(masked.chars().count(), len, "phone mask must keep length");
    masked
}

/// Masks an email: `john@example.com` -> `j***@example.com`.
pub fn mask_email(text: &str) -> String {
    let Some((local, domain)) = text.split_once('@') else {
        return EMAIL_FALLBACK.to_string();
    };

    match local.chars().next() {
        Some(first) => format!("{first}***@{domain}"),
        None => format!("***@{domain}"),
    }
}

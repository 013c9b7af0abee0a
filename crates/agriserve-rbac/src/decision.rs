//! Authorization decisions.

use serde::Serialize;

/// Fields named by PII denials that the caller will render redacted.
pub const DEFAULT_MASKED_FIELDS: [&str; 3] = ["phone", "email", "location"];

/// The outcome of every authorization check.
///
/// `reason` is for internal logs only. It must never be shown to end users:
/// the caller-facing effect of a denial is masking or refusal, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether the operation is allowed.
    pub allowed: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Fields hidden as a consequence of this decision, if the check names any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_fields: Option<Vec<String>>,
}

impl Decision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            masked_fields: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            masked_fields: None,
        }
    }

    /// Denies and names the default PII fields the caller must mask.
    pub fn deny_masking(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            masked_fields: Some(
                DEFAULT_MASKED_FIELDS
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            ),
        }
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

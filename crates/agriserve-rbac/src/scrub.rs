//! Free-text PII scrubbing.
//!
//! Conversation summaries kept by the assistant are plain text, so the
//! field-based policy in [`crate::pii`] cannot see into them. Before a
//! summary is stored, email addresses and mobile numbers are replaced with
//! fixed tokens.
//!
//! ```
//! use agriserve_rbac::scrub::scrub_pii;
//!
//! let result = scrub_pii("call +91 98765 43210 or mail asha@example.in");
//! assert_eq!(result.scrubbed, "call [PHONE] or mail [EMAIL]");
//! assert_eq!(result.phones, 1);
//! assert_eq!(result.emails, 1);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// Replacement token for email addresses.
pub const EMAIL_TOKEN: &str = "[EMAIL]";

/// Replacement token for phone numbers.
pub const PHONE_TOKEN: &str = "[PHONE]";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b")
        .expect("email pattern is a valid regex")
});

// Indian mobile numbers: optional +91 or trunk 0, ten digits starting 6-9,
// optionally split 5+5 by a space or hyphen.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+91[\s-]?|\b0|\b)[6-9]\d{4}[\s-]?\d{5}\b")
        .expect("phone pattern is a valid regex")
});

/// Text with PII replaced, plus what was found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrubResult {
    pub scrubbed: String,
    pub emails: usize,
    pub phones: usize,
}

impl ScrubResult {
    pub fn found_pii(&self) -> bool {
        self.emails > 0 || self.phones > 0
    }
}

/// Replaces email addresses and phone numbers in `text`.
///
/// Emails are replaced first so that digits inside an address are not
/// reported as a phone number.
pub fn scrub_pii(text: &str) -> ScrubResult {
    let emails = EMAIL_PATTERN.find_iter(text).count();
    let without_emails = EMAIL_PATTERN.replace_all(text, EMAIL_TOKEN);

    let phones = PHONE_PATTERN.find_iter(&without_emails).count();
    let scrubbed = PHONE_PATTERN
        .replace_all(&without_emails, PHONE_TOKEN)
        .into_owned();

    ScrubResult {
        scrubbed,
        emails,
        phones,
    }
}

//! # agriserve-rbac: access-control core for the AgriServe assistant
//!
//! Decides what the conversational assistant may read or reveal for a
//! caller, and redacts records accordingly:
//! - **Decision functions** for PII, payments and admin data
//! - **Table gate** over a closed set of queryable tables
//! - **PII redaction** of records before they reach the user or the model
//! - **Free-text scrubbing** of conversation summaries
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  RequestContext (from the auth layer)        │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision functions                          │
//! │  ├─ can_query_table   (coarse, per table)    │
//! │  ├─ can_access_pii    (fine, per owner)      │
//! │  ├─ can_access_payments                      │
//! │  └─ can_access_admin_data                    │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  PiiPolicy::apply                            │
//! │  - sensitive fields masked on denial         │
//! │  - audit_required flag for the audit logger  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure and synchronous. Audit persistence lives in
//! `agriserve-audit`.
//!
//! ## Fail-closed
//!
//! An active role outside the closed set (`guest`, `farmer`, `provider`,
//! `labour`, `admin`) is denied by every decision function, whatever the
//! rest of the context says. Denials are values, never errors.
//!
//! ```
//! use agriserve_rbac::{RequestContext, Role, can_access_pii, can_query_table};
//!
//! let farmer = RequestContext::authenticated("user-1", Role::Farmer);
//! assert!(can_access_pii(&farmer, Some("user-1")).allowed);
//! assert!(!can_access_pii(&farmer, Some("user-2")).allowed);
//!
//! let forged = RequestContext::authenticated("user-1", "superuser");
//! assert!(!can_query_table(&forged, "equipment").allowed);
//! ```

pub mod context;
pub mod decision;
pub mod enforcement;
pub mod masking;
pub mod pii;
pub mod roles;
pub mod scrub;
pub mod tables;

pub use context::RequestContext;
pub use decision::Decision;
pub use enforcement::{can_access_admin_data, can_access_payments, can_access_pii};
pub use masking::PiiKind;
pub use pii::{PiiPolicy, PiiPolicyResult, Record, SensitiveField, apply_pii_policy};
pub use roles::{Role, RoleClaim};
pub use scrub::{ScrubResult, scrub_pii};
pub use tables::{Table, TableAccess, can_query_table};

#[cfg(test)]
mod property_tests;

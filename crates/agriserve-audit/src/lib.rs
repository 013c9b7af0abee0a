//! # agriserve-audit: audit trail for assistant data access
//!
//! Every PII-bearing access attempt, granted or denied, becomes an
//! [`AuditEvent`]. Events are persisted by an [`AuditStore`] behind a
//! fire-and-forget [`AuditLogger`]: a failing store never surfaces to the
//! request that produced the event.
//!
//! ## Example
//!
//! ```
//! use agriserve_audit::{AuditLogger, AuditSettings, MemoryAuditStore};
//! use agriserve_rbac::{RequestContext, Role};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = Arc::new(MemoryAuditStore::new());
//! let (logger, worker) = AuditLogger::spawn(store.clone(), AuditSettings::default()).unwrap();
//!
//! let ctx = RequestContext::authenticated("user-1", Role::Farmer);
//! logger.log_pii_denied(&ctx, "user_profiles", Some("user-2"));
//!
//! worker.shutdown(logger).await;
//! assert_eq!(store.len(), 1);
//! # });
//! ```

pub mod error;
pub mod event;
pub mod logger;
pub mod store;

pub use error::{AuditError, Result};
pub use event::{AuditAction, AuditEvent, StoredAuditEvent};
pub use logger::{AuditLogger, AuditSettings, AuditWorker};
pub use store::{AuditQuery, AuditStore, JsonlAuditStore, MemoryAuditStore};

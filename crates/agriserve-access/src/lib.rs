//! # agriserve-access: the assistant's entry point to access control
//!
//! [`AccessGuard`] joins the pure policy in `agriserve-rbac` with the
//! fire-and-forget audit trail in `agriserve-audit`. The query layer calls
//! [`AccessGuard::authorize_table`] before each query and
//! [`AccessGuard::apply_pii_policy`] on every record it hands back.
//!
//! ```
//! use agriserve_access::{AccessGuard, AuditLogger, PiiPolicy, RequestContext, Role};
//! use serde_json::json;
//!
//! let guard = AccessGuard::new(PiiPolicy::default(), AuditLogger::disabled());
//! let viewer = RequestContext::authenticated("user-2", Role::Farmer);
//!
//! let record = json!({ "name": "Ravi", "phone": "9876543210" });
//! let result = guard.apply_pii_policy(record.as_object().unwrap(), &viewer, Some("user-1"));
//!
//! assert_eq!(result.sanitized["phone"], "98765XXXXX");
//! assert_eq!(result.sanitized["name"], "Ravi");
//! ```

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use agriserve_audit::{
    AuditAction, AuditError, AuditEvent, AuditLogger, AuditQuery, AuditSettings, AuditStore,
    AuditWorker, JsonlAuditStore, MemoryAuditStore, StoredAuditEvent,
};
pub use agriserve_config::{AccessConfig, ConfigError, ConfigLoader};
pub use agriserve_rbac::{
    Decision, PiiKind, PiiPolicy, PiiPolicyResult, Record, RequestContext, Role, RoleClaim,
    SensitiveField, Table, TableAccess, can_access_admin_data, can_access_payments,
    can_access_pii, can_query_table, scrub_pii,
};

/// Resource recorded for PII audit events unless configured otherwise.
pub const DEFAULT_RESOURCE: &str = "user_profiles";

/// Errors raised while assembling a guard from configuration.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("audit store unavailable: {0}")]
    Audit(#[from] AuditError),
}

/// Policy plus audit dispatch, shared across request handlers.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    policy: Arc<PiiPolicy>,
    logger: AuditLogger,
    resource: String,
}

impl AccessGuard {
    pub fn new(policy: PiiPolicy, logger: AuditLogger) -> Self {
        Self {
            policy: Arc::new(policy),
            logger,
            resource: DEFAULT_RESOURCE.to_string(),
        }
    }

    /// Sets the resource name recorded in PII audit events.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Builds a guard from configuration.
    ///
    /// With auditing enabled this opens the JSON-lines store at
    /// `audit.store_path` and starts the audit worker, so it must run
    /// inside a Tokio runtime. The worker is returned for shutdown.
    pub fn from_config(
        config: &AccessConfig,
    ) -> Result<(AccessGuard, Option<AuditWorker>), AccessError> {
        config.validate()?;

        let policy = config.pii.policy();

        if !config.audit.enabled {
            debug!("Audit disabled by configuration");
            let guard = AccessGuard::new(policy, AuditLogger::disabled())
                .with_resource(config.audit.resource.clone());
            return Ok((guard, None));
        }

        let store = JsonlAuditStore::open(&config.audit.store_path)?;
        debug!(store = %store.path().display(), "Audit store opened");

        let settings = AuditSettings {
            queue_capacity: config.audit.queue_capacity,
            write_timeout: config.audit.write_timeout(),
            max_in_flight: config.audit.max_in_flight_writes,
        };
        let (logger, worker) = AuditLogger::spawn(Arc::new(store), settings)?;

        debug!(
            queue_capacity = settings.queue_capacity,
            max_in_flight = settings.max_in_flight,
            "Audit worker started"
        );

        let guard =
            AccessGuard::new(policy, logger).with_resource(config.audit.resource.clone());
        Ok((guard, Some(worker)))
    }

    pub fn policy(&self) -> &PiiPolicy {
        &self.policy
    }

    pub fn logger(&self) -> &AuditLogger {
        &self.logger
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Sanitizes `record` and audits the access to its sensitive fields.
    ///
    /// Exactly one audit event is submitted when the record carries
    /// sensitive fields and its owner is known: `pii_query` listing the
    /// fields when they were revealed, `pii_denied` when they were masked.
    /// Never blocks on the audit store.
    pub fn apply_pii_policy(
        &self,
        record: &Record,
        ctx: &RequestContext,
        target_owner_id: Option<&str>,
    ) -> PiiPolicyResult {
        self.apply_pii_policy_for(&self.resource, record, ctx, target_owner_id)
    }

    /// Same as [`AccessGuard::apply_pii_policy`], auditing against `resource`.
    pub fn apply_pii_policy_for(
        &self,
        resource: &str,
        record: &Record,
        ctx: &RequestContext,
        target_owner_id: Option<&str>,
    ) -> PiiPolicyResult {
        let result = self.policy.apply(record, ctx, target_owner_id);

        if let (true, Some(target)) = (result.audit_required, target_owner_id) {
            if result.access_granted() {
                self.logger
                    .log_pii_access(ctx, resource, Some(target), &result.sensitive_present);
            } else {
                self.logger.log_pii_denied(ctx, resource, Some(target));
            }
        }

        if !result.masked_fields.is_empty() {
            debug!(
                request_id = %ctx.request_id,
                resource,
                masked = ?result.masked_fields,
                "PII masked"
            );
        }

        result
    }

    /// Sanitizes every record of a result set owned by `target_owner_id`.
    pub fn apply_pii_policy_all<'a, I>(
        &self,
        records: I,
        ctx: &RequestContext,
        target_owner_id: Option<&str>,
    ) -> Vec<PiiPolicyResult>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records
            .into_iter()
            .map(|record| self.apply_pii_policy(record, ctx, target_owner_id))
            .collect()
    }

    /// Table gate consulted before any query is built.
    pub fn authorize_table(&self, ctx: &RequestContext, table_name: &str) -> Decision {
        can_query_table(ctx, table_name)
    }

    /// Gates a structured query and audits it when permitted.
    ///
    /// `scope` describes the query (filters, columns) for the audit trail.
    pub fn authorize_sql_query(
        &self,
        ctx: &RequestContext,
        table_name: &str,
        scope: Value,
    ) -> Decision {
        let decision = can_query_table(ctx, table_name);
        if decision.is_denied() {
            return decision;
        }
        self.logger.log_sql_query(ctx, table_name, scope);
        decision
    }

    /// Audits a vector search run over `collection` for the caller.
    pub fn record_vector_query(&self, ctx: &RequestContext, collection: &str, scope: Value) {
        self.logger.log_vector_query(ctx, collection, scope);
    }

    /// Drops this guard's logger and waits for queued audit events to drain.
    ///
    /// Other clones of the guard keep the worker alive until they are dropped.
    pub async fn shutdown(self, worker: AuditWorker) {
        worker.shutdown(self.logger).await;
    }
}

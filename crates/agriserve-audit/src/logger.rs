//! Fire-and-forget audit logger.
//!
//! Callers hand events to [`AuditLogger::log_event`], which never blocks and
//! never fails. A background worker drains a bounded queue and performs one
//! insert per event on the blocking pool. Anything that goes wrong on the
//! way (full queue, stopped worker, store error, timeout) is logged locally
//! and the event is dropped: losing an audit record is preferred over
//! failing the user's request.
//!
//! ```text
//! log_event ──try_send──▶ [ bounded queue ] ──▶ worker ──spawn_blocking──▶ AuditStore::insert
//!     │                                              │
//!     └─ full/closed: warn!, drop                    └─ error/timeout: error!, drop
//! ```
//!
//! A timed-out insert keeps running on its blocking thread. It holds one of
//! `max_in_flight` permits until it returns, and an event that finds no
//! permit free is dropped, so a hung store ties up a bounded number of
//! threads.

use crate::error::{AuditError, Result};
use crate::event::{AuditAction, AuditEvent};
use crate::store::AuditStore;
use agriserve_rbac::RequestContext;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Tuning for the background worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSettings {
    /// Events buffered before new ones are dropped.
    pub queue_capacity: usize,
    /// Longest a single insert may take before it is abandoned.
    pub write_timeout: Duration,
    /// Inserts allowed to run at once, abandoned ones included.
    pub max_in_flight: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            write_timeout: Duration::from_secs(2),
            max_in_flight: 4,
        }
    }
}

/// Handle used to submit audit events.
///
/// Cheap to clone. A disabled logger accepts and discards everything.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    tx: Option<mpsc::Sender<AuditEvent>>,
}

/// The background worker behind an [`AuditLogger`].
#[derive(Debug)]
pub struct AuditWorker {
    handle: JoinHandle<()>,
}

impl AuditLogger {
    /// Starts a worker on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Unavailable`] when called outside a runtime.
    pub fn spawn(
        store: Arc<dyn AuditStore>,
        settings: AuditSettings,
    ) -> Result<(AuditLogger, AuditWorker)> {
        let runtime = Handle::try_current()
            .map_err(|e| AuditError::Unavailable(format!("no Tokio runtime: {e}")))?;
        Ok(Self::spawn_on(&runtime, store, settings))
    }

    /// Starts a worker on `runtime`.
    pub fn spawn_on(
        runtime: &Handle,
        store: Arc<dyn AuditStore>,
        settings: AuditSettings,
    ) -> (AuditLogger, AuditWorker) {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let handle = runtime.spawn(run_worker(store, rx, settings));
        (AuditLogger { tx: Some(tx) }, AuditWorker { handle })
    }

    /// Returns a logger that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Submits an event. Never blocks, never fails.
    pub fn log_event(&self, event: AuditEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    action = %event.action,
                    resource = %event.resource,
                    request_id = ?event.request_id,
                    "Audit queue full; event dropped"
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    action = %event.action,
                    resource = %event.resource,
                    request_id = ?event.request_id,
                    "Audit worker stopped; event dropped"
                );
            }
        }
    }

    /// Records that PII `fields` of `target_id` were revealed to the caller.
    pub fn log_pii_access(
        &self,
        ctx: &RequestContext,
        resource: &str,
        target_id: Option<&str>,
        fields: &[String],
    ) {
        self.log_event(
            AuditEvent::from_context(ctx, AuditAction::PiiQuery, resource)
                .with_target(target_id)
                .with_scope(json!({ "fields": fields })),
        );
    }

    /// Records that PII of `target_id` was masked because access was denied.
    pub fn log_pii_denied(&self, ctx: &RequestContext, resource: &str, target_id: Option<&str>) {
        self.log_event(
            AuditEvent::from_context(ctx, AuditAction::PiiDenied, resource).with_target(target_id),
        );
    }

    /// Records a structured query issued on behalf of the caller.
    pub fn log_sql_query(&self, ctx: &RequestContext, resource: &str, scope: Value) {
        self.log_event(
            AuditEvent::from_context(ctx, AuditAction::SqlQuery, resource).with_scope(scope),
        );
    }

    /// Records a vector search issued on behalf of the caller.
    pub fn log_vector_query(&self, ctx: &RequestContext, resource: &str, scope: Value) {
        self.log_event(
            AuditEvent::from_context(ctx, AuditAction::VectorQuery, resource).with_scope(scope),
        );
    }
}

impl AuditWorker {
    /// Drops `logger` and waits for the queue to drain.
    ///
    /// Completes once every clone of the logger is gone.
    pub async fn shutdown(self, logger: AuditLogger) {
        drop(logger);
        self.join().await;
    }

    /// Waits for the worker to exit.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!(error = %e, "Audit worker terminated abnormally");
        }
    }
}

async fn run_worker(
    store: Arc<dyn AuditStore>,
    mut rx: mpsc::Receiver<AuditEvent>,
    settings: AuditSettings,
) {
    let writers = Arc::new(Semaphore::new(settings.max_in_flight.max(1)));
    while let Some(event) = rx.recv().await {
        persist(&store, &writers, event, settings.write_timeout).await;
    }
    debug!("Audit queue closed; worker exiting");
}

/// One best-effort insert. Every failure ends here.
async fn persist(
    store: &Arc<dyn AuditStore>,
    writers: &Arc<Semaphore>,
    event: AuditEvent,
    write_timeout: Duration,
) {
    let action = event.action;
    let resource = event.resource.clone();
    let request_id = event.request_id.clone();

    // The permit lives in the closure, so it is held until the insert
    // returns even after the timeout below gives up on it.
    let Ok(permit) = Arc::clone(writers).try_acquire_owned() else {
        error!(
            action = %action,
            resource = %resource,
            request_id = ?request_id,
            "Audit store saturated by stalled writes; event dropped"
        );
        return;
    };

    let store = Arc::clone(store);
    let write = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        store.insert(event)
    });

    let failure = match tokio::time::timeout(write_timeout, write).await {
        Ok(Ok(Ok(stored))) => {
            debug!(id = %stored.id, action = %action, resource = %resource, "Audit event stored");
            return;
        }
        Ok(Ok(Err(e))) => e,
        Ok(Err(join_error)) => AuditError::Unavailable(format!("insert panicked: {join_error}")),
        Err(_) => AuditError::Timeout(write_timeout),
    };

    error!(
        error = %failure,
        action = %action,
        resource = %resource,
        request_id = ?request_id,
        "Audit write failed; event dropped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StoredAuditEvent;
    use crate::store::MemoryAuditStore;
    use agriserve_rbac::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FailingStore {
        attempts: AtomicUsize,
    }

    impl AuditStore for FailingStore {
        fn insert(&self, _event: AuditEvent) -> Result<StoredAuditEvent> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::Unavailable("database offline".to_string()))
        }
    }

    #[derive(Debug)]
    struct SlowStore {
        delay: Duration,
        inner: MemoryAuditStore,
        attempts: AtomicUsize,
    }

    impl SlowStore {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                inner: MemoryAuditStore::new(),
                attempts: AtomicUsize::new(0),
            }
        }
    }

    impl AuditStore for SlowStore {
        fn insert(&self, event: AuditEvent) -> Result<StoredAuditEvent> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.inner.insert(event)
        }
    }

    /// Never returns in time; records how many inserts overlap.
    #[derive(Debug, Default)]
    struct HungStore {
        attempts: AtomicUsize,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl AuditStore for HungStore {
        fn insert(&self, _event: AuditEvent) -> Result<StoredAuditEvent> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Err(AuditError::Unavailable("lock wait".to_string()))
        }
    }

    /// Polls `counter` until it reaches `expected` or a second has passed.
    async fn wait_for(counter: &AtomicUsize, expected: usize) -> usize {
        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        counter.load(Ordering::SeqCst)
    }

    #[derive(Debug)]
    struct PanickingStore;

    impl AuditStore for PanickingStore {
        fn insert(&self, _event: AuditEvent) -> Result<StoredAuditEvent> {
            panic!("driver bug");
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::authenticated("user-1", Role::Farmer).with_request_id("req-1")
    }

    #[tokio::test]
    async fn test_events_reach_the_store() {
        let store = Arc::new(MemoryAuditStore::new());
        let (logger, worker) = AuditLogger::spawn(store.clone(), AuditSettings::default()).unwrap();

        logger.log_pii_access(&ctx(), "user_profiles", Some("user-1"), &["phone".to_string()]);
        logger.log_pii_denied(&ctx(), "user_profiles", Some("user-2"));
        worker.shutdown(logger).await;

        let events = store.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.action, AuditAction::PiiQuery);
        assert_eq!(events[0].event.data_scope, json!({"fields": ["phone"]}));
        assert_eq!(events[1].event.action, AuditAction::PiiDenied);
        assert_eq!(events[1].event.data_scope, json!({}));
        assert_eq!(events[1].event.target_id.as_deref(), Some("user-2"));
    }

    #[tokio::test]
    async fn test_query_actions() {
        let store = Arc::new(MemoryAuditStore::new());
        let (logger, worker) = AuditLogger::spawn(store.clone(), AuditSettings::default()).unwrap();

        logger.log_sql_query(&ctx(), "bookings", json!({"columns": ["status"]}));
        logger.log_vector_query(&ctx(), "equipment", json!({"top_k": 5}));
        worker.shutdown(logger).await;

        let actions: Vec<AuditAction> = store.events().iter().map(|s| s.event.action).collect();
        assert_eq!(actions, vec![AuditAction::SqlQuery, AuditAction::VectorQuery]);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = Arc::new(FailingStore::default());
        let (logger, worker) = AuditLogger::spawn(store.clone(), AuditSettings::default()).unwrap();

        logger.log_pii_denied(&ctx(), "user_profiles", Some("user-2"));
        logger.log_pii_denied(&ctx(), "user_profiles", Some("user-3"));
        worker.shutdown(logger).await;

        // One attempt per event, no retries.
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_panic_is_swallowed() {
        let (logger, worker) =
            AuditLogger::spawn(Arc::new(PanickingStore), AuditSettings::default()).unwrap();

        logger.log_pii_denied(&ctx(), "user_profiles", None);
        logger.log_pii_denied(&ctx(), "user_profiles", None);
        worker.shutdown(logger).await;
    }

    #[tokio::test]
    async fn test_slow_store_times_out_and_worker_continues() {
        let store = Arc::new(SlowStore::new(Duration::from_millis(200)));
        let settings = AuditSettings {
            queue_capacity: 8,
            write_timeout: Duration::from_millis(10),
            ..AuditSettings::default()
        };
        let (logger, worker) = AuditLogger::spawn(store.clone(), settings).unwrap();

        logger.log_pii_denied(&ctx(), "user_profiles", None);
        logger.log_pii_denied(&ctx(), "user_profiles", None);
        worker.shutdown(logger).await;

        // The first timeout did not stop the worker from trying the second.
        assert_eq!(wait_for(&store.attempts, 2).await, 2);
    }

    #[tokio::test]
    async fn test_hung_store_bounds_concurrent_inserts() {
        let store = Arc::new(HungStore::default());
        let settings = AuditSettings {
            queue_capacity: 1,
            write_timeout: Duration::from_millis(5),
            max_in_flight: 2,
        };
        let (logger, worker) = AuditLogger::spawn(store.clone(), settings).unwrap();

        for i in 0..30 {
            logger.log_pii_denied(&ctx(), "user_profiles", Some(&format!("user-{i}")));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        worker.shutdown(logger).await;

        assert!(wait_for(&store.attempts, 1).await >= 1);
        assert!(
            store.peak.load(Ordering::SeqCst) <= 2,
            "peak concurrent inserts {} exceeded max_in_flight",
            store.peak.load(Ordering::SeqCst)
        );
        // Stalled writes hold every permit, so most events were dropped.
        assert!(store.attempts.load(Ordering::SeqCst) < 30);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let store = Arc::new(MemoryAuditStore::new());
        let settings = AuditSettings {
            queue_capacity: 1,
            ..AuditSettings::default()
        };
        let (logger, worker) = AuditLogger::spawn(store.clone(), settings).unwrap();

        // The current-thread runtime cannot run the worker until we yield,
        // so only the first event fits in the queue.
        for _ in 0..3 {
            logger.log_pii_denied(&ctx(), "user_profiles", None);
        }
        worker.shutdown(logger).await;

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_queue_drops_without_failing() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let logger = AuditLogger { tx: Some(tx) };

        logger.log_pii_denied(&ctx(), "user_profiles", None);
    }

    #[test]
    fn test_disabled_logger_discards() {
        let logger = AuditLogger::disabled();
        assert!(!logger.is_enabled());
        logger.log_pii_denied(&ctx(), "user_profiles", None);
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let result = AuditLogger::spawn(Arc::new(MemoryAuditStore::new()), AuditSettings::default());
        assert!(matches!(result, Err(AuditError::Unavailable(_))));
    }
}

//! Durable audit stores.
//!
//! A store exposes one operation: insert a single event. Inserts block until
//! the record is written; the logger runs them off the request path.

use crate::error::{AuditError, Result};
use crate::event::{AuditAction, AuditEvent, StoredAuditEvent};
use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Sink for audit events.
///
/// Implementations assign the id and insertion time. They are never asked
/// to update or delete a record.
pub trait AuditStore: Send + Sync + Debug {
    /// Inserts one event.
    ///
    /// # Errors
    ///
    /// Any failure to persist. The logger logs and swallows it.
    fn insert(&self, event: AuditEvent) -> Result<StoredAuditEvent>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Query filter for [`MemoryAuditStore`].
///
/// Fields set together are combined with AND.
#[derive(Debug, Default, Clone)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub resource: Option<String>,
    pub request_id: Option<String>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn with_actor(mut self, actor_id: &str) -> Self {
        self.actor_id = Some(actor_id.to_string());
        self
    }

    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, stored: &StoredAuditEvent) -> bool {
        let event = &stored.event;
        self.actor_id
            .as_ref()
            .is_none_or(|actor| event.actor_id.as_ref() == Some(actor))
            && self.action.is_none_or(|action| event.action == action)
            && self
                .resource
                .as_ref()
                .is_none_or(|resource| &event.resource == resource)
            && self
                .request_id
                .as_ref()
                .is_none_or(|id| event.request_id.as_ref() == Some(id))
    }
}

/// Append-only in-process store.
///
/// The API has no mutation or removal methods beyond `insert`.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    events: Mutex<Vec<StoredAuditEvent>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every stored event, oldest first.
    pub fn events(&self) -> Vec<StoredAuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns stored events matching `query`, oldest first.
    pub fn query(&self, query: &AuditQuery) -> Vec<StoredAuditEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events
            .iter()
            .filter(|stored| query.matches(stored))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

impl AuditStore for MemoryAuditStore {
    fn insert(&self, event: AuditEvent) -> Result<StoredAuditEvent> {
        let stored = StoredAuditEvent::assign(event);
        let mut events = self
            .events
            .lock()
            .map_err(|_| AuditError::Unavailable("memory store lock poisoned".to_string()))?;

        let count_before = events.len();
        events.push(stored.clone());
        debug_assert_eq!(events.len(), count_before + 1);

        Ok(stored)
    }
}

// ---------------------------------------------------------------------------
// JSON-lines file store
// ---------------------------------------------------------------------------

/// Append-only file store, one JSON object per line.
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditStore {
    /// Opens `path` for appending, creating it and its parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be created or opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every event stored at `path`, oldest first.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors and on lines that are not stored events.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<StoredAuditEvent>> {
        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }
}

impl AuditStore for JsonlAuditStore {
    fn insert(&self, event: AuditEvent) -> Result<StoredAuditEvent> {
        let stored = StoredAuditEvent::assign(event);
        let mut line = serde_json::to_vec(&stored)?;
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| AuditError::Unavailable("audit file lock poisoned".to_string()))?;
        file.write_all(&line)?;
        file.sync_data()?;

        Ok(stored)
    }
}

//! Best-effort audit records for department mutations.
//!
//! Entries are queued on an unbounded channel and written by a background
//! task. Queueing never blocks or fails the caller; sink errors are only
//! logged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Audit sink errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode audit entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Old and new value of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry for a department action.
    pub fn department(action: &str, entity_id: Uuid, user_id: Uuid) -> Self {
        Self {
            action: action.to_string(),
            entity_type: "department".to_string(),
            entity_id,
            user_id,
            changes: Vec::new(),
            metadata: Value::Null,
            at: Utc::now(),
        }
    }

    pub fn with_changes(mut self, changes: Vec<FieldChange>) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync + 'static {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Writes entries as structured events on the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let body = serde_json::to_string(entry)?;
        info!(
            target: "audit",
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            user_id = %entry.user_id,
            "{body}"
        );
        Ok(())
    }
}

/// Handle used by the service to queue audit entries.
#[derive(Debug, Clone)]
pub struct AuditLog {
    tx: Option<mpsc::UnboundedSender<AuditEntry>>,
}

impl AuditLog {
    /// Start the background writer. The task ends once every handle is dropped.
    pub fn spawn(sink: Arc<dyn AuditSink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();
        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = sink.record(&entry) {
                    warn!(
                        "Audit write failed for {} {} ({}): {e}",
                        entry.entity_type, entry.entity_id, entry.action
                    );
                }
            }
            debug!("Audit writer stopped");
        });
        (Self { tx: Some(tx) }, handle)
    }

    /// Handle that discards every entry.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue an entry. Never blocks and never reports failure.
    pub fn emit(&self, entry: AuditEntry) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(entry).is_err() {
            warn!("Audit writer is gone; entry dropped");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that keeps entries in memory.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub entries: Mutex<Vec<AuditEntry>>,
    }

    impl AuditSink for MemorySink {
        fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    /// Sink that always fails.
    pub(crate) struct FailingSink;

    impl AuditSink for FailingSink {
        fn record(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
            Err(AuditError::Unavailable("sink offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_entries_reach_sink() {
        let sink = Arc::new(MemorySink::default());
        let (log, handle) = AuditLog::spawn(sink.clone());

        log.emit(AuditEntry::department("department.update", Uuid::from_u128(1), Uuid::from_u128(2)));
        drop(log);
        handle.await.unwrap();

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, "department");
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_writer() {
        let (log, handle) = AuditLog::spawn(Arc::new(FailingSink));
        log.emit(AuditEntry::department("a", Uuid::nil(), Uuid::nil()));
        log.emit(AuditEntry::department("b", Uuid::nil(), Uuid::nil()));
        drop(log);
        assert!(handle.await.is_ok());
    }

    #[test]
    fn test_disabled_log_discards() {
        AuditLog::disabled().emit(AuditEntry::department("a", Uuid::nil(), Uuid::nil()));
    }

    #[test]
    fn test_entry_serialization_skips_empty() {
        let entry = AuditEntry::department("department.delete", Uuid::nil(), Uuid::nil())
            .with_metadata(serde_json::json!({ "name": "Ops" }));
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("changes").is_none());
        assert_eq!(json["metadata"]["name"], "Ops");
        assert_eq!(json["entityType"], "department");
    }
}

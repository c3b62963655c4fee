//! Durable, append-only audit trail of pipeline runs.
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use switchblade_common::models::{HistoryRecord, Outcome};
use switchblade_error::{ErrorCode, ErrorContext, Result, SwitchbladeError};
use uuid::Uuid;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

/// Record store addressed by `(user_id, message_id)`.
pub trait HistoryStore: Send + Sync {
    /// Create tables if they don't exist
    fn init(&self) -> BoxFuture<'_, Result<()>>;

    /// Insert a new record. Records are never updated afterwards.
    fn insert<'a>(&'a self, record: &'a HistoryRecord) -> BoxFuture<'a, Result<()>>;

    /// Newest-first records of one user
    fn list_for_user<'a>(
        &'a self,
        user_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<HistoryRecord>>>;
}

/// What happened to the audit write of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HistoryWrite {
    Recorded { message_id: Uuid },
    /// No user id, so there is no key to record under.
    Skipped { reason: String },
    Failed { error: SwitchbladeError },
}

impl HistoryWrite {
    pub fn is_recorded(&self) -> bool {
        matches!(self, HistoryWrite::Recorded { .. })
    }
}

#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn HistoryStore>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Persist one outcome. Any failure comes back as `HistoryWriteFailed`.
    pub async fn record(
        &self,
        user_id: &str,
        question: &str,
        outcome: &Outcome,
    ) -> Result<HistoryRecord> {
        let record = HistoryRecord::from_outcome(user_id, question, outcome).map_err(|e| {
            SwitchbladeError::history_write_failed(format!(
                "Failed to build history record: {}",
                e.message
            ))
        })?;

        self.store.insert(&record).await.map_err(|e| {
            let message = if e.code == ErrorCode::HistoryWriteFailed {
                e.message
            } else {
                format!("Failed to write history record: {}", e.message)
            };
            SwitchbladeError::history_write_failed(message).with_context(ErrorContext::History {
                user_id: user_id.to_string(),
                message_id: Some(record.message_id.to_string()),
            })
        })?;

        Ok(record)
    }

    pub async fn list(&self, user_id: &str, limit: u32) -> Result<Vec<HistoryRecord>> {
        self.store.list_for_user(user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchblade_common::models::{GeneratedSql, HistoryStatus, ResultSet};

    struct BrokenStore;

    impl HistoryStore for BrokenStore {
        fn init(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn insert<'a>(&'a self, _record: &'a HistoryRecord) -> BoxFuture<'a, Result<()>> {
            Box::pin(async {
                Err(SwitchbladeError::new(
                    ErrorCode::Unknown,
                    "connection refused",
                ))
            })
        }

        fn list_for_user<'a>(
            &'a self,
            _user_id: &'a str,
            _limit: u32,
        ) -> BoxFuture<'a, Result<Vec<HistoryRecord>>> {
            Box::pin(async { Ok(vec![]) })
        }
    }

    #[tokio::test]
    async fn test_record_success_and_error_outcomes() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let recorder = HistoryRecorder::new(store.clone());

        let completed = Outcome::completed(
            GeneratedSql {
                sql: "SELECT 1".into(),
                explanation: None,
            },
            ResultSet::default(),
        );
        let failed = Outcome::failed(&SwitchbladeError::translation_failed("down"));

        let a = recorder.record("u1", "q1", &completed).await.unwrap();
        let b = recorder.record("u1", "q2", &failed).await.unwrap();
        assert_ne!(a.message_id, b.message_id);

        let records = recorder.list("u1", 10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, HistoryStatus::Error);
        assert_eq!(records[1].status, HistoryStatus::Completed);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_history_write_failed() {
        let recorder = HistoryRecorder::new(Arc::new(BrokenStore));
        let outcome = Outcome::failed(&SwitchbladeError::translation_failed("down"));
        let err = recorder.record("u1", "q", &outcome).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::HistoryWriteFailed);
        assert!(err.message.contains("connection refused"));
        assert!(matches!(err.context, Some(ErrorContext::History { .. })));
    }
}

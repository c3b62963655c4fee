use super::HistoryStore;
use futures::future::BoxFuture;
use std::sync::Mutex;
use switchblade_common::models::HistoryRecord;
use switchblade_error::{Result, SwitchbladeError};

/// Process-local store, for embedding and tests.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record in insertion order.
    pub fn snapshot(&self) -> Vec<HistoryRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn init(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn insert<'a>(&'a self, record: &'a HistoryRecord) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut records = self
                .records
                .lock()
                .map_err(|_| SwitchbladeError::history_write_failed("History lock poisoned"))?;
            if records.iter().any(|r| {
                r.user_id == record.user_id && r.message_id == record.message_id
            }) {
                return Err(SwitchbladeError::history_write_failed(format!(
                    "Message {} already recorded",
                    record.message_id
                )));
            }
            records.push(record.clone());
            Ok(())
        })
    }

    fn list_for_user<'a>(
        &'a self,
        user_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<HistoryRecord>>> {
        Box::pin(async move {
            let records = self.records.lock().map_err(|_| {
                SwitchbladeError::new(
                    switchblade_error::ErrorCode::HistoryReadFailed,
                    "History lock poisoned",
                )
            })?;
            Ok(records
                .iter()
                .rev()
                .filter(|r| r.user_id == user_id)
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }
}

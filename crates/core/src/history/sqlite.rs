use super::HistoryStore;
use chrono::DateTime;
use futures::future::BoxFuture;
use rusqlite::{params, Connection, Row};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use switchblade_common::models::{HistoryRecord, HistoryStatus};
use switchblade_error::{ErrorCode, Result, SwitchbladeError};
use uuid::Uuid;

pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SwitchbladeError::history_write_failed(format!(
                        "Failed to create history directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }
        let conn = Connection::open(&path).map_err(|e| {
            SwitchbladeError::history_write_failed(format!(
                "Failed to open history database {:?}: {}",
                path, e
            ))
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn read_failed(message: impl Into<String>) -> SwitchbladeError {
    SwitchbladeError::new(ErrorCode::HistoryReadFailed, message)
}

fn lock_poisoned() -> SwitchbladeError {
    SwitchbladeError::history_write_failed("SQLite connection lock poisoned")
}

fn join_failed(err: tokio::task::JoinError) -> SwitchbladeError {
    SwitchbladeError::new(
        ErrorCode::Unknown,
        format!("History task failed to complete: {}", err),
    )
}

struct StoredRow {
    message_id: String,
    user_id: String,
    question: String,
    answer: Option<String>,
    status: String,
    error: Option<String>,
    timestamp_ms: i64,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            message_id: row.get("message_id")?,
            user_id: row.get("user_id")?,
            question: row.get("question")?,
            answer: row.get("answer")?,
            status: row.get("status")?,
            error: row.get("error")?,
            timestamp_ms: row.get("timestamp_ms")?,
        })
    }

    fn into_record(self) -> Result<HistoryRecord> {
        let message_id = Uuid::parse_str(&self.message_id)
            .map_err(|e| read_failed(format!("Bad message id '{}': {}", self.message_id, e)))?;
        let status: HistoryStatus = self.status.parse().map_err(read_failed)?;
        let timestamp = DateTime::from_timestamp_millis(self.timestamp_ms)
            .ok_or_else(|| read_failed(format!("Bad timestamp {}", self.timestamp_ms)))?;
        Ok(HistoryRecord {
            message_id,
            user_id: self.user_id,
            question: self.question,
            answer_payload: self.answer,
            status,
            error_detail: self.error,
            timestamp,
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn init(&self) -> BoxFuture<'_, Result<()>> {
        let conn = self.conn.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().map_err(|_| lock_poisoned())?;
                let schema_v1 = include_str!("../../migrations/sqlite/001_chat_history.sql");
                conn.execute_batch(schema_v1).map_err(|e| {
                    SwitchbladeError::history_write_failed(format!(
                        "Failed to execute history schema: {}",
                        e
                    ))
                })?;
                Ok(())
            })
            .await
            .map_err(join_failed)?
        })
    }

    fn insert<'a>(&'a self, record: &'a HistoryRecord) -> BoxFuture<'a, Result<()>> {
        let conn = self.conn.clone();
        let record = record.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().map_err(|_| lock_poisoned())?;
                conn.execute(
                    "INSERT INTO chat_history
                        (user_id, message_id, question, answer, status, error, timestamp_ms)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    params![
                        record.user_id,
                        record.message_id.to_string(),
                        record.question,
                        record.answer_payload,
                        record.status.as_str(),
                        record.error_detail,
                        record.timestamp.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(join_failed)?
        })
    }

    fn list_for_user<'a>(
        &'a self,
        user_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<HistoryRecord>>> {
        let conn = self.conn.clone();
        let user_id = user_id.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().map_err(|_| lock_poisoned())?;
                let mut stmt = conn
                    .prepare(
                        "SELECT message_id, user_id, question, answer, status, error, timestamp_ms
                         FROM chat_history
                         WHERE user_id = ?
                         ORDER BY timestamp_ms DESC, rowid DESC
                         LIMIT ?",
                    )
                    .map_err(|e| read_failed(e.to_string()))?;
                let rows = stmt
                    .query_map(params![user_id, limit], StoredRow::from_row)
                    .map_err(|e| read_failed(e.to_string()))?;

                let mut records = Vec::new();
                for row in rows {
                    let row = row.map_err(|e| read_failed(e.to_string()))?;
                    records.push(row.into_record()?);
                }
                Ok(records)
            })
            .await
            .map_err(join_failed)?
        })
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use switchblade_error::{ErrorCode, ErrorContext, SwitchbladeError};
use uuid::Uuid;

/// One incoming question, fixed at entry and never mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    request_id: Uuid,
    user_id: String,
    question: String,
    submitted_at: DateTime<Utc>,
}

impl QueryRequest {
    pub fn new(user_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: user_id.into(),
            question: question.into(),
            submitted_at: Utc::now(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// The user id, if one was supplied. Blank ids count as missing.
    pub fn history_key(&self) -> Option<&str> {
        let trimmed = self.user_id.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Fails with `InvalidInput` when either the question or the user id is blank.
    pub fn validate(&self) -> switchblade_error::Result<()> {
        if self.history_key().is_none() {
            return Err(SwitchbladeError::invalid_input("userId is required")
                .with_context(ErrorContext::Input {
                    field: "userId".to_string(),
                }));
        }
        if self.question.trim().is_empty() {
            return Err(SwitchbladeError::invalid_input("question is required")
                .with_context(ErrorContext::Input {
                    field: "question".to_string(),
                })
                .with_hint("Ask a question about your data, e.g. 'total revenue per product'"));
        }
        Ok(())
    }
}

/// Caller payload for a query; missing fields become blank and are rejected by validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPayload {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

impl From<QueryPayload> for QueryRequest {
    fn from(payload: QueryPayload) -> Self {
        QueryRequest::new(
            payload.user_id.unwrap_or_default(),
            payload.question.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Normalized tabular result. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ResultSetParts")]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

#[derive(Deserialize)]
struct ResultSetParts {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl TryFrom<ResultSetParts> for ResultSet {
    type Error = SwitchbladeError;

    fn try_from(parts: ResultSetParts) -> Result<Self, Self::Error> {
        ResultSet::new(parts.columns, parts.rows)
    }
}

impl ResultSet {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> switchblade_error::Result<Self> {
        if let Some((row_index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(SwitchbladeError::malformed_result_set(format!(
                "Row {} has {} cells but the header has {} columns",
                row_index,
                row.len(),
                columns.len()
            ))
            .with_context(ErrorContext::ResultShape {
                row_index,
                expected_cells: columns.len(),
                actual_cells: row.len(),
            }));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

/// Result of one pipeline run, independent of whether it was persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Completed {
        sql: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        results: ResultSet,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl Outcome {
    pub fn completed(generated: GeneratedSql, results: ResultSet) -> Self {
        Outcome::Completed {
            sql: generated.sql,
            explanation: generated.explanation,
            results,
        }
    }

    pub fn failed(err: &SwitchbladeError) -> Self {
        Outcome::Error {
            code: err.code,
            message: err.message.clone(),
        }
    }

    pub fn status(&self) -> HistoryStatus {
        match self {
            Outcome::Completed { .. } => HistoryStatus::Completed,
            Outcome::Error { .. } => HistoryStatus::Error,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryStatus {
    Completed,
    Error,
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Completed => "COMPLETED",
            HistoryStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(HistoryStatus::Completed),
            "ERROR" => Ok(HistoryStatus::Error),
            other => Err(format!("Unknown history status: {}", other)),
        }
    }
}

/// Serialized answer stored with a COMPLETED history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub sql: String,
    pub results: ResultSet,
}

/// Append-only audit entry, one per pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub message_id: Uuid,
    pub user_id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_payload: Option<String>,
    pub status: HistoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// Build the record for one outcome with a fresh message id.
    pub fn from_outcome(
        user_id: &str,
        question: &str,
        outcome: &Outcome,
    ) -> switchblade_error::Result<Self> {
        let (answer_payload, error_detail) = match outcome {
            Outcome::Completed { sql, results, .. } => {
                let payload = AnswerPayload {
                    sql: sql.clone(),
                    results: results.clone(),
                };
                (Some(serde_json::to_string(&payload)?), None)
            }
            Outcome::Error { message, .. } => (None, Some(message.clone())),
        };

        Ok(Self {
            message_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            question: question.to_string(),
            answer_payload,
            status: outcome.status(),
            error_detail,
            timestamp: Utc::now(),
        })
    }

    pub fn answer(&self) -> Option<AnswerPayload> {
        self.answer_payload
            .as_deref()
            .and_then(|payload| serde_json::from_str(payload).ok())
    }
}

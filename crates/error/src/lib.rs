//! # switchblade-error
//!
//! Unified error type for the Switchblade natural-language query pipeline.
//!
//! Every failure carries:
//! - A stable numeric code (SWB-XXXX)
//! - An optional structured context for programmatic handling
//! - An optional hint the caller can act on

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchbladeError {
    /// Numeric error code (e.g., "SWB-3003")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Id of the pipeline request this error belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl SwitchbladeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
            request_id: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn translation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TranslationFailed, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExecutionFailed, message)
    }

    pub fn execution_timed_out(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExecutionTimedOut, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    pub fn engine_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EngineUnavailable, message)
    }

    pub fn malformed_result_set(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedResultSet, message)
    }

    pub fn history_write_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::HistoryWriteFailed, message)
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a caller-facing hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Tag the error with the request it occurred in
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Serialize to JSON for API responses
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize SwitchbladeError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for SwitchbladeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for SwitchbladeError {}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SwitchbladeError>;

//! # Error Contexts
//!
//! Structured metadata attached to pipeline errors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for SWB-1001 (InvalidInput)
    Input { field: String },

    /// Context for SWB-2001 and SWB-3005: the remote service that answered
    Upstream {
        service: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Context for SWB-3001/3002/3004
    Execution {
        execution_id: String,
        state: String,
        reason: Option<String>,
    },

    /// Context for SWB-3003 (ExecutionTimedOut)
    PollBudget {
        execution_id: String,
        last_state: String,
        attempts: u32,
        elapsed_ms: u64,
    },

    /// Context for SWB-4001 (MalformedResultSet)
    ResultShape {
        /// Zero-based index of the offending data row
        row_index: usize,
        expected_cells: usize,
        actual_cells: usize,
    },

    /// Context for SWB-5001/5002
    History {
        user_id: String,
        message_id: Option<String>,
    },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following SWB-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Caller input errors
/// - **2000-2999**: Translation errors
/// - **3000-3999**: Query engine errors
/// - **4000-4999**: Result shape errors
/// - **5000-5999**: History store errors
/// - **9000-9999**: Internal errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    /// SWB-1001: question or user id missing
    InvalidInput = 1001,
    /// SWB-1002: caller payload could not be parsed
    InvalidRequestBody = 1002,

    /// SWB-2001: the NL-to-SQL service failed or returned no SQL
    TranslationFailed = 2001,

    /// SWB-3001: the engine reported FAILED
    ExecutionFailed = 3001,
    /// SWB-3002: the engine reported CANCELLED
    ExecutionCancelled = 3002,
    /// SWB-3003: poll budget exhausted before a terminal state
    ExecutionTimedOut = 3003,
    /// SWB-3004: operation not valid for the execution's current state
    InvalidState = 3004,
    /// SWB-3005: engine unreachable or answered with an unexpected payload
    EngineUnavailable = 3005,

    /// SWB-4001: header/row shape mismatch in the engine payload
    MalformedResultSet = 4001,

    /// SWB-5001: history record could not be persisted
    HistoryWriteFailed = 5001,
    /// SWB-5002: history records could not be read
    HistoryReadFailed = 5002,

    /// SWB-9001: serialization/deserialization failed
    SerializationFailed = 9001,
    /// SWB-9999: unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Formatted code string (e.g., "SWB-3003")
    pub fn as_str(&self) -> String {
        format!("SWB-{:04}", self.as_u16())
    }

    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Input,
            2000..=2999 => ErrorCategory::Translation,
            3000..=3999 => ErrorCategory::Execution,
            4000..=4999 => ErrorCategory::Result,
            5000..=5999 => ErrorCategory::History,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("SWB-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::InvalidInput),
            1002 => Ok(Self::InvalidRequestBody),
            2001 => Ok(Self::TranslationFailed),
            3001 => Ok(Self::ExecutionFailed),
            3002 => Ok(Self::ExecutionCancelled),
            3003 => Ok(Self::ExecutionTimedOut),
            3004 => Ok(Self::InvalidState),
            3005 => Ok(Self::EngineUnavailable),
            4001 => Ok(Self::MalformedResultSet),
            5001 => Ok(Self::HistoryWriteFailed),
            5002 => Ok(Self::HistoryReadFailed),
            9001 => Ok(Self::SerializationFailed),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// Pipeline stage an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Input,
    Translation,
    Execution,
    Result,
    History,
    Internal,
}

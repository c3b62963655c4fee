use crate::{ErrorCode, SwitchbladeError};

impl From<serde_json::Error> for SwitchbladeError {
    fn from(err: serde_json::Error) -> Self {
        SwitchbladeError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<rusqlite::Error> for SwitchbladeError {
    fn from(err: rusqlite::Error) -> Self {
        SwitchbladeError::new(ErrorCode::HistoryWriteFailed, err.to_string())
    }
}

impl From<std::io::Error> for SwitchbladeError {
    fn from(err: std::io::Error) -> Self {
        SwitchbladeError::new(ErrorCode::Unknown, err.to_string())
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Duplicate,
    Conflict,
    InvalidArgument,
    RemoteUnavailable,
    RemoteWriteFailed,
    Internal,
}

/// Wire form of an error, as returned by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors raised by the scheduling core and the sync gateway.
///
/// The first four variants are validation failures surfaced before any ledger
/// mutation; the remote variants describe sync outcomes (`RemoteUnavailable`
/// short-circuits to local-only mode, `RemoteWriteFailed` triggers a full
/// resync).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate name: {0}")]
    Duplicate(String),
    #[error("date conflict: {0}")]
    Conflict(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("remote write failed: {0}")]
    RemoteWriteFailed(String),
}

impl ScheduleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ScheduleError::NotFound(_) => ErrorCode::NotFound,
            ScheduleError::Duplicate(_) => ErrorCode::Duplicate,
            ScheduleError::Conflict(_) => ErrorCode::Conflict,
            ScheduleError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ScheduleError::RemoteUnavailable(_) => ErrorCode::RemoteUnavailable,
            ScheduleError::RemoteWriteFailed(_) => ErrorCode::RemoteWriteFailed,
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}

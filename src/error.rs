use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Error codes surfaced to callers inside structured error envelopes.
///
/// All of these are local, recoverable conditions; none should abort the
/// process. Store corruption is intentionally absent here because the job
/// store recovers from it silently (see `job_store::JobStore::load`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    AlreadyCompleted,
    NotReady,
    InvalidInput,
    DuplicateId,
    Io,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub code: ErrorCode,
    pub message: String,
}

impl ScanError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(job_id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("Job '{job_id}' not found"))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for ScanError {}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, err.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCode::InvalidInput, err.to_string())
    }
}

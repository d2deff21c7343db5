// SPDX-License-Identifier: GPL-3.0-or-later

use tracing::warn;

use crate::engine::NativeEngine;
use crate::guard::Guarded;
use crate::{Result, SearchError};

/// Typed view of the engine's integer status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    DeadlineExceeded,
    ConnectionError,
    InvalidInput,
    NotFound,
    InternalError,
    NotInitialized,
    Unauthenticated,
    LookupFailed,
    Other(i32),
}

impl StatusCode {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => StatusCode::Ok,
            1 => StatusCode::DeadlineExceeded,
            2 => StatusCode::ConnectionError,
            3 => StatusCode::InvalidInput,
            4 => StatusCode::NotFound,
            5 => StatusCode::InternalError,
            6 => StatusCode::NotInitialized,
            7 => StatusCode::Unauthenticated,
            8 => StatusCode::LookupFailed,
            other => StatusCode::Other(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::DeadlineExceeded => 1,
            StatusCode::ConnectionError => 2,
            StatusCode::InvalidInput => 3,
            StatusCode::NotFound => 4,
            StatusCode::InternalError => 5,
            StatusCode::NotInitialized => 6,
            StatusCode::Unauthenticated => 7,
            StatusCode::LookupFailed => 8,
            StatusCode::Other(raw) => raw,
        }
    }

    /// Transport failures that may clear up on a later attempt.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            StatusCode::DeadlineExceeded | StatusCode::ConnectionError
        )
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Ok => write!(f, "ok"),
            StatusCode::DeadlineExceeded => write!(f, "deadline exceeded"),
            StatusCode::ConnectionError => write!(f, "connection error"),
            StatusCode::InvalidInput => write!(f, "invalid input"),
            StatusCode::NotFound => write!(f, "not found"),
            StatusCode::InternalError => write!(f, "internal error"),
            StatusCode::NotInitialized => write!(f, "not initialized"),
            StatusCode::Unauthenticated => write!(f, "unauthenticated"),
            StatusCode::LookupFailed => write!(f, "lookup failed"),
            StatusCode::Other(raw) => write!(f, "status {}", raw),
        }
    }
}

/// Outcome reported by a native call: a code and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    pub(crate) fn into_init_error(self) -> SearchError {
        SearchError::Init {
            code: self.code,
            message: self.message,
        }
    }
}

/// Read the status object a native call just wrote and turn a failure into
/// [`SearchError::Status`].
pub(crate) fn check(engine: &dyn NativeEngine, status: &Guarded<'_>) -> Result<()> {
    let status = engine.status(status.handle());
    if status.is_ok() {
        return Ok(());
    }

    warn!(target: "engine", code = %status.code, "native call failed: {}", status.message);
    Err(SearchError::Status {
        code: status.code,
        message: status.message,
    })
}

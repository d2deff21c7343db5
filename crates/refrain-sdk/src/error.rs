// SPDX-License-Identifier: GPL-3.0-or-later

use refrain_domain::DomainError;
use thiserror::Error;

use crate::engine::ResourceKind;
use crate::status::StatusCode;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Engine bootstrap rejected the credentials or failed internally.
    #[error("Engine initialization failed ({code}): {message}")]
    Init { code: StatusCode, message: String },

    /// A native allocation returned a null handle.
    #[error("Out of memory allocating {0}")]
    OutOfMemory(ResourceKind),

    /// A native call completed but reported a non-OK status.
    #[error("Engine error ({code}): {message}")]
    Status { code: StatusCode, message: String },

    #[error("Invalid search request: {0}")]
    ProtocolMisuse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SearchError {
    /// Native status code carried by the error, if any.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            SearchError::Init { code, .. } | SearchError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Status { code, .. } => code.is_retryable(),
            _ => false,
        }
    }
}

impl From<DomainError> for SearchError {
    fn from(err: DomainError) -> Self {
        SearchError::ProtocolMisuse(err.to_string())
    }
}

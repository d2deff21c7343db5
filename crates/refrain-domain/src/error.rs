// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Unknown client type: {0}")]
    UnknownClientType(i32),

    #[error("Fingerprint I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

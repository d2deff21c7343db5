// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{DomainError, Result};

/// Audio fingerprint as produced by the engine's fingerprinter.
///
/// The bytes are opaque to this library: they are extracted elsewhere and
/// handed to the engine unchanged when a search is submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fingerprint {
    bytes: Vec<u8>,
}

impl Fingerprint {
    /// Wrap raw fingerprint bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Read a previously saved fingerprint from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::from_bytes(bytes))
    }

    /// Persist the fingerprint bytes so a search can be repeated later
    /// without re-fingerprinting the media.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.bytes)?;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Validate the fingerprint before it is submitted.
    ///
    /// The engine rejects empty buffers only after a network round trip, so
    /// an empty fingerprint is refused here.
    pub fn validate(&self) -> Result<()> {
        if self.bytes.is_empty() {
            return Err(DomainError::InvalidFingerprint(
                "fingerprint bytes are empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl From<Vec<u8>> for Fingerprint {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

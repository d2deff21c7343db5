// SPDX-License-Identifier: GPL-3.0-or-later

//! Value types shared by the search client and its configuration.

pub mod error;
pub mod fingerprint;

pub use error::{DomainError, Result};
pub use fingerprint::Fingerprint;

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

// ============================================================================
// Credentials
// ============================================================================

/// Client credential pair issued by the search service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Engine enumerations
// ============================================================================

/// Kind of search session a client is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// Searches the caller's own private catalog.
    PrivateSearch,
    /// Searches the shared catalog.
    #[default]
    PexSearch,
}

impl ClientType {
    pub fn as_raw(self) -> i32 {
        match self {
            ClientType::PrivateSearch => 0,
            ClientType::PexSearch => 1,
        }
    }
}

impl TryFrom<i32> for ClientType {
    type Error = DomainError;

    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(ClientType::PrivateSearch),
            1 => Ok(ClientType::PexSearch),
            other => Err(DomainError::UnknownClientType(other)),
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientType::PrivateSearch => write!(f, "private_search"),
            ClientType::PexSearch => write!(f, "pex_search"),
        }
    }
}

/// Narrows how the engine matches a submitted fingerprint or ISRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Default,
    IdentifyMusic,
    FindMatches,
}

impl SearchMode {
    pub fn as_raw(self) -> i32 {
        match self {
            SearchMode::Default => 0,
            SearchMode::IdentifyMusic => 1,
            SearchMode::FindMatches => 2,
        }
    }
}

/// Media component a match can be based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Video,
    Audio,
    Melody,
}

impl MatchType {
    pub const ALL: [MatchType; 3] = [MatchType::Video, MatchType::Audio, MatchType::Melody];

    pub fn bit(self) -> u32 {
        match self {
            MatchType::Video => 1,
            MatchType::Audio => 2,
            MatchType::Melody => 4,
        }
    }
}

/// Bit mask of [`MatchType`]s in the engine's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatchTypes(u32);

impl MatchTypes {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::from_types(&MatchType::ALL)
    }

    /// Fold a list of match types into the mask the engine expects.
    pub fn from_types(types: &[MatchType]) -> Self {
        Self(types.iter().fold(0, |mask, t| mask | t.bit()))
    }

    pub fn contains(self, t: MatchType) -> bool {
        self.0 & t.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<MatchType> for MatchTypes {
    fn from(t: MatchType) -> Self {
        Self(t.bit())
    }
}

impl BitOr for MatchTypes {
    type Output = MatchTypes;

    fn bitor(self, rhs: MatchTypes) -> MatchTypes {
        MatchTypes(self.0 | rhs.0)
    }
}

impl BitOr<MatchType> for MatchTypes {
    type Output = MatchTypes;

    fn bitor(self, rhs: MatchType) -> MatchTypes {
        MatchTypes(self.0 | rhs.bit())
    }
}

impl BitOr for MatchType {
    type Output = MatchTypes;

    fn bitor(self, rhs: MatchType) -> MatchTypes {
        MatchTypes(self.bit() | rhs.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_type_raw_roundtrip() {
        assert_eq!(ClientType::PrivateSearch.as_raw(), 0);
        assert_eq!(ClientType::PexSearch.as_raw(), 1);
        assert_eq!(ClientType::try_from(1).unwrap(), ClientType::PexSearch);
        assert!(matches!(
            ClientType::try_from(9),
            Err(DomainError::UnknownClientType(9))
        ));
    }

    #[test]
    fn match_types_mask_from_list() {
        let mask = MatchTypes::from_types(&[MatchType::Audio, MatchType::Melody]);
        assert_eq!(mask.bits(), 6);
        assert!(mask.contains(MatchType::Audio));
        assert!(!mask.contains(MatchType::Video));

        assert_eq!(MatchTypes::all().bits(), 7);
        assert!(MatchTypes::from_types(&[]).is_empty());
    }

    #[test]
    fn match_types_bitor() {
        let mask = MatchType::Video | MatchType::Audio;
        assert_eq!(mask.bits(), 3);
        assert_eq!((mask | MatchType::Melody), MatchTypes::all());
    }

    #[test]
    fn duplicate_types_collapse() {
        let mask = MatchTypes::from_types(&[MatchType::Audio, MatchType::Audio]);
        assert_eq!(mask, MatchTypes::from(MatchType::Audio));
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = Credentials::new("abc", "xyz");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("abc"));
        assert!(!rendered.contains("xyz"));
    }

    #[test]
    fn search_mode_serde_names() {
        let mode: SearchMode = serde_json::from_str("\"identify_music\"").unwrap();
        assert_eq!(mode, SearchMode::IdentifyMusic);
        assert_eq!(SearchMode::FindMatches.as_raw(), 2);
    }
}

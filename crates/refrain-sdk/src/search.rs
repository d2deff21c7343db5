// SPDX-License-Identifier: GPL-3.0-or-later

//! Two-phase search: submit a request, then poll its lookup IDs.
//!
//! ```no_run
//! # use refrain_sdk::{Client, SearchRequest};
//! # use refrain_domain::{Fingerprint, MatchTypes, SearchMode};
//! # fn example(client: &Client) -> refrain_sdk::Result<()> {
//! let fp = Fingerprint::from_bytes(std::fs::read("track.fp").unwrap_or_default());
//! let request = SearchRequest::fingerprint(fp, MatchTypes::all(), SearchMode::IdentifyMusic);
//!
//! let pending = client.start_search(&request)?;
//! let result = pending.get()?;
//! let payload = result.to_value()?;
//! # Ok(())
//! # }
//! ```

use refrain_config::SearchConfig;
use refrain_domain::{Fingerprint, MatchTypes, SearchMode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::Client;
use crate::engine::{c_string, ResourceKind};
use crate::guard::Guarded;
use crate::status;
use crate::{Result, SearchError};

/// A search submission. Exactly one variant is live per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    /// Search the shared catalog by fingerprint.
    Fingerprint {
        fingerprint: Fingerprint,
        match_types: MatchTypes,
        mode: SearchMode,
    },
    /// Search the shared catalog by ISRC code.
    Isrc {
        isrc: String,
        match_types: MatchTypes,
        mode: SearchMode,
    },
    /// Search the caller's private catalog by fingerprint.
    Private { fingerprint: Fingerprint },
}

impl SearchRequest {
    pub fn fingerprint(fingerprint: Fingerprint, match_types: MatchTypes, mode: SearchMode) -> Self {
        SearchRequest::Fingerprint {
            fingerprint,
            match_types,
            mode,
        }
    }

    pub fn isrc(isrc: impl Into<String>, match_types: MatchTypes, mode: SearchMode) -> Self {
        SearchRequest::Isrc {
            isrc: isrc.into(),
            match_types,
            mode,
        }
    }

    pub fn private(fingerprint: Fingerprint) -> Self {
        SearchRequest::Private { fingerprint }
    }

    /// Fingerprint search using the configured mode and match types.
    pub fn configured_fingerprint(config: &SearchConfig, fingerprint: Fingerprint) -> Self {
        Self::fingerprint(fingerprint, config.match_mask(), config.mode)
    }

    /// ISRC search using the configured mode and match types.
    pub fn configured_isrc(config: &SearchConfig, isrc: impl Into<String>) -> Self {
        Self::isrc(isrc, config.match_mask(), config.mode)
    }

    /// Search mode sent with the request. Private searches never carry one.
    pub fn mode(&self) -> Option<SearchMode> {
        match self {
            SearchRequest::Fingerprint { mode, .. } | SearchRequest::Isrc { mode, .. } => {
                Some(*mode)
            }
            SearchRequest::Private { .. } => None,
        }
    }

    /// Reject requests the engine cannot accept before any native call is made.
    pub fn validate(&self) -> Result<()> {
        match self {
            SearchRequest::Fingerprint { fingerprint, .. }
            | SearchRequest::Private { fingerprint } => fingerprint.validate()?,
            SearchRequest::Isrc { isrc, .. } => {
                if isrc.trim().is_empty() {
                    return Err(SearchError::ProtocolMisuse("ISRC is empty".to_string()));
                }
                c_string(isrc, "ISRC")?;
            }
        }
        Ok(())
    }
}

/// A submitted search waiting to be polled.
///
/// Borrows the client it was started on, so the client outlives it.
#[derive(Debug)]
pub struct PendingSearch<'c> {
    client: &'c Client,
    lookup_ids: Vec<String>,
}

impl<'c> PendingSearch<'c> {
    pub fn client(&self) -> &'c Client {
        self.client
    }

    /// Lookup IDs the engine created for the submission, in emission order.
    pub fn lookup_ids(&self) -> &[String] {
        &self.lookup_ids
    }

    pub fn into_lookup_ids(self) -> Vec<String> {
        self.lookup_ids
    }

    /// Poll the engine once for this search's result.
    pub fn get(&self) -> Result<CheckSearchResult> {
        self.client.check_search(&self.lookup_ids)
    }
}

/// Raw result payload from a poll, tagged with the lookup IDs it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSearchResult {
    json: String,
    lookup_ids: Vec<String>,
}

impl CheckSearchResult {
    pub fn new(json: impl Into<String>, lookup_ids: Vec<String>) -> Self {
        Self {
            json: json.into(),
            lookup_ids,
        }
    }

    /// The payload exactly as the engine returned it.
    pub fn json(&self) -> &str {
        &self.json
    }

    pub fn lookup_ids(&self) -> &[String] {
        &self.lookup_ids
    }

    /// Decode the payload into a caller-defined type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.json)?)
    }

    /// Decode the payload and attach the queried IDs as `lookup_ids` on the
    /// top-level object.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let mut value: serde_json::Value = serde_json::from_str(&self.json)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "lookup_ids".to_string(),
                serde_json::Value::from(self.lookup_ids.clone()),
            );
        }
        Ok(value)
    }
}

impl Client {
    /// Submit a search and collect the lookup IDs the engine created for it.
    ///
    /// # Errors
    /// Returns:
    /// - `ProtocolMisuse` if the request is missing required fields.
    /// - `Status` if attaching the fingerprint or submitting fails.
    /// - `OutOfMemory` if a native allocation fails.
    pub fn start_search(&self, request: &SearchRequest) -> Result<PendingSearch<'_>> {
        request.validate()?;

        let lock = self.engine().lock();
        let engine = lock.engine();

        let start_request = Guarded::acquire(engine, ResourceKind::StartSearchRequest)?;
        let start_result = Guarded::acquire(engine, ResourceKind::StartSearchResult)?;
        let status = Guarded::acquire(engine, ResourceKind::Status)?;
        let mut buffer = None;

        match request {
            SearchRequest::Isrc {
                isrc, match_types, ..
            } => {
                let isrc = c_string(isrc, "ISRC")?;
                engine.set_isrc(start_request.handle(), &isrc, match_types.bits());
            }
            SearchRequest::Fingerprint { fingerprint, .. }
            | SearchRequest::Private { fingerprint } => {
                let buffer: &Guarded<'_> =
                    buffer.insert(Guarded::acquire(engine, ResourceKind::Buffer)?);
                engine.buffer_set(buffer.handle(), fingerprint.as_bytes());
                engine.set_fingerprint(start_request.handle(), buffer.handle(), status.handle());
                status::check(engine, &status)?;
            }
        }

        if let Some(mode) = request.mode() {
            engine.set_type(start_request.handle(), mode.as_raw());
        }

        engine.start_search(
            self.native,
            start_request.handle(),
            start_result.handle(),
            status.handle(),
        );
        status::check(engine, &status)?;

        let mut lookup_ids = Vec::new();
        let mut index = 0;
        while let Some(lookup_id) = engine.next_lookup_id(start_result.handle(), &mut index) {
            lookup_ids.push(lookup_id);
        }

        debug!(target: "search", lookup_ids = lookup_ids.len(), "search started");
        Ok(PendingSearch {
            client: self,
            lookup_ids,
        })
    }

    /// Poll the engine for the result of previously started searches.
    ///
    /// May be called repeatedly with the same IDs; completion is reported
    /// inside the payload.
    pub fn check_search(&self, lookup_ids: &[String]) -> Result<CheckSearchResult> {
        let c_lookup_ids = lookup_ids
            .iter()
            .map(|id| c_string(id, "lookup ID"))
            .collect::<Result<Vec<_>>>()?;

        let lock = self.engine().lock();
        let engine = lock.engine();

        let check_request = Guarded::acquire(engine, ResourceKind::CheckSearchRequest)?;
        let check_result = Guarded::acquire(engine, ResourceKind::CheckSearchResult)?;
        let status = Guarded::acquire(engine, ResourceKind::Status)?;

        for lookup_id in &c_lookup_ids {
            engine.add_lookup_id(check_request.handle(), lookup_id);
        }

        engine.check_search(
            self.native,
            check_request.handle(),
            check_result.handle(),
            status.handle(),
        );
        status::check(engine, &status)?;

        let json = engine.result_json(check_result.handle());
        debug!(target: "search", lookup_ids = lookup_ids.len(), bytes = json.len(), "search checked");
        Ok(CheckSearchResult::new(json, lookup_ids.to_vec()))
    }
}

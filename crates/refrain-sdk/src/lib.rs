// SPDX-License-Identifier: GPL-3.0-or-later

//! Client library for audio fingerprint search through the native engine.
//!
//! This crate provides:
//! - A shared [`EngineHandle`] that serializes every call into the engine
//! - [`Client`] sessions bound to a credential pair and a client type
//! - The two-phase search protocol: [`Client::start_search`] returns lookup
//!   IDs, [`Client::check_search`] polls them for a result payload
//!
//! Every engine allocation made by an operation is released before it
//! returns, on success and on every error path.

pub mod client;
pub mod engine;
pub mod error;
mod guard;
#[cfg(feature = "native")]
pub mod native;
pub mod search;
pub mod status;

pub use client::Client;
pub use engine::{EngineHandle, EngineLock, Handle, NativeEngine, ResourceKind};
pub use error::{Result, SearchError};
pub use search::{CheckSearchResult, PendingSearch, SearchRequest};
pub use status::{Status, StatusCode};

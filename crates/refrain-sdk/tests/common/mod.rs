//! Instrumented in-memory engine for exercising the binding layer.
//!
//! Counts every allocation and release per resource class, detects double
//! frees, flags calls made while the engine lock is not held or when the lock
//! is taken twice, and lets tests inject failures at any status-bearing call.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use refrain_sdk::{EngineHandle, Handle, NativeEngine, ResourceKind, Status, StatusCode};
use tracing_subscriber::EnvFilter;

pub const ALL_KINDS: [ResourceKind; 7] = [
    ResourceKind::Status,
    ResourceKind::Client,
    ResourceKind::StartSearchRequest,
    ResourceKind::StartSearchResult,
    ResourceKind::CheckSearchRequest,
    ResourceKind::CheckSearchResult,
    ResourceKind::Buffer,
];

/// Install a test-writer subscriber; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Failures to inject, as (code, message) pairs.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub init: Option<(StatusCode, String)>,
    pub client_init: Option<(StatusCode, String)>,
    pub set_fingerprint: Option<(StatusCode, String)>,
    pub start_search: Option<(StatusCode, String)>,
    pub check_search: Option<(StatusCode, String)>,
    pub alloc: Option<ResourceKind>,
}

/// What the engine was asked to search for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submitted {
    pub isrc: Option<String>,
    pub match_types: Option<u32>,
    pub fingerprint: Option<Vec<u8>>,
    pub mode: Option<i32>,
}

#[derive(Default)]
struct FakeState {
    faults: Faults,
    lookup_ids: Vec<String>,
    json: String,

    locked: bool,
    reentrant_locks: usize,
    unlocked_calls: usize,

    next_handle: usize,
    live: HashMap<Handle, ResourceKind>,
    news: HashMap<ResourceKind, usize>,
    deletes: HashMap<ResourceKind, usize>,
    double_frees: usize,

    inits: usize,
    cleanups: usize,
    client_types: Vec<i32>,

    statuses: HashMap<Handle, Status>,
    buffers: HashMap<Handle, Vec<u8>>,
    requests: HashMap<Handle, Submitted>,
    results: HashMap<Handle, Vec<String>>,
    check_requests: HashMap<Handle, Vec<String>>,
    check_results: HashMap<Handle, String>,

    submitted: Vec<Submitted>,
    checked: Vec<Vec<String>>,
}

impl FakeState {
    fn require_lock(&mut self) {
        if !self.locked {
            self.unlocked_calls += 1;
        }
    }

    fn report(&mut self, status: Handle, fault: &Option<(StatusCode, String)>) {
        let reported = match fault {
            Some((code, message)) => Status::new(*code, message.clone()),
            None => Status::ok(),
        };
        self.statuses.insert(status, reported);
    }
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self::default())
    }

    /// Engine handle driving this fake.
    pub fn handle(self: &Arc<Self>) -> Arc<EngineHandle> {
        EngineHandle::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_faults(&self, faults: Faults) {
        self.state().faults = faults;
    }

    pub fn set_lookup_ids(&self, ids: &[&str]) {
        self.state().lookup_ids = ids.iter().map(|id| id.to_string()).collect();
    }

    pub fn set_json(&self, json: &str) {
        self.state().json = json.to_string();
    }

    pub fn news(&self, kind: ResourceKind) -> usize {
        self.state().news.get(&kind).copied().unwrap_or(0)
    }

    pub fn deletes(&self, kind: ResourceKind) -> usize {
        self.state().deletes.get(&kind).copied().unwrap_or(0)
    }

    pub fn live(&self, kind: ResourceKind) -> usize {
        self.state().live.values().filter(|k| **k == kind).count()
    }

    /// Every class freed as often as allocated, and nothing freed twice.
    pub fn assert_balanced(&self) {
        for kind in ALL_KINDS {
            assert_eq!(
                self.news(kind),
                self.deletes(kind),
                "unbalanced {} allocations",
                kind
            );
        }
        assert_eq!(self.double_frees(), 0, "double free detected");
    }

    pub fn double_frees(&self) -> usize {
        self.state().double_frees
    }

    pub fn lock_violations(&self) -> usize {
        let state = self.state();
        state.reentrant_locks + state.unlocked_calls
    }

    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    pub fn inits(&self) -> usize {
        self.state().inits
    }

    pub fn cleanups(&self) -> usize {
        self.state().cleanups
    }

    pub fn client_types(&self) -> Vec<i32> {
        self.state().client_types.clone()
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.state().submitted.clone()
    }

    pub fn checked(&self) -> Vec<Vec<String>> {
        self.state().checked.clone()
    }
}

fn lossy(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

impl NativeEngine for FakeEngine {
    fn init(&self, _client_id: &CStr, _client_secret: &CStr) -> Result<(), Status> {
        let mut state = self.state();
        state.inits += 1;
        match &state.faults.init {
            Some((code, message)) => Err(Status::new(*code, message.clone())),
            None => Ok(()),
        }
    }

    fn cleanup(&self) {
        self.state().cleanups += 1;
    }

    fn lock(&self) {
        let mut state = self.state();
        if state.locked {
            state.reentrant_locks += 1;
        }
        state.locked = true;
    }

    fn unlock(&self) {
        let mut state = self.state();
        if !state.locked {
            state.unlocked_calls += 1;
        }
        state.locked = false;
    }

    fn alloc(&self, kind: ResourceKind) -> Option<Handle> {
        let mut state = self.state();
        state.require_lock();
        if state.faults.alloc == Some(kind) {
            return None;
        }

        state.next_handle += 1;
        let handle = Handle::from_raw(state.next_handle)?;
        state.live.insert(handle, kind);
        *state.news.entry(kind).or_insert(0) += 1;
        Some(handle)
    }

    fn free(&self, kind: ResourceKind, handle: Handle) {
        let mut state = self.state();
        state.require_lock();
        match state.live.remove(&handle) {
            Some(live_kind) if live_kind == kind => {
                *state.deletes.entry(kind).or_insert(0) += 1;
            }
            _ => state.double_frees += 1,
        }
    }

    fn status(&self, status: Handle) -> Status {
        let mut state = self.state();
        state.require_lock();
        state.statuses.get(&status).cloned().unwrap_or_else(Status::ok)
    }

    fn client_init(
        &self,
        _client: Handle,
        client_type: i32,
        _client_id: &CStr,
        _client_secret: &CStr,
        status: Handle,
    ) {
        let mut state = self.state();
        state.require_lock();
        state.client_types.push(client_type);
        let fault = state.faults.client_init.clone();
        state.report(status, &fault);
    }

    fn buffer_set(&self, buffer: Handle, bytes: &[u8]) {
        let mut state = self.state();
        state.require_lock();
        state.buffers.insert(buffer, bytes.to_vec());
    }

    fn set_isrc(&self, request: Handle, isrc: &CStr, match_types: u32) {
        let mut state = self.state();
        state.require_lock();
        let entry = state.requests.entry(request).or_default();
        entry.isrc = Some(lossy(isrc));
        entry.match_types = Some(match_types);
    }

    fn set_fingerprint(&self, request: Handle, buffer: Handle, status: Handle) {
        let mut state = self.state();
        state.require_lock();
        let bytes = state.buffers.get(&buffer).cloned();
        state.requests.entry(request).or_default().fingerprint = bytes;
        let fault = state.faults.set_fingerprint.clone();
        state.report(status, &fault);
    }

    fn set_type(&self, request: Handle, mode: i32) {
        let mut state = self.state();
        state.require_lock();
        state.requests.entry(request).or_default().mode = Some(mode);
    }

    fn start_search(&self, _client: Handle, request: Handle, result: Handle, status: Handle) {
        {
            let mut state = self.state();
            state.require_lock();
            let fault = state.faults.start_search.clone();
            state.report(status, &fault);
            if fault.is_none() {
                let submitted = state.requests.get(&request).cloned().unwrap_or_default();
                state.submitted.push(submitted);
                let ids = state.lookup_ids.clone();
                state.results.insert(result, ids);
            }
        }
        // Widen the window in which an unserialized caller would collide.
        std::thread::sleep(Duration::from_millis(2));
    }

    fn next_lookup_id(&self, result: Handle, index: &mut usize) -> Option<String> {
        let mut state = self.state();
        state.require_lock();
        let id = state.results.get(&result)?.get(*index)?.clone();
        *index += 1;
        Some(id)
    }

    fn add_lookup_id(&self, request: Handle, lookup_id: &CStr) {
        let mut state = self.state();
        state.require_lock();
        state
            .check_requests
            .entry(request)
            .or_default()
            .push(lossy(lookup_id));
    }

    fn check_search(&self, _client: Handle, request: Handle, result: Handle, status: Handle) {
        {
            let mut state = self.state();
            state.require_lock();
            let fault = state.faults.check_search.clone();
            state.report(status, &fault);
            if fault.is_none() {
                let ids = state.check_requests.get(&request).cloned().unwrap_or_default();
                state.checked.push(ids);
                let json = state.json.clone();
                state.check_results.insert(result, json);
            }
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    fn result_json(&self, result: Handle) -> String {
        let mut state = self.state();
        state.require_lock();
        state.check_results.get(&result).cloned().unwrap_or_default()
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later

//! Process-wide handle on the native search engine.
//!
//! The engine is not reentrant: every sequence of native calls runs while
//! holding an [`EngineLock`], which serializes callers on a mutex and holds
//! the engine's own lock for as long as the guard lives.

use std::ffi::{CStr, CString};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use refrain_domain::Credentials;
use tracing::debug;

use crate::status::Status;
use crate::{Result, SearchError};

/// Opaque, non-null handle to an object owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    /// `None` for a null handle.
    pub fn from_raw(raw: usize) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Classes of objects the engine allocates on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Status,
    Client,
    StartSearchRequest,
    StartSearchResult,
    CheckSearchRequest,
    CheckSearchResult,
    Buffer,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Status => "status",
            ResourceKind::Client => "client",
            ResourceKind::StartSearchRequest => "start-search request",
            ResourceKind::StartSearchResult => "start-search result",
            ResourceKind::CheckSearchRequest => "check-search request",
            ResourceKind::CheckSearchResult => "check-search result",
            ResourceKind::Buffer => "buffer",
        };
        f.write_str(name)
    }
}

/// Operations the native engine exposes.
///
/// Calls that can fail report through a status handle allocated with
/// [`ResourceKind::Status`]; read it back with [`NativeEngine::status`].
/// Everything except `init` and `cleanup` must be called between `lock` and
/// `unlock`.
pub trait NativeEngine: Send + Sync {
    /// One-time bootstrap with a credential pair.
    fn init(&self, client_id: &CStr, client_secret: &CStr) -> std::result::Result<(), Status>;

    /// Release engine-wide resources.
    fn cleanup(&self);

    fn lock(&self);
    fn unlock(&self);

    /// Allocate an object of the given class. `None` means out of memory.
    fn alloc(&self, kind: ResourceKind) -> Option<Handle>;
    fn free(&self, kind: ResourceKind, handle: Handle);

    fn status(&self, status: Handle) -> Status;

    fn client_init(
        &self,
        client: Handle,
        client_type: i32,
        client_id: &CStr,
        client_secret: &CStr,
        status: Handle,
    );

    fn buffer_set(&self, buffer: Handle, bytes: &[u8]);

    fn set_isrc(&self, request: Handle, isrc: &CStr, match_types: u32);
    fn set_fingerprint(&self, request: Handle, buffer: Handle, status: Handle);
    fn set_type(&self, request: Handle, mode: i32);
    fn start_search(&self, client: Handle, request: Handle, result: Handle, status: Handle);

    /// Yield the lookup ID at `*index` and advance it; `None` once drained.
    fn next_lookup_id(&self, result: Handle, index: &mut usize) -> Option<String>;

    fn add_lookup_id(&self, request: Handle, lookup_id: &CStr);
    fn check_search(&self, client: Handle, request: Handle, result: Handle, status: Handle);
    fn result_json(&self, result: Handle) -> String;
}

#[derive(Debug, Default)]
struct EngineState {
    initialized: bool,
    live_clients: usize,
}

/// Shared entry point to one native engine.
///
/// Cleanup runs without the lock once the last client is released. A client
/// created on the same handle during that window is not protected from it;
/// callers must order the last drop and any new construction.
pub struct EngineHandle {
    engine: Arc<dyn NativeEngine>,
    state: Mutex<EngineState>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn NativeEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            state: Mutex::new(EngineState::default()),
        })
    }

    /// Process-wide handle on the linked engine library, created on first use.
    #[cfg(feature = "native")]
    pub fn native() -> Arc<Self> {
        use std::sync::OnceLock;

        static NATIVE: OnceLock<Arc<EngineHandle>> = OnceLock::new();
        NATIVE
            .get_or_init(|| EngineHandle::new(Arc::new(crate::native::LinkedEngine)))
            .clone()
    }

    /// Bootstrap the engine with a credential pair.
    ///
    /// Serialized against other engine calls, but made without the native
    /// lock: the engine takes it itself while bootstrapping.
    pub fn init(&self, credentials: &Credentials) -> Result<()> {
        let client_id = c_string(&credentials.client_id, "client ID")?;
        let client_secret = c_string(&credentials.client_secret, "client secret")?;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.engine
            .init(&client_id, &client_secret)
            .map_err(Status::into_init_error)?;

        if !state.initialized {
            debug!(target: "engine", "engine initialized");
        }
        state.initialized = true;
        Ok(())
    }

    /// Take the global lock for a sequence of native calls.
    pub fn lock(&self) -> EngineLock<'_> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.engine.lock();
        EngineLock {
            handle: self,
            state,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .initialized
    }

    pub fn live_clients(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live_clients
    }

    /// Release engine-wide resources once no client remains. Runs lock-free.
    pub(crate) fn teardown(&self) {
        self.engine.cleanup();
        debug!(target: "engine", "engine torn down");
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("initialized", &self.is_initialized())
            .field("live_clients", &self.live_clients())
            .finish()
    }
}

/// Scoped hold on the global lock. Releases the native lock, then the mutex,
/// when dropped.
pub struct EngineLock<'e> {
    handle: &'e EngineHandle,
    state: MutexGuard<'e, EngineState>,
}

impl EngineLock<'_> {
    /// The engine, borrowed for no longer than the lock is held.
    ///
    /// ```compile_fail
    /// use refrain_sdk::{EngineHandle, NativeEngine};
    ///
    /// fn outlives_lock(handle: &EngineHandle) -> &dyn NativeEngine {
    ///     let lock = handle.lock();
    ///     lock.engine()
    /// }
    /// ```
    pub fn engine(&self) -> &dyn NativeEngine {
        self.handle.engine.as_ref()
    }

    pub(crate) fn register_client(&mut self) {
        self.state.live_clients += 1;
    }

    /// Returns true when the released client was the last one.
    pub(crate) fn release_client(&mut self) -> bool {
        self.state.live_clients = self.state.live_clients.saturating_sub(1);
        if self.state.live_clients == 0 {
            self.state.initialized = false;
            return true;
        }
        false
    }
}

impl Drop for EngineLock<'_> {
    fn drop(&mut self) {
        self.handle.engine.unlock();
    }
}

pub(crate) fn c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| SearchError::ProtocolMisuse(format!("{} contains a NUL byte", what)))
}

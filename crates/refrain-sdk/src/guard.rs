// SPDX-License-Identifier: GPL-3.0-or-later

use tracing::trace;

use crate::engine::{Handle, NativeEngine, ResourceKind};
use crate::{Result, SearchError};

/// Owns one engine allocation and frees it when dropped.
///
/// The engine reference is borrowed from an
/// [`EngineLock`](crate::engine::EngineLock), so a guard cannot outlive the
/// lock it frees under.
pub(crate) struct Guarded<'e> {
    engine: &'e dyn NativeEngine,
    kind: ResourceKind,
    handle: Handle,
}

impl<'e> Guarded<'e> {
    pub(crate) fn acquire(engine: &'e dyn NativeEngine, kind: ResourceKind) -> Result<Self> {
        let handle = engine.alloc(kind).ok_or(SearchError::OutOfMemory(kind))?;
        trace!(target: "engine", %kind, handle = handle.as_raw(), "acquired");
        Ok(Self {
            engine,
            kind,
            handle,
        })
    }

    pub(crate) fn handle(&self) -> Handle {
        self.handle
    }

    /// Give up ownership without freeing; the caller becomes responsible
    /// for the release.
    pub(crate) fn into_raw(self) -> Handle {
        let handle = self.handle;
        std::mem::forget(self);
        handle
    }
}

impl Drop for Guarded<'_> {
    fn drop(&mut self) {
        self.engine.free(self.kind, self.handle);
        trace!(target: "engine", kind = %self.kind, handle = self.handle.as_raw(), "released");
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use refrain_config::AppConfig;
use refrain_domain::{ClientType, Credentials};
use tracing::debug;

use crate::engine::{c_string, EngineHandle, Handle, ResourceKind};
use crate::guard::Guarded;
use crate::status;
use crate::{Result, SearchError};

/// One authenticated session against the search service.
///
/// Owns exactly one native client handle, destroyed when the `Client` is
/// dropped. The last client dropped on an engine also tears the engine down,
/// after the lock is released; creating a client on the same engine while the
/// last one is being dropped is the caller's ordering responsibility.
pub struct Client {
    engine: Arc<EngineHandle>,
    pub(crate) native: Handle,
    client_type: ClientType,
    credentials: Credentials,
}

impl Client {
    /// Initialize the engine and open a session of the given type.
    ///
    /// # Errors
    /// Returns:
    /// - `Init` if the engine rejects the credentials during bootstrap.
    /// - `Status` if the engine rejects the session.
    /// - `OutOfMemory` if a native allocation fails.
    pub fn new(
        engine: Arc<EngineHandle>,
        client_type: ClientType,
        credentials: Credentials,
    ) -> Result<Self> {
        engine.init(&credentials)?;

        let client_id = c_string(&credentials.client_id, "client ID")?;
        let client_secret = c_string(&credentials.client_secret, "client secret")?;

        let native = {
            let mut lock = engine.lock();
            let native_engine = lock.engine();

            let status = Guarded::acquire(native_engine, ResourceKind::Status)?;
            let client = Guarded::acquire(native_engine, ResourceKind::Client)?;

            native_engine.client_init(
                client.handle(),
                client_type.as_raw(),
                &client_id,
                &client_secret,
                status.handle(),
            );
            // On failure the client guard frees the half-initialized handle.
            status::check(native_engine, &status)?;

            let native = client.into_raw();
            drop(status);
            lock.register_client();
            native
        };

        debug!(target: "client", %client_type, client_id = %credentials.client_id, "client created");
        Ok(Self {
            engine,
            native,
            client_type,
            credentials,
        })
    }

    /// Build a client from loaded configuration.
    pub fn from_config(engine: Arc<EngineHandle>, config: &AppConfig) -> Result<Self> {
        let credentials = config.credentials.credentials().ok_or_else(|| {
            SearchError::Config("client credentials are not configured".to_string())
        })?;
        Self::new(engine, config.search.client_type, credentials)
    }

    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn engine(&self) -> &Arc<EngineHandle> {
        &self.engine
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let last = {
            let mut lock = self.engine.lock();
            lock.engine().free(ResourceKind::Client, self.native);
            lock.release_client()
        };
        debug!(target: "client", client_type = %self.client_type, "client destroyed");

        if last {
            self.engine.teardown();
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_type", &self.client_type)
            .field("credentials", &self.credentials)
            .finish()
    }
}

//! Request-scoped construction and disposal of relay clients.
//!
//! Build one [`RelayClientFactory`] at startup and keep it in application
//! state. For each inbound request, [`RelayClientFactory::scoped`] yields a
//! [`RelayScope`] that closes its client when it goes out of scope, on every
//! exit path.

use std::ops::Deref;
use std::sync::Arc;

use log::error;

use relay_common::{InboundContext, RelayConfig};

use crate::client::RelayClient;
use crate::error::{CLIENT_INIT_MESSAGE, Result};

/// Creates relay clients for inbound requests from a shared configuration.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct RelayClientFactory {
    config: Arc<RelayConfig>,
}

impl RelayClientFactory {
    /// Creates a factory from a configuration.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a factory configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an invalid value.
    pub fn from_env() -> relay_common::Result<Self> {
        RelayConfig::from_env().map(Self::new)
    }

    /// The configuration clients are built with.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Creates a client for an inbound request.
    ///
    /// The caller owns the client and must call
    /// [`RelayClient::close`] when the request is done. Prefer
    /// [`scoped`](Self::scoped).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransportInit`](crate::ClientError::TransportInit)
    /// if the transport cannot be built. Render it with
    /// [`ClientError::into_response`](crate::ClientError::into_response).
    pub fn create(&self, context: &InboundContext) -> Result<RelayClient> {
        RelayClient::for_context(&self.config, context)
            .inspect_err(|e| error!("{CLIENT_INIT_MESSAGE} : {e}"))
    }

    /// Creates a client that is closed when the returned scope is dropped.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub fn scoped(&self, context: &InboundContext) -> Result<RelayScope> {
        self.create(context).map(RelayScope::new)
    }
}

/// A relay client bound to the lifetime of one inbound request.
///
/// Dereferences to [`RelayClient`]. The client is closed exactly once, either
/// by [`close`](Self::close) or when the scope is dropped.
#[derive(Debug)]
pub struct RelayScope {
    client: RelayClient,
}

impl RelayScope {
    /// Wraps a client.
    #[must_use]
    pub const fn new(client: RelayClient) -> Self {
        Self { client }
    }

    /// Ends the scope now.
    pub fn close(self) {
        drop(self);
    }
}

impl Deref for RelayScope {
    type Target = RelayClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for RelayScope {
    fn drop(&mut self) {
        self.client.close();
    }
}

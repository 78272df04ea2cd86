//! Construction of typed peer handles.
//!
//! [`ConnectionFactory`] turns connection arguments into [`PeerHandle`]s for
//! either a coordinator or a worker. It is synchronous and keeps no state
//! beyond the shared [`ClientOptions`]: every call yields a fresh,
//! independent handle and nothing is cached or retried.

mod args;
mod handle;

pub use args::*;
pub use handle::*;

use crate::Result;
use std::sync::Arc;

/// Builds [`PeerHandle`]s bound to a shared set of [`ClientOptions`].
#[derive(Clone, Debug, Default)]
pub struct ConnectionFactory {
    options: Arc<ClientOptions>,
}

impl ConnectionFactory {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &Arc<ClientOptions> {
        &self.options
    }

    /// Builds a coordinator handle for `address`.
    ///
    /// The address is expected to be non-empty; it is validated only when the
    /// handle is turned into an endpoint.
    pub fn connect_to_coordinator(&self, address: impl Into<String>) -> PeerHandle {
        let params = ConnectionParameters {
            address: address.into(),
            token: None,
        };
        PeerHandle::new(Role::Coordinator, params, Arc::clone(&self.options))
    }

    /// Builds a worker handle from any accepted argument shape.
    ///
    /// ```
    /// use fanout::{ConnectionFactory, WorkerRecord};
    ///
    /// let factory = ConnectionFactory::default();
    /// let positional = factory.connect_to_worker(("http://h:1", "tok")).unwrap();
    ///
    /// let record = WorkerRecord::default()
    ///     .with(":url", "http://h:1")
    ///     .with("token", "tok");
    /// let mapped = factory.connect_to_worker(&record).unwrap();
    ///
    /// assert_eq!(positional.parameters(), mapped.parameters());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConnectionArguments`] if the arguments
    /// cannot be normalized into an address and token.
    pub fn connect_to_worker(&self, args: impl Into<ConnectionArgs>) -> Result<PeerHandle> {
        let params = args.into().normalize()?;
        Ok(self.worker_handle(params))
    }

    pub(crate) fn worker_handle(&self, params: ConnectionParameters) -> PeerHandle {
        PeerHandle::new(Role::Worker, params, Arc::clone(&self.options))
    }
}

use super::ConnectionParameters;
use crate::{Error, Result};
use core::{fmt, time::Duration};
use std::sync::Arc;
use tonic::{
    Request,
    metadata::{Ascii, MetadataValue},
    transport::{Channel, Endpoint},
};

/// Metadata key carrying the peer auth token.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Ambient client configuration shared by every handle a factory builds.
///
/// Neither the factory nor the fan-out engine look inside; it is only read
/// when a handle turns into a transport endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    /// Upper bound on establishing the transport session.
    pub connect_timeout: Duration,
    /// Upper bound applied to every request sent over the channel.
    pub request_timeout: Option<Duration>,
    /// Overrides the default user agent sent to peers.
    pub user_agent: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Some(Duration::from_secs(30)),
            user_agent: None,
        }
    }
}

/// The part a remote peer plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Coordinator,
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => write!(f, "coordinator"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

/// A client handle bound to one peer in one role.
///
/// Building a handle does not touch the network. The session is only dialed
/// through [`PeerHandle::connect`], typically from inside a per-element
/// action.
#[derive(Clone, Debug)]
pub struct PeerHandle {
    role: Role,
    params: ConnectionParameters,
    options: Arc<ClientOptions>,
}

impl PeerHandle {
    pub(crate) fn new(role: Role, params: ConnectionParameters, options: Arc<ClientOptions>) -> Self {
        Self {
            role,
            params,
            options,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address(&self) -> &str {
        &self.params.address
    }

    pub fn token(&self) -> Option<&str> {
        self.params.token.as_deref()
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Builds the transport endpoint for this peer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is not a valid URI or
    /// the configured user agent is not a valid header value.
    pub fn endpoint(&self) -> Result<Endpoint> {
        let invalid = |e: tonic::transport::Error| Error::InvalidAddress {
            address: self.params.address.clone(),
            reason: e.to_string(),
        };

        let mut endpoint = Endpoint::from_shared(self.params.address.clone())
            .map_err(invalid)?
            .connect_timeout(self.options.connect_timeout);

        if let Some(timeout) = self.options.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }
        if let Some(agent) = &self.options.user_agent {
            endpoint = endpoint.user_agent(agent.clone()).map_err(invalid)?;
        }

        Ok(endpoint)
    }

    /// Dials the peer and returns a ready channel.
    pub async fn connect(&self) -> Result<Channel> {
        let endpoint = self.endpoint()?;

        #[cfg(feature = "tracing")]
        tracing::trace!("Dialing {} at {}", self.role, self.params.address);

        endpoint.connect().await.map_err(|e| Error::Transport {
            address: self.params.address.clone(),
            reason: e.to_string(),
        })
    }

    /// Attaches the peer's auth token to an outgoing request, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] if the token cannot be encoded as
    /// ASCII metadata.
    pub fn authorize<T>(&self, mut request: Request<T>) -> Result<Request<T>> {
        if let Some(token) = &self.params.token {
            let value: MetadataValue<Ascii> = format!("Bearer {token}")
                .parse()
                .map_err(|_| Error::InvalidToken)?;
            request.metadata_mut().insert(AUTHORIZATION_KEY, value);
        }
        Ok(request)
    }
}

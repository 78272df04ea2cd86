//! Error types for the fan-out dispatch core.
//!
//! Construction-time problems (malformed connection arguments, a zero
//! concurrency ceiling, unparseable addresses) are reported synchronously
//! through [`Error`] before any asynchronous work is started. Failures of the
//! per-element actions themselves never surface here: they belong to the
//! action and travel through whatever value it produces.
//!
//! ## Error Cases
//! - `InvalidConnectionArguments`: worker connection arguments could not be
//!   normalized into an address/token pair.
//! - `InvalidConcurrency`: a traversal was requested with a ceiling of zero.
//! - `InvalidAddress`: a peer address is not a valid URI for the transport.
//! - `InvalidToken`: an auth token cannot be carried as request metadata.
//! - `Transport`: dialing a peer failed.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the fan-out dispatch core.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Worker connection arguments did not match any accepted shape.
    #[error("Invalid connection arguments: {reason}")]
    InvalidConnectionArguments { reason: String },

    /// The concurrency ceiling must be at least one.
    #[error("Invalid concurrency ceiling: {value} (must be greater than 0)")]
    InvalidConcurrency { value: usize },

    /// The peer address could not be turned into a transport endpoint.
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The auth token contains characters that are not valid in metadata.
    #[error("Auth token is not valid ASCII metadata")]
    InvalidToken,

    /// Establishing the transport session failed.
    #[error("Transport error for {address}: {reason}")]
    Transport { address: String, reason: String },
}

impl Error {
    pub(crate) fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidConnectionArguments {
            reason: reason.into(),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidConnectionArguments { reason } => Status::invalid_argument(reason),
            Error::InvalidConcurrency { value } => {
                Status::invalid_argument(format!("Invalid concurrency ceiling: {value}"))
            }
            Error::InvalidAddress { address, reason } => {
                Status::invalid_argument(format!("Invalid address {address:?}: {reason}"))
            }
            Error::InvalidToken => Status::unauthenticated("Auth token is not valid metadata"),
            Error::Transport { address, reason } => {
                Status::unavailable(format!("Peer {address} unavailable: {reason}"))
            }
        }
    }
}

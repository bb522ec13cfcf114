//! Server errors.

use std::net::SocketAddr;

use merlin_router::RouteError;
use thiserror::Error;

/// Errors raised while setting up or running the server.
///
/// Per-request failures never appear here; they are answered with HTTP
/// responses.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address does not parse.
    #[error("invalid address {addr:?}: {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not bind.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// Address that was attempted.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A route failed to register.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

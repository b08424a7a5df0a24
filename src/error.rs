use std::fmt;
use std::io;
use std::net::SocketAddr;

use mio::Token;

pub type Result<T> = std::result::Result<T, ReactorError>;

/// Error taxonomy for the reactor.
///
/// Only `Bind` and `SelectorFatal` terminate the server. A `ConnectionIo`
/// is recovered locally by closing the one affected connection, and a
/// `RegistryMisuse` signals a programming error in interest bookkeeping.
#[derive(Debug)]
pub enum ReactorError {
    /// The listener could not bind or listen on the requested address.
    Bind { addr: SocketAddr, source: io::Error },
    /// The readiness-selection primitive itself failed.
    SelectorFatal(io::Error),
    /// An I/O failure isolated to a single registered connection.
    ConnectionIo { token: Token, source: io::Error },
    /// Interest mutation on a token the registry does not know about,
    /// or a duplicate registration.
    RegistryMisuse { reason: &'static str, token: Token },
    /// A handler callback reported failure for a connection.
    Handler(String),
    /// The blocking worker pool has shut down and can no longer accept jobs.
    WorkerGone,
    /// Generic I/O plumbing failure.
    Io(io::Error),
}

impl fmt::Display for ReactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactorError::Bind { addr, source } => {
                write!(f, "failed to bind {}: {}", addr, source)
            }
            ReactorError::SelectorFatal(e) => write!(f, "selector failure: {}", e),
            ReactorError::ConnectionIo { token, source } => {
                write!(f, "connection {:?} I/O error: {}", token, source)
            }
            ReactorError::RegistryMisuse { reason, token } => {
                write!(f, "registry misuse on {:?}: {}", token, reason)
            }
            ReactorError::Handler(msg) => write!(f, "handler error: {}", msg),
            ReactorError::WorkerGone => write!(f, "blocking pool is gone"),
            ReactorError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ReactorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReactorError::Bind { source, .. } | ReactorError::ConnectionIo { source, .. } => {
                Some(source)
            }
            ReactorError::SelectorFatal(e) | ReactorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReactorError {
    fn from(err: io::Error) -> Self {
        ReactorError::Io(err)
    }
}

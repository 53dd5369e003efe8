//! Error types for kvsync-core.

use std::fmt;

use thiserror::Error;

/// Missing or incomplete remote-service configuration.
///
/// Raised before any remote call is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more always-required identifiers are unset.
    #[error("the following options must be set as environment variables: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),

    /// Neither an API token nor a legacy auth key is set.
    #[error("one of the following options must be set as an environment variable: {}", .0.join(", "))]
    MissingAuth(Vec<&'static str>),

    /// An auth key was provided without the matching account email.
    #[error("{0} is set but {1} is missing")]
    IncompleteAuth(&'static str, &'static str),
}

/// The Key-Value Service operation an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvOp {
    List,
    Get,
    Put,
    PutBulk,
    DeleteBulk,
}

impl fmt::Display for KvOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KvOp::List => "list",
            KvOp::Get => "get",
            KvOp::Put => "put",
            KvOp::PutBulk => "bulk put",
            KvOp::DeleteBulk => "bulk delete",
        })
    }
}

/// Failure talking to the Key-Value Service.
///
/// Not retried by the engine; every variant names the operation it came from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KvError {
    /// The service answered with a non-success HTTP status.
    #[error("{op} failed with HTTP {status}: {body}")]
    Status { op: KvOp, status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("{op} failed: {message}")]
    Transport { op: KvOp, message: String },

    /// The response could not be understood.
    #[error("{op} returned an unreadable response: {message}")]
    Decode { op: KvOp, message: String },

    /// The API envelope reported `success: false`.
    #[error("{op} was rejected: {message}")]
    Rejected { op: KvOp, message: String },
}

impl KvError {
    /// The operation this error was raised by.
    pub fn op(&self) -> KvOp {
        match self {
            KvError::Status { op, .. }
            | KvError::Transport { op, .. }
            | KvError::Decode { op, .. }
            | KvError::Rejected { op, .. } => *op,
        }
    }
}

//! Error types for query execution.

use std::fmt;

use crate::record::Fields;

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Failures raised by a [`crate::LogBackend`] implementation.
///
/// These are propagated unchanged to the caller; nothing in this crate
/// retries or recovers from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Network or transport failure (connect, TLS, timeout, ...).
    Transport(String),
    /// The backend answered with a non-success HTTP status.
    Status { status: u16, body: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// The backend could not be constructed from the given settings.
    Config(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport(msg) => write!(f, "transport error: {msg}"),
            BackendError::Status { status, body } => {
                write!(f, "backend http error status={status}: {body}")
            }
            BackendError::Decode(msg) => write!(f, "decode error: {msg}"),
            BackendError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Errors surfaced by [`crate::QueryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A single-record lookup matched nothing.
    NotFound { namespace: String, fields: Fields },
    /// The backend failed.
    Backend(BackendError),
    /// A hit was returned but is not a usable log record (missing `M`/`T`, ...).
    MalformedRecord(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NotFound { namespace, fields } => {
                write!(
                    f,
                    "no log record found in namespace '{namespace}' matching {}",
                    fields
                )
            }
            QueryError::Backend(err) => write!(f, "{err}"),
            QueryError::MalformedRecord(msg) => write!(f, "malformed log record: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for QueryError {
    fn from(err: BackendError) -> Self {
        QueryError::Backend(err)
    }
}

// ABOUTME: Defines all error types for the token bucket client using thiserror.
// ABOUTME: Each layer has its own error enum, unified under ClientError.

use std::path::PathBuf;

/// Top-level error type for the token bucket client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Context(#[from] ContextError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),
}

impl ClientError {
    /// Whether this error came from the caller's own cancellation or deadline.
    pub fn is_context(&self) -> bool {
        matches!(
            self,
            ClientError::Context(_) | ClientError::Transport(TransportError::Context(_))
        )
    }
}

/// Why a [`RequestContext`](crate::RequestContext) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Errors from transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport is closed")]
    Closed,

    #[error("{0}")]
    Context(#[from] ContextError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from loading TLS credentials.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid root certificate in {}: {source}", path.display())]
    InvalidCertificate {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "invalid client certificate {} or key {}: {source}",
        cert.display(),
        key.display()
    )]
    InvalidIdentity {
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: reqwest::Error,
    },
}

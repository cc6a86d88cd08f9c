//! Error types for the build service client.
//!
//! # Design
//! `BuildError` covers everything that can go wrong before a request leaves
//! the process: the caller asked for a verb the service does not speak, no
//! usable credentials are configured, or a file parameter cannot be loaded.
//! `TransportError` carries the transport collaborator's own failure text.
//! Both eventually collapse into `Outcome::Failure` carrying their `Display`
//! output, so the messages here are the ones callers will read.

use std::io;
use std::path::PathBuf;

/// Errors raised while turning an `Operation` into a `RequestDescriptor`.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The verb is not one of GET, POST, PUT or DELETE.
    #[error("Unknown request method: {0}")]
    UnsupportedMethod(String),

    /// Neither a token nor a username/password pair is available.
    #[error("Please provide token or username and password")]
    MissingCredentials,

    /// A file parameter does not resolve to a readable regular file. The
    /// I/O failure, when there was one, is kept as the source.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    /// The structured parameters could not be encoded as JSON.
    #[error("Failed to encode request data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A failure reported by the transport before any HTTP exchange completed:
/// connection refused, TLS failure, timeout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

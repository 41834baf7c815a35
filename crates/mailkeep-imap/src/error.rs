//! Error types for the IMAP client.

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// LOGIN was rejected by the server.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Server returned NO for a command.
    #[error("server returned NO: {0}")]
    No(String),

    /// Server returned BAD for a command.
    #[error("server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("server sent BYE: {0}")]
    Bye(String),

    /// Reply could not be parsed.
    #[error("protocol error: {0}")]
    Parse(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

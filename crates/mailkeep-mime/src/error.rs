//! Error types for MIME parsing.

use thiserror::Error;

/// Errors that can occur while parsing MIME content.
#[derive(Debug, Error)]
pub enum Error {
    /// Message structure could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A transfer encoding was malformed.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 payload could not be decoded.
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded text was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the card directory core

use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in the core crypto and codec layer
#[derive(Error, Debug)]
pub enum CoreError {
    /// A private or public key could not be imported
    #[error("key import error: {0}")]
    KeyImport(String),

    /// A cryptographic primitive failed
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A stored snapshot could not be decoded
    #[error("snapshot decode error: {0}")]
    SnapshotDecode(String),
}

impl From<base64::DecodeError> for CoreError {
    fn from(err: base64::DecodeError) -> Self {
        CoreError::SnapshotDecode(err.to_string())
    }
}

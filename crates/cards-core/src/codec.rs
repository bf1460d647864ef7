//! Byte-string codecs for the wire and storage boundaries
//!
//! Everything binary that leaves the process is standard base64; identifiers
//! are lowercase hex.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode bytes as a standard base64 string.
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a standard base64 string.
pub fn base64_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data)
}

/// Encode bytes as lowercase hex.
pub fn hex_encode(data: &[u8]) -> String {
    hex::encode(data)
}

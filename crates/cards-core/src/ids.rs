//! Identifier derivation for cards and public keys
//!
//! Identifiers are left-truncated SHA-512 digests, hex-encoded: 32 bytes for
//! card ids (64 hex chars), 8 bytes for public key ids (16 hex chars). Both
//! functions are pure and must stay stable across releases — persisted data
//! depends on them.

use sha2::{Digest, Sha512};

use crate::codec::hex_encode;

/// Bytes of the SHA-512 digest kept for a card id.
pub const CARD_ID_BYTES: usize = 32;

/// Bytes of the SHA-512 digest kept for a public key id.
pub const PUBLIC_KEY_ID_BYTES: usize = 8;

/// Derive a card id from the raw (decoded) content snapshot.
pub fn derive_card_id(snapshot: &[u8]) -> String {
    let digest = Sha512::digest(snapshot);
    hex_encode(&digest[..CARD_ID_BYTES])
}

/// Derive a public key id from the raw key bytes.
pub fn derive_key_id(public_key: &[u8]) -> String {
    let digest = Sha512::digest(public_key);
    hex_encode(&digest[..PUBLIC_KEY_ID_BYTES])
}

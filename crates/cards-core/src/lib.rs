//! # Cards Core
//!
//! Core types and cryptographic primitives for the card directory service.
//!
//! ## Key Concepts
//!
//! - **Card**: a signed record binding a public key to a tenant-scoped identity
//! - **Content snapshot**: the canonical byte string a card id is derived from;
//!   base64 over a JSON document on the wire
//! - **Stamp**: one signature entry within a card's signature list
//! - **Chain**: the sequence of cards linked by `previous_card_id`, sharing a
//!   chain id
//!
//! ## Invariants
//!
//! 1. A card id is the first 32 bytes of SHA-512 of the decoded snapshot
//! 2. Signatures cover `snapshot ‖ extra_snapshot`, with an empty extra being
//!    the zero-length byte string
//! 3. The service counter-signature is appended exactly once, after validation

pub mod card;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod ids;
pub mod signer;

pub use card::{Card, Stamp, CARD_VERSION_5, SIGNER_APP, SIGNER_SELF, SIGNER_VIRGIL};
pub use crypto::{open_sealed_key, seal_key, verify_card_signature, KeyPair};
pub use error::{CoreError, Result};
pub use ids::{derive_card_id, derive_key_id};
pub use signer::CardSigner;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Service-side counter-signing
//!
//! After a submission passes validation, the service signs the decoded
//! content snapshot (empty extra) and appends the `virgil` stamp. The signer
//! owns the service key pair for the process lifetime; the derived signer id
//! is a process constant.

use crate::card::{Card, Stamp, SIGNER_VIRGIL};
use crate::codec::{base64_decode, base64_encode};
use crate::crypto::KeyPair;
use crate::error::{CoreError, Result};
use crate::ids::derive_key_id;

/// Counter-signs validated cards with the service key.
#[derive(Debug, Clone)]
pub struct CardSigner {
    keys: KeyPair,
    signer_id: String,
}

impl CardSigner {
    /// Create a signer; the signer id is derived from the public key once.
    pub fn new(keys: KeyPair) -> Self {
        let signer_id = derive_key_id(&keys.public_key_bytes());
        Self { keys, signer_id }
    }

    /// The truncated-hash id of the service public key.
    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    /// Raw service public key bytes, for verification by clients and tests.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.keys.public_key_bytes()
    }

    /// Append the service counter-signature to a validated card.
    pub fn sign_card(&self, card: &mut Card) -> Result<()> {
        let snapshot = base64_decode(&card.content_snapshot).map_err(|err| {
            CoreError::SnapshotDecode(format!(
                "content snapshot of card ({}) is not base64: {err}",
                card.id
            ))
        })?;

        let signature = self.keys.sign(&snapshot, &[]);
        card.signatures.push(Stamp {
            signer: SIGNER_VIRGIL.into(),
            signature: base64_encode(&signature),
            snapshot: None,
        });

        Ok(())
    }
}

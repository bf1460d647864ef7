//! Cryptographic primitives for card signing
//!
//! Cards are signed over the byte string `snapshot ‖ extra_snapshot` with
//! Ed25519. An absent extra snapshot contributes zero bytes to the signed
//! data, not a placeholder encoding.
//!
//! The service private key is stored sealed: a ChaCha20-Poly1305 box over the
//! 32-byte signing seed, keyed by the SHA-512 of the operator password.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};

use crate::error::{CoreError, Result};

/// Length of the nonce prefix in a sealed key blob.
const SEALED_KEY_NONCE_LEN: usize = 12;

/// Ed25519 key pair for signing card snapshots
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("signing_key", &"[redacted]")
            .field("verifying_key", &hex::encode(self.verifying_key.to_bytes()))
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create a key pair from a 32-byte signing seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get the raw signing seed
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Sign `snapshot ‖ extra` and return the signature bytes
    pub fn sign(&self, snapshot: &[u8], extra: &[u8]) -> Vec<u8> {
        let signature = self.signing_key.sign(&concat_signed_data(snapshot, extra));
        signature.to_bytes().to_vec()
    }
}

/// Verify a card signature over `snapshot ‖ extra` with the submitted key.
///
/// Returns `Ok(false)` when the signature does not verify — a validation
/// failure owned by the caller. Returns `Err` only when the public key itself
/// cannot be imported, which is an internal fault of the stored data or the
/// primitive, not of the signature.
pub fn verify_card_signature(
    snapshot: &[u8],
    extra: &[u8],
    public_key: &[u8],
    signature: &[u8],
) -> Result<bool> {
    let key_bytes: [u8; 32] = public_key.try_into().map_err(|_| {
        CoreError::KeyImport(format!("public key must be 32 bytes, got {}", public_key.len()))
    })?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|err| CoreError::KeyImport(err.to_string()))?;

    let signature = match Signature::from_slice(signature) {
        Ok(signature) => signature,
        Err(_) => return Ok(false),
    };

    Ok(verifying_key
        .verify(&concat_signed_data(snapshot, extra), &signature)
        .is_ok())
}

/// Seal a key pair's signing seed under a password.
///
/// Blob layout: `nonce(12) ‖ ciphertext`. Used by provisioning tooling and
/// tests; the service only ever opens blobs.
pub fn seal_key(keys: &KeyPair, password: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&password_key(password)));
    let mut nonce = [0u8; SEALED_KEY_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), keys.seed().as_slice())
        .map_err(|_| CoreError::Crypto("sealing the private key failed".into()))?;

    let mut blob = Vec::with_capacity(SEALED_KEY_NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a sealed private key blob with the operator password.
pub fn open_sealed_key(blob: &[u8], password: &[u8]) -> Result<KeyPair> {
    if blob.len() <= SEALED_KEY_NONCE_LEN {
        return Err(CoreError::KeyImport(format!(
            "sealed key blob is too short: {} bytes",
            blob.len()
        )));
    }
    let (nonce, ciphertext) = blob.split_at(SEALED_KEY_NONCE_LEN);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&password_key(password)));
    let seed = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CoreError::KeyImport("private key password is incorrect".into()))?;

    let seed: [u8; 32] = seed
        .as_slice()
        .try_into()
        .map_err(|_| CoreError::KeyImport(format!("sealed seed must be 32 bytes, got {}", seed.len())))?;

    Ok(KeyPair::from_seed(&seed))
}

fn password_key(password: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(password);
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest[..32]);
    key
}

fn concat_signed_data(snapshot: &[u8], extra: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(snapshot.len() + extra.len());
    data.extend_from_slice(snapshot);
    data.extend_from_slice(extra);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keys = KeyPair::generate();
        let signature = keys.sign(b"snapshot", b"");

        let ok =
            verify_card_signature(b"snapshot", b"", &keys.public_key_bytes(), &signature).unwrap();
        assert!(ok);
    }

    #[test]
    fn test_verify_fails_with_wrong_key() {
        let keys = KeyPair::generate();
        let other = KeyPair::generate();
        let signature = keys.sign(b"snapshot", b"");

        let ok =
            verify_card_signature(b"snapshot", b"", &other.public_key_bytes(), &signature).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_extra_snapshot_is_bound() {
        let keys = KeyPair::generate();
        let signature = keys.sign(b"snapshot", b"extra");

        let pk = keys.public_key_bytes();
        assert!(verify_card_signature(b"snapshot", b"extra", &pk, &signature).unwrap());
        assert!(!verify_card_signature(b"snapshot", b"", &pk, &signature).unwrap());
        // An absent extra is zero bytes, never a textual placeholder.
        assert!(!verify_card_signature(b"snapshot", b"[]", &pk, &signature).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_a_verification_failure() {
        let keys = KeyPair::generate();
        let ok = verify_card_signature(b"snapshot", b"", &keys.public_key_bytes(), b"short")
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_unimportable_key_is_an_error() {
        let result = verify_card_signature(b"snapshot", b"", b"not-32-bytes", &[0u8; 64]);
        assert!(matches!(result, Err(CoreError::KeyImport(_))));
    }

    #[test]
    fn test_sealed_key_round_trip() {
        let keys = KeyPair::generate();
        let blob = seal_key(&keys, b"password").unwrap();
        let restored = open_sealed_key(&blob, b"password").unwrap();

        assert_eq!(restored.seed(), keys.seed());
        assert_eq!(restored.public_key_bytes(), keys.public_key_bytes());
    }

    #[test]
    fn test_sealed_key_wrong_password() {
        let keys = KeyPair::generate();
        let blob = seal_key(&keys, b"password").unwrap();

        assert!(matches!(
            open_sealed_key(&blob, b"wrong"),
            Err(CoreError::KeyImport(_))
        ));
    }

    #[test]
    fn test_sealed_key_truncated_blob() {
        assert!(matches!(
            open_sealed_key(&[0u8; 8], b"password"),
            Err(CoreError::KeyImport(_))
        ));
    }
}

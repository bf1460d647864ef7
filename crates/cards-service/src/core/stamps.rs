//! Stamp-set validation
//!
//! Enforces cardinality, per-stamp field rules, self-stamp uniqueness and —
//! when enabled — cryptographic verification of the self-stamp against the
//! public key carried by the snapshot. App-signed stamps are never verified
//! here (their keys are unknown to the directory), and service-signed stamps
//! are rejected at ingress outright.

use cards_core::codec::base64_decode;
use cards_core::{verify_card_signature, Stamp};

use crate::api::error::ApiError;
use crate::core::csr::DecodedParams;

pub const STAMPS_MIN: usize = 1;
pub const STAMPS_MAX: usize = 8;
pub const STAMP_SNAPSHOT_MAX_LENGTH: usize = 1024;
pub const STAMP_SIGNER_MAX_LENGTH: usize = 1024;

/// Validate the stamp list of a card submission.
///
/// `verify_signatures` gates only the cryptographic check; the structural
/// rules always run. The self-stamp's decoded snapshot is bound into
/// `params.extra_snapshot` as a side effect of verification.
pub fn validate_stamps(
    stamps: &[Stamp],
    params: &mut DecodedParams,
    verify_signatures: bool,
) -> Result<(), ApiError> {
    if stamps.len() < STAMPS_MIN {
        return Err(ApiError::StampsTooFew);
    }
    if stamps.len() > STAMPS_MAX {
        return Err(ApiError::StampsTooMany);
    }

    let mut self_stamp_seen = false;
    for stamp in stamps {
        validate_stamp(stamp, params, verify_signatures)?;
        if stamp.is_self() {
            if self_stamp_seen {
                return Err(ApiError::SelfStampNotUnique);
            }
            self_stamp_seen = true;
        }
    }

    if !self_stamp_seen {
        return Err(ApiError::SelfStampMissing);
    }

    Ok(())
}

fn validate_stamp(
    stamp: &Stamp,
    params: &mut DecodedParams,
    verify_signatures: bool,
) -> Result<(), ApiError> {
    let extra_snapshot = decode_stamp_snapshot(stamp.snapshot.as_deref())?;

    if stamp.signature.is_empty() {
        return Err(ApiError::StampSignatureMissing);
    }
    let signature = base64_decode(&stamp.signature).map_err(|_| ApiError::SignatureDecoding)?;

    if verify_signatures && stamp.is_self() && !params.public_key.is_empty() {
        params.extra_snapshot = extra_snapshot;

        // A client key the primitive cannot import proves nothing about the
        // signature; the submission is unverifiable either way.
        let verified = verify_card_signature(
            &params.csr,
            &params.extra_snapshot,
            &params.public_key,
            &signature,
        )
        .unwrap_or(false);

        if !verified {
            return Err(ApiError::SignatureVerificationFailed);
        }
    }

    validate_signer(&stamp.signer)?;

    Ok(())
}

fn decode_stamp_snapshot(snapshot: Option<&str>) -> Result<Vec<u8>, ApiError> {
    let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };

    let decoded = base64_decode(snapshot).map_err(|_| ApiError::StampSnapshotDecoding)?;
    if decoded.len() > STAMP_SNAPSHOT_MAX_LENGTH {
        return Err(ApiError::StampSnapshotTooLong);
    }

    Ok(decoded)
}

fn validate_signer(signer: &str) -> Result<(), ApiError> {
    if signer == cards_core::SIGNER_VIRGIL {
        return Err(ApiError::StampSignerReserved);
    }
    if signer.len() > STAMP_SIGNER_MAX_LENGTH {
        return Err(ApiError::StampSignerTooLong);
    }
    if signer.is_empty() {
        return Err(ApiError::StampSignerEmpty);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cards_core::codec::base64_encode;
    use cards_core::{KeyPair, SIGNER_APP, SIGNER_SELF, SIGNER_VIRGIL};

    fn signed_params(keys: &KeyPair, snapshot: &[u8]) -> DecodedParams {
        DecodedParams {
            csr: snapshot.to_vec(),
            public_key: keys.public_key_bytes().to_vec(),
            extra_snapshot: Vec::new(),
        }
    }

    fn self_stamp(keys: &KeyPair, snapshot: &[u8], extra: &[u8]) -> Stamp {
        Stamp {
            signer: SIGNER_SELF.into(),
            signature: base64_encode(&keys.sign(snapshot, extra)),
            snapshot: (!extra.is_empty()).then(|| base64_encode(extra)),
        }
    }

    #[test]
    fn test_valid_self_stamp_verifies() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");
        let stamps = vec![self_stamp(&keys, b"snapshot", b"")];

        validate_stamps(&stamps, &mut params, true).unwrap();
    }

    #[test]
    fn test_extra_snapshot_is_bound_into_verification() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");
        let stamps = vec![self_stamp(&keys, b"snapshot", b"extra bytes")];

        validate_stamps(&stamps, &mut params, true).unwrap();
        assert_eq!(params.extra_snapshot, b"extra bytes");
    }

    #[test]
    fn test_wrong_key_signature_fails() {
        let keys = KeyPair::generate();
        let other = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");
        let stamps = vec![self_stamp(&other, b"snapshot", b"")];

        assert!(matches!(
            validate_stamps(&stamps, &mut params, true),
            Err(ApiError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_verification_skipped_when_disabled() {
        let keys = KeyPair::generate();
        let other = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");
        let stamps = vec![self_stamp(&other, b"snapshot", b"")];

        validate_stamps(&stamps, &mut params, false).unwrap();
    }

    #[test]
    fn test_verification_skipped_without_public_key() {
        let keys = KeyPair::generate();
        let mut params = DecodedParams {
            csr: b"snapshot".to_vec(),
            public_key: Vec::new(),
            extra_snapshot: Vec::new(),
        };
        let stamps = vec![self_stamp(&keys, b"other data", b"")];

        validate_stamps(&stamps, &mut params, true).unwrap();
    }

    #[test]
    fn test_cardinality() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");

        assert!(matches!(
            validate_stamps(&[], &mut params, true),
            Err(ApiError::StampsTooFew)
        ));

        let mut stamps = vec![self_stamp(&keys, b"snapshot", b"")];
        for i in 0..8 {
            stamps.push(Stamp {
                signer: format!("app-{i}"),
                signature: "c2ln".into(),
                snapshot: None,
            });
        }
        assert!(matches!(
            validate_stamps(&stamps, &mut params, true),
            Err(ApiError::StampsTooMany)
        ));
    }

    #[test]
    fn test_self_stamp_uniqueness_and_presence() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");

        let stamps = vec![
            self_stamp(&keys, b"snapshot", b""),
            self_stamp(&keys, b"snapshot", b""),
        ];
        assert!(matches!(
            validate_stamps(&stamps, &mut params, true),
            Err(ApiError::SelfStampNotUnique)
        ));

        let stamps = vec![Stamp {
            signer: SIGNER_APP.into(),
            signature: "c2ln".into(),
            snapshot: None,
        }];
        assert!(matches!(
            validate_stamps(&stamps, &mut params, true),
            Err(ApiError::SelfStampMissing)
        ));
    }

    #[test]
    fn test_multiple_app_stamps_accepted() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");

        let stamps = vec![
            self_stamp(&keys, b"snapshot", b""),
            Stamp {
                signer: SIGNER_APP.into(),
                signature: "c2ln".into(),
                snapshot: None,
            },
            Stamp {
                signer: "another-app".into(),
                signature: "c2ln".into(),
                snapshot: None,
            },
        ];
        validate_stamps(&stamps, &mut params, true).unwrap();
    }

    #[test]
    fn test_signer_rules() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");

        let reserved = vec![Stamp {
            signer: SIGNER_VIRGIL.into(),
            signature: "c2ln".into(),
            snapshot: None,
        }];
        assert!(matches!(
            validate_stamps(&reserved, &mut params, true),
            Err(ApiError::StampSignerReserved)
        ));

        let empty = vec![Stamp {
            signer: String::new(),
            signature: "c2ln".into(),
            snapshot: None,
        }];
        assert!(matches!(
            validate_stamps(&empty, &mut params, true),
            Err(ApiError::StampSignerEmpty)
        ));

        let long = vec![Stamp {
            signer: "s".repeat(STAMP_SIGNER_MAX_LENGTH + 1),
            signature: "c2ln".into(),
            snapshot: None,
        }];
        assert!(matches!(
            validate_stamps(&long, &mut params, true),
            Err(ApiError::StampSignerTooLong)
        ));
    }

    #[test]
    fn test_signature_field_rules() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");

        let missing = vec![Stamp {
            signer: SIGNER_SELF.into(),
            signature: String::new(),
            snapshot: None,
        }];
        assert!(matches!(
            validate_stamps(&missing, &mut params, true),
            Err(ApiError::StampSignatureMissing)
        ));

        let undecodable = vec![Stamp {
            signer: SIGNER_SELF.into(),
            signature: "!!!".into(),
            snapshot: None,
        }];
        assert!(matches!(
            validate_stamps(&undecodable, &mut params, true),
            Err(ApiError::SignatureDecoding)
        ));
    }

    #[test]
    fn test_stamp_snapshot_rules() {
        let keys = KeyPair::generate();
        let mut params = signed_params(&keys, b"snapshot");

        let undecodable = vec![Stamp {
            signer: SIGNER_SELF.into(),
            signature: "c2ln".into(),
            snapshot: Some("!!!".into()),
        }];
        assert!(matches!(
            validate_stamps(&undecodable, &mut params, false),
            Err(ApiError::StampSnapshotDecoding)
        ));

        let oversized = vec![Stamp {
            signer: SIGNER_SELF.into(),
            signature: "c2ln".into(),
            snapshot: Some(base64_encode(&vec![0u8; STAMP_SNAPSHOT_MAX_LENGTH + 1])),
        }];
        assert!(matches!(
            validate_stamps(&oversized, &mut params, false),
            Err(ApiError::StampSnapshotTooLong)
        ));
    }
}

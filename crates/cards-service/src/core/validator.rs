//! Request validators composed from the CSR, stamp-set and chain stages
//!
//! The base pass produces a fully populated card; create and delete add
//! their per-operation constraints on top. The duplicate check runs last so
//! every structural failure wins over the uniqueness failure.

use std::sync::Arc;

use cards_core::{derive_card_id, Card};

use crate::api::error::ApiError;
use crate::api::request::{CardBaseRequest, RequestHeaders};
use crate::core::csr::{self, Csr, DecodedParams, PUBLIC_KEY_MIN_LENGTH};
use crate::core::{chain, stamps};
use crate::storage::CardStore;

/// Search fan-out cap per request.
pub const SEARCH_IDENTITIES_LIMIT: usize = 50;

/// Validates card submissions against the store.
#[derive(Debug, Clone)]
pub struct CardValidator {
    store: Arc<dyn CardStore>,
}

impl CardValidator {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self { store }
    }

    /// Validate a create (register or supersede) request.
    pub async fn validate_create(
        &self,
        request: &CardBaseRequest,
        headers: &RequestHeaders,
    ) -> Result<Card, ApiError> {
        let card = self.validate_base(request, headers, true).await?;

        if card.public_key.len() < PUBLIC_KEY_MIN_LENGTH {
            return Err(ApiError::PublicKeyTooShort);
        }

        Ok(card)
    }

    /// Validate a delete (chain tombstone) request.
    ///
    /// The tombstone card carries no public key, so there is nothing to
    /// verify the self-stamp against; structural stamp checks still apply.
    pub async fn validate_delete(
        &self,
        request: &CardBaseRequest,
        headers: &RequestHeaders,
    ) -> Result<Card, ApiError> {
        let card = self.validate_base(request, headers, false).await?;

        if !card.public_key.is_empty() {
            return Err(ApiError::PublicKeyMustBeEmpty);
        }
        if card.previous_card_id.is_empty() {
            return Err(ApiError::DeleteCardIdRequired);
        }

        Ok(card)
    }

    async fn validate_base(
        &self,
        request: &CardBaseRequest,
        headers: &RequestHeaders,
        verify_signatures: bool,
    ) -> Result<Card, ApiError> {
        let (csr, mut params) = csr::validate_csr(&request.content_snapshot, &headers.identity)?;

        stamps::validate_stamps(&request.signatures, &mut params, verify_signatures)?;

        chain::validate_previous_card(
            self.store.as_ref(),
            &csr.previous_card_id,
            &headers.application_id,
            &csr.identity,
        )
        .await?;

        let card = fill_card(request, csr, headers, &params);

        if self.store.get_card(&card.id).await?.is_some() {
            return Err(ApiError::SnapshotNotUnique);
        }

        Ok(card)
    }
}

/// Populate the card from already-validated request data.
fn fill_card(
    request: &CardBaseRequest,
    csr: Csr,
    headers: &RequestHeaders,
    params: &DecodedParams,
) -> Card {
    Card {
        id: derive_card_id(&params.csr),
        content_snapshot: request.content_snapshot.clone(),
        public_key: params.public_key.clone(),
        identity: csr.identity,
        version: csr.version,
        created_at: csr.created_at,
        previous_card_id: csr.previous_card_id,
        application_id: headers.application_id.clone(),
        chain_id: String::new(),
        signatures: request.signatures.clone(),
        is_superseded: false,
    }
}

/// Validate the identity batch of a search request.
pub fn validate_search(identities: &[String]) -> Result<(), ApiError> {
    if identities.is_empty() {
        return Err(ApiError::SearchIdentitiesEmpty);
    }
    if identities.len() > SEARCH_IDENTITIES_LIMIT {
        return Err(ApiError::SearchIdentitiesLimited);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use cards_core::codec::base64_encode;
    use cards_core::{KeyPair, Stamp, SIGNER_SELF};

    fn snapshot_for(identity: &str, public_key: Option<&[u8]>, previous: &str) -> (String, Vec<u8>) {
        let mut fields = serde_json::json!({
            "identity": identity,
            "version": "5.0",
            "created_at": 1_700_000_000,
        });
        if let Some(key) = public_key {
            fields["public_key"] = serde_json::json!(base64_encode(key));
        }
        if !previous.is_empty() {
            fields["previous_card_id"] = serde_json::json!(previous);
        }
        let raw = fields.to_string().into_bytes();
        (base64_encode(&raw), raw)
    }

    fn create_request(keys: &KeyPair, identity: &str) -> CardBaseRequest {
        let (content_snapshot, raw) = snapshot_for(identity, Some(&keys.public_key_bytes()), "");
        CardBaseRequest {
            content_snapshot,
            signatures: vec![Stamp {
                signer: SIGNER_SELF.into(),
                signature: base64_encode(&keys.sign(&raw, b"")),
                snapshot: None,
            }],
        }
    }

    fn headers_for(identity: &str) -> RequestHeaders {
        RequestHeaders {
            identity: identity.into(),
            application_id: "app-1".into(),
            account_id: "acc-1".into(),
        }
    }

    #[tokio::test]
    async fn test_create_produces_populated_card() {
        let validator = CardValidator::new(Arc::new(MemoryStore::new()));
        let keys = KeyPair::generate();
        let request = create_request(&keys, "alice");

        let card = validator
            .validate_create(&request, &headers_for("alice"))
            .await
            .unwrap();

        assert_eq!(card.id.len(), 64);
        assert_eq!(card.identity, "alice");
        assert_eq!(card.application_id, "app-1");
        assert_eq!(card.public_key, keys.public_key_bytes());
        assert_eq!(card.signatures.len(), 1);
        assert!(card.chain_id.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_unverifiable_public_key() {
        let validator = CardValidator::new(Arc::new(MemoryStore::new()));
        let keys = KeyPair::generate();

        // An 8-byte key cannot verify the self-stamp, whatever signed it.
        let (content_snapshot, raw) = snapshot_for("alice", Some(&[1u8; 8]), "");
        let request = CardBaseRequest {
            content_snapshot,
            signatures: vec![Stamp {
                signer: SIGNER_SELF.into(),
                signature: base64_encode(&keys.sign(&raw, b"")),
                snapshot: None,
            }],
        };

        let err = validator
            .validate_create(&request, &headers_for("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SignatureVerificationFailed));
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let store = Arc::new(MemoryStore::new());
        let validator = CardValidator::new(store.clone());
        let keys = KeyPair::generate();
        let request = create_request(&keys, "alice");

        let mut card = validator
            .validate_create(&request, &headers_for("alice"))
            .await
            .unwrap();
        card.chain_id = "chain-1".into();
        store.save_card(&card).await.unwrap();

        let err = validator
            .validate_create(&request, &headers_for("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SnapshotNotUnique));
    }

    #[tokio::test]
    async fn test_delete_constraints() {
        let store = Arc::new(MemoryStore::new());
        let validator = CardValidator::new(store.clone());

        // Seed a card to delete.
        let keys = KeyPair::generate();
        let request = create_request(&keys, "alice");
        let mut existing = validator
            .validate_create(&request, &headers_for("alice"))
            .await
            .unwrap();
        existing.chain_id = "chain-1".into();
        store.save_card(&existing).await.unwrap();

        // A tombstone card with a public key is rejected.
        let (content_snapshot, _) =
            snapshot_for("alice", Some(&keys.public_key_bytes()), &existing.id);
        let bad = CardBaseRequest {
            content_snapshot,
            signatures: vec![Stamp {
                signer: SIGNER_SELF.into(),
                signature: "c2ln".into(),
                snapshot: None,
            }],
        };
        let err = validator
            .validate_delete(&bad, &headers_for("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PublicKeyMustBeEmpty));

        // A tombstone card without a predecessor is rejected.
        let (content_snapshot, _) = snapshot_for("alice", None, "");
        let bad = CardBaseRequest {
            content_snapshot,
            signatures: vec![Stamp {
                signer: SIGNER_SELF.into(),
                signature: "c2ln".into(),
                snapshot: None,
            }],
        };
        let err = validator
            .validate_delete(&bad, &headers_for("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DeleteCardIdRequired));

        // The well-formed tombstone passes with no verifiable signature.
        let (content_snapshot, _) = snapshot_for("alice", None, &existing.id);
        let good = CardBaseRequest {
            content_snapshot,
            signatures: vec![Stamp {
                signer: SIGNER_SELF.into(),
                signature: "c2ln".into(),
                snapshot: None,
            }],
        };
        let card = validator
            .validate_delete(&good, &headers_for("alice"))
            .await
            .unwrap();
        assert!(card.public_key.is_empty());
        assert_eq!(card.previous_card_id, existing.id);
    }

    #[test]
    fn test_search_limits() {
        assert!(matches!(
            validate_search(&[]),
            Err(ApiError::SearchIdentitiesEmpty)
        ));

        let too_many: Vec<String> = (0..=SEARCH_IDENTITIES_LIMIT)
            .map(|i| format!("identity-{i}"))
            .collect();
        assert!(matches!(
            validate_search(&too_many),
            Err(ApiError::SearchIdentitiesLimited)
        ));

        let at_limit: Vec<String> = (0..SEARCH_IDENTITIES_LIMIT)
            .map(|i| format!("identity-{i}"))
            .collect();
        assert!(validate_search(&at_limit).is_ok());
    }
}

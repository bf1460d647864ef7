//! Chain and supersession validation
//!
//! Cross-entity rules for a card that declares a predecessor: the
//! predecessor must exist, live in the same tenant scope, carry the same
//! identity, and have no successor yet. This stage reads the store but never
//! writes; the successor index taken inside `save_card` remains the
//! authoritative guard under concurrency.

use crate::api::error::ApiError;
use crate::storage::CardStore;

/// Validate the declared predecessor, if any.
pub async fn validate_previous_card(
    store: &dyn CardStore,
    previous_card_id: &str,
    application_id: &str,
    identity: &str,
) -> Result<(), ApiError> {
    if previous_card_id.is_empty() {
        return Ok(());
    }

    if store.has_successor(previous_card_id, application_id).await? {
        return Err(ApiError::PreviousCardSuperseded);
    }

    let previous = store
        .get_card(previous_card_id)
        .await?
        .ok_or(ApiError::PreviousCardNotFound)?;

    if !previous.scope_matches(application_id) {
        return Err(ApiError::PreviousCardWrongScope);
    }
    if previous.identity != identity {
        return Err(ApiError::PreviousCardIdentityMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use cards_core::Card;

    async fn store_with_card(id: &str, identity: &str, scope: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .save_card(&Card {
                id: id.into(),
                identity: identity.into(),
                application_id: scope.into(),
                chain_id: "chain-1".into(),
                created_at: 1_700_000_000,
                ..Card::default()
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_root_card_passes() {
        let store = MemoryStore::new();
        validate_previous_card(&store, "", "app", "alice")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_valid_predecessor_passes() {
        let store = store_with_card("prev-1", "alice", "app").await;
        validate_previous_card(&store, "prev-1", "app", "alice")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_predecessor() {
        let store = MemoryStore::new();
        let err = validate_previous_card(&store, "missing", "app", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PreviousCardNotFound));
    }

    #[tokio::test]
    async fn test_predecessor_in_another_scope() {
        let store = store_with_card("prev-1", "alice", "other-app").await;
        let err = validate_previous_card(&store, "prev-1", "app", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PreviousCardWrongScope));
    }

    #[tokio::test]
    async fn test_predecessor_identity_mismatch() {
        let store = store_with_card("prev-1", "bob", "app").await;
        let err = validate_previous_card(&store, "prev-1", "app", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PreviousCardIdentityMismatch));
    }

    #[tokio::test]
    async fn test_predecessor_already_superseded() {
        let store = store_with_card("prev-1", "alice", "app").await;
        store
            .save_card(&Card {
                id: "succ-1".into(),
                identity: "alice".into(),
                application_id: "app".into(),
                chain_id: "chain-1".into(),
                previous_card_id: "prev-1".into(),
                created_at: 1_700_000_001,
                ..Card::default()
            })
            .await
            .unwrap();

        let err = validate_previous_card(&store, "prev-1", "app", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PreviousCardSuperseded));
    }
}

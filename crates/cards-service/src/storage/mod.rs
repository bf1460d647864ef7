//! Storage abstraction for the card directory
//!
//! The store keeps four projections of the card collection and must hold
//! them mutually consistent per write:
//!
//! | projection          | key                                   | purpose                         |
//! |---------------------|---------------------------------------|---------------------------------|
//! | card_by_card_id     | id                                    | point lookup, source of truth   |
//! | card_by_identity    | (identity, application_id, id)        | identity-scoped scans           |
//! | card_previous_ids   | (previous_card_id, application_id)    | unique successor index          |
//! | card_chain          | (identity, application_id, chain_id)  | chain membership and tombstone  |
//!
//! The successor index is the authoritative guard against concurrent double
//! supersession: `save_card` fails with [`StorageError::SuccessorExists`]
//! when the `(previous_card_id, application_id)` slot is already taken, and
//! the chain validator's earlier read is only an optimistic fast path.

pub mod cql;
pub mod memory;
#[cfg(feature = "scylla")]
pub mod scylla;

pub use memory::MemoryStore;
#[cfg(feature = "scylla")]
pub use scylla::ScyllaStore;

use async_trait::async_trait;
use std::fmt::Debug;
use uuid::Uuid;

use cards_core::{Card, Stamp};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The successor slot for a predecessor is already taken in this scope.
    #[error("a successor of card ({previous_card_id}) already exists in application ({application_id})")]
    SuccessorExists {
        previous_card_id: String,
        application_id: String,
    },

    /// A predecessor row exists without a usable chain id.
    #[error("chain id of previous card ({0}) is missing or empty")]
    MissingChainId(String),

    #[error("database error: {0}")]
    Database(String),
}

/// The search projection of a card: only what the wire DTO needs.
#[derive(Debug, Clone, Default)]
pub struct CardDocument {
    pub content_snapshot: String,
    pub signatures: Vec<Stamp>,
}

/// Storage backend for cards and their chains.
///
/// Implementations must be thread-safe; one logical cluster is assumed, so
/// no cross-store coordination happens above this trait.
#[async_trait]
pub trait CardStore: Send + Sync + Debug {
    /// Load a card by its content-derived id.
    async fn get_card(&self, id: &str) -> Result<Option<Card>, StorageError>;

    /// True if any card claims this predecessor in this scope.
    async fn has_successor(
        &self,
        previous_card_id: &str,
        application_id: &str,
    ) -> Result<bool, StorageError>;

    /// Persist a card across all projections.
    ///
    /// For a successor this also takes the `(previous_card_id,
    /// application_id)` successor slot; a lost race surfaces as
    /// [`StorageError::SuccessorExists`].
    async fn save_card(&self, card: &Card) -> Result<(), StorageError>;

    /// The latest live cards of the given identities within one scope.
    ///
    /// Chains with a tombstone are skipped entirely.
    async fn search_by_identities(
        &self,
        identities: &[String],
        application_id: &str,
    ) -> Result<Vec<CardDocument>, StorageError>;

    /// True iff the chain row exists with `deleted_at > 0`.
    async fn is_chain_deleted(
        &self,
        identity: &str,
        application_id: &str,
        chain_id: &str,
    ) -> Result<bool, StorageError>;

    /// Tombstone a chain, conditional on it being live.
    ///
    /// Returns whether the update applied; `false` means the chain was
    /// already deleted (or never existed). Deletion is one-way.
    async fn set_chain_deleted(
        &self,
        identity: &str,
        application_id: &str,
        chain_id: &str,
        deleted_at: i64,
    ) -> Result<bool, StorageError>;

    /// Assign the card's chain id: fresh for a root, inherited otherwise.
    async fn assign_chain_id(&self, card: &mut Card) -> Result<(), StorageError> {
        if card.previous_card_id.is_empty() {
            card.chain_id = Uuid::new_v4().to_string();
            return Ok(());
        }

        let previous = self
            .get_card(&card.previous_card_id)
            .await?
            .ok_or_else(|| StorageError::MissingChainId(card.previous_card_id.clone()))?;
        if previous.chain_id.is_empty() {
            return Err(StorageError::MissingChainId(card.previous_card_id.clone()));
        }

        card.chain_id = previous.chain_id;
        Ok(())
    }
}

//! In-memory storage backend
//!
//! Default backend for development and tests. All four projections live
//! under one write lock, so a save is atomic with respect to readers; data
//! is lost on restart.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use cards_core::Card;

use super::{CardDocument, CardStore, StorageError};

/// In-memory card store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    projections: RwLock<Projections>,
}

#[derive(Debug, Default)]
struct Projections {
    cards_by_id: HashMap<String, Card>,
    /// (identity, application_id) -> card ids; kept for identity scans.
    cards_by_identity: HashMap<(String, String), BTreeSet<String>>,
    /// Unique successor index: (previous_card_id, application_id).
    previous_ids: HashSet<(String, String)>,
    /// (identity, application_id, chain_id) -> chain row.
    chains: HashMap<(String, String, String), ChainRow>,
}

#[derive(Debug, Default)]
struct ChainRow {
    ids: BTreeSet<String>,
    created_at: i64,
    /// 0 means live; a positive value is the tombstone time.
    deleted_at: i64,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn get_card(&self, id: &str) -> Result<Option<Card>, StorageError> {
        let projections = self.projections.read().unwrap();
        Ok(projections.cards_by_id.get(id).cloned())
    }

    async fn has_successor(
        &self,
        previous_card_id: &str,
        application_id: &str,
    ) -> Result<bool, StorageError> {
        let projections = self.projections.read().unwrap();
        Ok(projections
            .previous_ids
            .contains(&(previous_card_id.to_string(), application_id.to_string())))
    }

    async fn save_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut projections = self.projections.write().unwrap();

        // Take the successor slot first; losing this race must leave the
        // other projections untouched.
        if !card.previous_card_id.is_empty() {
            let slot = (card.previous_card_id.clone(), card.application_id.clone());
            if !projections.previous_ids.insert(slot) {
                return Err(StorageError::SuccessorExists {
                    previous_card_id: card.previous_card_id.clone(),
                    application_id: card.application_id.clone(),
                });
            }
        }

        projections
            .cards_by_id
            .insert(card.id.clone(), card.clone());
        projections
            .cards_by_identity
            .entry((card.identity.clone(), card.application_id.clone()))
            .or_default()
            .insert(card.id.clone());

        let chain = projections
            .chains
            .entry((
                card.identity.clone(),
                card.application_id.clone(),
                card.chain_id.clone(),
            ))
            .or_default();
        chain.ids.insert(card.id.clone());
        if card.previous_card_id.is_empty() {
            chain.created_at = card.created_at;
            chain.deleted_at = 0;
        }

        Ok(())
    }

    async fn search_by_identities(
        &self,
        identities: &[String],
        application_id: &str,
    ) -> Result<Vec<CardDocument>, StorageError> {
        let projections = self.projections.read().unwrap();

        let mut card_ids = BTreeSet::new();
        for ((identity, scope, _), chain) in &projections.chains {
            if scope != application_id || !identities.contains(identity) {
                continue;
            }
            if chain.deleted_at > 0 {
                continue;
            }
            card_ids.extend(chain.ids.iter().cloned());
        }

        if card_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(card_ids
            .iter()
            .filter_map(|id| projections.cards_by_id.get(id))
            .map(|card| CardDocument {
                content_snapshot: card.content_snapshot.clone(),
                signatures: card.signatures.clone(),
            })
            .collect())
    }

    async fn is_chain_deleted(
        &self,
        identity: &str,
        application_id: &str,
        chain_id: &str,
    ) -> Result<bool, StorageError> {
        let projections = self.projections.read().unwrap();
        Ok(projections
            .chains
            .get(&(
                identity.to_string(),
                application_id.to_string(),
                chain_id.to_string(),
            ))
            .is_some_and(|chain| chain.deleted_at > 0))
    }

    async fn set_chain_deleted(
        &self,
        identity: &str,
        application_id: &str,
        chain_id: &str,
        deleted_at: i64,
    ) -> Result<bool, StorageError> {
        let mut projections = self.projections.write().unwrap();
        let Some(chain) = projections.chains.get_mut(&(
            identity.to_string(),
            application_id.to_string(),
            chain_id.to_string(),
        )) else {
            return Ok(false);
        };

        if chain.deleted_at != 0 {
            return Ok(false);
        }

        chain.deleted_at = deleted_at;
        Ok(true)
    }
}

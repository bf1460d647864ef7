//! Cassandra/Scylla storage backend
//!
//! Persistent backend over the four column families of [`super::cql`].
//! Writes go out as one unlogged batch tagged LOCAL_QUORUM; the successor
//! slot is taken with a lightweight transaction before the batch, so a lost
//! race never touches the other projections. The batch itself is not
//! linearizable across its members — the successor index is the guard.
//!
//! # Environment
//!
//! - `CARDS_CASSANDRA`: contact points and keyspace,
//!   e.g. `db-1:9042,db-2:9042/cards`

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

use scylla::batch::{Batch, BatchType};
use scylla::statement::Consistency;
use scylla::{Session, SessionBuilder};
use tracing::info;

use cards_core::codec::{base64_decode, base64_encode};
use cards_core::{Card, Stamp};

use super::{cql, CardDocument, CardStore, StorageError};

/// Scylla/Cassandra card store implementation
pub struct ScyllaStore {
    session: Session,
}

impl std::fmt::Debug for ScyllaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaStore").finish_non_exhaustive()
    }
}

impl ScyllaStore {
    /// Connect to the cluster and bind the keyspace.
    pub async fn connect(nodes: &[String], keyspace: &str) -> Result<Self, StorageError> {
        let session = SessionBuilder::new()
            .known_nodes(nodes)
            .use_keyspace(keyspace, false)
            .build()
            .await
            .map_err(db_err)?;

        info!(keyspace = %keyspace, "connected to the card store cluster");

        Ok(Self { session })
    }

    fn card_row_values(card: &Card) -> CardRowValues {
        (
            card.id.clone(),
            card.identity.clone(),
            base64_encode(&card.public_key),
            card.content_snapshot.clone(),
            card.version.clone(),
            card.application_id.clone(),
            card.previous_card_id.clone(),
            stamps_to_rows(&card.signatures),
            card.created_at,
            card.chain_id.clone(),
        )
    }
}

type SignatureRows = Vec<HashMap<String, String>>;

type CardRowValues = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    SignatureRows,
    i64,
    String,
);

#[async_trait]
impl CardStore for ScyllaStore {
    async fn get_card(&self, id: &str) -> Result<Option<Card>, StorageError> {
        let result = self
            .session
            .query(cql::select_card_by_id(), (id,))
            .await
            .map_err(db_err)?;

        let Some((
            id,
            identity,
            public_key,
            content_snapshot,
            version,
            application_id,
            previous_card_id,
            signatures,
            created_at,
            chain_id,
        )) = result
            .maybe_first_row_typed::<(
                String,
                String,
                String,
                String,
                String,
                String,
                String,
                Option<SignatureRows>,
                i64,
                String,
            )>()
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let public_key = base64_decode(&public_key).map_err(|err| {
            StorageError::Database(format!("stored public key of card ({id}) is not base64: {err}"))
        })?;

        Ok(Some(Card {
            id,
            content_snapshot,
            public_key,
            identity,
            version,
            created_at,
            previous_card_id,
            application_id,
            chain_id,
            signatures: rows_to_stamps(signatures.unwrap_or_default()),
            is_superseded: false,
        }))
    }

    async fn has_successor(
        &self,
        previous_card_id: &str,
        application_id: &str,
    ) -> Result<bool, StorageError> {
        let result = self
            .session
            .query(cql::select_successor(), (previous_card_id, application_id))
            .await
            .map_err(db_err)?;

        Ok(result
            .maybe_first_row_typed::<(String,)>()
            .map_err(db_err)?
            .is_some())
    }

    async fn save_card(&self, card: &Card) -> Result<(), StorageError> {
        // Claim the successor slot first; the insert conflict is the
        // authoritative answer under concurrent supersession.
        if !card.previous_card_id.is_empty() {
            let result = self
                .session
                .query(
                    cql::insert_successor_if_absent(),
                    (card.previous_card_id.as_str(), card.application_id.as_str()),
                )
                .await
                .map_err(db_err)?;

            if !lwt_applied(result) {
                return Err(StorageError::SuccessorExists {
                    previous_card_id: card.previous_card_id.clone(),
                    application_id: card.application_id.clone(),
                });
            }
        }

        let mut batch = Batch::new(BatchType::Unlogged);
        batch.set_consistency(Consistency::LocalQuorum);
        batch.append_statement(cql::insert_card(cql::TABLE_CARD_BY_CARD_ID).as_str());
        batch.append_statement(cql::insert_card(cql::TABLE_CARD_BY_IDENTITY).as_str());

        let chain_values = (
            card.identity.clone(),
            card.application_id.clone(),
            card.chain_id.clone(),
        );

        if card.previous_card_id.is_empty() {
            batch.append_statement(cql::upsert_chain_root(&card.id).as_str());
            self.session
                .batch(
                    &batch,
                    (
                        Self::card_row_values(card),
                        Self::card_row_values(card),
                        (
                            card.created_at,
                            chain_values.0,
                            chain_values.1,
                            chain_values.2,
                        ),
                    ),
                )
                .await
                .map_err(db_err)?;
        } else {
            batch.append_statement(cql::upsert_chain_successor(&card.id).as_str());
            self.session
                .batch(
                    &batch,
                    (
                        Self::card_row_values(card),
                        Self::card_row_values(card),
                        chain_values,
                    ),
                )
                .await
                .map_err(db_err)?;
        }

        Ok(())
    }

    async fn search_by_identities(
        &self,
        identities: &[String],
        application_id: &str,
    ) -> Result<Vec<CardDocument>, StorageError> {
        let result = self
            .session
            .query(cql::select_chains_by_identities(identities), (application_id,))
            .await
            .map_err(db_err)?;

        let mut card_ids = BTreeSet::new();
        for row in result
            .rows_typed::<(i64, Option<Vec<String>>)>()
            .map_err(db_err)?
        {
            let (deleted_at, ids) = row.map_err(db_err)?;
            if deleted_at > 0 {
                continue;
            }
            card_ids.extend(ids.unwrap_or_default());
        }

        if card_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = card_ids.into_iter().collect();
        let result = self
            .session
            .query(cql::select_cards_by_ids(&ids), ())
            .await
            .map_err(db_err)?;

        let mut documents = Vec::new();
        for row in result
            .rows_typed::<(String, Option<SignatureRows>)>()
            .map_err(db_err)?
        {
            let (content_snapshot, signatures) = row.map_err(db_err)?;
            documents.push(CardDocument {
                content_snapshot,
                signatures: rows_to_stamps(signatures.unwrap_or_default()),
            });
        }

        Ok(documents)
    }

    async fn is_chain_deleted(
        &self,
        identity: &str,
        application_id: &str,
        chain_id: &str,
    ) -> Result<bool, StorageError> {
        let result = self
            .session
            .query(
                cql::select_chain_deleted_at(),
                (identity, application_id, chain_id),
            )
            .await
            .map_err(db_err)?;

        Ok(result
            .maybe_first_row_typed::<(i64,)>()
            .map_err(db_err)?
            .is_some_and(|(deleted_at,)| deleted_at > 0))
    }

    async fn set_chain_deleted(
        &self,
        identity: &str,
        application_id: &str,
        chain_id: &str,
        deleted_at: i64,
    ) -> Result<bool, StorageError> {
        let result = self
            .session
            .query(
                cql::set_chain_deleted_at(),
                (deleted_at, identity, application_id, chain_id),
            )
            .await
            .map_err(db_err)?;

        Ok(lwt_applied(result))
    }
}

/// Read the `[applied]` column of a lightweight-transaction result.
fn lwt_applied(result: scylla::QueryResult) -> bool {
    result
        .rows
        .into_iter()
        .flatten()
        .next()
        .and_then(|row| row.columns.into_iter().next().flatten())
        .and_then(|value| value.as_boolean())
        .unwrap_or(false)
}

fn stamps_to_rows(stamps: &[Stamp]) -> SignatureRows {
    stamps
        .iter()
        .map(|stamp| {
            HashMap::from([
                ("signer".to_string(), stamp.signer.clone()),
                ("signature".to_string(), stamp.signature.clone()),
                (
                    "snapshot".to_string(),
                    stamp.snapshot.clone().unwrap_or_default(),
                ),
            ])
        })
        .collect()
}

fn rows_to_stamps(rows: SignatureRows) -> Vec<Stamp> {
    rows.into_iter()
        .map(|mut row| Stamp {
            signer: row.remove("signer").unwrap_or_default(),
            signature: row.remove("signature").unwrap_or_default(),
            snapshot: row.remove("snapshot").filter(|s| !s.is_empty()),
        })
        .collect()
}

fn db_err(err: impl std::fmt::Display) -> StorageError {
    StorageError::Database(err.to_string())
}

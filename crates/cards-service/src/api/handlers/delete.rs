//! Chain delete handler
//!
//! POST /card/actions/delete tombstones a whole chain with a service-signed
//! tombstone card. The chain id comes from the declared predecessor; the
//! tombstone itself is saved only after the conditional chain update
//! applied, so deletion stays one-way.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use cards_core::Card;

use super::AppState;
use crate::api::error::ApiError;
use crate::api::request::{parse_body, CardBaseRequest, CardResponse, RequestHeaders};

pub async fn card_delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CardResponse>, ApiError> {
    let headers = RequestHeaders::from_headers(&headers)?;
    let request: CardBaseRequest = parse_body(&body)?;

    match delete_chain(&state, &headers, &request).await {
        Ok(card) => {
            state
                .meter
                .chain_delete_success(&headers.account_id, &headers.application_id);

            info!(
                card_id = %card.id,
                chain_id = %card.chain_id,
                application_id = %headers.application_id,
                "chain tombstoned"
            );

            Ok(Json(CardResponse::from(card)))
        }
        Err(err) => {
            state
                .meter
                .chain_delete_error(&headers.account_id, &headers.application_id);
            Err(err)
        }
    }
}

async fn delete_chain(
    state: &AppState,
    headers: &RequestHeaders,
    request: &CardBaseRequest,
) -> Result<Card, ApiError> {
    headers.require_identity()?;

    let mut card = state.validator.validate_delete(request, headers).await?;

    state.store.assign_chain_id(&mut card).await?;

    state
        .signer
        .sign_card(&mut card)
        .map_err(|err| ApiError::internal(format!("sign card ({}) error: {err}", card.id)))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| ApiError::internal(format!("system clock error: {err}")))?
        .as_secs() as i64;

    let applied = state
        .store
        .set_chain_deleted(&headers.identity, &headers.application_id, &card.chain_id, now)
        .await?;
    if !applied {
        return Err(ApiError::ChainDeleted);
    }

    state.store.save_card(&card).await?;

    Ok(card)
}

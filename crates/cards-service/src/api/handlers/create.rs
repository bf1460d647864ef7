//! Card create handler
//!
//! POST /card registers a root card or supersedes an existing one. The
//! pipeline: validate -> assign chain id -> refuse tombstoned chains ->
//! counter-sign -> save. Success emits the create or override event
//! depending on whether the card declared a predecessor.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::sync::Arc;
use tracing::info;

use cards_core::Card;

use super::AppState;
use crate::api::error::ApiError;
use crate::api::request::{parse_body, CardBaseRequest, CardResponse, RequestHeaders};

pub async fn card_create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<CardResponse>), ApiError> {
    let headers = RequestHeaders::from_headers(&headers)?;
    let request: CardBaseRequest = parse_body(&body)?;

    match create_card(&state, &headers, &request).await {
        Ok(card) => {
            if card.previous_card_id.is_empty() {
                state
                    .meter
                    .card_create_success(&headers.account_id, &headers.application_id);
            } else {
                state
                    .meter
                    .card_override_success(&headers.account_id, &headers.application_id);
            }

            info!(
                card_id = %card.id,
                application_id = %headers.application_id,
                superseding = !card.previous_card_id.is_empty(),
                "card registered"
            );

            Ok((StatusCode::CREATED, Json(CardResponse::from(card))))
        }
        Err(err) => {
            state
                .meter
                .card_create_error(&headers.account_id, &headers.application_id);
            Err(err)
        }
    }
}

async fn create_card(
    state: &AppState,
    headers: &RequestHeaders,
    request: &CardBaseRequest,
) -> Result<Card, ApiError> {
    headers.require_identity()?;

    let mut card = state.validator.validate_create(request, headers).await?;

    state.store.assign_chain_id(&mut card).await?;

    // Supersession only: a tombstoned chain never grows again.
    if !card.previous_card_id.is_empty()
        && state
            .store
            .is_chain_deleted(&headers.identity, &headers.application_id, &card.chain_id)
            .await?
    {
        return Err(ApiError::ChainDeleted);
    }

    state
        .signer
        .sign_card(&mut card)
        .map_err(|err| ApiError::internal(format!("sign card ({}) error: {err}", card.id)))?;

    state.store.save_card(&card).await?;

    Ok(card)
}

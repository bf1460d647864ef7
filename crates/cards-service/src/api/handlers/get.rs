//! Card get handler
//!
//! GET /card/{card_id} returns the card by its content-derived id, confined
//! to the caller's scope. When a successor exists, the response carries the
//! superseded marker header.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use cards_core::Card;

use super::AppState;
use crate::api::error::ApiError;
use crate::api::request::{CardResponse, RequestHeaders, HEADER_IS_SUPERSEDED};

pub async fn card_get(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let headers = RequestHeaders::from_headers(&headers)?;

    match get_card(&state, &headers, &card_id).await {
        Ok(card) => {
            state
                .meter
                .card_get_success(&headers.account_id, &headers.application_id);

            let is_superseded = card.is_superseded;
            let mut response = Json(CardResponse::from(card)).into_response();
            if is_superseded {
                response
                    .headers_mut()
                    .insert(HEADER_IS_SUPERSEDED, HeaderValue::from_static("true"));
            }
            Ok(response)
        }
        Err(err) => {
            state
                .meter
                .card_get_error(&headers.account_id, &headers.application_id);
            Err(err)
        }
    }
}

async fn get_card(
    state: &AppState,
    headers: &RequestHeaders,
    card_id: &str,
) -> Result<Card, ApiError> {
    let mut card = state
        .store
        .get_card(card_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !card.scope_matches(&headers.application_id) {
        return Err(ApiError::ScopeMismatch);
    }

    card.is_superseded = state
        .store
        .has_successor(&card.id, &card.application_id)
        .await?;

    Ok(card)
}

//! Card search handler
//!
//! POST /card/actions/search returns the latest live cards for a batch of
//! identities within the caller's scope. Tombstoned chains are excluded by
//! the store; an empty result is a success.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;

use super::AppState;
use crate::api::error::ApiError;
use crate::api::request::{parse_body, CardResponse, CardSearchRequest, RequestHeaders};
use crate::core::validator::validate_search;

pub async fn card_search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<CardResponse>>, ApiError> {
    let headers = RequestHeaders::from_headers(&headers)?;
    let request: CardSearchRequest = parse_body(&body)?;

    match search_cards(&state, &headers, &request).await {
        Ok(cards) => {
            state
                .meter
                .card_search_success(&headers.account_id, &headers.application_id);
            Ok(Json(cards))
        }
        Err(err) => {
            state
                .meter
                .card_search_error(&headers.account_id, &headers.application_id);
            Err(err)
        }
    }
}

async fn search_cards(
    state: &AppState,
    headers: &RequestHeaders,
    request: &CardSearchRequest,
) -> Result<Vec<CardResponse>, ApiError> {
    let identities = request.identities();
    validate_search(&identities)?;

    let documents = state
        .store
        .search_by_identities(&identities, &headers.application_id)
        .await?;

    Ok(documents.into_iter().map(CardResponse::from).collect())
}

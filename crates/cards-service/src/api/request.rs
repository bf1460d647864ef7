//! Request and response DTOs plus header extraction
//!
//! Bodies are decoded from raw bytes so that every framing failure maps to
//! the same parsing error instead of a transport-level rejection.

use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use cards_core::{Card, Stamp};

use crate::api::error::ApiError;
use crate::storage::CardDocument;

/// Header carrying the tenant scope (application id). Required everywhere.
pub const HEADER_APPLICATION_ID: &str = "X-Application-Id";

/// Header carrying the caller identity. Required on create and delete.
pub const HEADER_IDENTITY: &str = "X-Identity";

/// Header carrying the account id; used as a metrics label only.
pub const HEADER_ACCOUNT_ID: &str = "X-Account-Id";

/// Response header set when the fetched card has a successor.
pub const HEADER_IS_SUPERSEDED: &str = "X-Virgil-Is-Superseeded";

/// Common header values extracted from every request.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    pub identity: String,
    pub application_id: String,
    pub account_id: String,
}

impl RequestHeaders {
    /// Extract the scope, identity and account headers.
    ///
    /// The scope is mandatory for every endpoint; the identity is checked
    /// separately by the endpoints that need it.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let extracted = Self {
            identity: header_value(headers, HEADER_IDENTITY),
            application_id: header_value(headers, HEADER_APPLICATION_ID),
            account_id: header_value(headers, HEADER_ACCOUNT_ID),
        };

        if extracted.application_id.is_empty() {
            return Err(ApiError::ScopeHeaderMissing);
        }

        Ok(extracted)
    }

    /// Fail unless the caller identity header was provided.
    pub fn require_identity(&self) -> Result<(), ApiError> {
        if self.identity.is_empty() {
            return Err(ApiError::IdentityHeaderMissing);
        }
        Ok(())
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Decode a JSON request body; any framing failure is one parsing error.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::RequestParsing)
}

/// Body of a card create or delete request: the signed card object.
#[derive(Debug, Default, Deserialize)]
pub struct CardBaseRequest {
    /// Base64-encoded JSON content snapshot, stored verbatim on success.
    #[serde(default)]
    pub content_snapshot: String,

    /// Stamps proving the snapshot's validity.
    #[serde(default)]
    pub signatures: Vec<Stamp>,
}

/// Body of a card search request.
///
/// Accepts either a single `identity` or an `identities` batch; the single
/// form wins when both are present.
#[derive(Debug, Default, Deserialize)]
pub struct CardSearchRequest {
    #[serde(default)]
    pub identity: String,

    #[serde(default)]
    pub identities: Vec<String>,
}

impl CardSearchRequest {
    /// The effective identity batch to search for.
    pub fn identities(&self) -> Vec<String> {
        if !self.identity.is_empty() {
            return vec![self.identity.clone()];
        }
        self.identities.clone()
    }
}

/// The card as serialized back to clients.
///
/// Only the snapshot and the stamps cross the wire; every other attribute is
/// derivable from the snapshot on the client side.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub content_snapshot: String,
    pub signatures: Vec<Stamp>,
}

impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            content_snapshot: card.content_snapshot,
            signatures: card.signatures,
        }
    }
}

impl From<CardDocument> for CardResponse {
    fn from(document: CardDocument) -> Self {
        Self {
            content_snapshot: document.content_snapshot,
            signatures: document.signatures,
        }
    }
}

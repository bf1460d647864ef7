//! API error types and the client error envelope
//!
//! Every failure surfaces exactly once with a stable numeric code and an HTTP
//! status; outer layers never re-wrap an inner kind. Internal errors keep
//! their full cause in the log and show the client an opaque message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

/// API error type covering every client-visible failure.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request serving internal error. Try again later.")]
    Internal(String),

    #[error("Requested card entity not found.")]
    NotFound,

    #[error("Request scope application is not set.")]
    ScopeHeaderMissing,

    #[error("Request identity is not set.")]
    IdentityHeaderMissing,

    #[error("Request body parsing error. Invalid JSON, field name or field type.")]
    RequestParsing,

    #[error("Content snapshot is empty.")]
    SnapshotEmpty,

    #[error("Content snapshot is not a base64-encoded string.")]
    SnapshotNotBase64,

    #[error("Content snapshot is not a base64-encoded JSON message.")]
    SnapshotNotJson,

    #[error("Signature is missing in signature entries.")]
    StampSignatureMissing,

    #[error("Signer is missing or is incorrect in one of signature entries.")]
    StampSignerReserved,

    #[error("Self signature is missing for the Virgil Card.")]
    SelfStampMissing,

    #[error("Virgil Card version must be 5.0.")]
    VersionInvalid,

    #[error("Public key is not a base64-encoded string.")]
    PublicKeyDecoding,

    #[error("Previous Virgil Card ID is not a valid ID.")]
    PreviousCardIdInvalid,

    #[error("Previous Virgil Card ID does not exist.")]
    PreviousCardNotFound,

    #[error("Previous Virgil Card ID is registered for another application.")]
    PreviousCardWrongScope,

    #[error("Identity is incorrect. It mustn't exceed 1024 bytes.")]
    IdentityInvalid,

    #[error("Creation time is incorrect.")]
    CreatedAtInvalid,

    #[error("Extra content snapshot decoding error.")]
    StampSnapshotDecoding,

    #[error("Signature is not a base64-encoded string.")]
    SignatureDecoding,

    #[error("Signature verification failed for one of signature entries.")]
    SignatureVerificationFailed,

    #[error("Signature list must contain at least self signature.")]
    StampsTooFew,

    #[error("Signature list must contain at most eight entries.")]
    StampsTooMany,

    #[error("Extra snapshot is too long for one of signature entries. It must not exceed 1024 bytes.")]
    StampSnapshotTooLong,

    #[error("Virgil card content snapshot is not unique.")]
    SnapshotNotUnique,

    #[error("Public key exceeds 4096 bytes.")]
    PublicKeyTooLong,

    #[error("Public key is less than 16 bytes.")]
    PublicKeyTooShort,

    #[error("Self signature must be only one.")]
    SelfStampNotUnique,

    #[error("Previous Virgil Card identity doesn't match current Virgil Card one.")]
    PreviousCardIdentityMismatch,

    #[error("Identity is empty.")]
    IdentityEmpty,

    #[error("Identity is incorrect. It must match request identity.")]
    IdentityMismatch,

    #[error("Signer is empty in one of signature entries.")]
    StampSignerEmpty,

    #[error("Signer is too long in one of signature entries. It mustn't exceed 1024 characters.")]
    StampSignerTooLong,

    #[error("Previous Virgil Card exists already.")]
    PreviousCardSuperseded,

    #[error("Trying to get the Virgil Card that is scoped for another application.")]
    ScopeMismatch,

    #[error("Identity search parameter cannot be empty.")]
    SearchIdentitiesEmpty,

    #[error("Identities to search amount limited to 50.")]
    SearchIdentitiesLimited,

    #[error("Public key must be empty.")]
    PublicKeyMustBeEmpty,

    #[error("Empty card ID to delete (previous Card ID).")]
    DeleteCardIdRequired,

    #[error("Deleted card can not be deleted.")]
    ChainDeleted,
}

/// API error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
}

impl ApiError {
    /// Build an internal error carrying its full cause for the log.
    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal(detail.into())
    }

    /// The stable numeric code of this error kind.
    pub fn code(&self) -> u32 {
        match self {
            ApiError::Internal(_) => 10000,
            ApiError::NotFound => 10001,
            ApiError::ScopeHeaderMissing => 20310,
            ApiError::IdentityHeaderMissing => 20311,
            ApiError::RequestParsing => 30001,
            ApiError::SnapshotEmpty => 40001,
            ApiError::SnapshotNotBase64 => 40002,
            ApiError::SnapshotNotJson => 40003,
            ApiError::StampSignatureMissing => 40006,
            ApiError::StampSignerReserved => 40007,
            ApiError::SelfStampMissing => 40008,
            ApiError::VersionInvalid => 40011,
            ApiError::PublicKeyDecoding => 40012,
            ApiError::PreviousCardIdInvalid => 40014,
            ApiError::PreviousCardNotFound => 40015,
            ApiError::PreviousCardWrongScope => 40016,
            ApiError::IdentityInvalid => 40017,
            ApiError::CreatedAtInvalid => 40018,
            ApiError::StampSnapshotDecoding => 40019,
            ApiError::SignatureDecoding => 40020,
            ApiError::SignatureVerificationFailed => 40021,
            ApiError::StampsTooFew => 40022,
            ApiError::StampsTooMany => 40023,
            ApiError::StampSnapshotTooLong => 40026,
            ApiError::SnapshotNotUnique => 40027,
            ApiError::PublicKeyTooLong => 40029,
            ApiError::PublicKeyTooShort => 40030,
            ApiError::SelfStampNotUnique => 40031,
            ApiError::PreviousCardIdentityMismatch => 40032,
            ApiError::IdentityEmpty => 40033,
            ApiError::IdentityMismatch => 40034,
            ApiError::StampSignerEmpty => 40035,
            ApiError::StampSignerTooLong => 40036,
            ApiError::PreviousCardSuperseded => 40037,
            ApiError::ScopeMismatch => 40100,
            ApiError::SearchIdentitiesEmpty => 40200,
            ApiError::SearchIdentitiesLimited => 40300,
            ApiError::ChainDeleted => 40310,
            ApiError::PublicKeyMustBeEmpty => 40410,
            ApiError::DeleteCardIdRequired => 40420,
        }
    }

    /// The HTTP status of this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ScopeMismatch | ApiError::ChainDeleted => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(error = %detail, "internal error while serving a card request");
        }

        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            // A lost race on the successor index is the authoritative signal
            // that the predecessor is already claimed.
            StorageError::SuccessorExists { .. } => ApiError::PreviousCardSuperseded,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<cards_core::CoreError> for ApiError {
    fn from(err: cards_core::CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

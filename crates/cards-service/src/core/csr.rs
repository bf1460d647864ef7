//! Content-snapshot (card signing request) validation
//!
//! Decodes the submitted snapshot and enforces every field-level constraint,
//! in a fixed order so each failure keeps its own error code. This stage is
//! purely local — no storage is touched.

use serde::Deserialize;

use cards_core::codec::base64_decode;
use cards_core::CARD_VERSION_5;

use crate::api::error::ApiError;

pub const PUBLIC_KEY_MIN_LENGTH: usize = 16;
pub const PUBLIC_KEY_MAX_LENGTH: usize = 4096;
pub const IDENTITY_MAX_LENGTH: usize = 1024;
pub const CARD_ID_LENGTH: usize = 64;

/// The parsed card signing request carried inside the content snapshot.
#[derive(Debug, Default, Deserialize)]
pub struct Csr {
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub previous_card_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub created_at: i64,
}

/// Decoded byte parameters, kept so later stages never re-decode.
#[derive(Debug, Default)]
pub struct DecodedParams {
    /// The raw decoded content snapshot; the card id hashes exactly this.
    pub csr: Vec<u8>,
    pub public_key: Vec<u8>,
    /// Bound from the self-stamp during signature verification.
    pub extra_snapshot: Vec<u8>,
}

/// Validate the content snapshot against the request identity.
pub fn validate_csr(snapshot: &str, request_identity: &str) -> Result<(Csr, DecodedParams), ApiError> {
    if snapshot.is_empty() {
        return Err(ApiError::SnapshotEmpty);
    }

    let csr_bytes = base64_decode(snapshot).map_err(|_| ApiError::SnapshotNotBase64)?;
    let csr = parse_csr(&csr_bytes)?;
    let public_key = decode_public_key(&csr.public_key)?;

    validate_identity(&csr.identity, request_identity)?;
    validate_previous_card_id(&csr.previous_card_id)?;
    validate_created_at(csr.created_at)?;
    validate_version(&csr.version)?;

    Ok((
        csr,
        DecodedParams {
            csr: csr_bytes,
            public_key,
            extra_snapshot: Vec::new(),
        },
    ))
}

/// Parse the decoded snapshot with strict field typing.
///
/// A type error on `created_at` keeps its own error code; nulls are dropped
/// so an explicit `null` behaves like an absent field.
fn parse_csr(raw: &[u8]) -> Result<Csr, ApiError> {
    let mut value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|_| ApiError::SnapshotNotJson)?;

    let Some(fields) = value.as_object_mut() else {
        return Err(ApiError::SnapshotNotJson);
    };

    if let Some(created_at) = fields.get("created_at") {
        if !created_at.is_null() && created_at.as_i64().is_none() {
            return Err(ApiError::CreatedAtInvalid);
        }
    }
    fields.retain(|_, field| !field.is_null());

    serde_json::from_value(value).map_err(|_| ApiError::SnapshotNotJson)
}

fn decode_public_key(key: &str) -> Result<Vec<u8>, ApiError> {
    if key.is_empty() {
        return Ok(Vec::new());
    }

    let decoded = base64_decode(key).map_err(|_| ApiError::PublicKeyDecoding)?;
    if decoded.len() > PUBLIC_KEY_MAX_LENGTH {
        return Err(ApiError::PublicKeyTooLong);
    }

    Ok(decoded)
}

fn validate_identity(identity: &str, request_identity: &str) -> Result<(), ApiError> {
    if identity.is_empty() {
        return Err(ApiError::IdentityEmpty);
    }
    if identity.len() > IDENTITY_MAX_LENGTH {
        return Err(ApiError::IdentityInvalid);
    }
    if identity != request_identity {
        return Err(ApiError::IdentityMismatch);
    }

    Ok(())
}

fn validate_previous_card_id(id: &str) -> Result<(), ApiError> {
    if !id.is_empty() && id.len() != CARD_ID_LENGTH {
        return Err(ApiError::PreviousCardIdInvalid);
    }

    Ok(())
}

fn validate_created_at(created_at: i64) -> Result<(), ApiError> {
    if created_at <= 0 {
        return Err(ApiError::CreatedAtInvalid);
    }

    Ok(())
}

fn validate_version(version: &str) -> Result<(), ApiError> {
    if version != CARD_VERSION_5 {
        return Err(ApiError::VersionInvalid);
    }

    Ok(())
}

//! Card and stamp domain records

use serde::{Deserialize, Serialize};

/// The only card version this service issues.
pub const CARD_VERSION_5: &str = "5.0";

/// Signer label of the submitter's own stamp.
pub const SIGNER_SELF: &str = "self";

/// Signer label of a tenant application co-signature.
pub const SIGNER_APP: &str = "app";

/// Signer label reserved for the service counter-signature.
pub const SIGNER_VIRGIL: &str = "virgil";

/// One signature entry within a card's signature list.
///
/// Stamps cross the wire verbatim in both directions, so the serde shape here
/// is the wire shape: `snapshot` is omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    #[serde(default)]
    pub signer: String,

    /// Base64-encoded signature over `snapshot ‖ extra_snapshot`.
    #[serde(default)]
    pub signature: String,

    /// Optional base64-encoded extra snapshot bound into the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl Stamp {
    pub fn is_self(&self) -> bool {
        self.signer == SIGNER_SELF
    }

    pub fn is_app(&self) -> bool {
        self.signer == SIGNER_APP
    }

    pub fn is_virgil(&self) -> bool {
        self.signer == SIGNER_VIRGIL
    }
}

/// The card record as validated and persisted.
///
/// Immutable once saved. Only `content_snapshot` and `signatures` are ever
/// serialized back to clients — every other attribute is derivable from the
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct Card {
    /// 64-char lowercase hex, first 32 bytes of SHA-512 of the decoded snapshot.
    pub id: String,

    /// The base64-encoded snapshot exactly as submitted.
    pub content_snapshot: String,

    /// Decoded public key bytes; empty on a chain tombstone.
    pub public_key: Vec<u8>,

    pub identity: String,
    pub version: String,

    /// Seconds since epoch, client-declared.
    pub created_at: i64,

    /// Empty for a root card, else the 64-char id of the card replaced.
    pub previous_card_id: String,

    /// Tenant scope the card belongs to.
    pub application_id: String,

    /// UUIDv4 shared by all cards of a supersession chain.
    pub chain_id: String,

    pub signatures: Vec<Stamp>,

    /// Read-side derivation: a successor for this card exists in this scope.
    pub is_superseded: bool,
}

impl Card {
    /// True when the card belongs to the given tenant scope.
    pub fn scope_matches(&self, application_id: &str) -> bool {
        self.application_id == application_id
    }
}

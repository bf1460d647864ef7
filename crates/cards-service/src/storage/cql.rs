//! CQL statements for the four card column families
//!
//! Statement text lives here, away from the driver glue, so the quoting
//! rules are testable without a cluster. User-supplied strings that end up
//! inside `IN (...)` literal lists MUST have every single quote doubled —
//! the only literal-string metacharacter in CQL.

/// Full card rows, keyed by card id.
pub const TABLE_CARD_BY_CARD_ID: &str = "card_by_card_id";

/// Full card rows, keyed by (identity, application_id, id).
pub const TABLE_CARD_BY_IDENTITY: &str = "card_by_identity";

/// Unique successor index, keyed by (previous_card_id, application_id).
pub const TABLE_CARD_PREVIOUS_IDS: &str = "card_previous_ids";

/// Chain membership and tombstone, keyed by (identity, application_id, chain_id).
pub const TABLE_CARD_CHAIN: &str = "card_chain";

/// Double every single quote in a user-supplied string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a quoted, escaped, comma-separated literal list for `IN (...)`.
pub fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{}'", escape_literal(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Insert a full card row into one of the two card tables.
pub fn insert_card(table: &str) -> String {
    format!(
        "INSERT INTO {table} (id, identity, public_key, content_snapshot, version, \
         application_id, previous_card_id, signatures, created_at_timestamp, chain_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
}

/// Select the full card row by id, column for column as inserted.
pub fn select_card_by_id() -> String {
    format!(
        "SELECT id, identity, public_key, content_snapshot, version, \
         application_id, previous_card_id, signatures, created_at_timestamp, chain_id \
         FROM {TABLE_CARD_BY_CARD_ID} WHERE id = ?"
    )
}

/// Probe the successor index for a `(previous_card_id, application_id)` slot.
pub fn select_successor() -> String {
    format!(
        "SELECT previous_card_id FROM {TABLE_CARD_PREVIOUS_IDS} \
         WHERE previous_card_id = ? AND application_id = ? LIMIT 1"
    )
}

/// Take the successor slot; `[applied]` answers whether it was free.
pub fn insert_successor_if_absent() -> String {
    format!(
        "INSERT INTO {TABLE_CARD_PREVIOUS_IDS} (previous_card_id, application_id) \
         VALUES (?, ?) IF NOT EXISTS"
    )
}

/// Upsert the chain row for a root card: seed the ids set and reset the
/// tombstone. The card id lands in the statement text as a set literal, so
/// it is escaped here.
pub fn upsert_chain_root(card_id: &str) -> String {
    format!(
        "UPDATE {TABLE_CARD_CHAIN} \
         SET ids = ids + {{'{}'}}, created_at_timestamp = ?, deleted_at = 0 \
         WHERE identity = ? AND application_id = ? AND chain_id = ?",
        escape_literal(card_id)
    )
}

/// Grow the chain row's ids set for a successor card.
pub fn upsert_chain_successor(card_id: &str) -> String {
    format!(
        "UPDATE {TABLE_CARD_CHAIN} SET ids = ids + {{'{}'}} \
         WHERE identity = ? AND application_id = ? AND chain_id = ?",
        escape_literal(card_id)
    )
}

/// Read a chain's tombstone time.
pub fn select_chain_deleted_at() -> String {
    format!(
        "SELECT deleted_at FROM {TABLE_CARD_CHAIN} \
         WHERE identity = ? AND application_id = ? AND chain_id = ?"
    )
}

/// Tombstone a chain, conditional on it being live.
pub fn set_chain_deleted_at() -> String {
    format!(
        "UPDATE {TABLE_CARD_CHAIN} SET deleted_at = ? \
         WHERE identity = ? AND application_id = ? AND chain_id = ? IF deleted_at = 0"
    )
}

/// Scan chain rows of a scope for a batch of identities.
pub fn select_chains_by_identities(identities: &[String]) -> String {
    format!(
        "SELECT deleted_at, ids FROM {TABLE_CARD_CHAIN} \
         WHERE application_id = ? AND identity IN ({})",
        quoted_list(identities)
    )
}

/// Project snapshot and signatures for a set of card ids.
pub fn select_cards_by_ids(ids: &[String]) -> String {
    format!(
        "SELECT content_snapshot, signatures FROM {TABLE_CARD_BY_CARD_ID} \
         WHERE id IN ({})",
        quoted_list(ids)
    )
}

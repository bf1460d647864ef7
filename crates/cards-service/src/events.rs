//! Business-event counters
//!
//! Each card operation emits a success or error event labelled with the
//! caller's account and application ids. The installed metrics recorder
//! decides where the events go; this module only records them.

use metrics::{counter, describe_counter};

pub const CARD_CREATE_SUCCESS: &str = "cards_card_create_success_total";
pub const CARD_OVERRIDE_SUCCESS: &str = "cards_card_override_success_total";
pub const CARD_CREATE_ERROR: &str = "cards_card_create_error_total";
pub const CARD_GET_SUCCESS: &str = "cards_card_get_success_total";
pub const CARD_GET_ERROR: &str = "cards_card_get_error_total";
pub const CARD_SEARCH_SUCCESS: &str = "cards_card_search_success_total";
pub const CARD_SEARCH_ERROR: &str = "cards_card_search_error_total";
pub const CHAIN_DELETE_SUCCESS: &str = "cards_chain_delete_success_total";
pub const CHAIN_DELETE_ERROR: &str = "cards_chain_delete_error_total";

/// Registers all event descriptions.
///
/// Call once at startup after installing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(CARD_CREATE_SUCCESS, "Total root cards registered");
    describe_counter!(CARD_OVERRIDE_SUCCESS, "Total successor cards registered");
    describe_counter!(CARD_CREATE_ERROR, "Total failed card registrations");
    describe_counter!(CARD_GET_SUCCESS, "Total cards fetched");
    describe_counter!(CARD_GET_ERROR, "Total failed card fetches");
    describe_counter!(CARD_SEARCH_SUCCESS, "Total card searches served");
    describe_counter!(CARD_SEARCH_ERROR, "Total failed card searches");
    describe_counter!(CHAIN_DELETE_SUCCESS, "Total chains tombstoned");
    describe_counter!(CHAIN_DELETE_ERROR, "Total failed chain deletions");
}

/// Records card lifecycle events against the metrics recorder.
#[derive(Debug, Clone, Default)]
pub struct EventMeter;

impl EventMeter {
    pub fn new() -> Self {
        Self
    }

    pub fn card_create_success(&self, account_id: &str, application_id: &str) {
        self.push(CARD_CREATE_SUCCESS, account_id, application_id);
    }

    pub fn card_override_success(&self, account_id: &str, application_id: &str) {
        self.push(CARD_OVERRIDE_SUCCESS, account_id, application_id);
    }

    pub fn card_create_error(&self, account_id: &str, application_id: &str) {
        self.push(CARD_CREATE_ERROR, account_id, application_id);
    }

    pub fn card_get_success(&self, account_id: &str, application_id: &str) {
        self.push(CARD_GET_SUCCESS, account_id, application_id);
    }

    pub fn card_get_error(&self, account_id: &str, application_id: &str) {
        self.push(CARD_GET_ERROR, account_id, application_id);
    }

    pub fn card_search_success(&self, account_id: &str, application_id: &str) {
        self.push(CARD_SEARCH_SUCCESS, account_id, application_id);
    }

    pub fn card_search_error(&self, account_id: &str, application_id: &str) {
        self.push(CARD_SEARCH_ERROR, account_id, application_id);
    }

    pub fn chain_delete_success(&self, account_id: &str, application_id: &str) {
        self.push(CHAIN_DELETE_SUCCESS, account_id, application_id);
    }

    pub fn chain_delete_error(&self, account_id: &str, application_id: &str) {
        self.push(CHAIN_DELETE_ERROR, account_id, application_id);
    }

    fn push(&self, name: &'static str, account_id: &str, application_id: &str) {
        counter!(
            name,
            "account" => account_id.to_string(),
            "application" => application_id.to_string()
        )
        .increment(1);
    }
}

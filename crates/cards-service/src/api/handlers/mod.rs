//! Request orchestrators for the card endpoints

mod create;
mod delete;
mod get;
mod search;

pub use create::card_create;
pub use delete::card_delete;
pub use get::card_get;
pub use search::card_search;

use std::sync::Arc;

use cards_core::CardSigner;

use crate::core::validator::CardValidator;
use crate::events::EventMeter;
use crate::storage::CardStore;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// Card and chain persistence
    pub store: Arc<dyn CardStore>,
    /// Service counter-signer; holds the service key for the process lifetime
    pub signer: CardSigner,
    /// Request validation against the store
    pub validator: CardValidator,
    /// Business-event counters
    pub meter: EventMeter,
}

impl AppState {
    /// Wire the object graph around one store and one service key.
    pub fn new(store: Arc<dyn CardStore>, signer: CardSigner) -> Self {
        let validator = CardValidator::new(store.clone());
        Self {
            store,
            signer,
            validator,
            meter: EventMeter::new(),
        }
    }
}

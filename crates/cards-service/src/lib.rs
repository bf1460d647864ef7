//! Card Directory Service
//!
//! A public-key directory that issues, publishes, supersedes and retires
//! identity cards. Each card binds an opaque public key to a tenant-scoped
//! identity, is self-signed by the submitter, optionally co-signed by a
//! tenant application, and counter-signed by the service.
//!
//! Cards form append-only chains: a card may declare the card it replaces,
//! and a whole chain can be tombstoned. The lifecycle rules enforced here:
//!
//! 1. A predecessor has at most one successor per tenant scope
//! 2. A successor stays within its predecessor's scope and identity
//! 3. A tombstoned chain never grows again
//!
//! ## API Endpoints
//!
//! - `POST /card` - register or supersede a card
//! - `GET /card/{card_id}` - fetch a card by its content-derived id
//! - `POST /card/actions/search` - latest live cards for a batch of identities
//! - `POST /card/actions/delete` - tombstone a chain
//! - `GET /health` - liveness and signer identity

pub mod api;
pub mod config;
pub mod core;
pub mod events;
pub mod storage;

pub use api::create_router;
pub use api::error::ApiError;
pub use api::handlers::AppState;
pub use config::Config;
pub use events::EventMeter;
pub use storage::{CardStore, MemoryStore};

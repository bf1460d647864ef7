//! Card Directory Server Binary
//!
//! Wires the object graph at startup: configuration, logging, the sealed
//! service key, the card store, the router. Resources are dropped on every
//! exit path; shutdown is signal-driven.

use std::sync::Arc;
use std::time::Duration;

use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use cards_core::{open_sealed_key, CardSigner};
use cards_service::storage::MemoryStore;
use cards_service::{create_router, AppState, CardStore, Config};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    let keys = match open_sealed_key(&config.private_key, &config.private_key_password) {
        Ok(keys) => keys,
        Err(err) => {
            tracing::error!(error = %err, "service private key import failed");
            std::process::exit(1);
        }
    };
    let signer = CardSigner::new(keys);

    cards_service::events::register_metrics();

    if config.tracer.disabled {
        info!("request tracing disabled");
    } else {
        info!(
            agent = %config.tracer.agent_address,
            sampler = %config.tracer.sampler_type,
            param = config.tracer.sampler_param,
            "request tracing configured"
        );
    }

    let store = build_store(&config).await;
    let state = Arc::new(AppState::new(store, signer));

    info!(
        signer_id = %state.signer.signer_id(),
        address = %config.server.bind_address(),
        "starting card directory server"
    );

    let request_timeout: Duration = config.server.read_timeout + config.server.write_timeout;
    let app = create_router(state).layer(TimeoutLayer::new(request_timeout));

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .expect("failed to bind the server address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn build_store(config: &Config) -> Arc<dyn CardStore> {
    #[cfg(feature = "scylla")]
    if let Some(cassandra) = &config.cassandra {
        match cards_service::storage::ScyllaStore::connect(&cassandra.nodes, &cassandra.keyspace)
            .await
        {
            Ok(store) => return Arc::new(store),
            Err(err) => {
                tracing::error!(error = %err, "card store cluster connection failed");
                std::process::exit(1);
            }
        }
    }

    #[cfg(not(feature = "scylla"))]
    if config.cassandra.is_some() {
        warn!("built without the scylla feature; the configured cluster is ignored");
    }

    warn!("using the in-memory card store; data will not survive a restart");
    Arc::new(MemoryStore::new())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for the shutdown signal");
    info!("shutdown signal received");
}

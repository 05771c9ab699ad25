//! protrack registry
//!
//! Serves item code allocation for prototypes, prototype sets and prototype
//! packages. Codes are drawn from per-(location, evidence year) counters
//! kept in Postgres.

use std::sync::Arc;

use anyhow::Result;
use protrack_registry::{
    allocation::{AllocationGate, IdentifierAllocator},
    api,
    config::{self, CounterBackend},
    db::{CounterStore, Database, MemoryCounterStore},
    state::AppState,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to PROTRACK_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting protrack registry");
    info!(
        listen_addr = %config.listen_addr,
        backend = ?config.allocation.backend,
        gate_scope = %config.allocation.gate_scope,
        gate_timeout_ms = config.allocation.gate_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    let store: Arc<dyn CounterStore> = match config.allocation.backend {
        CounterBackend::Postgres => {
            let db = match Database::connect(&config.database).await {
                Ok(db) => {
                    info!("Database connection established");
                    db
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return Err(e.into());
                }
            };

            // Run migrations in dev mode
            if config.dev_mode {
                info!("Running database migrations (dev mode)");
                if let Err(e) = db.run_migrations().await {
                    error!(error = %e, "Failed to run migrations");
                    return Err(e.into());
                }
            }

            Arc::new(db.counter_store())
        }
        CounterBackend::Memory => {
            warn!("Using in-memory counters; allocations are lost on restart");
            Arc::new(MemoryCounterStore::new())
        }
    };

    let gate = Arc::new(AllocationGate::new(
        config.allocation.gate_scope,
        config.allocation.gate_timeout,
    ));
    let state = AppState::new(IdentifierAllocator::new(store, gate));

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Registry shutdown complete");
    Ok(())
}

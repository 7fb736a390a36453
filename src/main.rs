//! ==============================================================================
//! main.rs - telemetry api entry point
//! ==============================================================================
//!
//! startup order:
//!     1. load configuration (telemetry.toml, then DB_* env overrides)
//!     2. install the log subscriber
//!     3. build the store (postgres pool, or in-memory)
//!     4. ensure the sensor_data table exists (postgres only)
//!     5. serve http until ctrl-c
//!
//! a failed schema bootstrap is logged, not fatal: the listener still comes
//! up and the data endpoints report database failures per request.
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use telemetry_api::{
    ensure_schema, router, AppState, MemoryStore, PostgresClient, PostgresTelemetryStore,
    ServiceConfig, StoreBackend, TelemetryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let (config, notes) = ServiceConfig::load_or_default();

    // step 2: logging
    telemetry_api::logging::init_logging(&config.logging.level)?;
    for note in &notes {
        info!("[CONFIG] {}", note);
    }
    config.log_summary();

    // step 3 + 4: store and schema
    let store = build_store(&config).await?;

    // step 5: serve
    let app = router(AppState::new(store));
    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Telemetry API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Telemetry API stopped");
    Ok(())
}

async fn build_store(config: &ServiceConfig) -> Result<Arc<dyn TelemetryStore>> {
    match config.database.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Postgres => {
            let client = PostgresClient::new(&config.database)?;
            if let Err(e) = client.ping().await {
                warn!("Database unreachable at startup, schema bootstrap skipped: {}", e);
            } else if let Err(e) = ensure_schema(&client).await {
                warn!("Schema bootstrap failed: {}", e);
            }
            Ok(Arc::new(PostgresTelemetryStore::new(client)))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}

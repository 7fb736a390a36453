//! ==============================================================================
//! telemetry-api - sensor readings over http, stored in postgres
//! ==============================================================================
//!
//! modules:
//!     - config:   telemetry.toml + DB_* environment overrides
//!     - logging:  tracing subscriber setup
//!     - domain:   SensorReading and friends
//!     - error:    StoreError / ApiError
//!     - store:    TelemetryStore trait + in-memory implementation
//!     - postgres: pooled connector, schema bootstrap, postgres store
//!     - api:      axum router and handlers
//!
//! ==============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod postgres;
pub mod store;

pub use api::{router, AppState};
pub use config::{ServiceConfig, StoreBackend};
pub use domain::{InsertedReading, NewReading, SensorReading, TelemetryStats};
pub use error::{ApiError, StoreError, StoreResult};
pub use postgres::{ensure_schema, PostgresClient, PostgresTelemetryStore};
pub use store::{MemoryStore, TelemetryStore};

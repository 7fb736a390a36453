//! ==============================================================================
//! store.rs - telemetry storage abstraction
//! ==============================================================================
//!
//! purpose:
//!     one trait for the three data operations the api needs, so handlers do
//!     not care whether readings live in postgres or in process memory.
//!
//! relationships:
//!     - used by: api.rs (handlers hold an Arc<dyn TelemetryStore>)
//!     - implemented by: postgres.rs (PostgresTelemetryStore)
//!     - implemented by: MemoryStore below (no database required)
//!
//! ==============================================================================

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::RwLock;

use crate::domain::{InsertedReading, NewReading, SensorReading, TelemetryStats};
use crate::error::StoreResult;

#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// up to `limit` readings, newest first
    async fn latest(&self, limit: usize) -> StoreResult<Vec<SensorReading>>;

    /// insert one reading, letting the store assign id and timestamp
    async fn insert(&self, reading: NewReading) -> StoreResult<InsertedReading>;

    /// count, null-ignoring means, and newest timestamp over all readings
    async fn stats(&self) -> StoreResult<TelemetryStats>;
}

// ==============================================================================
// in-memory implementation
// ==============================================================================
// mirrors the postgres table semantics: serial ids starting at 1, timestamps
// from the local clock, VARCHAR(50) on sensor_id.

const SENSOR_ID_MAX_LEN: usize = 50;

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<SensorReading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        tracing::info!("Using in-memory telemetry store (readings are not persisted)");
        Self::default()
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn latest(&self, limit: usize) -> StoreResult<Vec<SensorReading>> {
        let rows = self.rows.read().await;
        let mut newest: Vec<SensorReading> = rows.iter().cloned().collect();
        // timestamp DESC (nulls first, as postgres does), then id DESC
        newest.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => y.cmp(&x).then(b.id.cmp(&a.id)),
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, None) => b.id.cmp(&a.id),
        });
        newest.truncate(limit);
        Ok(newest)
    }

    async fn insert(&self, reading: NewReading) -> StoreResult<InsertedReading> {
        let too_long = reading
            .sensor_id
            .as_ref()
            .is_some_and(|id| id.chars().count() > SENSOR_ID_MAX_LEN);
        if too_long {
            return Err(crate::error::StoreError::Query(format!(
                "value too long for type character varying({})",
                SENSOR_ID_MAX_LEN
            )));
        }

        let mut rows = self.rows.write().await;
        let id = rows.last().map(|r| r.id + 1).unwrap_or(1);
        let timestamp = Local::now().naive_local();
        rows.push(SensorReading {
            id,
            timestamp: Some(timestamp),
            temperature: reading.temperature,
            humidity: reading.humidity,
            pressure: reading.pressure,
            sensor_id: reading.sensor_id,
        });
        tracing::debug!(id, "stored reading in memory");
        Ok(InsertedReading { id, timestamp })
    }

    async fn stats(&self) -> StoreResult<TelemetryStats> {
        let rows = self.rows.read().await;
        let mean = |pick: fn(&SensorReading) -> Option<f64>| {
            let values: Vec<f64> = rows.iter().filter_map(pick).collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };

        Ok(TelemetryStats::from_aggregates(
            rows.len() as i64,
            mean(|r| r.temperature),
            mean(|r| r.humidity),
            mean(|r| r.pressure),
            rows.iter().filter_map(|r| r.timestamp).max(),
        ))
    }
}

//! ==============================================================================
//! postgres.rs - postgres connection pool, schema bootstrap, reading queries
//! ==============================================================================
//!
//! purpose:
//!     the storage connector. every data operation takes one pooled
//!     connection, runs exactly one statement, and hands the connection back
//!     to the pool when the guard drops (success, error, or early return).
//!
//! relationships:
//!     - used by: main.rs (builds the pool, runs ensure_schema once)
//!     - implements: store.rs (TelemetryStore)
//!     - reads: config.rs (DatabaseConfig)
//!
//! ==============================================================================

use async_trait::async_trait;
use chrono::NaiveDateTime;
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::domain::{InsertedReading, NewReading, SensorReading, TelemetryStats};
use crate::error::{StoreError, StoreResult};
use crate::store::TelemetryStore;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS sensor_data (
        id SERIAL PRIMARY KEY,
        timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        temperature FLOAT,
        humidity FLOAT,
        pressure FLOAT,
        sensor_id VARCHAR(50)
    )";

const SELECT_LATEST: &str = "
    SELECT id, timestamp, temperature, humidity, pressure, sensor_id
    FROM sensor_data
    ORDER BY timestamp DESC, id DESC
    LIMIT $1";

const INSERT_READING: &str = "
    INSERT INTO sensor_data (temperature, humidity, pressure, sensor_id)
    VALUES ($1, $2, $3, $4)
    RETURNING id, timestamp";

const SELECT_STATS: &str = "
    SELECT
        COUNT(*) AS total_records,
        AVG(temperature) AS avg_temperature,
        AVG(humidity) AS avg_humidity,
        AVG(pressure) AS avg_pressure,
        MAX(timestamp) AS latest_timestamp
    FROM sensor_data";

/// PostgreSQL client wrapper with connection pooling
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Creates a pool from `config`. No connection is opened until the first
    /// `get_connection`, so an unreachable database does not fail here.
    pub fn new(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.name.clone());
        cfg.user = config.user.clone();
        cfg.password = config.password.clone();
        cfg.connect_timeout = Some(config.acquire_timeout());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig {
            max_size: config.max_pool_size,
            timeouts: Timeouts {
                wait: Some(config.acquire_timeout()),
                create: Some(config.acquire_timeout()),
                recycle: Some(config.acquire_timeout()),
            },
            ..PoolConfig::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create postgres pool: {}", e))?;

        Ok(Self { pool })
    }

    /// Pings the database to verify connectivity
    pub async fn ping(&self) -> StoreResult<()> {
        let client = self.get_connection().await?;
        client.execute("SELECT 1", &[]).await?;
        debug!("postgres connection successful");
        Ok(())
    }

    /// Gets a connection from the pool; returned to the pool on drop
    pub async fn get_connection(&self) -> StoreResult<deadpool_postgres::Client> {
        self.pool.get().await.map_err(|e| {
            error!("Database connection error: {}", e);
            StoreError::from(e)
        })
    }
}

// ==============================================================================
// schema bootstrap
// ==============================================================================

/// Create the sensor_data table if it does not exist. Safe to run on every
/// start.
pub async fn ensure_schema(client: &PostgresClient) -> StoreResult<()> {
    let conn = client.get_connection().await?;
    conn.batch_execute(CREATE_TABLE).await.map_err(|e| {
        error!("Error creating table: {}", e);
        StoreError::from(e)
    })?;
    info!("sensor_data table ready");
    Ok(())
}

// ==============================================================================
// telemetry store
// ==============================================================================

/// PostgreSQL implementation of TelemetryStore
#[derive(Clone)]
pub struct PostgresTelemetryStore {
    client: PostgresClient,
}

impl PostgresTelemetryStore {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn reading_from_row(row: &Row) -> Result<SensorReading, tokio_postgres::Error> {
    Ok(SensorReading {
        id: row.try_get("id")?,
        timestamp: row.try_get("timestamp")?,
        temperature: row.try_get("temperature")?,
        humidity: row.try_get("humidity")?,
        pressure: row.try_get("pressure")?,
        sensor_id: row.try_get("sensor_id")?,
    })
}

fn query_failed(context: &'static str) -> impl Fn(tokio_postgres::Error) -> StoreError {
    move |e| {
        error!("{}: {}", context, e);
        StoreError::from(e)
    }
}

#[async_trait]
impl TelemetryStore for PostgresTelemetryStore {
    async fn latest(&self, limit: usize) -> StoreResult<Vec<SensorReading>> {
        let conn = self.client.get_connection().await?;
        let limit = limit as i64;

        let rows = conn
            .query(SELECT_LATEST, &[&limit])
            .await
            .map_err(query_failed("Database query error"))?;

        rows.iter()
            .map(reading_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_failed("Database query error"))
    }

    async fn insert(&self, reading: NewReading) -> StoreResult<InsertedReading> {
        let conn = self.client.get_connection().await?;

        let row = conn
            .query_one(
                INSERT_READING,
                &[
                    &reading.temperature,
                    &reading.humidity,
                    &reading.pressure,
                    &reading.sensor_id,
                ],
            )
            .await
            .map_err(query_failed("Database insert error"))?;

        let id: i32 = row.try_get(0).map_err(query_failed("Database insert error"))?;
        let timestamp: NaiveDateTime =
            row.try_get(1).map_err(query_failed("Database insert error"))?;

        debug!(id, sensor_id = ?reading.sensor_id, "inserted reading");
        Ok(InsertedReading { id, timestamp })
    }

    async fn stats(&self) -> StoreResult<TelemetryStats> {
        let conn = self.client.get_connection().await?;

        let row = conn
            .query_one(SELECT_STATS, &[])
            .await
            .map_err(query_failed("Database query error"))?;

        let decode = |row: &Row| -> Result<TelemetryStats, tokio_postgres::Error> {
            Ok(TelemetryStats::from_aggregates(
                row.try_get(0)?,
                row.try_get(1)?,
                row.try_get(2)?,
                row.try_get(3)?,
                row.try_get(4)?,
            ))
        };

        decode(&row).map_err(query_failed("Database query error"))
    }
}

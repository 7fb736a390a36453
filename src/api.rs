//! ==============================================================================
//! api.rs - http routes for the telemetry api
//! ==============================================================================
//!
//! routes:
//!     GET  /                        health check, never touches the store
//!     GET  /api/telemetry/latest    newest readings (at most 10)
//!     POST /api/telemetry/insert    store one reading
//!     GET  /api/telemetry/stats     count, averages, newest timestamp
//!
//! every data handler is one store call; failures come back as
//! `{"error": "..."}` via ApiError.
//!
//! ==============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domain::{NewReading, SensorReading, TelemetryStats, LATEST_LIMIT};
use crate::error::ApiError;
use crate::store::TelemetryStore;

/// state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }
}

/// Build the router with CORS open to any origin
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/api/telemetry/latest", get(latest_handler))
        .route("/api/telemetry/insert", post(insert_handler))
        .route("/api/telemetry/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==============================================================================
// response bodies
// ==============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
    pub timestamp: NaiveDateTime,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub success: bool,
    pub data: Vec<SensorReading>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct InsertResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: i32,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: TelemetryStats,
}

// ==============================================================================
// handlers
// ==============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Telemetry API is running",
        timestamp: Local::now().naive_local(),
        status: "healthy",
    })
}

async fn latest_handler(
    State(state): State<AppState>,
) -> Result<Json<LatestResponse>, ApiError> {
    let data = state
        .store
        .latest(LATEST_LIMIT)
        .await
        .map_err(ApiError::from_query)?;

    Ok(Json(LatestResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

async fn insert_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewReading>, JsonRejection>,
) -> Result<Json<InsertResponse>, ApiError> {
    let Json(reading) = payload.map_err(|rejection| {
        warn!("rejected insert body: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    })?;

    let inserted = state
        .store
        .insert(reading)
        .await
        .map_err(ApiError::from_insert)?;

    Ok(Json(InsertResponse {
        success: true,
        message: "Data inserted successfully",
        id: inserted.id,
        timestamp: inserted.timestamp,
    }))
}

async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.store.stats().await.map_err(ApiError::from_query)?;

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

//! ==============================================================================
//! error.rs - store and http error types
//! ==============================================================================
//!
//! purpose:
//!     StoreError is what a TelemetryStore returns. ApiError is what a handler
//!     returns; it renders as `{"error": "..."}` with a status code and never
//!     carries the underlying cause into the response body.
//!
//! ==============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// store unreachable, credentials rejected, or pool wait timed out
    #[error("connection error: {0}")]
    Connection(String),

    /// malformed statement, constraint violation, or type mismatch
    #[error("query error: {0}")]
    Query(String),
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// missing, malformed, or mistyped request body
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("Database query failed")]
    QueryFailed,

    #[error("Database insert failed")]
    InsertFailed,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ConnectionFailed | ApiError::QueryFailed | ApiError::InsertFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// map a failed read onto its response
    pub fn from_query(err: StoreError) -> Self {
        match err {
            StoreError::Connection(_) => ApiError::ConnectionFailed,
            StoreError::Query(_) => ApiError::QueryFailed,
        }
    }

    /// map a failed insert onto its response
    pub fn from_insert(err: StoreError) -> Self {
        match err {
            StoreError::Connection(_) => ApiError::ConnectionFailed,
            StoreError::Query(_) => ApiError::InsertFailed,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub mod config;
pub mod db;
pub mod error;
pub mod functions;
pub mod gateway;
pub mod models;
pub mod producer;
pub mod registry;
pub mod schema;
pub mod stream;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub use config::Config;
pub use db::Database;
pub use error::{TelemetryError, TelemetryResult};
pub use gateway::Gateway;
pub use registry::RunRegistry;
pub use stream::StreamStore;

/// Error returned by every HTTP handler.
///
/// Each failure kind maps to its own status so callers can tell a bad
/// request from a missing run from a storage failure worth retrying.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<TelemetryError>() {
            Some(TelemetryError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(TelemetryError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

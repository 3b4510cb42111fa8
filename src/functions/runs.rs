use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::Value;

use super::extract::{ValidJson, ValidPath};
use crate::{gateway::Gateway, models::Run, AppError};

pub fn routes() -> Router<Gateway> {
    Router::new()
        .route("/runs", get(list_runs).post(create_run))
        .route("/runs/latest", get(latest_run))
        .route("/runs/:id", get(get_run).delete(delete_run))
}

#[axum::debug_handler]
pub async fn create_run(
    State(gateway): State<Gateway>,
    ValidJson(run): ValidJson<Value>,
) -> Result<Json<Run>, AppError> {
    Ok(Json(gateway.create_run(run).await?))
}

#[axum::debug_handler]
pub async fn list_runs(State(gateway): State<Gateway>) -> Result<Json<Vec<Run>>, AppError> {
    Ok(Json(gateway.runs().list().await?))
}

#[axum::debug_handler]
pub async fn latest_run(State(gateway): State<Gateway>) -> Result<Json<Run>, AppError> {
    Ok(Json(gateway.runs().latest().await?))
}

#[axum::debug_handler]
pub async fn get_run(
    State(gateway): State<Gateway>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Run>, AppError> {
    Ok(Json(gateway.runs().get(id).await?))
}

#[axum::debug_handler]
pub async fn delete_run(
    State(gateway): State<Gateway>,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, AppError> {
    gateway.runs().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

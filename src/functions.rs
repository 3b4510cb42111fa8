use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::{
    gateway::Gateway,
    models::{ControlInput, DepthSample, ImuSample, MotorOutput, PowerSample, ServoOutput},
};

pub mod extract;
pub mod runs;
pub mod samples;

/// The full HTTP surface: runs, the six streams and a health probe.
pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(runs::routes())
        .merge(samples::routes::<ImuSample>())
        .merge(samples::routes::<DepthSample>())
        .merge(samples::routes::<PowerSample>())
        .merge(samples::routes::<MotorOutput>())
        .merge(samples::routes::<ServoOutput>())
        .merge(samples::routes::<ControlInput>())
        .with_state(gateway)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[axum::debug_handler]
async fn health(State(gateway): State<Gateway>) -> (StatusCode, Json<HealthResponse>) {
    if gateway.database().ping().await {
        (StatusCode::OK, Json(HealthResponse { status: "healthy" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "database unreachable",
            }),
        )
    }
}


#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::test_support::{app, send};

    #[tokio::test]
    async fn health_endpoint() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = app().await;
        let (status, _) = send(&app, Method::GET, "/sonar", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

//! The same three endpoints for every telemetry stream, mounted under the
//! stream's own prefix.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::extract::{ValidJson, ValidPath, ValidQuery};
use crate::{
    gateway::{Gateway, RangeParams},
    models::{Payload, Sample},
    AppError,
};

#[derive(Deserialize, Default)]
pub struct LatestParams {
    pub run_id: Option<i64>,
}

pub fn routes<P: Payload>() -> Router<Gateway> {
    let prefix = P::KIND.route();
    Router::new()
        .route(prefix, post(create_sample::<P>))
        .route(&format!("{prefix}/latest"), get(latest_sample::<P>))
        .route(&format!("{prefix}/by-run/:run_id"), get(samples_by_run::<P>))
}

pub async fn create_sample<P: Payload>(
    State(gateway): State<Gateway>,
    ValidJson(sample): ValidJson<Value>,
) -> Result<Json<Sample<P>>, AppError> {
    Ok(Json(gateway.ingest::<P>(sample).await?))
}

pub async fn latest_sample<P: Payload>(
    State(gateway): State<Gateway>,
    ValidQuery(params): ValidQuery<LatestParams>,
) -> Result<Json<Sample<P>>, AppError> {
    Ok(Json(gateway.latest::<P>(params.run_id).await?))
}

pub async fn samples_by_run<P: Payload>(
    State(gateway): State<Gateway>,
    ValidPath(run_id): ValidPath<i64>,
    ValidQuery(params): ValidQuery<RangeParams>,
) -> Result<Json<Vec<Sample<P>>>, AppError> {
    Ok(Json(gateway.list_by_run::<P>(run_id, params).await?))
}

#[cfg(test)]
mod tests {
    use axum::{
        http::{Method, StatusCode},
        Router,
    };
    use serde_json::json;

    use crate::functions::test_support::{app, send};

    async fn app_with_run() -> Router {
        let app = app().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/runs",
            Some(json!({"name": "sea-trial-1", "platform": "hardware"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        app
    }

    #[tokio::test]
    async fn control_input_round_trip() {
        let app = app_with_run().await;

        let record = json!({
            "run_id": 1, "t_us": 1_000, "seq": 7,
            "x": 0.25, "y": -1.0, "z": 0.0, "yaw": 0.5,
            "s1": 1, "s2": 0, "s3": 1,
        });
        let (status, created) = send(&app, Method::POST, "/inputs", Some(record)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["id"], 1);
        assert_eq!(created["seq"], 7);
        assert_eq!(created["yaw"], 0.5);

        let (status, latest) = send(&app, Method::GET, "/inputs/latest?run_id=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest, created);
    }

    #[tokio::test]
    async fn unknown_run_is_404() {
        let app = app_with_run().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/depth",
            Some(json!({"run_id": 999, "t_us": 1, "depth_m": 3.0})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Run not found");

        let (status, _) = send(&app, Method::GET, "/depth/by-run/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/depth/latest?run_id=999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_stream_latest_is_404() {
        let app = app_with_run().await;

        let (status, body) = send(&app, Method::GET, "/servo/latest", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "No servo outputs found");
    }

    #[tokio::test]
    async fn motor_channel_out_of_range_is_422() {
        let app = app_with_run().await;

        let record = json!({
            "run_id": 1, "t_us": 1,
            "m1": 0, "m2": 0, "m3": -1, "m4": 0, "m5": 0, "m6": 0, "m7": 0, "m8": 0,
        });
        let (status, body) = send(&app, Method::POST, "/motor", Some(record)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "m3 must be within [0, 255], got -1");
    }

    #[tokio::test]
    async fn by_run_window_and_limit() {
        let app = app_with_run().await;
        for t_us in [30, 10, 20] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/depth",
                Some(json!({"run_id": 1, "t_us": t_us, "depth_m": 1.5})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, rows) = send(&app, Method::GET, "/depth/by-run/1", None).await;
        assert_eq!(status, StatusCode::OK);
        let times: Vec<i64> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["t_us"].as_i64().unwrap())
            .collect();
        assert_eq!(times, vec![10, 20, 30]);

        let (_, rows) = send(&app, Method::GET, "/depth/by-run/1?t_start_us=15&limit=1", None).await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["t_us"], 20);

        let (_, rows) = send(&app, Method::GET, "/depth/by-run/1?t_start_us=25&t_end_us=5", None).await;
        assert_eq!(rows, json!([]));

        let (status, _) = send(&app, Method::GET, "/depth/by-run/1?limit=0", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, Method::GET, "/depth/by-run/1?limit=200001", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn non_numeric_parameters_are_422() {
        let app = app_with_run().await;

        for uri in [
            "/depth/by-run/1?limit=abc",
            "/depth/by-run/1?t_start_us=x",
            "/depth/by-run/one",
            "/imu/latest?run_id=first",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert!(body["detail"].is_string(), "{uri}");
        }
    }
}

//! Connector health: `GET /health`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use std::collections::BTreeMap;

use super::IdpState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: &'static str,
    /// Per connector: `"ok"` or the failure message.
    pub connectors: BTreeMap<String, String>,
}

/// 200 when every connector reports healthy, 503 otherwise.
pub async fn health_handler(State(state): State<IdpState>) -> impl IntoResponse {
    let report = state.connectors.health().await;
    let healthy = report.values().all(Option::is_none);
    let connectors = report
        .into_iter()
        .map(|(id, failure)| (id, failure.unwrap_or_else(|| "ok".to_string())))
        .collect();

    if healthy {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                connectors,
            }),
        )
    } else {
        tracing::warn!(?connectors, "connector health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                connectors,
            }),
        )
    }
}

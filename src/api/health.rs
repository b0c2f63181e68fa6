use crate::{api::routes::AppState, observability::MetricsRecorder};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// GET /api/health - 503 when the data store is unreachable
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.health.check().await;

    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> Result<String, StatusCode> {
    MetricsRecorder::export().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

use crate::{
    api::{data, export, health},
    clock::Clock,
    config::SecurityConfig,
    db::StockRepository,
    gate::RequestGate,
    observability::HealthChecker,
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{path::Path, sync::Arc, time::Duration};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeFile,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' https://cdnjs.cloudflare.com; \
    style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
    font-src 'self' https://fonts.gstatic.com; \
    img-src 'self' data: https:; \
    connect-src 'self'";

#[derive(Clone)]
pub struct AppState {
    pub gate: RequestGate,
    pub repository: Arc<dyn StockRepository>,
    pub health: Arc<HealthChecker>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(gate: RequestGate, repository: Arc<dyn StockRepository>, clock: Arc<dyn Clock>) -> Self {
        let health = Arc::new(HealthChecker::new(repository.clone()));
        Self {
            gate,
            repository,
            health,
            clock,
        }
    }

    /// RFC 3339 generation time stamped into response bodies.
    pub fn timestamp(&self) -> String {
        self.clock.now().to_rfc3339()
    }
}

pub fn create_router(state: AppState, security: &SecurityConfig, index_file: &Path) -> Router {
    let origins: Vec<HeaderValue> = security
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .max_age(Duration::from_secs(security.cors_max_age_seconds));

    Router::new()
        .route_service("/", ServeFile::new(index_file))
        .route("/api/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .nest("/api/data", data_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(security_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(header::X_XSS_PROTECTION, "1; mode=block"))
        .layer(security_header(
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ))
        .layer(security_header(
            header::CONTENT_SECURITY_POLICY,
            CONTENT_SECURITY_POLICY,
        ))
        .with_state(state)
}

fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/decades", get(data::decades))
        .route("/markets", get(data::markets))
        .route("/decade/:decade", get(data::decade_data))
        .route("/market/:market", get(data::market_data))
        .route("/stock/:symbol", get(data::stock_data))
        .route("/top-performers", get(data::top_performers))
        .route("/statistics", get(data::statistics))
        .route("/export", get(export::export_data))
}

fn security_header(
    name: HeaderName,
    value: &'static str,
) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "message": "The requested resource was not found",
        })),
    )
}

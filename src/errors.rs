use axum::{
    extract::rejection::QueryRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    DatabaseMigration(#[from] sqlx::migrate::MigrateError),

    /// A read query behind one of the data endpoints failed.
    #[error("Failed to fetch {operation}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimitExceeded {
        max_requests: u32,
        window_seconds: u64,
        retry_after: Option<u64>,
    },

    // Client input
    #[error("{0}")]
    Validation(String),

    #[error("No data found for {0}")]
    NotFound(&'static str),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// `Invalid <name> parameter`
    pub fn invalid_param(name: &str) -> Self {
        AppError::Validation(format!("Invalid {} parameter", name))
    }

    /// Wrap a data-store failure for the named operation, e.g. `.map_err(AppError::query("decades"))`.
    pub fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
        move |source| AppError::Query { operation, source }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected query string");
        AppError::Validation("Invalid query parameters".to_string())
    }
}

/// Render a limiter window the way the throttling message reports it.
pub fn describe_window(window_seconds: u64) -> String {
    match window_seconds {
        s if s >= 3600 && s % 3600 == 0 => plural(s / 3600, "hour"),
        s if s >= 60 && s % 60 == 0 => plural(s / 60, "minute"),
        s => plural(s, "second"),
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

// Implement IntoResponse for Axum
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::RateLimitExceeded {
                max_requests,
                window_seconds,
                retry_after,
            } => {
                let body = Json(json!({
                    "error": "Rate limit exceeded",
                    "message": format!(
                        "Maximum {} requests per {}",
                        max_requests,
                        describe_window(*window_seconds)
                    ),
                    "timestamp": timestamp(),
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                if let Some(secs) = retry_after {
                    if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                        response.headers_mut().insert(header::RETRY_AFTER, value);
                    }
                }
                return response;
            }
            AppError::Query { operation, source } => {
                tracing::error!(operation = %operation, error = %source, "Query failed");
            }
            AppError::Database(_)
            | AppError::DatabaseMigration(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => {
                tracing::error!("{:?}", self);
            }
            AppError::Validation(_) | AppError::NotFound(_) => {}
        }

        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Query { .. } => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
            "timestamp": timestamp(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_window() {
        assert_eq!(describe_window(900), "15 minutes");
        assert_eq!(describe_window(60), "1 minute");
        assert_eq!(describe_window(7200), "2 hours");
        assert_eq!(describe_window(45), "45 seconds");
        assert_eq!(describe_window(90), "90 seconds");
    }

    #[test]
    fn test_status_codes() {
        let throttled = AppError::RateLimitExceeded {
            max_requests: 2,
            window_seconds: 60,
            retry_after: Some(30),
        }
        .into_response();
        assert_eq!(throttled.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(throttled.headers().get(header::RETRY_AFTER).unwrap(), "30");

        assert_eq!(
            AppError::invalid_param("decade").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("this decade").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::query("decades")(sqlx::Error::RowNotFound)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_query_string_rejection_is_a_validation_error() {
        let uri: axum::http::Uri = "/top-performers?limit=abc".parse().unwrap();
        let rejection = axum::extract::Query::<std::collections::HashMap<String, u32>>::try_from_uri(&uri)
            .unwrap_err();

        let err = AppError::from(rejection);
        assert!(matches!(&err, AppError::Validation(msg) if msg == "Invalid query parameters"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_query_error_message_hides_source() {
        let err = AppError::query("market data")(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), "Failed to fetch market data");
    }
}

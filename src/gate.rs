// Admission and caching in front of the data endpoints

use crate::cache::{CacheKey, ExpiringCache};
use crate::errors::{AppError, Result};
use crate::observability::MetricsRecorder;
use crate::rate_limit::{add_rate_limit_headers, ClientIdentity, RateLimitDecision, SlidingWindowLimiter};
use axum::{
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A successful gated response: the JSON body plus how it was produced.
#[derive(Debug)]
pub struct GatedResponse {
    pub body: Value,
    pub cache: CacheStatus,
    pub rate_limit: RateLimitDecision,
}

impl IntoResponse for GatedResponse {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        let headers = response.headers_mut();
        add_rate_limit_headers(headers, &self.rate_limit);
        headers.insert(
            HeaderName::from_static("x-cache"),
            HeaderValue::from_static(self.cache.as_str()),
        );
        response
    }
}

/// Wraps query handlers with the rate limiter and the response cache.
///
/// Order per request: admission, then cache lookup, then (on a miss) the
/// handler. A rejected request touches neither the cache nor the handler,
/// and failed handlers are never cached. Concurrent misses on the same key
/// each run the handler; the last write wins.
#[derive(Clone)]
pub struct RequestGate {
    limiter: Arc<SlidingWindowLimiter>,
    cache: Arc<ExpiringCache>,
}

impl RequestGate {
    pub fn new(limiter: Arc<SlidingWindowLimiter>, cache: Arc<ExpiringCache>) -> Self {
        Self { limiter, cache }
    }

    /// Count one request from `client` against the limit.
    pub fn admit(&self, endpoint: &str, client: &ClientIdentity) -> Result<RateLimitDecision> {
        let decision = self.limiter.check(client.as_str());
        MetricsRecorder::set_tracked_clients(self.limiter.tracked_clients());

        if !decision.allowed {
            tracing::warn!(
                client = %client,
                endpoint = %endpoint,
                limit = %decision.limit,
                "Rate limit exceeded"
            );
            MetricsRecorder::record_rate_limit_exceeded(endpoint);

            return Err(AppError::RateLimitExceeded {
                max_requests: self.limiter.max_requests(),
                window_seconds: self.limiter.window_seconds(),
                retry_after: decision.retry_after,
            });
        }

        Ok(decision)
    }

    /// Admit `client`, then answer from the cache or run `handler` and cache its result.
    pub async fn cached<F, Fut, T>(
        &self,
        client: &ClientIdentity,
        key: CacheKey,
        handler: F,
    ) -> Result<GatedResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        T: Serialize,
    {
        let endpoint = key.endpoint();
        let rate_limit = self.admit(endpoint, client)?;

        if let Some(body) = self.cache.get::<Value>(key.as_str()).await {
            tracing::debug!(key = %key, "Cache hit");
            MetricsRecorder::record_cache_lookup(endpoint, true);
            return Ok(GatedResponse {
                body,
                cache: CacheStatus::Hit,
                rate_limit,
            });
        }
        MetricsRecorder::record_cache_lookup(endpoint, false);

        let started = Instant::now();
        let result = handler().await;
        MetricsRecorder::record_query_duration(endpoint, started.elapsed().as_secs_f64());

        let body = serde_json::to_value(result?)
            .map_err(|e| AppError::Internal(format!("Response encoding failed: {}", e)))?;

        self.cache.set(key.as_str(), &body).await;
        tracing::debug!(key = %key, "Cache miss, stored fresh response");

        Ok(GatedResponse {
            body,
            cache: CacheStatus::Miss,
            rate_limit,
        })
    }
}

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

// Metrics registry
static RATE_LIMIT_EXCEEDED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rate_limit_exceeded_total",
        "Total number of requests rejected by the rate limiter",
        &["endpoint"]
    )
    .expect("rate_limit_exceeded_total registers once")
});

static RATE_LIMIT_TRACKED_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "rate_limit_tracked_clients",
        "Clients with at least one request inside the rate limit window"
    )
    .expect("rate_limit_tracked_clients registers once")
});

static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cache_lookups_total",
        "Response cache lookups by result",
        &["endpoint", "result"]
    )
    .expect("cache_lookups_total registers once")
});

static CACHE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cache_errors_total",
        "Cache backend failures that were degraded to a miss",
        &["operation"]
    )
    .expect("cache_errors_total registers once")
});

static QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "query_duration_seconds",
        "Data store query latency in seconds for cache misses",
        &["endpoint"],
        vec![0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0]
    )
    .expect("query_duration_seconds registers once")
});

pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn record_rate_limit_exceeded(endpoint: &str) {
        RATE_LIMIT_EXCEEDED_TOTAL
            .with_label_values(&[endpoint])
            .inc();
    }

    pub fn set_tracked_clients(count: usize) {
        RATE_LIMIT_TRACKED_CLIENTS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn record_cache_lookup(endpoint: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        CACHE_LOOKUPS_TOTAL
            .with_label_values(&[endpoint, result])
            .inc();
    }

    pub fn record_cache_error(operation: &str) {
        CACHE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }

    pub fn record_query_duration(endpoint: &str, duration: f64) {
        QUERY_DURATION
            .with_label_values(&[endpoint])
            .observe(duration);
    }

    /// Export all metrics in Prometheus format
    pub fn export() -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        encoder.encode_to_string(&metric_families)
    }
}

use crate::clock::Clock;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Sliding window rate limiter keeping per-client request timestamps in memory.
///
/// A client is admitted while it has fewer than `max_requests` admitted
/// requests newer than `now - window`. Every check first drops expired
/// timestamps for *all* clients and forgets clients left with none, so the
/// map only ever holds recently active clients.
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: chrono::Duration,
    clock: Arc<dyn Clock>,
    requests: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl SlidingWindowLimiter {
    /// Create a new sliding window rate limiter. A zero-length window is rejected.
    pub fn new(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if window.is_zero() {
            return Err(AppError::Configuration(
                "Rate limit window must be greater than zero".to_string(),
            ));
        }

        let window = chrono::Duration::from_std(window)
            .map_err(|e| AppError::Configuration(format!("Rate limit window: {}", e)))?;

        if clock.now().checked_sub_signed(window).is_none() {
            return Err(AppError::Configuration(
                "Rate limit window is out of range".to_string(),
            ));
        }

        Ok(Self {
            max_requests,
            window,
            clock,
            requests: Mutex::new(HashMap::new()),
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_seconds(&self) -> u64 {
        self.window.num_seconds().max(0) as u64
    }

    /// Admit or reject one request from `client`.
    pub fn admit(&self, client: &str) -> bool {
        self.check(client).allowed
    }

    /// Check if a request is allowed and record it if so.
    pub fn check(&self, client: &str) -> RateLimitDecision {
        let now = self.clock.now();
        // None only if the window reaches past the earliest representable time
        let cutoff = now.checked_sub_signed(self.window);
        let limit = self.max_requests;

        // Prune, count and append under one lock so concurrent callers for the
        // same client can never both take the last slot.
        let mut requests = self.requests.lock();

        requests.retain(|_, timestamps| {
            timestamps.retain(|ts| cutoff.map_or(true, |cutoff| *ts > cutoff));
            !timestamps.is_empty()
        });

        let current = requests.get(client).map_or(0, |t| t.len()) as u32;

        if current >= limit {
            let oldest = requests.get(client).and_then(|t| t.iter().min().copied());
            drop(requests);

            let reset_at = oldest.and_then(|ts| ts.checked_add_signed(self.window));
            let retry_after = reset_at.map(|reset| seconds_until(now, reset));

            tracing::debug!(
                client = %client,
                limit = %limit,
                current = %current,
                "Rate limit check rejected"
            );

            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                current,
                reset_at,
                retry_after,
            };
        }

        let timestamps = requests.entry(client.to_string()).or_default();
        timestamps.push_back(now);
        let current = timestamps.len() as u32;
        let oldest = timestamps.iter().min().copied().unwrap_or(now);

        tracing::trace!(
            client = %client,
            current = %current,
            remaining = %(limit - current),
            "Rate limit check admitted"
        );

        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit - current,
            current,
            reset_at: oldest.checked_add_signed(self.window),
            retry_after: None,
        }
    }

    /// Requests from `client` still inside the window, without recording one.
    #[cfg(test)]
    fn current_count(&self, client: &str) -> u32 {
        let cutoff = self.clock.now().checked_sub_signed(self.window);
        self.requests.lock().get(client).map_or(0, |t| {
            t.iter()
                .filter(|ts| cutoff.map_or(true, |cutoff| **ts > cutoff))
                .count() as u32
        })
    }

    /// Number of clients with at least one remembered request.
    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().len()
    }
}

fn seconds_until(now: DateTime<Utc>, then: DateTime<Utc>) -> u64 {
    let millis = (then - now).num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// The rate limit (max requests)
    pub limit: u32,
    /// Number of requests remaining in the current window
    pub remaining: u32,
    /// Requests counted in the window, including this one when admitted
    pub current: u32,
    /// When the oldest counted request leaves the window
    pub reset_at: Option<DateTime<Utc>>,
    /// Seconds until a slot frees up, for rejected requests
    pub retry_after: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};

    fn limiter(max_requests: u32, window_seconds: u64) -> (SlidingWindowLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let limiter = SlidingWindowLimiter::new(
            max_requests,
            Duration::from_secs(window_seconds),
            clock.clone(),
        )
        .unwrap();
        (limiter, clock)
    }

    #[test]
    fn test_sliding_window_scenario() {
        let (limiter, clock) = limiter(2, 60);

        assert!(limiter.admit("A")); // t=0
        clock.advance(Duration::from_secs(10));
        assert!(limiter.admit("A")); // t=10
        clock.advance(Duration::from_secs(10));
        assert!(!limiter.admit("A")); // t=20
        clock.advance(Duration::from_secs(41));
        assert!(limiter.admit("A")); // t=61, the t=0 request expired
    }

    #[test]
    fn test_limit_plus_one_rejected() {
        let (limiter, _clock) = limiter(5, 60);

        for i in 1..=5 {
            let result = limiter.check("client");
            assert!(result.allowed, "Request {} should be allowed", i);
            assert_eq!(result.current, i);
            assert_eq!(result.remaining, 5 - i);
        }

        let result = limiter.check("client");
        assert!(!result.allowed);
        assert_eq!(result.current, 5);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.retry_after, Some(60));

        // Rejections are not recorded
        assert_eq!(limiter.current_count("client"), 5);
    }

    #[test]
    fn test_request_exactly_at_cutoff_expires() {
        let (limiter, clock) = limiter(1, 60);

        assert!(limiter.admit("A"));
        clock.advance(Duration::from_secs(59));
        assert!(!limiter.admit("A"));
        clock.advance(Duration::from_secs(1));
        assert!(limiter.admit("A"));
    }

    #[test]
    fn test_clients_are_independent() {
        let (limiter, _clock) = limiter(1, 60);

        assert!(limiter.admit("10.0.0.1"));
        assert!(!limiter.admit("10.0.0.1"));
        assert!(limiter.admit("10.0.0.2"));
    }

    #[test]
    fn test_zero_max_requests_rejects_everything() {
        let (limiter, _clock) = limiter(0, 60);

        let result = limiter.check("A");
        assert!(!result.allowed);
        assert_eq!(result.retry_after, None);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_zero_window_is_configuration_error() {
        let result = SlidingWindowLimiter::new(10, Duration::ZERO, Arc::new(ManualClock::at_epoch()));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_window_reaching_past_earliest_time_is_configuration_error() {
        let result = SlidingWindowLimiter::new(
            10,
            Duration::from_secs(10_000_000_000_000),
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_checks_near_earliest_time_do_not_overflow() {
        let (limiter, clock) = limiter(2, 60);

        clock.set(DateTime::<Utc>::MIN_UTC);
        assert!(limiter.admit("A"));
        assert!(limiter.admit("A"));

        let rejected = limiter.check("A");
        assert!(!rejected.allowed);
        assert_eq!(rejected.retry_after, Some(60));
        assert_eq!(limiter.current_count("A"), 2);
    }

    #[test]
    fn test_idle_clients_are_forgotten() {
        let (limiter, clock) = limiter(10, 60);

        limiter.admit("A");
        limiter.admit("B");
        assert_eq!(limiter.tracked_clients(), 2);

        clock.advance(Duration::from_secs(30));
        limiter.admit("C");
        assert_eq!(limiter.tracked_clients(), 3);

        // A and B expire during C's next check
        clock.advance(Duration::from_secs(31));
        limiter.admit("C");
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.current_count("A"), 0);
        assert_eq!(limiter.current_count("C"), 2);
    }

    #[test]
    fn test_concurrent_checks_admit_exactly_the_limit() {
        let (limiter, _clock) = limiter(10, 60);

        let admitted: u32 = std::thread::scope(|s| {
            let handles: Vec<_> = (0..64)
                .map(|_| s.spawn(|| limiter.admit("shared") as u32))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 10);
        assert_eq!(limiter.current_count("shared"), 10);
    }
}

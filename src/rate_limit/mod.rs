pub mod middleware;
pub mod sliding_window;

pub use middleware::{add_rate_limit_headers, ClientIdentity};
pub use sliding_window::{RateLimitDecision, SlidingWindowLimiter};

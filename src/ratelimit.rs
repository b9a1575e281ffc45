//! Token-bucket admission control, one bucket per API route.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket refilled lazily on each call.
///
/// Holds at most `2 * rate` tokens and starts full.
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// A non-positive or non-finite rate is treated as 1 request per second
    pub fn new(requests_per_second: f64) -> Self {
        Self::starting_at(requests_per_second, Instant::now())
    }

    fn starting_at(requests_per_second: f64, now: Instant) -> Self {
        let rate = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            requests_per_second
        } else {
            1.0
        };
        let capacity = rate * 2.0;
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Take one token if available
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    pub fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Independent buckets for the rate-limited routes
#[derive(Clone)]
pub struct RouteLimiters {
    pub search: Arc<TokenBucket>,
    pub reverse: Arc<TokenBucket>,
    pub lookup: Arc<TokenBucket>,
    pub details: Arc<TokenBucket>,
}

impl RouteLimiters {
    pub fn new(requests_per_second: f64) -> Self {
        let bucket = || Arc::new(TokenBucket::new(requests_per_second));
        Self {
            search: bucket(),
            reverse: bucket(),
            lookup: bucket(),
            details: bucket(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_full_then_rejects() {
        let t0 = Instant::now();
        let bucket = TokenBucket::starting_at(2.0, t0);
        assert_eq!(bucket.capacity(), 4.0);
        for _ in 0..4 {
            assert!(bucket.allow_at(t0));
        }
        assert!(!bucket.allow_at(t0));
    }

    #[test]
    fn test_refills_with_elapsed_time_up_to_capacity() {
        let t0 = Instant::now();
        let bucket = TokenBucket::starting_at(1.0, t0);
        assert!(bucket.allow_at(t0));
        assert!(bucket.allow_at(t0));
        assert!(!bucket.allow_at(t0));

        let t1 = t0 + Duration::from_millis(1500);
        assert!(bucket.allow_at(t1));
        assert!(!bucket.allow_at(t1));

        // a long idle period only refills to capacity
        let t2 = t1 + Duration::from_secs(60);
        assert!(bucket.allow_at(t2));
        assert!(bucket.allow_at(t2));
        assert!(!bucket.allow_at(t2));
    }

    #[test]
    fn test_non_positive_rate_means_one() {
        assert_eq!(TokenBucket::new(0.0).rate(), 1.0);
        assert_eq!(TokenBucket::new(-5.0).rate(), 1.0);
        assert_eq!(TokenBucket::new(f64::NAN).rate(), 1.0);
    }

    #[test]
    fn test_routes_are_independent() {
        let limiters = RouteLimiters::new(0.5);
        assert!(limiters.search.allow());
        assert!(!limiters.search.allow());
        assert!(limiters.reverse.allow());
    }
}

//! Token-bucket rate limiting.
//!
//! [`rate_limit`] wraps an effect so every invocation first takes a token
//! from a shared bucket. The bucket refills continuously at
//! `max_per_second` and holds at most `burst` tokens, so short bursts pass
//! straight through while the sustained rate stays bounded.
//!
//! One bucket is created per wrapped effect and shared across all of that
//! wrapper's invocations - not per call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::writer::WriterEffect;

/// Token bucket configuration: sustained rate plus burst capacity.
///
/// # Examples
///
/// ```
/// use breakwater::RateLimitPolicy;
///
/// // 10 requests/second, bursts up to 10 (= floor of the rate).
/// let policy = RateLimitPolicy::per_second(10.0);
/// assert_eq!(policy.burst_capacity(), 10);
///
/// // Half a request per second still gets a usable bucket.
/// let slow = RateLimitPolicy::per_second(0.5);
/// assert_eq!(slow.burst_capacity(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    max_per_second: f64,
    burst: Option<u32>,
}

impl RateLimitPolicy {
    /// Sustain at most `max_per_second` invocations per second.
    ///
    /// Burst capacity defaults to `floor(max_per_second)`, but never below
    /// one token.
    ///
    /// # Panics
    ///
    /// Panics if `max_per_second <= 0`.
    pub fn per_second(max_per_second: f64) -> Self {
        assert!(
            max_per_second > 0.0,
            "RateLimitPolicy max_per_second must be > 0"
        );
        RateLimitPolicy {
            max_per_second,
            burst: None,
        }
    }

    /// Override the burst capacity.
    ///
    /// # Panics
    ///
    /// Panics if `burst < 1`.
    pub fn with_burst(mut self, burst: u32) -> Self {
        assert!(burst >= 1, "RateLimitPolicy burst must be >= 1");
        self.burst = Some(burst);
        self
    }

    /// The sustained rate in tokens per second.
    pub fn max_per_second(&self) -> f64 {
        self.max_per_second
    }

    /// The effective burst capacity.
    pub fn burst_capacity(&self) -> u32 {
        match self.burst {
            Some(burst) => burst,
            None => (self.max_per_second.floor() as u32).max(1),
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket shared by every invocation of one rate-limited wrapper.
///
/// The bucket starts full. `acquire` refills from elapsed wall-clock time
/// (clamped to capacity), takes a token when one is available, and
/// otherwise sleeps exactly long enough for the deficit to refill before
/// re-checking.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Build a bucket for the given policy, starting full.
    pub fn new(policy: &RateLimitPolicy) -> Self {
        let capacity = f64::from(policy.burst_capacity());
        TokenBucket {
            rate: policy.max_per_second(),
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, waiting for the refill when none is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
                state.last_refill = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                (1.0 - state.tokens) / self.rate
            };
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        }
    }
}

/// Generic rate-limit combinator.
///
/// The bucket is created here, once, and captured by the wrapper: all
/// invocations of the returned effect draw from the same bucket.
pub fn rate_limit_m<I>(thunk: Thunk<I::Raw>, policy: RateLimitPolicy) -> I::Monad
where
    I: Interp,
{
    let bucket = Arc::new(TokenBucket::new(&policy));
    I::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        let bucket = bucket.clone();
        Box::pin(async move {
            bucket.acquire().await;
            thunk().await
        })
    }))
}

/// Throttle an [`Effect`] with a token bucket.
///
/// # Examples
///
/// ```
/// use breakwater::{Effect, RateLimitPolicy};
/// use breakwater::combinators::rate_limit;
///
/// # tokio_test::block_on(async {
/// let limited = rate_limit(
///     Effect::<_, String>::pure(1),
///     RateLimitPolicy::per_second(100.0),
/// );
/// assert_eq!(limited.run().await, Ok(1));
/// # });
/// ```
pub fn rate_limit<T, E>(effect: Effect<T, E>, policy: RateLimitPolicy) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    rate_limit_m::<EffectInterp<T, E>>(effect.thunk(), policy)
}

/// Throttle a [`WriterEffect`] with a token bucket. The log is untouched.
pub fn rate_limit_writer<T, E, A>(
    effect: WriterEffect<T, E, A>,
    policy: RateLimitPolicy,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    rate_limit_m::<WriterInterp<T, E, A>>(effect.thunk(), policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_burst_passes_without_waiting() {
        let effect = rate_limit(
            Effect::<_, String>::pure(1),
            RateLimitPolicy::per_second(5.0).with_burst(3),
        );
        let start = Instant::now();
        for _ in 0..3 {
            assert_eq!(effect.run().await, Ok(1));
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_sustained_rate_is_bounded() {
        // 5 calls through a rate of 20/s with burst 1: at least
        // (5 - 1) / 20 = 200ms of wall clock.
        let effect = rate_limit(
            Effect::<_, String>::pure(1),
            RateLimitPolicy::per_second(20.0).with_burst(1),
        );
        let start = Instant::now();
        for _ in 0..5 {
            assert_eq!(effect.run().await, Ok(1));
        }
        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn test_bucket_is_shared_across_invocations_not_per_call() {
        let effect = rate_limit(
            Effect::<_, String>::pure(1),
            RateLimitPolicy::per_second(10.0).with_burst(1),
        );
        let start = Instant::now();
        assert_eq!(effect.run().await, Ok(1));
        assert_eq!(effect.run().await, Ok(1));
        // The second call had to wait for the shared bucket to refill.
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn test_default_burst_is_floor_of_rate() {
        assert_eq!(RateLimitPolicy::per_second(7.9).burst_capacity(), 7);
    }

    #[test]
    fn test_fractional_rate_keeps_one_token_of_capacity() {
        assert_eq!(RateLimitPolicy::per_second(0.25).burst_capacity(), 1);
    }

    #[test]
    #[should_panic(expected = "max_per_second must be > 0")]
    fn test_non_positive_rate_is_rejected() {
        let _ = RateLimitPolicy::per_second(0.0);
    }
}

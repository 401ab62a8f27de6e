//! Retry with pluggable backoff.
//!
//! [`RetryPolicy`] is pure data: it describes how many attempts to make,
//! how long to wait between them, and which errors are worth retrying.
//! The executing loop lives in [`retry_m`] and is shared by every effect
//! representation.
//!
//! # Quick Start
//!
//! ```
//! use breakwater::{Effect, RetryPolicy};
//! use breakwater::combinators::retry;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::exponential(5, Duration::from_millis(100))
//!     .with_max_delay(Duration::from_secs(2));
//!
//! let effect = retry(Effect::<_, String>::pure(42), policy);
//! assert_eq!(effect.run().await, Ok(42));
//! # });
//! ```
//!
//! # Backoff strategies
//!
//! - **Fixed**: the same delay before every retry
//! - **Exponential**: `initial * multiplier^attempt`, capped at `max_delay`
//! - **Jittered**: multiply any of the above by `1 ± jitter_factor`
//!   (uniformly sampled; requires the `jitter` feature, otherwise the base
//!   delay is used unchanged)

use std::sync::Arc;
use std::time::Duration;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::writer::WriterEffect;

/// The backoff curve of a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed(Duration),
    /// Delay grows geometrically from this initial value.
    Exponential(Duration),
}

/// A retry policy: attempt budget, backoff curve, and retry predicate.
///
/// Policies are immutable and shared across attempts. Invalid
/// configurations are rejected at construction time, not at execution
/// time.
///
/// # Examples
///
/// ```
/// use breakwater::RetryPolicy;
/// use std::time::Duration;
///
/// // Three attempts, 100ms apart.
/// let policy = RetryPolicy::<String>::fixed(3, Duration::from_millis(100));
/// assert_eq!(policy.times(), 3);
///
/// // Exponential: 100ms, 200ms, 400ms ... capped at 5s.
/// let policy = RetryPolicy::<String>::exponential(6, Duration::from_millis(100))
///     .with_max_delay(Duration::from_secs(5));
/// assert_eq!(policy.delay_for(0), Duration::from_millis(100));
/// assert_eq!(policy.delay_for(2), Duration::from_millis(400));
/// ```
pub struct RetryPolicy<E> {
    times: u32,
    backoff: Backoff,
    multiplier: f64,
    max_delay: Duration,
    jitter_factor: f64,
    retry_on: Option<Arc<dyn Fn(&E) -> bool + Send + Sync>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        RetryPolicy {
            times: self.times,
            backoff: self.backoff,
            multiplier: self.multiplier,
            max_delay: self.max_delay,
            jitter_factor: self.jitter_factor,
            retry_on: self.retry_on.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("times", &self.times)
            .field("backoff", &self.backoff)
            .field("multiplier", &self.multiplier)
            .field("max_delay", &self.max_delay)
            .field("jitter_factor", &self.jitter_factor)
            .field("retry_on", &self.retry_on.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

const DEFAULT_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

impl<E> RetryPolicy<E> {
    fn new(times: u32, backoff: Backoff) -> Self {
        assert!(times >= 1, "RetryPolicy times must be >= 1");
        RetryPolicy {
            times,
            backoff,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_factor: 0.0,
            retry_on: None,
        }
    }

    /// Same delay before every retry. Simple and predictable.
    ///
    /// `times` is the total attempt budget, including the first attempt.
    ///
    /// # Panics
    ///
    /// Panics if `times < 1`.
    pub fn fixed(times: u32, delay: Duration) -> Self {
        Self::new(times, Backoff::Fixed(delay))
    }

    /// Back off more aggressively with each failure.
    ///
    /// Delay for attempt `n` is `initial * multiplier^n`, capped at the
    /// configured `max_delay` (60s unless overridden).
    ///
    /// # Panics
    ///
    /// Panics if `times < 1`.
    pub fn exponential(times: u32, initial: Duration) -> Self {
        Self::new(times, Backoff::Exponential(initial))
    }

    /// Fixed base delay with randomized spread, to avoid thundering herds.
    ///
    /// Equivalent to `fixed(times, base).with_jitter_factor(0.5)`.
    pub fn jitter(times: u32, base: Duration) -> Self {
        Self::new(times, Backoff::Fixed(base)).with_jitter_factor(0.5)
    }

    /// Exponential growth plus randomness: production-grade retry.
    ///
    /// Equivalent to `exponential(times, initial).with_jitter_factor(0.3)`.
    pub fn exponential_jitter(times: u32, initial: Duration) -> Self {
        Self::new(times, Backoff::Exponential(initial)).with_jitter_factor(0.3)
    }

    /// Set the growth factor for exponential backoff.
    ///
    /// Has no effect on a fixed backoff curve.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier < 1.0`.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "RetryPolicy multiplier must be >= 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Cap exponential growth at this delay. No effect on a fixed curve.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Randomize delays by `± factor` (proportional jitter).
    ///
    /// Requires the `jitter` feature; without it the base delay is used
    /// unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `factor` is outside `[0, 1]`.
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&factor),
            "RetryPolicy jitter factor must be in [0, 1]"
        );
        self.jitter_factor = factor;
        self
    }

    /// Only retry errors the predicate accepts.
    ///
    /// A rejected error returns immediately, regardless of the remaining
    /// attempt budget.
    pub fn with_retry_on(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.retry_on = Some(Arc::new(predicate));
        self
    }

    /// Total attempt budget, including the first attempt.
    pub fn times(&self) -> u32 {
        self.times
    }

    /// The configured backoff curve.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Whether this error should be retried.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_on {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// Delay before the retry following attempt `attempt` (0-indexed),
    /// before jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential(initial) => {
                let grown = initial.as_secs_f64() * self.multiplier.powi(attempt as i32);
                Duration::from_secs_f64(grown.min(self.max_delay.as_secs_f64()))
            }
        }
    }

    /// Delay with jitter applied (used by the retry loop).
    #[doc(hidden)]
    pub fn sleep_for(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        if self.jitter_factor <= 0.0 {
            return base;
        }
        apply_jitter(base, self.jitter_factor)
    }
}

#[cfg(feature = "jitter")]
fn apply_jitter(base: Duration, factor: f64) -> Duration {
    use rand::Rng;
    let mut rng = rand::rng();
    let spread = rng.random_range(-factor..=factor);
    Duration::from_secs_f64((base.as_secs_f64() * (1.0 + spread)).max(0.0))
}

#[cfg(not(feature = "jitter"))]
fn apply_jitter(base: Duration, _factor: f64) -> Duration {
    base
}

/// Generic retry combinator.
///
/// Runs the thunk up to `policy.times()` times. Stop conditions, in order:
/// success returns immediately; a failure on the final attempt returns that
/// failure; a failure the policy refuses to retry returns immediately.
/// Otherwise the loop sleeps the backoff delay (skipped when zero) and
/// tries again. Only the final attempt's raw result - and for writer
/// effects, only its log - survives; earlier attempts are discarded.
pub fn retry_m<I>(thunk: Thunk<I::Raw>, policy: RetryPolicy<I::Error>) -> I::Monad
where
    I: Interp,
{
    I::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        let policy = policy.clone();
        Box::pin(async move {
            for attempt in 0..policy.times() {
                let raw = thunk().await;
                let (result, ctx) = I::split(raw);
                match result {
                    Ok(value) => return I::rebuild(Ok(value), ctx),
                    Err(error) => {
                        let last = attempt + 1 == policy.times();
                        if last || !policy.should_retry(&error) {
                            return I::rebuild(Err(error), ctx);
                        }
                        #[cfg(feature = "tracing")]
                        tracing::debug!(attempt = attempt + 1, "retrying failed effect");
                        let delay = policy.sleep_for(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
            unreachable!("retry loop exits inside the final attempt")
        })
    }))
}

/// Retry an [`Effect`] according to a policy.
///
/// # Examples
///
/// ```
/// use breakwater::{Effect, RetryPolicy};
/// use breakwater::combinators::retry;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let effect = retry(
///     Effect::<i32, _>::fail("down".to_string()),
///     RetryPolicy::fixed(3, Duration::ZERO),
/// );
/// assert_eq!(effect.run().await, Err("down".to_string()));
/// # });
/// ```
pub fn retry<T, E>(effect: Effect<T, E>, policy: RetryPolicy<E>) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    retry_m::<EffectInterp<T, E>>(effect.thunk(), policy)
}

/// Retry a [`WriterEffect`] according to a policy.
///
/// Logs of failed attempts are discarded; the returned effect carries only
/// the final attempt's log.
pub fn retry_writer<T, E, A>(
    effect: WriterEffect<T, E, A>,
    policy: RetryPolicy<E>,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    retry_m::<WriterInterp<T, E, A>>(effect.thunk(), policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::writer_err;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failing_counter(calls: Arc<AtomicU32>) -> Effect<i32, String> {
        Effect::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("always".to_string())
            }
        })
    }

    fn flaky(calls: Arc<AtomicU32>, failures: u32) -> Effect<u32, String> {
        Effect::new(move || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(format!("failure {}", n))
                } else {
                    Ok(n)
                }
            }
        })
    }

    #[tokio::test]
    async fn test_retry_runs_exactly_times_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = retry(
            failing_counter(calls.clone()),
            RetryPolicy::fixed(4, Duration::ZERO),
        );
        assert_eq!(effect.run().await, Err("always".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_stops_on_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = retry(
            flaky(calls.clone(), 2),
            RetryPolicy::fixed(5, Duration::ZERO),
        );
        assert_eq!(effect.run().await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds_with_budget_of_three() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = retry(
            flaky(calls.clone(), 2),
            RetryPolicy::fixed(3, Duration::ZERO),
        );
        assert_eq!(effect.run().await, Ok(2));
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds_with_budget_of_two() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = retry(
            flaky(calls.clone(), 2),
            RetryPolicy::fixed(2, Duration::ZERO),
        );
        assert_eq!(effect.run().await, Err("failure 1".to_string()));
    }

    #[tokio::test]
    async fn test_retry_on_rejection_stops_after_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy =
            RetryPolicy::fixed(5, Duration::ZERO).with_retry_on(|e: &String| e != "always");
        let effect = retry(failing_counter(calls.clone()), policy);
        assert_eq!(effect.run().await, Err("always".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_writer_keeps_only_final_attempt_log() {
        let effect = retry_writer(
            writer_err::<i32, _, _>("boom".to_string(), ["attempt log"]),
            RetryPolicy::fixed(3, Duration::ZERO),
        );
        let (result, log) = effect.run().await;
        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(log.entries(), &["attempt log"]);
    }

    #[test]
    fn test_exponential_delay_growth() {
        let policy = RetryPolicy::<String>::exponential(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy::<String>::exponential(10, Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));
        assert_eq!(policy.delay_for(9), Duration::from_millis(500));
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::<String>::fixed(3, Duration::from_millis(50));
        assert_eq!(policy.delay_for(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for(2), Duration::from_millis(50));
    }

    #[test]
    #[should_panic(expected = "times must be >= 1")]
    fn test_zero_times_is_rejected_eagerly() {
        let _ = RetryPolicy::<String>::fixed(0, Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "jitter factor")]
    fn test_out_of_range_jitter_is_rejected() {
        let _ = RetryPolicy::<String>::fixed(1, Duration::ZERO).with_jitter_factor(1.5);
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_jitter_stays_within_spread() {
        let policy = RetryPolicy::<String>::jitter(3, Duration::from_millis(100));
        for attempt in 0..3 {
            let d = policy.sleep_for(attempt);
            assert!(d >= Duration::from_millis(50));
            assert!(d <= Duration::from_millis(150));
        }
    }
}

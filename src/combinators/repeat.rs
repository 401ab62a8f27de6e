//! Repeat an effect until its value satisfies a condition.
//!
//! [`repeat_until`] re-runs an effect up to `max_rounds` times until the
//! success value passes the condition. An error from the underlying effect
//! short-circuits immediately; exhausting every round yields
//! [`RepeatError::ConditionNotMet`] carrying the round count.

use std::sync::Arc;
use std::time::Duration;

use crate::effect::Effect;
use crate::error::RepeatError;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::writer::WriterEffect;

/// Configuration for [`repeat_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatPolicy {
    max_rounds: u32,
    delay: Duration,
}

impl RepeatPolicy {
    /// Repeat up to `max_rounds` times with no delay between rounds.
    ///
    /// # Panics
    ///
    /// Panics if `max_rounds < 1`.
    pub fn new(max_rounds: u32) -> Self {
        assert!(max_rounds >= 1, "RepeatPolicy max_rounds must be >= 1");
        RepeatPolicy {
            max_rounds,
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long between rounds.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Maximum number of rounds.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Delay between rounds.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Generic repeat-until combinator.
///
/// Runs the thunk up to `max_rounds` times. A success that satisfies the
/// condition returns immediately with its own context; an error
/// short-circuits, widened to [`RepeatError::Inner`]; exhaustion returns
/// [`RepeatError::ConditionNotMet`] with an empty context.
pub fn repeat_until_m<In, Out, P>(
    thunk: Thunk<In::Raw>,
    condition: P,
    policy: RepeatPolicy,
) -> Out::Monad
where
    In: Interp,
    Out: Interp<Value = In::Value, Error = RepeatError<In::Error>, Ctx = In::Ctx>,
    P: Fn(&In::Value) -> bool + Send + Sync + 'static,
{
    let condition = Arc::new(condition);
    Out::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        let condition = condition.clone();
        Box::pin(async move {
            for round in 0..policy.max_rounds() {
                let raw = thunk().await;
                let (result, ctx) = In::split(raw);
                match result {
                    Ok(value) => {
                        if condition(&value) {
                            return Out::rebuild(Ok(value), ctx);
                        }
                    }
                    Err(error) => {
                        return Out::rebuild(Err(RepeatError::Inner(error)), ctx);
                    }
                }
                if round + 1 < policy.max_rounds() && !policy.delay().is_zero() {
                    tokio::time::sleep(policy.delay()).await;
                }
            }
            Out::rebuild(
                Err(RepeatError::condition_not_met(policy.max_rounds())),
                Monoid::empty(),
            )
        })
    }))
}

/// Re-run an [`Effect`] until its value satisfies the condition.
///
/// # Examples
///
/// ```
/// use breakwater::{Effect, RepeatPolicy};
/// use breakwater::combinators::repeat_until;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let counter = Arc::new(AtomicU32::new(0));
/// let ticks = counter.clone();
/// let effect = Effect::<_, String>::new(move || {
///     let ticks = ticks.clone();
///     async move { Ok(ticks.fetch_add(1, Ordering::SeqCst)) }
/// });
///
/// let done = repeat_until(effect, |n| *n >= 2, RepeatPolicy::new(5));
/// assert_eq!(done.run().await, Ok(2));
/// # });
/// ```
pub fn repeat_until<T, E, P>(
    effect: Effect<T, E>,
    condition: P,
    policy: RepeatPolicy,
) -> Effect<T, RepeatError<E>>
where
    T: Send + 'static,
    E: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    repeat_until_m::<EffectInterp<T, E>, EffectInterp<T, RepeatError<E>>, P>(
        effect.thunk(),
        condition,
        policy,
    )
}

/// Re-run a [`WriterEffect`] until its value satisfies the condition.
///
/// The returned log is the satisfying round's log; exhaustion yields an
/// empty log.
pub fn repeat_until_writer<T, E, A, P>(
    effect: WriterEffect<T, E, A>,
    condition: P,
    policy: RepeatPolicy,
) -> WriterEffect<T, RepeatError<E>, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    repeat_until_m::<WriterInterp<T, E, A>, WriterInterp<T, RepeatError<E>, A>, P>(
        effect.thunk(),
        condition,
        policy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting(calls: Arc<AtomicU32>) -> Effect<u32, String> {
        Effect::new(move || {
            let calls = calls.clone();
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) }
        })
    }

    #[tokio::test]
    async fn test_stops_when_condition_met() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = repeat_until(counting(calls.clone()), |n| *n >= 3, RepeatPolicy::new(10));
        assert_eq!(effect.run().await, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_round_count() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = repeat_until(counting(calls.clone()), |_| false, RepeatPolicy::new(4));
        assert_eq!(
            effect.run().await,
            Err(RepeatError::condition_not_met(4))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_inner_error_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let effect = Effect::<u32, _>::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("broken".to_string())
            }
        });
        let repeated = repeat_until(effect, |_| true, RepeatPolicy::new(10));
        assert_eq!(
            repeated.run().await,
            Err(RepeatError::Inner("broken".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_writer_exhaustion_has_empty_log() {
        let effect = crate::writer::writer_ok::<_, String, _>(1, ["round"]);
        let repeated = repeat_until_writer(effect, |_| false, RepeatPolicy::new(2));
        let (result, log) = repeated.run().await;
        assert_eq!(result, Err(RepeatError::condition_not_met(2)));
        assert!(log.is_empty());
    }

    #[test]
    #[should_panic(expected = "max_rounds must be >= 1")]
    fn test_zero_rounds_rejected() {
        let _ = RepeatPolicy::new(0);
    }
}

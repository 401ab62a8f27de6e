//! Deadlines and delays.
//!
//! [`timeout`] races an effect against a deadline; [`delay`] sleeps before
//! running one. On expiry the in-flight work is cancelled (the future is
//! dropped at the deadline) and a [`TimeoutError::Timeout`] is returned.
//! For writer effects any partially accumulated log is discarded with the
//! cancelled work - cancellation races with log writes, and dropping the
//! partial log is preferred over returning an inconsistent one.

use std::sync::Arc;
use std::time::Duration;

use crate::effect::Effect;
use crate::error::TimeoutError;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::writer::WriterEffect;

/// Generic timeout combinator.
///
/// Completion before the deadline passes the outcome through with the
/// error channel widened to [`TimeoutError`]; expiry cancels the work and
/// yields `TimeoutError::Timeout` with an empty context.
pub fn timeout_m<In, Out>(thunk: Thunk<In::Raw>, duration: Duration) -> Out::Monad
where
    In: Interp,
    Out: Interp<Value = In::Value, Error = TimeoutError<In::Error>, Ctx = In::Ctx>,
{
    Out::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        Box::pin(async move {
            match tokio::time::timeout(duration, thunk()).await {
                Ok(raw) => {
                    let (result, ctx) = In::split(raw);
                    Out::rebuild(result.map_err(TimeoutError::Inner), ctx)
                }
                Err(_) => Out::rebuild(Err(TimeoutError::timeout(duration)), Monoid::empty()),
            }
        })
    }))
}

/// Generic delay combinator: sleep, then run.
pub fn delay_m<I>(thunk: Thunk<I::Raw>, duration: Duration) -> I::Monad
where
    I: Interp,
{
    I::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        Box::pin(async move {
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
            thunk().await
        })
    }))
}

/// Bound an [`Effect`] by a deadline.
///
/// # Examples
///
/// ```
/// use breakwater::{Effect, TimeoutError};
/// use breakwater::combinators::timeout;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let fast = timeout(Effect::<_, String>::pure(1), Duration::from_secs(1));
/// assert_eq!(fast.run().await, Ok(1));
///
/// let slow = Effect::<i32, String>::new(|| async {
///     tokio::time::sleep(Duration::from_secs(10)).await;
///     Ok(1)
/// });
/// let bounded = timeout(slow, Duration::from_millis(5));
/// assert!(matches!(bounded.run().await, Err(TimeoutError::Timeout { .. })));
/// # });
/// ```
pub fn timeout<T, E>(effect: Effect<T, E>, duration: Duration) -> Effect<T, TimeoutError<E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    timeout_m::<EffectInterp<T, E>, EffectInterp<T, TimeoutError<E>>>(effect.thunk(), duration)
}

/// Bound a [`WriterEffect`] by a deadline.
///
/// On expiry the partial log is discarded along with the cancelled work;
/// the returned log is empty.
pub fn timeout_writer<T, E, A>(
    effect: WriterEffect<T, E, A>,
    duration: Duration,
) -> WriterEffect<T, TimeoutError<E>, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    timeout_m::<WriterInterp<T, E, A>, WriterInterp<T, TimeoutError<E>, A>>(
        effect.thunk(),
        duration,
    )
}

/// Sleep before running an [`Effect`].
pub fn delay<T, E>(effect: Effect<T, E>, duration: Duration) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    delay_m::<EffectInterp<T, E>>(effect.thunk(), duration)
}

/// Sleep before running a [`WriterEffect`]. The log is untouched.
pub fn delay_writer<T, E, A>(
    effect: WriterEffect<T, E, A>,
    duration: Duration,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    delay_m::<WriterInterp<T, E, A>>(effect.thunk(), duration)
}

//! Observation without interference.
//!
//! [`tap`] runs a callback on success values, [`tap_err`] on errors; the
//! outcome passes through unchanged either way. Useful for logging,
//! metrics, and debugging probes.

use std::sync::Arc;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::writer::WriterEffect;

/// Generic tap combinator: observe the success value, pass the raw result
/// through unchanged.
pub fn tap_m<I, F>(thunk: Thunk<I::Raw>, observe: F) -> I::Monad
where
    I: Interp,
    F: Fn(&I::Value) + Send + Sync + 'static,
{
    let observe = Arc::new(observe);
    I::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        let observe = observe.clone();
        Box::pin(async move {
            let raw = thunk().await;
            let (result, ctx) = I::split(raw);
            if let Ok(value) = &result {
                observe(value);
            }
            I::rebuild(result, ctx)
        })
    }))
}

/// Generic tap combinator for the error channel.
pub fn tap_err_m<I, F>(thunk: Thunk<I::Raw>, observe: F) -> I::Monad
where
    I: Interp,
    F: Fn(&I::Error) + Send + Sync + 'static,
{
    let observe = Arc::new(observe);
    I::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        let observe = observe.clone();
        Box::pin(async move {
            let raw = thunk().await;
            let (result, ctx) = I::split(raw);
            if let Err(error) = &result {
                observe(error);
            }
            I::rebuild(result, ctx)
        })
    }))
}

/// Observe an [`Effect`]'s success value without altering it.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::tap;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let seen = Arc::new(AtomicI32::new(0));
/// let probe = seen.clone();
/// let effect = tap(Effect::<_, String>::pure(7), move |n| {
///     probe.store(*n, Ordering::SeqCst);
/// });
/// assert_eq!(effect.run().await, Ok(7));
/// assert_eq!(seen.load(Ordering::SeqCst), 7);
/// # });
/// ```
pub fn tap<T, E, F>(effect: Effect<T, E>, observe: F) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    tap_m::<EffectInterp<T, E>, F>(effect.thunk(), observe)
}

/// Observe an [`Effect`]'s error without altering it.
pub fn tap_err<T, E, F>(effect: Effect<T, E>, observe: F) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(&E) + Send + Sync + 'static,
{
    tap_err_m::<EffectInterp<T, E>, F>(effect.thunk(), observe)
}

/// Observe a [`WriterEffect`]'s success value. The log is untouched.
pub fn tap_writer<T, E, A, F>(effect: WriterEffect<T, E, A>, observe: F) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    tap_m::<WriterInterp<T, E, A>, F>(effect.thunk(), observe)
}

/// Observe a [`WriterEffect`]'s error. The log is untouched.
pub fn tap_err_writer<T, E, A, F>(
    effect: WriterEffect<T, E, A>,
    observe: F,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(&E) + Send + Sync + 'static,
{
    tap_err_m::<WriterInterp<T, E, A>, F>(effect.thunk(), observe)
}

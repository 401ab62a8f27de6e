//! Fallback chains: try alternatives left to right.
//!
//! [`fallback`] tries a secondary effect when the primary fails;
//! [`fallback_chain`] generalizes to any number of alternatives. The first
//! success wins; if everything fails, the last failure is returned.
//!
//! For writer effects only the returned branch's log is kept - a failed
//! primary's log is discarded once a later branch succeeds.

use std::sync::Arc;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::writer::WriterEffect;

/// Generic fallback chain: try each thunk in order, return the first
/// success, or the last failure if all fail.
///
/// # Panics
///
/// Panics if called with no thunks.
pub fn fallback_chain_m<I>(thunks: Vec<Thunk<I::Raw>>) -> I::Monad
where
    I: Interp,
{
    assert!(
        !thunks.is_empty(),
        "fallback_chain requires at least one effect"
    );
    I::wrap(Arc::new(move || {
        let thunks = thunks.clone();
        Box::pin(async move {
            let last = thunks.len() - 1;
            for (index, thunk) in thunks.iter().enumerate() {
                let raw = thunk().await;
                let (result, ctx) = I::split(raw);
                match result {
                    Ok(value) => return I::rebuild(Ok(value), ctx),
                    Err(error) => {
                        if index == last {
                            return I::rebuild(Err(error), ctx);
                        }
                    }
                }
            }
            unreachable!("fallback_chain returns inside the final alternative")
        })
    }))
}

/// Try `secondary` when `primary` fails.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::fallback;
///
/// # tokio_test::block_on(async {
/// let effect = fallback(
///     Effect::<i32, _>::fail("primary down".to_string()),
///     Effect::pure(2),
/// );
/// assert_eq!(effect.run().await, Ok(2));
/// # });
/// ```
pub fn fallback<T, E>(primary: Effect<T, E>, secondary: Effect<T, E>) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fallback_chain_m::<EffectInterp<T, E>>(vec![primary.thunk(), secondary.thunk()])
}

/// Compute the fallback from the primary's error.
///
/// This variant stays outside the generic core: the secondary effect
/// depends on the error value itself.
pub fn fallback_with<T, E, F>(primary: Effect<T, E>, secondary: F) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(E) -> Effect<T, E> + Send + Sync + 'static,
{
    let primary = primary.thunk();
    let secondary = Arc::new(secondary);
    Effect::from_thunk(Arc::new(move || {
        let primary = primary.clone();
        let secondary = secondary.clone();
        Box::pin(async move {
            match primary().await {
                Ok(value) => Ok(value),
                Err(error) => secondary(error).run().await,
            }
        })
    }))
}

/// Try each effect in order until one succeeds.
pub fn fallback_chain<T, E>(effects: Vec<Effect<T, E>>) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fallback_chain_m::<EffectInterp<T, E>>(effects.iter().map(Effect::thunk).collect())
}

/// Try `secondary` when `primary` fails - writer variant.
///
/// Only the returned branch's log is kept.
pub fn fallback_writer<T, E, A>(
    primary: WriterEffect<T, E, A>,
    secondary: WriterEffect<T, E, A>,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    fallback_chain_m::<WriterInterp<T, E, A>>(vec![primary.thunk(), secondary.thunk()])
}

/// Try each writer effect in order until one succeeds. Only the returned
/// branch's log is kept.
pub fn fallback_chain_writer<T, E, A>(
    effects: Vec<WriterEffect<T, E, A>>,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    fallback_chain_m::<WriterInterp<T, E, A>>(effects.iter().map(WriterEffect::thunk).collect())
}

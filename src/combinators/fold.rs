//! Effectful left fold.
//!
//! [`fold`] threads an accumulator through a sequence of effectful steps,
//! strictly in order. The first failure stops the fold and is returned;
//! for writer effects the logs of every executed step (including the
//! failing one) are merged.

use std::sync::Arc;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::semigroup::Semigroup;
use crate::writer::WriterEffect;

/// Generic fold combinator: sequential, first error stops.
pub fn fold_m<A, I, F>(items: Vec<A>, initial: I::Value, step: F) -> I::Monad
where
    A: Clone + Send + Sync + 'static,
    I: Interp,
    I::Value: Clone + Sync,
    F: Fn(I::Value, A) -> Thunk<I::Raw> + Send + Sync + 'static,
{
    let step = Arc::new(step);
    I::wrap(Arc::new(move || {
        let items = items.clone();
        let initial = initial.clone();
        let step = step.clone();
        Box::pin(async move {
            let mut acc = initial;
            let mut ctx: I::Ctx = Monoid::empty();
            for item in items {
                let raw = step(acc, item)().await;
                let (result, step_ctx) = I::split(raw);
                ctx = ctx.combine(step_ctx);
                match result {
                    Ok(next) => acc = next,
                    Err(error) => return I::rebuild(Err(error), ctx),
                }
            }
            I::rebuild(Ok(acc), ctx)
        })
    }))
}

/// Fold items through effectful steps, threading an accumulator.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::fold;
///
/// # tokio_test::block_on(async {
/// let effect = fold(vec![1, 2, 3], 0, |acc, n| {
///     Effect::<_, String>::pure(acc + n)
/// });
/// assert_eq!(effect.run().await, Ok(6));
/// # });
/// ```
pub fn fold<A, T, E, F>(items: Vec<A>, initial: T, step: F) -> Effect<T, E>
where
    A: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    F: Fn(T, A) -> Effect<T, E> + Send + Sync + 'static,
{
    fold_m::<A, EffectInterp<T, E>, _>(items, initial, move |acc, item| step(acc, item).thunk())
}

/// Fold items through effectful steps, merging every step's log.
pub fn fold_writer<A, T, E, W, F>(items: Vec<A>, initial: T, step: F) -> WriterEffect<T, E, W>
where
    A: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    W: Send + 'static,
    F: Fn(T, A) -> WriterEffect<T, E, W> + Send + Sync + 'static,
{
    fold_m::<A, WriterInterp<T, E, W>, _>(items, initial, move |acc, item| {
        step(acc, item).thunk()
    })
}

//! Effectful traversal of collections.
//!
//! [`traverse`] maps items through an effectful handler strictly in
//! sequence, preserving order; the first failure stops the walk.
//! [`traverse_par`] trades the ordering of *execution* for speed while
//! still reassembling results in input order (it delegates to
//! [`batch`](crate::combinators::batch::batch)). [`sequence`] and
//! [`replicate`] are the usual specializations.

use std::sync::Arc;

use crate::combinators::batch::{batch, batch_writer};
use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::semigroup::Semigroup;
use crate::writer::WriterEffect;

/// Generic sequential traverse: handler effects run one at a time, results
/// keep input order, the first error stops the walk.
pub fn traverse_m<A, In, Out, F>(items: Vec<A>, handler: F) -> Out::Monad
where
    A: Clone + Send + Sync + 'static,
    In: Interp,
    Out: Interp<Value = Vec<In::Value>, Error = In::Error, Ctx = In::Ctx>,
    F: Fn(A) -> Thunk<In::Raw> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    Out::wrap(Arc::new(move || {
        let items = items.clone();
        let handler = handler.clone();
        Box::pin(async move {
            let mut values = Vec::with_capacity(items.len());
            let mut ctx: In::Ctx = Monoid::empty();
            for item in items {
                let raw = handler(item)().await;
                let (result, item_ctx) = In::split(raw);
                ctx = ctx.combine(item_ctx);
                match result {
                    Ok(value) => values.push(value),
                    Err(error) => return Out::rebuild(Err(error), ctx),
                }
            }
            Out::rebuild(Ok(values), ctx)
        })
    }))
}

/// Sequentially map items through an effectful handler.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::traverse;
///
/// # tokio_test::block_on(async {
/// let effect = traverse(vec![1, 2, 3], |n| Effect::<_, String>::pure(n * 10));
/// assert_eq!(effect.run().await, Ok(vec![10, 20, 30]));
/// # });
/// ```
pub fn traverse<A, T, E, F>(items: Vec<A>, handler: F) -> Effect<Vec<T>, E>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Effect<T, E> + Send + Sync + 'static,
{
    traverse_m::<A, EffectInterp<T, E>, EffectInterp<Vec<T>, E>, _>(items, move |item| {
        handler(item).thunk()
    })
}

/// Traverse with bounded concurrency; execution order is unspecified but
/// results keep input order.
pub fn traverse_par<A, T, E, F>(items: Vec<A>, handler: F, concurrency: usize) -> Effect<Vec<T>, E>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Effect<T, E> + Send + Sync + 'static,
{
    batch(items, handler, concurrency)
}

/// Sequentially map items through a writer handler, merging every
/// executed item's log (including a failing one).
pub fn traverse_writer<A, T, E, W, F>(items: Vec<A>, handler: F) -> WriterEffect<Vec<T>, E, W>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    W: Send + 'static,
    F: Fn(A) -> WriterEffect<T, E, W> + Send + Sync + 'static,
{
    traverse_m::<A, WriterInterp<T, E, W>, WriterInterp<Vec<T>, E, W>, _>(items, move |item| {
        handler(item).thunk()
    })
}

/// [`traverse_par`] for writer effects; all branches' logs are merged.
pub fn traverse_par_writer<A, T, E, W, F>(
    items: Vec<A>,
    handler: F,
    concurrency: usize,
) -> WriterEffect<Vec<T>, E, W>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    W: Send + 'static,
    F: Fn(A) -> WriterEffect<T, E, W> + Send + Sync + 'static,
{
    batch_writer(items, handler, concurrency)
}

/// Flip structure: a list of effects becomes an effect of a list.
pub fn sequence<T, E>(effects: Vec<Effect<T, E>>) -> Effect<Vec<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let thunks: Vec<Thunk<Result<T, E>>> = effects.iter().map(Effect::thunk).collect();
    traverse_m::<Thunk<Result<T, E>>, EffectInterp<T, E>, EffectInterp<Vec<T>, E>, _>(
        thunks,
        |thunk| thunk,
    )
}

/// Flip structure for writer effects, merging logs in order.
pub fn sequence_writer<T, E, W>(effects: Vec<WriterEffect<T, E, W>>) -> WriterEffect<Vec<T>, E, W>
where
    T: Send + 'static,
    E: Send + 'static,
    W: Send + 'static,
{
    let thunks: Vec<Thunk<(Result<T, E>, crate::Log<W>)>> =
        effects.iter().map(WriterEffect::thunk).collect();
    traverse_m::<Thunk<(Result<T, E>, crate::Log<W>)>, WriterInterp<T, E, W>, WriterInterp<Vec<T>, E, W>, _>(
        thunks,
        |thunk| thunk,
    )
}

/// Run the same effect `n` times sequentially, collecting the results.
///
/// `n == 0` yields an empty list.
pub fn replicate<T, E>(effect: Effect<T, E>, n: usize) -> Effect<Vec<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    sequence(vec![effect; n])
}

/// Run the same writer effect `n` times sequentially, merging logs.
pub fn replicate_writer<T, E, W>(effect: WriterEffect<T, E, W>, n: usize) -> WriterEffect<Vec<T>, E, W>
where
    T: Send + 'static,
    E: Send + 'static,
    W: Send + 'static,
{
    sequence_writer(vec![effect; n])
}

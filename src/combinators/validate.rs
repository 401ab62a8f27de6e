//! Error-accumulating validation and partitioning.
//!
//! [`validate`] runs every effect concurrently and, unlike fail-fast
//! combinators, collects **all** failures: it succeeds only when every
//! branch does, and otherwise reports the full error list in input order.
//! [`partition`] never fails - it splits outcomes into successes and
//! failures.

use std::sync::Arc;

use futures::future::join_all;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::semigroup::Semigroup;
use crate::writer::WriterEffect;

/// Generic validate combinator: collect every failure, in input order.
pub fn validate_m<In, Out>(thunks: Vec<Thunk<In::Raw>>) -> Out::Monad
where
    In: Interp,
    Out: Interp<Value = Vec<In::Value>, Error = Vec<In::Error>, Ctx = In::Ctx>,
{
    Out::wrap(Arc::new(move || {
        let futures: Vec<_> = thunks.iter().map(|thunk| thunk()).collect();
        Box::pin(async move {
            let raws = join_all(futures).await;
            let mut successes = Vec::new();
            let mut failures = Vec::new();
            let mut ctx: In::Ctx = Monoid::empty();
            for raw in raws {
                let (result, branch_ctx) = In::split(raw);
                ctx = ctx.combine(branch_ctx);
                match result {
                    Ok(value) => successes.push(value),
                    Err(error) => failures.push(error),
                }
            }
            if failures.is_empty() {
                Out::rebuild(Ok(successes), ctx)
            } else {
                Out::rebuild(Err(failures), ctx)
            }
        })
    }))
}

/// Generic partition combinator: split outcomes, never fail.
pub fn partition_m<In, Out>(thunks: Vec<Thunk<In::Raw>>) -> Out::Monad
where
    In: Interp,
    Out: Interp<
        Value = (Vec<In::Value>, Vec<In::Error>),
        Error = std::convert::Infallible,
        Ctx = In::Ctx,
    >,
{
    Out::wrap(Arc::new(move || {
        let futures: Vec<_> = thunks.iter().map(|thunk| thunk()).collect();
        Box::pin(async move {
            let raws = join_all(futures).await;
            let mut successes = Vec::new();
            let mut failures = Vec::new();
            let mut ctx: In::Ctx = Monoid::empty();
            for raw in raws {
                let (result, branch_ctx) = In::split(raw);
                ctx = ctx.combine(branch_ctx);
                match result {
                    Ok(value) => successes.push(value),
                    Err(error) => failures.push(error),
                }
            }
            Out::rebuild(Ok((successes, failures)), ctx)
        })
    }))
}

/// Run all effects concurrently; succeed only if every one does.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::validate;
///
/// # tokio_test::block_on(async {
/// let effect = validate(vec![
///     Effect::<i32, String>::pure(1),
///     Effect::fail("too short".to_string()),
///     Effect::fail("too long".to_string()),
/// ]);
/// assert_eq!(
///     effect.run().await,
///     Err(vec!["too short".to_string(), "too long".to_string()]),
/// );
/// # });
/// ```
pub fn validate<T, E>(effects: Vec<Effect<T, E>>) -> Effect<Vec<T>, Vec<E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    validate_m::<EffectInterp<T, E>, EffectInterp<Vec<T>, Vec<E>>>(
        effects.iter().map(Effect::thunk).collect(),
    )
}

/// [`validate`] for writer effects; every branch's log is merged.
pub fn validate_writer<T, E, A>(
    effects: Vec<WriterEffect<T, E, A>>,
) -> WriterEffect<Vec<T>, Vec<E>, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    validate_m::<WriterInterp<T, E, A>, WriterInterp<Vec<T>, Vec<E>, A>>(
        effects.iter().map(WriterEffect::thunk).collect(),
    )
}

/// Run all effects concurrently and split the outcomes. Never fails.
pub fn partition<T, E>(
    effects: Vec<Effect<T, E>>,
) -> Effect<(Vec<T>, Vec<E>), std::convert::Infallible>
where
    T: Send + 'static,
    E: Send + 'static,
{
    partition_m::<EffectInterp<T, E>, EffectInterp<(Vec<T>, Vec<E>), std::convert::Infallible>>(
        effects.iter().map(Effect::thunk).collect(),
    )
}

/// [`partition`] for writer effects; every branch's log is merged.
pub fn partition_writer<T, E, A>(
    effects: Vec<WriterEffect<T, E, A>>,
) -> WriterEffect<(Vec<T>, Vec<E>), std::convert::Infallible, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    partition_m::<
        WriterInterp<T, E, A>,
        WriterInterp<(Vec<T>, Vec<E>), std::convert::Infallible, A>,
    >(effects.iter().map(WriterEffect::thunk).collect())
}

//! Selection among redundant computations.
//!
//! [`best_of`] runs the same effect `n` times concurrently and keeps the
//! success that maximizes a key; [`best_of_many`] selects among distinct
//! candidates. [`vote`] delegates the choice to an asynchronous judge.
//! All branches must succeed - a single failure fails the selection, with
//! the same joint-completion semantics as
//! [`parallel`](crate::combinators::parallel::parallel).

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::semigroup::Semigroup;
use crate::writer::WriterEffect;

/// Generic best-of combinator: run all candidates, keep the success with
/// the greatest key. Ties keep the earliest candidate.
///
/// # Panics
///
/// Panics if called with no candidates.
pub fn best_of_many_m<I, K, KF>(thunks: Vec<Thunk<I::Raw>>, key: KF) -> I::Monad
where
    I: Interp,
    K: PartialOrd,
    KF: Fn(&I::Value) -> K + Send + Sync + 'static,
{
    assert!(!thunks.is_empty(), "best_of requires at least one candidate");
    let key = Arc::new(key);
    I::wrap(Arc::new(move || {
        let futures: Vec<_> = thunks.iter().map(|thunk| thunk()).collect();
        let key = key.clone();
        Box::pin(async move {
            let raws = join_all(futures).await;
            let mut values = Vec::with_capacity(raws.len());
            let mut ctx: I::Ctx = Monoid::empty();
            for raw in raws {
                let (result, branch_ctx) = I::split(raw);
                ctx = ctx.combine(branch_ctx);
                match result {
                    Ok(value) => values.push(value),
                    Err(error) => return I::rebuild(Err(error), ctx),
                }
            }

            let mut values = values.into_iter();
            let mut best = match values.next() {
                Some(first) => first,
                None => unreachable!("non-empty candidate set produced no values"),
            };
            for value in values {
                if key(&value)
                    .partial_cmp(&key(&best))
                    .is_some_and(|ordering| ordering.is_gt())
                {
                    best = value;
                }
            }
            I::rebuild(Ok(best), ctx)
        })
    }))
}

/// Generic vote combinator: run all candidates, let an async judge pick
/// the winner from the successes.
///
/// # Panics
///
/// Panics if called with no candidates.
pub fn vote_m<I, J, JFut>(thunks: Vec<Thunk<I::Raw>>, judge: J) -> I::Monad
where
    I: Interp,
    J: Fn(Vec<I::Value>) -> JFut + Send + Sync + 'static,
    JFut: Future<Output = I::Value> + Send + 'static,
{
    assert!(!thunks.is_empty(), "vote requires at least one candidate");
    let judge = Arc::new(judge);
    I::wrap(Arc::new(move || {
        let futures: Vec<_> = thunks.iter().map(|thunk| thunk()).collect();
        let judge = judge.clone();
        Box::pin(async move {
            let raws = join_all(futures).await;
            let mut values = Vec::with_capacity(raws.len());
            let mut ctx: I::Ctx = Monoid::empty();
            for raw in raws {
                let (result, branch_ctx) = I::split(raw);
                ctx = ctx.combine(branch_ctx);
                match result {
                    Ok(value) => values.push(value),
                    Err(error) => return I::rebuild(Err(error), ctx),
                }
            }
            let winner = judge(values).await;
            I::rebuild(Ok(winner), ctx)
        })
    }))
}

/// Run the same effect `n` times concurrently, keep the best success.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::best_of;
///
/// # tokio_test::block_on(async {
/// let effect = best_of(Effect::<_, String>::pure(7), 3, |n| *n);
/// assert_eq!(effect.run().await, Ok(7));
/// # });
/// ```
///
/// # Panics
///
/// Panics if `n < 1`.
pub fn best_of<T, E, K, KF>(effect: Effect<T, E>, n: usize, key: KF) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    K: PartialOrd,
    KF: Fn(&T) -> K + Send + Sync + 'static,
{
    assert!(n >= 1, "best_of requires n >= 1");
    best_of_many_m::<EffectInterp<T, E>, K, KF>(vec![effect.thunk(); n], key)
}

/// Run distinct candidates concurrently, keep the best success.
pub fn best_of_many<T, E, K, KF>(candidates: Vec<Effect<T, E>>, key: KF) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    K: PartialOrd,
    KF: Fn(&T) -> K + Send + Sync + 'static,
{
    best_of_many_m::<EffectInterp<T, E>, K, KF>(candidates.iter().map(Effect::thunk).collect(), key)
}

/// [`best_of`] for writer effects; all branches' logs are merged.
pub fn best_of_writer<T, E, A, K, KF>(
    effect: WriterEffect<T, E, A>,
    n: usize,
    key: KF,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    K: PartialOrd,
    KF: Fn(&T) -> K + Send + Sync + 'static,
{
    assert!(n >= 1, "best_of requires n >= 1");
    best_of_many_m::<WriterInterp<T, E, A>, K, KF>(vec![effect.thunk(); n], key)
}

/// [`best_of_many`] for writer effects; all branches' logs are merged.
pub fn best_of_many_writer<T, E, A, K, KF>(
    candidates: Vec<WriterEffect<T, E, A>>,
    key: KF,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    K: PartialOrd,
    KF: Fn(&T) -> K + Send + Sync + 'static,
{
    best_of_many_m::<WriterInterp<T, E, A>, K, KF>(
        candidates.iter().map(WriterEffect::thunk).collect(),
        key,
    )
}

/// Run candidates concurrently and let an async judge pick the winner.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::vote;
///
/// # tokio_test::block_on(async {
/// let effect = vote(
///     vec![
///         Effect::<_, String>::pure(10),
///         Effect::<_, String>::pure(30),
///         Effect::<_, String>::pure(20),
///     ],
///     |answers| async move {
///         // Majority is a stub here: take the median.
///         let mut sorted = answers;
///         sorted.sort();
///         sorted[sorted.len() / 2]
///     },
/// );
/// assert_eq!(effect.run().await, Ok(20));
/// # });
/// ```
pub fn vote<T, E, J, JFut>(candidates: Vec<Effect<T, E>>, judge: J) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    J: Fn(Vec<T>) -> JFut + Send + Sync + 'static,
    JFut: Future<Output = T> + Send + 'static,
{
    vote_m::<EffectInterp<T, E>, J, JFut>(candidates.iter().map(Effect::thunk).collect(), judge)
}

/// [`vote`] for writer effects; all branches' logs are merged.
pub fn vote_writer<T, E, A, J, JFut>(
    candidates: Vec<WriterEffect<T, E, A>>,
    judge: J,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    J: Fn(Vec<T>) -> JFut + Send + Sync + 'static,
    JFut: Future<Output = T> + Send + 'static,
{
    vote_m::<WriterInterp<T, E, A>, J, JFut>(
        candidates.iter().map(WriterEffect::thunk).collect(),
        judge,
    )
}

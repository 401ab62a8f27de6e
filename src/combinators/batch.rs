//! Bounded-concurrency batch processing.
//!
//! [`batch`] maps items through an effectful handler with at most
//! `concurrency` branches in flight; results are reassembled in input
//! order. Failures do not cancel in-flight work: every scheduled branch
//! runs to completion, then the first error (in input order) is returned.
//! [`batch_all`] never fails at the outer level - it collects every
//! branch's individual outcome.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::semigroup::Semigroup;
use crate::writer::WriterEffect;

/// Generic batch combinator: bounded concurrency, input-order results,
/// first error returned after joint completion.
///
/// # Panics
///
/// Panics if `concurrency` is zero.
pub fn batch_m<A, In, Out, F>(items: Vec<A>, handler: F, concurrency: usize) -> Out::Monad
where
    A: Clone + Send + Sync + 'static,
    In: Interp,
    Out: Interp<Value = Vec<In::Value>, Error = In::Error, Ctx = In::Ctx>,
    F: Fn(A) -> Thunk<In::Raw> + Send + Sync + 'static,
{
    assert!(concurrency >= 1, "batch requires concurrency >= 1");
    let handler = Arc::new(handler);
    Out::wrap(Arc::new(move || {
        let items = items.clone();
        let handler = handler.clone();
        Box::pin(async move {
            let raws: Vec<In::Raw> = stream::iter(items)
                .map(|item| handler(item)())
                .buffered(concurrency)
                .collect()
                .await;

            let mut values = Vec::with_capacity(raws.len());
            let mut ctx: In::Ctx = Monoid::empty();
            let mut first_error = None;
            for raw in raws {
                let (result, item_ctx) = In::split(raw);
                ctx = ctx.combine(item_ctx);
                match result {
                    Ok(value) => values.push(value),
                    Err(error) => {
                        if first_error.is_none() {
                            first_error = Some(error);
                        }
                    }
                }
            }
            match first_error {
                Some(error) => Out::rebuild(Err(error), ctx),
                None => Out::rebuild(Ok(values), ctx),
            }
        })
    }))
}

/// Generic batch-all combinator: bounded concurrency, never fails,
/// collects every branch's outcome in input order.
pub fn batch_all_m<A, In, Out, F>(items: Vec<A>, handler: F, concurrency: usize) -> Out::Monad
where
    A: Clone + Send + Sync + 'static,
    In: Interp,
    Out: Interp<
        Value = Vec<Result<In::Value, In::Error>>,
        Error = std::convert::Infallible,
        Ctx = In::Ctx,
    >,
    F: Fn(A) -> Thunk<In::Raw> + Send + Sync + 'static,
{
    assert!(concurrency >= 1, "batch_all requires concurrency >= 1");
    let handler = Arc::new(handler);
    Out::wrap(Arc::new(move || {
        let items = items.clone();
        let handler = handler.clone();
        Box::pin(async move {
            let raws: Vec<In::Raw> = stream::iter(items)
                .map(|item| handler(item)())
                .buffered(concurrency)
                .collect()
                .await;

            let mut outcomes = Vec::with_capacity(raws.len());
            let mut ctx: In::Ctx = Monoid::empty();
            for raw in raws {
                let (result, item_ctx) = In::split(raw);
                ctx = ctx.combine(item_ctx);
                outcomes.push(result);
            }
            Out::rebuild(Ok(outcomes), ctx)
        })
    }))
}

/// Map items through an effectful handler with bounded concurrency.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::batch;
///
/// # tokio_test::block_on(async {
/// let effect = batch(vec![1, 2, 3, 4], |n| Effect::<_, String>::pure(n * 2), 2);
/// assert_eq!(effect.run().await, Ok(vec![2, 4, 6, 8]));
/// # });
/// ```
pub fn batch<A, T, E, F>(items: Vec<A>, handler: F, concurrency: usize) -> Effect<Vec<T>, E>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Effect<T, E> + Send + Sync + 'static,
{
    batch_m::<A, EffectInterp<T, E>, EffectInterp<Vec<T>, E>, _>(items, move |item| {
        handler(item).thunk()
    }, concurrency)
}

/// Like [`batch`], but never fails: every branch's outcome is collected.
pub fn batch_all<A, T, E, F>(
    items: Vec<A>,
    handler: F,
    concurrency: usize,
) -> Effect<Vec<Result<T, E>>, std::convert::Infallible>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Effect<T, E> + Send + Sync + 'static,
{
    batch_all_m::<A, EffectInterp<T, E>, EffectInterp<Vec<Result<T, E>>, std::convert::Infallible>, _>(
        items,
        move |item| handler(item).thunk(),
        concurrency,
    )
}

/// [`batch`] for writer effects; every branch's log is merged, in input
/// order, even when some branches fail.
pub fn batch_writer<A, T, E, W, F>(
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
    batch_m::<A, WriterInterp<T, E, W>, WriterInterp<Vec<T>, E, W>, _>(items, move |item| {
        handler(item).thunk()
    }, concurrency)
}

/// [`batch_all`] for writer effects; logs merge across all branches.
pub fn batch_all_writer<A, T, E, W, F>(
    items: Vec<A>,
    handler: F,
    concurrency: usize,
) -> WriterEffect<Vec<Result<T, E>>, std::convert::Infallible, W>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    W: Send + 'static,
    F: Fn(A) -> WriterEffect<T, E, W> + Send + Sync + 'static,
{
    batch_all_m::<
        A,
        WriterInterp<T, E, W>,
        WriterInterp<Vec<Result<T, E>>, std::convert::Infallible, W>,
        _,
    >(items, move |item| handler(item).thunk(), concurrency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        // Earlier items sleep longer; order must still match input.
        let effect = batch(
            vec![30u64, 20, 10],
            |ms| {
                Effect::<_, String>::new(move || async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(ms)
                })
            },
            3,
        );
        assert_eq!(effect.run().await, Ok(vec![30, 20, 10]));
    }

    #[tokio::test]
    async fn test_batch_bounds_concurrency() {
        let in_flight = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));
        let effect = batch(
            (0..8).collect::<Vec<_>>(),
            {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                move |n: i32| {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    Effect::<_, String>::new(move || {
                        let in_flight = in_flight.clone();
                        let peak = peak.clone();
                        async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(n)
                        }
                    })
                }
            },
            3,
        );
        assert!(effect.run().await.is_ok());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_batch_runs_everything_despite_failure() {
        let completed = Arc::new(AtomicU32::new(0));
        let effect = batch(
            vec![1, 2, 3, 4],
            {
                let completed = completed.clone();
                move |n: i32| {
                    let completed = completed.clone();
                    Effect::new(move || {
                        let completed = completed.clone();
                        async move {
                            completed.fetch_add(1, Ordering::SeqCst);
                            if n == 2 {
                                Err(format!("failed on {}", n))
                            } else {
                                Ok(n)
                            }
                        }
                    })
                }
            },
            2,
        );
        assert_eq!(effect.run().await, Err("failed on 2".to_string()));
        // No mid-flight cancellation: every branch completed.
        assert_eq!(completed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_batch_all_collects_every_outcome() {
        let effect = batch_all(
            vec![1, 2, 3],
            |n: i32| {
                if n == 2 {
                    Effect::fail(format!("bad {}", n))
                } else {
                    Effect::pure(n)
                }
            },
            2,
        );
        let outcomes = effect.run().await.unwrap();
        assert_eq!(
            outcomes,
            vec![Ok(1), Err("bad 2".to_string()), Ok(3)]
        );
    }

    #[tokio::test]
    async fn test_batch_writer_merges_logs_even_on_failure() {
        let effect = batch_writer(
            vec![1, 2],
            |n: i32| {
                if n == 2 {
                    crate::writer::writer_err(format!("bad {}", n), [format!("log {}", n)])
                } else {
                    crate::writer::writer_ok(n, [format!("log {}", n)])
                }
            },
            2,
        );
        let (result, log) = effect.run().await;
        assert_eq!(result, Err("bad 2".to_string()));
        assert_eq!(log.entries(), &["log 1".to_string(), "log 2".to_string()]);
    }
}

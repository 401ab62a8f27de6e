//! Unbounded concurrent execution.
//!
//! [`parallel`] runs homogeneous effects concurrently, waits for all of
//! them, then fails with the first error found while scanning the joint
//! results (there is no mid-flight cancellation). [`gather2`]/[`gather3`]
//! do the same for heterogeneous pairs and triples; [`zip_par`] and
//! [`zip_with`] are the pairwise conveniences built on them.
//!
//! Writer variants merge every branch's log in input order, success or
//! failure.

use std::sync::Arc;

use futures::future::join_all;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::monoid::Monoid;
use crate::semigroup::Semigroup;
use crate::writer::WriterEffect;

/// Generic parallel combinator: run all, join, fail-fast while scanning.
pub fn parallel_m<In, Out>(thunks: Vec<Thunk<In::Raw>>) -> Out::Monad
where
    In: Interp,
    Out: Interp<Value = Vec<In::Value>, Error = In::Error, Ctx = In::Ctx>,
{
    Out::wrap(Arc::new(move || {
        let futures: Vec<_> = thunks.iter().map(|thunk| thunk()).collect();
        Box::pin(async move {
            let raws = join_all(futures).await;
            let mut values = Vec::with_capacity(raws.len());
            let mut ctx: In::Ctx = Monoid::empty();
            let mut first_error = None;
            for raw in raws {
                let (result, branch_ctx) = In::split(raw);
                ctx = ctx.combine(branch_ctx);
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

/// Generic heterogeneous pair: run both, join, fail on the first error.
pub fn gather2_m<A, B, Out>(a: Thunk<A::Raw>, b: Thunk<B::Raw>) -> Out::Monad
where
    A: Interp,
    B: Interp<Error = A::Error, Ctx = A::Ctx>,
    Out: Interp<Value = (A::Value, B::Value), Error = A::Error, Ctx = A::Ctx>,
{
    Out::wrap(Arc::new(move || {
        let fut_a = a();
        let fut_b = b();
        Box::pin(async move {
            let (raw_a, raw_b) = futures::join!(fut_a, fut_b);
            let (result_a, ctx_a) = A::split(raw_a);
            let (result_b, ctx_b) = B::split(raw_b);
            let ctx = ctx_a.combine(ctx_b);
            match (result_a, result_b) {
                (Ok(value_a), Ok(value_b)) => Out::rebuild(Ok((value_a, value_b)), ctx),
                (Err(error), _) => Out::rebuild(Err(error), ctx),
                (_, Err(error)) => Out::rebuild(Err(error), ctx),
            }
        })
    }))
}

/// Generic heterogeneous triple: run all three, join, fail on the first
/// error.
pub fn gather3_m<A, B, C, Out>(a: Thunk<A::Raw>, b: Thunk<B::Raw>, c: Thunk<C::Raw>) -> Out::Monad
where
    A: Interp,
    B: Interp<Error = A::Error, Ctx = A::Ctx>,
    C: Interp<Error = A::Error, Ctx = A::Ctx>,
    Out: Interp<Value = (A::Value, B::Value, C::Value), Error = A::Error, Ctx = A::Ctx>,
{
    Out::wrap(Arc::new(move || {
        let fut_a = a();
        let fut_b = b();
        let fut_c = c();
        Box::pin(async move {
            let (raw_a, raw_b, raw_c) = futures::join!(fut_a, fut_b, fut_c);
            let (result_a, ctx_a) = A::split(raw_a);
            let (result_b, ctx_b) = B::split(raw_b);
            let (result_c, ctx_c) = C::split(raw_c);
            let ctx = ctx_a.combine(ctx_b).combine(ctx_c);
            match (result_a, result_b, result_c) {
                (Ok(value_a), Ok(value_b), Ok(value_c)) => {
                    Out::rebuild(Ok((value_a, value_b, value_c)), ctx)
                }
                (Err(error), _, _) => Out::rebuild(Err(error), ctx),
                (_, Err(error), _) => Out::rebuild(Err(error), ctx),
                (_, _, Err(error)) => Out::rebuild(Err(error), ctx),
            }
        })
    }))
}

/// Run effects concurrently; fail with the first error after all complete.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::parallel;
///
/// # tokio_test::block_on(async {
/// let effect = parallel(vec![
///     Effect::<_, String>::pure(1),
///     Effect::<_, String>::pure(2),
/// ]);
/// assert_eq!(effect.run().await, Ok(vec![1, 2]));
/// # });
/// ```
pub fn parallel<T, E>(effects: Vec<Effect<T, E>>) -> Effect<Vec<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    parallel_m::<EffectInterp<T, E>, EffectInterp<Vec<T>, E>>(
        effects.iter().map(Effect::thunk).collect(),
    )
}

/// Run writer effects concurrently; every branch's log is merged.
pub fn parallel_writer<T, E, A>(effects: Vec<WriterEffect<T, E, A>>) -> WriterEffect<Vec<T>, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    parallel_m::<WriterInterp<T, E, A>, WriterInterp<Vec<T>, E, A>>(
        effects.iter().map(WriterEffect::thunk).collect(),
    )
}

/// Run two heterogeneous effects concurrently.
pub fn gather2<A, B, E>(a: Effect<A, E>, b: Effect<B, E>) -> Effect<(A, B), E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    gather2_m::<EffectInterp<A, E>, EffectInterp<B, E>, EffectInterp<(A, B), E>>(
        a.thunk(),
        b.thunk(),
    )
}

/// Run three heterogeneous effects concurrently.
pub fn gather3<A, B, C, E>(
    a: Effect<A, E>,
    b: Effect<B, E>,
    c: Effect<C, E>,
) -> Effect<(A, B, C), E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    gather3_m::<EffectInterp<A, E>, EffectInterp<B, E>, EffectInterp<C, E>, EffectInterp<(A, B, C), E>>(
        a.thunk(),
        b.thunk(),
        c.thunk(),
    )
}

/// Run two heterogeneous writer effects concurrently, merging logs.
pub fn gather2_writer<T1, T2, E, A>(
    a: WriterEffect<T1, E, A>,
    b: WriterEffect<T2, E, A>,
) -> WriterEffect<(T1, T2), E, A>
where
    T1: Send + 'static,
    T2: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    gather2_m::<WriterInterp<T1, E, A>, WriterInterp<T2, E, A>, WriterInterp<(T1, T2), E, A>>(
        a.thunk(),
        b.thunk(),
    )
}

/// Run three heterogeneous writer effects concurrently, merging logs.
pub fn gather3_writer<T1, T2, T3, E, A>(
    a: WriterEffect<T1, E, A>,
    b: WriterEffect<T2, E, A>,
    c: WriterEffect<T3, E, A>,
) -> WriterEffect<(T1, T2, T3), E, A>
where
    T1: Send + 'static,
    T2: Send + 'static,
    T3: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    gather3_m::<
        WriterInterp<T1, E, A>,
        WriterInterp<T2, E, A>,
        WriterInterp<T3, E, A>,
        WriterInterp<(T1, T2, T3), E, A>,
    >(a.thunk(), b.thunk(), c.thunk())
}

/// Pairwise concurrent zip. Alias for [`gather2`] under its traditional
/// name.
pub fn zip_par<A, B, E>(a: Effect<A, E>, b: Effect<B, E>) -> Effect<(A, B), E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    gather2(a, b)
}

/// Pairwise concurrent zip for writer effects.
pub fn zip_par_writer<T1, T2, E, A>(
    a: WriterEffect<T1, E, A>,
    b: WriterEffect<T2, E, A>,
) -> WriterEffect<(T1, T2), E, A>
where
    T1: Send + 'static,
    T2: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    gather2_writer(a, b)
}

/// Run two effects concurrently and combine their values.
pub fn zip_with<A, B, R, E, F>(a: Effect<A, E>, b: Effect<B, E>, combiner: F) -> Effect<R, E>
where
    A: Send + 'static,
    B: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(A, B) -> R + Send + Sync + 'static,
{
    gather2(a, b).map(move |(value_a, value_b)| combiner(value_a, value_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{writer_err, writer_ok};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_parallel_runs_concurrently() {
        let effects: Vec<Effect<u64, String>> = (0..4)
            .map(|n| {
                Effect::new(move || async move {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    Ok(n)
                })
            })
            .collect();
        let start = Instant::now();
        assert_eq!(parallel(effects).run().await, Ok(vec![0, 1, 2, 3]));
        // Four 40ms branches running together finish well under 160ms.
        assert!(start.elapsed() < Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_parallel_fail_fast_on_scan_but_all_run() {
        let completed = Arc::new(AtomicU32::new(0));
        let effects: Vec<Effect<i32, String>> = (0..3)
            .map(|n| {
                let completed = completed.clone();
                Effect::new(move || {
                    let completed = completed.clone();
                    async move {
                        completed.fetch_add(1, Ordering::SeqCst);
                        if n == 1 {
                            Err("branch 1 failed".to_string())
                        } else {
                            Ok(n)
                        }
                    }
                })
            })
            .collect();
        assert_eq!(
            parallel(effects).run().await,
            Err("branch 1 failed".to_string())
        );
        assert_eq!(completed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gather2_preserves_heterogeneous_types() {
        let effect = gather2(
            Effect::<_, String>::pure(1),
            Effect::<_, String>::pure("two".to_string()),
        );
        assert_eq!(effect.run().await, Ok((1, "two".to_string())));
    }

    #[tokio::test]
    async fn test_gather3_fails_on_any_error() {
        let effect = gather3(
            Effect::<i32, _>::pure(1),
            Effect::<bool, _>::fail("middle".to_string()),
            Effect::<u8, _>::pure(3),
        );
        assert_eq!(effect.run().await, Err("middle".to_string()));
    }

    #[tokio::test]
    async fn test_zip_with_combines() {
        let effect = zip_with(
            Effect::<_, String>::pure(6),
            Effect::<_, String>::pure(7),
            |a, b| a * b,
        );
        assert_eq!(effect.run().await, Ok(42));
    }

    #[tokio::test]
    async fn test_parallel_writer_merges_logs_in_input_order() {
        let effect = parallel_writer(vec![
            writer_ok::<_, String, _>(1, ["first"]),
            writer_ok::<_, String, _>(2, ["second"]),
        ]);
        let (result, log) = effect.run().await;
        assert_eq!(result, Ok(vec![1, 2]));
        assert_eq!(log.entries(), &["first", "second"]);
    }

    #[tokio::test]
    async fn test_parallel_writer_keeps_logs_on_failure() {
        let effect = parallel_writer(vec![
            writer_ok::<_, String, _>(1, ["ok log"]),
            writer_err::<i32, _, _>("bad".to_string(), ["err log"]),
        ]);
        let (result, log) = effect.run().await;
        assert_eq!(result, Err("bad".to_string()));
        assert_eq!(log.entries(), &["ok log", "err log"]);
    }
}

//! Guards: turn successes into failures by predicate.
//!
//! [`ensure`] fails when the value does **not** satisfy the predicate;
//! [`reject`] is its dual and fails when the value **does** match.
//! Failures pass through untouched either way.

use std::sync::Arc;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::writer::WriterEffect;

/// Generic ensure combinator: `Ok` becomes `Err` when the predicate fails.
pub fn ensure_m<I, P, F>(thunk: Thunk<I::Raw>, predicate: P, error: F) -> I::Monad
where
    I: Interp,
    P: Fn(&I::Value) -> bool + Send + Sync + 'static,
    F: Fn(I::Value) -> I::Error + Send + Sync + 'static,
{
    guard_m::<I, P, F>(thunk, predicate, error, true)
}

/// Generic reject combinator: `Ok` becomes `Err` when the predicate
/// matches. Dual of [`ensure_m`].
pub fn reject_m<I, P, F>(thunk: Thunk<I::Raw>, predicate: P, error: F) -> I::Monad
where
    I: Interp,
    P: Fn(&I::Value) -> bool + Send + Sync + 'static,
    F: Fn(I::Value) -> I::Error + Send + Sync + 'static,
{
    guard_m::<I, P, F>(thunk, predicate, error, false)
}

fn guard_m<I, P, F>(thunk: Thunk<I::Raw>, predicate: P, error: F, keep_on_match: bool) -> I::Monad
where
    I: Interp,
    P: Fn(&I::Value) -> bool + Send + Sync + 'static,
    F: Fn(I::Value) -> I::Error + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    let error = Arc::new(error);
    I::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        let predicate = predicate.clone();
        let error = error.clone();
        Box::pin(async move {
            let raw = thunk().await;
            let (result, ctx) = I::split(raw);
            match result {
                Err(e) => I::rebuild(Err(e), ctx),
                Ok(value) => {
                    if predicate(&value) == keep_on_match {
                        I::rebuild(Ok(value), ctx)
                    } else {
                        I::rebuild(Err(error(value)), ctx)
                    }
                }
            }
        })
    }))
}

/// Fail an [`Effect`] whose value does not satisfy the predicate.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::ensure;
///
/// # tokio_test::block_on(async {
/// let effect = ensure(
///     Effect::<_, String>::pure(5),
///     |n| *n > 0,
///     |n| format!("{} is not positive", n),
/// );
/// assert_eq!(effect.run().await, Ok(5));
/// # });
/// ```
pub fn ensure<T, E, P, F>(effect: Effect<T, E>, predicate: P, error: F) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
    F: Fn(T) -> E + Send + Sync + 'static,
{
    ensure_m::<EffectInterp<T, E>, P, F>(effect.thunk(), predicate, error)
}

/// Fail an [`Effect`] whose value matches the predicate. Dual of
/// [`ensure`].
pub fn reject<T, E, P, F>(effect: Effect<T, E>, predicate: P, error: F) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
    F: Fn(T) -> E + Send + Sync + 'static,
{
    reject_m::<EffectInterp<T, E>, P, F>(effect.thunk(), predicate, error)
}

/// [`ensure`] for [`WriterEffect`]s. The log rides through either way.
pub fn ensure_writer<T, E, A, P, F>(
    effect: WriterEffect<T, E, A>,
    predicate: P,
    error: F,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
    F: Fn(T) -> E + Send + Sync + 'static,
{
    ensure_m::<WriterInterp<T, E, A>, P, F>(effect.thunk(), predicate, error)
}

/// [`reject`] for [`WriterEffect`]s. The log rides through either way.
pub fn reject_writer<T, E, A, P, F>(
    effect: WriterEffect<T, E, A>,
    predicate: P,
    error: F,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
    F: Fn(T) -> E + Send + Sync + 'static,
{
    reject_m::<WriterInterp<T, E, A>, P, F>(effect.thunk(), predicate, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::writer_ok;

    #[tokio::test]
    async fn test_ensure_passes_satisfying_value() {
        let effect = ensure(Effect::<_, String>::pure(10), |n| *n > 5, |_| "small".into());
        assert_eq!(effect.run().await, Ok(10));
    }

    #[tokio::test]
    async fn test_ensure_fails_unsatisfying_value() {
        let effect = ensure(
            Effect::<_, String>::pure(3),
            |n| *n > 5,
            |n| format!("{} too small", n),
        );
        assert_eq!(effect.run().await, Err("3 too small".to_string()));
    }

    #[tokio::test]
    async fn test_reject_fails_matching_value() {
        let effect = reject(
            Effect::<_, String>::pure(0),
            |n| *n == 0,
            |_| "zero is not allowed".to_string(),
        );
        assert_eq!(effect.run().await, Err("zero is not allowed".to_string()));
    }

    #[tokio::test]
    async fn test_errors_pass_through_untouched() {
        let effect = ensure(
            Effect::<i32, _>::fail("boom".to_string()),
            |_| false,
            |_| "guard error".to_string(),
        );
        assert_eq!(effect.run().await, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_writer_keeps_log_on_failure() {
        let effect = ensure_writer(
            writer_ok::<_, String, _>(1, ["checked"]),
            |n| *n > 5,
            |_| "too small".to_string(),
        );
        let (result, log) = effect.run().await;
        assert_eq!(result, Err("too small".to_string()));
        assert_eq!(log.entries(), &["checked"]);
    }
}

//! Scoped resource acquisition.
//!
//! The bracket pattern guarantees cleanup: acquire a resource, use it,
//! release it - always, even when the use step fails or panics. Release
//! failures are swallowed so cleanup can never mask the primary result.
//!
//! - [`bracket`] - release runs whenever acquire succeeded
//! - [`bracket_on_error`] - release runs only when use failed; on success
//!   the caller keeps the resource and becomes responsible for it
//! - [`with_resource`] - the resource is already acquired; only release is
//!   guaranteed
//!
//! Resources are `Clone` so the use closure and the release hook can each
//! own a handle; in practice resources are `Arc`-shaped (pool handles,
//! connections) and the clone is a refcount bump.
//!
//! # Example
//!
//! ```
//! use breakwater::Effect;
//! use breakwater::combinators::bracket;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let released = Arc::new(AtomicBool::new(false));
//! let flag = released.clone();
//!
//! let result = bracket(
//!     Effect::<_, String>::pure("connection"),
//!     move |_conn| {
//!         let flag = flag.clone();
//!         async move { flag.store(true, Ordering::SeqCst); }
//!     },
//!     |conn| Effect::<_, String>::pure(conn.len()),
//! )
//! .run()
//! .await;
//!
//! assert_eq!(result, Ok(10));
//! assert!(released.load(Ordering::SeqCst));
//! # });
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::semigroup::Semigroup;
use crate::writer::WriterEffect;

/// Generic bracket combinator: acquire, use, always release.
///
/// Acquire failures propagate immediately and release never runs. Once
/// acquire has succeeded, release runs exactly once - after a successful
/// use, a failed use, or a panicking use (the panic resumes after
/// release). A panic inside release itself is caught and dropped.
pub fn bracket_m<In, Out, Rel, RelFut, Use>(
    acquire: Thunk<In::Raw>,
    release: Rel,
    use_fn: Use,
) -> Out::Monad
where
    In: Interp,
    In::Value: Clone + Sync,
    Out: Interp<Error = In::Error, Ctx = In::Ctx>,
    Rel: Fn(In::Value) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(In::Value) -> Thunk<Out::Raw> + Send + Sync + 'static,
{
    let release = Arc::new(release);
    let use_fn = Arc::new(use_fn);
    Out::wrap(Arc::new(move || {
        let acquire = acquire.clone();
        let release = release.clone();
        let use_fn = use_fn.clone();
        Box::pin(async move {
            let (acquired, acquire_ctx) = In::split(acquire().await);
            match acquired {
                Err(error) => Out::rebuild(Err(error), acquire_ctx),
                Ok(resource) => {
                    let used = AssertUnwindSafe(use_fn(resource.clone())())
                        .catch_unwind()
                        .await;
                    let _ = AssertUnwindSafe(release(resource)).catch_unwind().await;
                    match used {
                        Ok(raw) => {
                            let (result, use_ctx) = Out::split(raw);
                            Out::rebuild(result, acquire_ctx.combine(use_ctx))
                        }
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
            }
        })
    }))
}

/// Generic bracket for an already-acquired resource: only release is
/// guaranteed.
pub fn with_resource_m<Out, R, Rel, RelFut, Use>(
    resource: R,
    release: Rel,
    use_fn: Use,
) -> Out::Monad
where
    Out: Interp,
    R: Clone + Send + Sync + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> Thunk<Out::Raw> + Send + Sync + 'static,
{
    let release = Arc::new(release);
    let use_fn = Arc::new(use_fn);
    Out::wrap(Arc::new(move || {
        let resource = resource.clone();
        let release = release.clone();
        let use_fn = use_fn.clone();
        Box::pin(async move {
            let used = AssertUnwindSafe(use_fn(resource.clone())())
                .catch_unwind()
                .await;
            let _ = AssertUnwindSafe(release(resource)).catch_unwind().await;
            match used {
                Ok(raw) => raw,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }))
}

/// Acquire, use, always release - for [`Effect`]s.
pub fn bracket<R, T, E, Rel, RelFut, Use>(
    acquire: Effect<R, E>,
    release: Rel,
    use_fn: Use,
) -> Effect<T, E>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> Effect<T, E> + Send + Sync + 'static,
{
    bracket_m::<EffectInterp<R, E>, EffectInterp<T, E>, _, _, _>(
        acquire.thunk(),
        release,
        move |resource| use_fn(resource).thunk(),
    )
}

/// Acquire, use, release **only on failure** - for [`Effect`]s.
///
/// On success the caller retains the resource and is responsible for
/// releasing it.
pub fn bracket_on_error<R, T, E, Rel, RelFut, Use>(
    acquire: Effect<R, E>,
    release: Rel,
    use_fn: Use,
) -> Effect<T, E>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> Effect<T, E> + Send + Sync + 'static,
{
    let acquire = acquire.thunk();
    let release = Arc::new(release);
    let use_fn = Arc::new(use_fn);
    Effect::from_thunk(Arc::new(move || {
        let acquire = acquire.clone();
        let release = release.clone();
        let use_fn = use_fn.clone();
        Box::pin(async move {
            match acquire().await {
                Err(error) => Err(error),
                Ok(resource) => match use_fn(resource.clone()).run().await {
                    Ok(value) => Ok(value),
                    Err(error) => {
                        let _ = AssertUnwindSafe(release(resource)).catch_unwind().await;
                        Err(error)
                    }
                },
            }
        })
    }))
}

/// Guarantee release of an already-acquired resource - for [`Effect`]s.
pub fn with_resource<R, T, E, Rel, RelFut, Use>(
    resource: R,
    release: Rel,
    use_fn: Use,
) -> Effect<T, E>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> Effect<T, E> + Send + Sync + 'static,
{
    with_resource_m::<EffectInterp<T, E>, R, _, _, _>(resource, release, move |resource| {
        use_fn(resource).thunk()
    })
}

/// Acquire, use, always release - for [`WriterEffect`]s.
///
/// The acquire step's log and the use step's log are merged in that order.
pub fn bracket_writer<R, T, E, A, Rel, RelFut, Use>(
    acquire: WriterEffect<R, E, A>,
    release: Rel,
    use_fn: Use,
) -> WriterEffect<T, E, A>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> WriterEffect<T, E, A> + Send + Sync + 'static,
{
    bracket_m::<WriterInterp<R, E, A>, WriterInterp<T, E, A>, _, _, _>(
        acquire.thunk(),
        release,
        move |resource| use_fn(resource).thunk(),
    )
}

/// Acquire, use, release only on failure - for [`WriterEffect`]s.
pub fn bracket_on_error_writer<R, T, E, A, Rel, RelFut, Use>(
    acquire: WriterEffect<R, E, A>,
    release: Rel,
    use_fn: Use,
) -> WriterEffect<T, E, A>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> WriterEffect<T, E, A> + Send + Sync + 'static,
{
    let acquire = acquire.thunk();
    let release = Arc::new(release);
    let use_fn = Arc::new(use_fn);
    WriterEffect::from_thunk(Arc::new(move || {
        let acquire = acquire.clone();
        let release = release.clone();
        let use_fn = use_fn.clone();
        Box::pin(async move {
            let (acquired, acquire_log) = acquire().await;
            match acquired {
                Err(error) => (Err(error), acquire_log),
                Ok(resource) => {
                    let (result, use_log) = use_fn(resource.clone()).run().await;
                    let merged = acquire_log.combine(use_log);
                    if result.is_err() {
                        let _ = AssertUnwindSafe(release(resource)).catch_unwind().await;
                    }
                    (result, merged)
                }
            }
        })
    }))
}

/// Guarantee release of an already-acquired resource - for
/// [`WriterEffect`]s.
pub fn with_resource_writer<R, T, E, A, Rel, RelFut, Use>(
    resource: R,
    release: Rel,
    use_fn: Use,
) -> WriterEffect<T, E, A>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> WriterEffect<T, E, A> + Send + Sync + 'static,
{
    with_resource_m::<WriterInterp<T, E, A>, R, _, _, _>(resource, release, move |resource| {
        use_fn(resource).thunk()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{writer_err, writer_ok};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn release_counter(releases: Arc<AtomicU32>) -> impl Fn(&'static str) -> BoxedUnit {
        move |_resource| {
            let releases = releases.clone();
            Box::pin(async move {
                releases.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    type BoxedUnit = std::pin::Pin<Box<dyn Future<Output = ()> + Send>>;

    #[tokio::test]
    async fn test_release_runs_after_successful_use() {
        let releases = Arc::new(AtomicU32::new(0));
        let result = bracket(
            Effect::<_, String>::pure("res"),
            release_counter(releases.clone()),
            |resource| Effect::<_, String>::pure(resource.len()),
        )
        .run()
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_runs_after_failed_use() {
        let releases = Arc::new(AtomicU32::new(0));
        let result = bracket(
            Effect::<_, String>::pure("res"),
            release_counter(releases.clone()),
            |_resource| Effect::<i32, _>::fail("use failed".to_string()),
        )
        .run()
        .await;
        assert_eq!(result, Err("use failed".to_string()));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_skipped_when_acquire_fails() {
        let releases = Arc::new(AtomicU32::new(0));
        let result = bracket(
            Effect::<&str, _>::fail("no resource".to_string()),
            release_counter(releases.clone()),
            |resource| Effect::<_, String>::pure(resource.len()),
        )
        .run()
        .await;
        assert_eq!(result, Err("no resource".to_string()));
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_release_runs_even_when_use_panics() {
        let releases = Arc::new(AtomicU32::new(0));
        let effect = bracket(
            Effect::<_, String>::pure("res"),
            release_counter(releases.clone()),
            |_resource| -> Effect<i32, String> {
                Effect::new(|| async { panic!("use blew up") })
            },
        );

        let outcome = AssertUnwindSafe(effect.run()).catch_unwind().await;
        assert!(outcome.is_err());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_panic_does_not_mask_result() {
        let result = bracket(
            Effect::<_, String>::pure("res"),
            |_resource| -> BoxedUnit { Box::pin(async { panic!("release blew up") }) },
            |resource| Effect::<_, String>::pure(resource.len()),
        )
        .run()
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_bracket_on_error_keeps_resource_on_success() {
        let releases = Arc::new(AtomicU32::new(0));
        let result = bracket_on_error(
            Effect::<_, String>::pure("res"),
            release_counter(releases.clone()),
            |resource| Effect::<_, String>::pure(resource.len()),
        )
        .run()
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bracket_on_error_releases_on_failure() {
        let releases = Arc::new(AtomicU32::new(0));
        let result = bracket_on_error(
            Effect::<_, String>::pure("res"),
            release_counter(releases.clone()),
            |_resource| Effect::<i32, _>::fail("boom".to_string()),
        )
        .run()
        .await;
        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_resource_always_releases() {
        let releases = Arc::new(AtomicU32::new(0));
        let result = with_resource(
            "given",
            release_counter(releases.clone()),
            |resource| Effect::<_, String>::pure(resource.len()),
        )
        .run()
        .await;
        assert_eq!(result, Ok(5));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bracket_writer_merges_acquire_and_use_logs() {
        let (result, log) = bracket_writer(
            writer_ok::<_, String, _>("res", ["acquired"]),
            |_resource| async {},
            |resource| writer_ok(resource.len(), ["used"]),
        )
        .run()
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(log.entries(), &["acquired", "used"]);
    }

    #[tokio::test]
    async fn test_bracket_writer_failure_keeps_both_logs() {
        let (result, log) = bracket_writer(
            writer_ok::<_, String, _>("res", ["acquired"]),
            |_resource| async {},
            |_resource| writer_err::<usize, _, _>("boom".to_string(), ["use failed"]),
        )
        .run()
        .await;
        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(log.entries(), &["acquired", "use failed"]);
    }
}

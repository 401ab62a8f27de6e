//! Lazy, repeatable async computations yielding `Result`.
//!
//! [`Effect<T, E>`] is a deferred asynchronous computation that produces
//! `Ok(T)` or `Err(E)` each time it is executed. Effects are:
//!
//! - **Lazy**: nothing runs until [`Effect::run`] (or `.await`) is called.
//! - **Repeatable**: running twice re-executes the underlying computation;
//!   there is no implicit memoization (see [`Effect::cached`] for the
//!   explicit kind).
//! - **Cheap to clone**: an effect is an `Arc`'d thunk, so combinators can
//!   fan the same computation out to many concurrent branches.
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```
//! use breakwater::Effect;
//!
//! # tokio_test::block_on(async {
//! let effect = Effect::<_, String>::pure(42);
//! assert_eq!(effect.run().await, Ok(42));
//!
//! let effect = Effect::<i32, _>::fail("error".to_string());
//! assert_eq!(effect.run().await, Err("error".to_string()));
//! # });
//! ```
//!
//! ## Composing effects
//!
//! ```
//! use breakwater::Effect;
//!
//! # tokio_test::block_on(async {
//! let effect = Effect::<_, String>::pure(5)
//!     .map(|x| x * 2)
//!     .and_then(|x| Effect::pure(x + 10));
//!
//! assert_eq!(effect.run().await, Ok(20));
//! # });
//! ```
//!
//! ## Async operations
//!
//! ```
//! use breakwater::Effect;
//!
//! # tokio_test::block_on(async {
//! let effect = Effect::new(|| async {
//!     // Simulate async I/O
//!     Ok::<_, String>(42)
//! });
//!
//! assert_eq!(effect.run().await, Ok(42));
//! # });
//! ```

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use crate::interp::{BoxFuture, Thunk};

/// A lazy, repeatable async computation producing `Result<T, E>`.
///
/// Effects are built from the constructors below or returned by the
/// combinators in [`crate::combinators`]. They execute only when awaited,
/// and every execution starts the computation from scratch.
///
/// # Type Parameters
///
/// * `T` - The success value
/// * `E` - The error value (defaults to [`std::convert::Infallible`])
pub struct Effect<T, E = std::convert::Infallible> {
    thunk: Thunk<Result<T, E>>,
}

impl<T, E> Clone for Effect<T, E> {
    fn clone(&self) -> Self {
        Effect {
            thunk: self.thunk.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for Effect<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Effect(..)")
    }
}

impl<T, E> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create an effect from an async closure.
    ///
    /// The closure is invoked afresh on every execution.
    ///
    /// # Examples
    ///
    /// ```
    /// use breakwater::Effect;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::new(|| async { Ok::<_, String>(7) });
    /// assert_eq!(effect.run().await, Ok(7));
    /// # });
    /// ```
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Effect {
            thunk: Arc::new(move || Box::pin(f())),
        }
    }

    /// Wrap an existing raw thunk.
    ///
    /// This is the `wrap` half of the generic combinator protocol; most
    /// callers want [`Effect::new`] instead.
    pub fn from_thunk(thunk: Thunk<Result<T, E>>) -> Self {
        Effect { thunk }
    }

    /// The underlying thunk, shared.
    ///
    /// Hands the effect to the generic combinator core; invoking the thunk
    /// re-executes the computation, exactly like [`Effect::run`].
    pub fn thunk(&self) -> Thunk<Result<T, E>> {
        self.thunk.clone()
    }

    /// Lift a pure value into an always-succeeding effect.
    pub fn pure(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Effect::new(move || {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// Create an always-failing effect. Dual of [`Effect::pure`].
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Effect::new(move || {
            let error = error.clone();
            async move { Err(error) }
        })
    }

    /// Lift an already-computed `Result` into an effect.
    ///
    /// Note this is not lazy in any interesting sense - the result exists
    /// before the effect does. For deferred evaluation use
    /// [`Effect::from_fn`].
    pub fn from_result(result: Result<T, E>) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
    {
        Effect::new(move || {
            let result = result.clone();
            async move { result }
        })
    }

    /// Convert an `Option` into an effect; `None` becomes an error.
    ///
    /// The error factory is a thunk so the error value is only built when
    /// the option is actually empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use breakwater::Effect;
    ///
    /// # tokio_test::block_on(async {
    /// let found = Effect::from_option(Some(3), || "missing".to_string());
    /// assert_eq!(found.run().await, Ok(3));
    ///
    /// let missing = Effect::<i32, _>::from_option(None, || "missing".to_string());
    /// assert_eq!(missing.run().await, Err("missing".to_string()));
    /// # });
    /// ```
    pub fn from_option<F>(option: Option<T>, error: F) -> Self
    where
        T: Clone + Sync,
        F: Fn() -> E + Send + Sync + 'static,
    {
        Effect::new(move || {
            let result = match &option {
                Some(value) => Ok(value.clone()),
                None => Err(error()),
            };
            async move { result }
        })
    }

    /// Create an effect from a lazy synchronous computation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Effect::new(move || {
            let result = f();
            async move { result }
        })
    }

    /// Execute the effect, producing its outcome.
    ///
    /// Each call re-runs the computation from the beginning.
    pub async fn run(&self) -> Result<T, E> {
        (self.thunk)().await
    }

    /// Apply a function to the success value.
    pub fn map<U, F>(self, f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        Effect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move { fut.await.map(|value| f(value)) })
        }))
    }

    /// Apply a function to the error value.
    pub fn map_err<F2, F>(self, f: F) -> Effect<T, F2>
    where
        F2: Send + 'static,
        F: Fn(E) -> F2 + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        Effect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move { fut.await.map_err(|error| f(error)) })
        }))
    }

    /// Monadic bind: on success, continue with the effect `f` returns.
    ///
    /// On failure the continuation never runs and the error propagates.
    pub fn and_then<U, F>(self, f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> Effect<U, E> + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        Effect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move {
                match fut.await {
                    Ok(value) => f(value).run().await,
                    Err(error) => Err(error),
                }
            })
        }))
    }

    /// Bind on the error channel: on failure, continue with the effect `f`
    /// returns. Successes pass through untouched.
    pub fn or_else<F2, F>(self, f: F) -> Effect<T, F2>
    where
        F2: Send + 'static,
        F: Fn(E) -> Effect<T, F2> + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        Effect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(error) => f(error).run().await,
                }
            })
        }))
    }

    /// Memoize the first execution.
    ///
    /// The underlying computation runs at most once; every later execution
    /// replays the cached outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use breakwater::Effect;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let counter = calls.clone();
    /// let effect = Effect::<_, String>::new(move || {
    ///     let counter = counter.clone();
    ///     async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
    /// })
    /// .cached();
    ///
    /// assert_eq!(effect.run().await, Ok(0));
    /// assert_eq!(effect.run().await, Ok(0));
    /// assert_eq!(calls.load(Ordering::SeqCst), 1);
    /// # });
    /// ```
    pub fn cached(self) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
    {
        let cell = Arc::new(tokio::sync::OnceCell::<Result<T, E>>::new());
        let thunk = self.thunk;
        Effect::from_thunk(Arc::new(move || {
            let cell = cell.clone();
            let thunk = thunk.clone();
            Box::pin(async move { cell.get_or_init(|| thunk()).await.clone() })
        }))
    }
}

impl<T, E> IntoFuture for Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = BoxFuture<Result<T, E>>;

    fn into_future(self) -> Self::IntoFuture {
        (self.thunk)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_effect(calls: Arc<AtomicU32>) -> Effect<u32, String> {
        Effect::new(move || {
            let calls = calls.clone();
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) }
        })
    }

    #[tokio::test]
    async fn test_pure_and_fail() {
        let ok = Effect::<_, String>::pure(1);
        assert_eq!(ok.run().await, Ok(1));

        let err = Effect::<i32, _>::fail("nope".to_string());
        assert_eq!(err.run().await, Err("nope".to_string()));
    }

    #[tokio::test]
    async fn test_effect_is_lazy() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = counting_effect(calls.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let _ = effect.run().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_effect_reruns_each_execution() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = counting_effect(calls.clone());
        assert_eq!(effect.run().await, Ok(0));
        assert_eq!(effect.run().await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_map_and_map_err() {
        let effect = Effect::<_, String>::pure(10).map(|n| n + 1);
        assert_eq!(effect.run().await, Ok(11));

        let effect = Effect::<i32, _>::fail(10).map_err(|n: i32| n * 2);
        assert_eq!(effect.run().await, Err(20));
    }

    #[tokio::test]
    async fn test_and_then_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let effect = Effect::<i32, _>::fail("boom".to_string()).and_then(move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            Effect::pure(n)
        });
        assert_eq!(effect.run().await, Err("boom".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_or_else_recovers() {
        let effect = Effect::<i32, String>::fail("boom".to_string())
            .or_else(|_| Effect::<i32, String>::pure(5));
        assert_eq!(effect.run().await, Ok(5));
    }

    #[tokio::test]
    async fn test_from_option() {
        let built = Arc::new(AtomicU32::new(0));
        let counter = built.clone();
        let effect = Effect::from_option(Some(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "missing".to_string()
        });
        assert_eq!(effect.run().await, Ok(1));
        // The error factory never ran for a present value.
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let effect = counting_effect(calls.clone()).cached();
        assert_eq!(effect.run().await, Ok(0));
        assert_eq!(effect.run().await, Ok(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_effect_is_directly_awaitable() {
        let effect = Effect::<_, String>::pure(3);
        assert_eq!(effect.await, Ok(3));
    }
}

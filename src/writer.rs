//! Writer effects: async computations that accumulate a log.
//!
//! [`WriterEffect<T, E, A>`] is an [`Effect`]-shaped computation whose raw
//! result pairs the outcome with a [`Log<A>`]. Log accumulation follows the
//! writer discipline:
//!
//! - [`WriterEffect::and_then`] concatenates the logs of both steps on
//!   success and preserves the log accumulated so far on failure,
//! - [`tell`] / [`tell_one`] emit entries without computing anything,
//! - [`WriterEffect::listen`] exposes the log next to the value, and
//!   [`WriterEffect::censor`] rewrites it after the fact.
//!
//! # Examples
//!
//! ```
//! use breakwater::writer::{tell_one, WriterEffect};
//! use breakwater::Log;
//!
//! # tokio_test::block_on(async {
//! let effect = tell_one::<String, _>("start".to_string())
//!     .and_then(|_| WriterEffect::pure(40))
//!     .and_then(|n| WriterEffect::pure(n + 2).with_log(["done".to_string()]));
//!
//! let (result, log) = effect.run().await;
//! assert_eq!(result, Ok(42));
//! assert_eq!(log.entries(), &["start".to_string(), "done".to_string()]);
//! # });
//! ```
//!
//! Failures keep the trail that led to them:
//!
//! ```
//! use breakwater::writer::{tell_one, WriterEffect};
//!
//! # tokio_test::block_on(async {
//! let effect = tell_one::<String, _>("probing")
//!     .and_then(|_| WriterEffect::<i32, _, _>::fail("unreachable host".to_string()));
//!
//! let (result, log) = effect.run().await;
//! assert_eq!(result, Err("unreachable host".to_string()));
//! assert_eq!(log.entries(), &["probing"]);
//! # });
//! ```

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use crate::effect::Effect;
use crate::interp::{BoxFuture, Thunk};
use crate::log::Log;
use crate::semigroup::Semigroup;

/// The raw result of a writer effect: an outcome plus its accumulated log.
pub type LoggedResult<T, E, A> = (Result<T, E>, Log<A>);

/// A lazy, repeatable async computation producing a result and a [`Log`].
///
/// Shares the execution model of [`Effect`]: lazy, re-invocable, cheap to
/// clone. Log accumulation is monotonic along a single execution; separate
/// executions start from an empty log.
///
/// # Type Parameters
///
/// * `T` - The success value
/// * `E` - The error value
/// * `A` - The log entry type
pub struct WriterEffect<T, E, A> {
    thunk: Thunk<LoggedResult<T, E, A>>,
}

impl<T, E, A> Clone for WriterEffect<T, E, A> {
    fn clone(&self) -> Self {
        WriterEffect {
            thunk: self.thunk.clone(),
        }
    }
}

impl<T, E, A> std::fmt::Debug for WriterEffect<T, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WriterEffect(..)")
    }
}

impl<T, E, A> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Create a writer effect from an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoggedResult<T, E, A>> + Send + 'static,
    {
        WriterEffect {
            thunk: Arc::new(move || Box::pin(f())),
        }
    }

    /// Wrap an existing raw thunk (the `wrap` half of the combinator protocol).
    pub fn from_thunk(thunk: Thunk<LoggedResult<T, E, A>>) -> Self {
        WriterEffect { thunk }
    }

    /// The underlying thunk, shared.
    pub fn thunk(&self) -> Thunk<LoggedResult<T, E, A>> {
        self.thunk.clone()
    }

    /// Lift a pure value with an empty log.
    pub fn pure(value: T) -> Self
    where
        T: Clone + Sync,
    {
        WriterEffect::new(move || {
            let value = value.clone();
            async move { (Ok(value), Log::empty()) }
        })
    }

    /// Create an always-failing writer effect with an empty log.
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        WriterEffect::new(move || {
            let error = error.clone();
            async move { (Err(error), Log::empty()) }
        })
    }

    /// Lift an already-computed `Result` with an empty log.
    pub fn from_result(result: Result<T, E>) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
    {
        WriterEffect::new(move || {
            let result = result.clone();
            async move { (result, Log::empty()) }
        })
    }

    /// Lift a plain [`Effect`] into the writer world with an empty log.
    pub fn from_effect(effect: Effect<T, E>) -> Self {
        let thunk = effect.thunk();
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            Box::pin(async move { (fut.await, Log::empty()) })
        }))
    }

    /// Execute the effect, producing its outcome and accumulated log.
    pub async fn run(&self) -> LoggedResult<T, E, A> {
        (self.thunk)().await
    }

    /// Apply a function to the success value, preserving the log.
    pub fn map<U, F>(self, f: F) -> WriterEffect<U, E, A>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move {
                let (result, log) = fut.await;
                (result.map(|value| f(value)), log)
            })
        }))
    }

    /// Apply a function to the error value, preserving the log.
    pub fn map_err<F2, F>(self, f: F) -> WriterEffect<T, F2, A>
    where
        F2: Send + 'static,
        F: Fn(E) -> F2 + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move {
                let (result, log) = fut.await;
                (result.map_err(|error| f(error)), log)
            })
        }))
    }

    /// Monadic bind: on success run the continuation and concatenate logs.
    ///
    /// On failure the continuation never runs and the log accumulated so
    /// far is preserved.
    pub fn and_then<U, F>(self, f: F) -> WriterEffect<U, E, A>
    where
        U: Send + 'static,
        F: Fn(T) -> WriterEffect<U, E, A> + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move {
                let (result, log) = fut.await;
                match result {
                    Ok(value) => {
                        let (next_result, next_log) = f(value).run().await;
                        (next_result, log.combine(next_log))
                    }
                    Err(error) => (Err(error), log),
                }
            })
        }))
    }

    /// Bind with a plain `Result`-returning continuation.
    ///
    /// The continuation contributes no log entries; the current log rides
    /// through unchanged.
    pub fn then_result<U, F>(self, f: F) -> WriterEffect<U, E, A>
    where
        U: Send + 'static,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move {
                let (result, log) = fut.await;
                (result.and_then(|value| f(value)), log)
            })
        }))
    }

    /// Append entries to the log without changing the computation.
    pub fn with_log(self, entries: impl IntoIterator<Item = A>) -> Self
    where
        A: Clone + Sync,
    {
        let appended: Vec<A> = entries.into_iter().collect();
        let thunk = self.thunk;
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let appended = appended.clone();
            Box::pin(async move {
                let (result, log) = fut.await;
                (result, log.combine(Log::of(appended)))
            })
        }))
    }

    /// Transform the log, possibly changing the entry type.
    pub fn map_log<B, F>(self, f: F) -> WriterEffect<T, E, B>
    where
        B: Send + 'static,
        F: Fn(Log<A>) -> Log<B> + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        let f = Arc::new(f);
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            let f = f.clone();
            Box::pin(async move {
                let (result, log) = fut.await;
                (result, f(log))
            })
        }))
    }

    /// Rewrite the log after the computation, keeping the entry type.
    ///
    /// The writer-classic `censor`: the value is untouched.
    pub fn censor<F>(self, f: F) -> Self
    where
        F: Fn(Log<A>) -> Log<A> + Send + Sync + 'static,
    {
        self.map_log(f)
    }

    /// Expose the accumulated log next to the success value.
    ///
    /// The log itself still rides along unchanged.
    pub fn listen(self) -> WriterEffect<(T, Log<A>), E, A>
    where
        A: Clone,
    {
        let thunk = self.thunk;
        WriterEffect::from_thunk(Arc::new(move || {
            let fut = thunk();
            Box::pin(async move {
                let (result, log) = fut.await;
                match result {
                    Ok(value) => {
                        let snapshot = log.clone();
                        (Ok((value, snapshot)), log)
                    }
                    Err(error) => (Err(error), log),
                }
            })
        }))
    }

    /// Memoize the first execution.
    ///
    /// The underlying computation runs at most once; later executions
    /// replay the cached outcome and log.
    pub fn cached(self) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
        A: Clone + Sync,
    {
        let cell = Arc::new(tokio::sync::OnceCell::<LoggedResult<T, E, A>>::new());
        let thunk = self.thunk;
        WriterEffect::from_thunk(Arc::new(move || {
            let cell = cell.clone();
            let thunk = thunk.clone();
            Box::pin(async move { cell.get_or_init(|| thunk()).await.clone() })
        }))
    }

    /// Demote to a plain [`Effect`], carrying the log inside the success
    /// value.
    pub fn into_effect(self) -> Effect<(T, Log<A>), E> {
        let thunk = self.thunk;
        Effect::from_thunk(Arc::new(move || {
            let fut = thunk();
            Box::pin(async move {
                let (result, log) = fut.await;
                result.map(|value| (value, log))
            })
        }))
    }
}

impl<T, E, A> IntoFuture for WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    type Output = LoggedResult<T, E, A>;
    type IntoFuture = BoxFuture<LoggedResult<T, E, A>>;

    fn into_future(self) -> Self::IntoFuture {
        (self.thunk)()
    }
}

/// Emit log entries without producing a value.
pub fn tell<E, A>(entries: impl IntoIterator<Item = A>) -> WriterEffect<(), E, A>
where
    E: Send + 'static,
    A: Clone + Send + Sync + 'static,
{
    let entries: Vec<A> = entries.into_iter().collect();
    WriterEffect::new(move || {
        let entries = entries.clone();
        async move { (Ok(()), Log::of(entries)) }
    })
}

/// Emit a single log entry without producing a value.
pub fn tell_one<E, A>(entry: A) -> WriterEffect<(), E, A>
where
    E: Send + 'static,
    A: Clone + Send + Sync + 'static,
{
    tell([entry])
}

/// A successful writer effect carrying a value and initial log entries.
pub fn writer_ok<T, E, A>(value: T, entries: impl IntoIterator<Item = A>) -> WriterEffect<T, E, A>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Clone + Send + Sync + 'static,
{
    let entries: Vec<A> = entries.into_iter().collect();
    WriterEffect::new(move || {
        let value = value.clone();
        let entries = entries.clone();
        async move { (Ok(value), Log::of(entries)) }
    })
}

/// A failed writer effect carrying an error and initial log entries.
pub fn writer_err<T, E, A>(error: E, entries: impl IntoIterator<Item = A>) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    let entries: Vec<A> = entries.into_iter().collect();
    WriterEffect::new(move || {
        let error = error.clone();
        let entries = entries.clone();
        async move { (Err(error), Log::of(entries)) }
    })
}

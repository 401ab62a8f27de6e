//! Fluent pipelines as data.
//!
//! [`Flow`] records combinator applications as an expression tree instead
//! of applying them immediately. Nothing executes - and no per-wrapper
//! state (like rate-limit buckets) is created - until [`Flow::compile`]
//! lowers the tree bottom-up through the sugar layer into an executable
//! [`Effect`]. A flow can therefore be built once, inspected, and compiled
//! many times; each compilation yields an independent effect sharing no
//! mutable state with its siblings.
//!
//! [`FlowWriter`] offers the same fluent surface for [`WriterEffect`]s
//! using direct value threading (no tree), and [`FlowM`] generalizes the
//! surface to any user effect type through the [`Interpreter`] trait.
//!
//! # Example
//!
//! ```
//! use breakwater::{flow, Effect, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let pipeline = flow(Effect::<_, String>::pure(9))
//!     .ensure(|n| *n > 0, |n| format!("{} not positive", n))
//!     .retry(RetryPolicy::fixed(2, Duration::ZERO))
//!     .timeout(Duration::from_secs(1));
//!
//! let effect = pipeline.compile();
//! assert_eq!(effect.run().await, Ok(9));
//! # });
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::combinators::race::RaceOkPolicy;
use crate::combinators::rate_limit::RateLimitPolicy;
use crate::combinators::repeat::RepeatPolicy;
use crate::combinators::retry::RetryPolicy;
use crate::combinators::{
    best_of, best_of_many, best_of_many_writer, best_of_writer, bracket, delay, delay_writer,
    ensure, ensure_writer, race_ok, race_ok_writer, rate_limit, rate_limit_writer, recover,
    recover_with, recover_with_writer, recover_writer, reject, reject_writer, repeat_until,
    repeat_until_writer, retry, retry_writer, tap, tap_err, tap_err_writer, tap_writer, timeout,
    timeout_writer,
};
use crate::effect::Effect;
use crate::error::{RepeatError, TimeoutError};
use crate::interp::BoxFuture;
use crate::writer::WriterEffect;

type SharedObserver<T> = Arc<dyn Fn(&T) + Send + Sync>;
type SharedPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type SharedErrorFactory<T, E> = Arc<dyn Fn(T) -> E + Send + Sync>;
type SharedKey<T> = Arc<dyn Fn(&T) -> f64 + Send + Sync>;

/// A node that lowers to an [`Effect`] of a fixed output type.
///
/// Type-changing combinators (timeout, recover, repeat-until, bracket)
/// enter the tree through this trait: the node remembers its child at the
/// child's type and re-types the result at lowering time.
pub trait Lower<T, E>: Send + Sync {
    /// Lower this node into an executable effect.
    fn lower(&self) -> Effect<T, E>;
}

/// An expression tree of recorded combinator applications.
///
/// Built by [`Flow`]'s fluent methods; immutable once built. Lowering is
/// pure - it instantiates combinators but executes nothing.
pub enum Expr<T, E> {
    /// A leaf effect.
    Base(Effect<T, E>),
    /// Retry the child with a policy.
    Retry {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Retry configuration.
        policy: RetryPolicy<E>,
    },
    /// Observe the child's success values.
    Tap {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Success observer.
        observe: SharedObserver<T>,
    },
    /// Observe the child's errors.
    TapErr {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Error observer.
        observe: SharedObserver<E>,
    },
    /// Fail values that do not satisfy the predicate.
    Ensure {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Predicate the value must satisfy.
        predicate: SharedPredicate<T>,
        /// Error built from a rejected value.
        error: SharedErrorFactory<T, E>,
    },
    /// Fail values that match the predicate.
    Reject {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Predicate the value must not match.
        predicate: SharedPredicate<T>,
        /// Error built from a rejected value.
        error: SharedErrorFactory<T, E>,
    },
    /// Race the child against alternatives until the first success.
    RaceOk {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Competing effects.
        others: Vec<Effect<T, E>>,
        /// Race configuration.
        policy: RaceOkPolicy,
    },
    /// Run the child `n` times, keep the best success.
    BestOf {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Number of copies.
        n: usize,
        /// Selection key.
        key: SharedKey<T>,
    },
    /// Select the best among distinct candidates.
    BestOfMany {
        /// Candidate effects.
        candidates: Vec<Effect<T, E>>,
        /// Selection key.
        key: SharedKey<T>,
    },
    /// Sleep before running the child.
    Delay {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Sleep duration.
        duration: Duration,
    },
    /// Throttle the child with a token bucket.
    ///
    /// The bucket is created at lowering time, so independently compiled
    /// effects get independent buckets.
    RateLimit {
        /// Child expression.
        inner: Box<Expr<T, E>>,
        /// Bucket configuration.
        policy: RateLimitPolicy,
    },
    /// A type-changing node, captured behind [`Lower`].
    Erased(Arc<dyn Lower<T, E>>),
}

impl<T, E> std::fmt::Debug for Expr<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Expr::Base(_) => "Base",
            Expr::Retry { .. } => "Retry",
            Expr::Tap { .. } => "Tap",
            Expr::TapErr { .. } => "TapErr",
            Expr::Ensure { .. } => "Ensure",
            Expr::Reject { .. } => "Reject",
            Expr::RaceOk { .. } => "RaceOk",
            Expr::BestOf { .. } => "BestOf",
            Expr::BestOfMany { .. } => "BestOfMany",
            Expr::Delay { .. } => "Delay",
            Expr::RateLimit { .. } => "RateLimit",
            Expr::Erased(_) => "Erased",
        };
        write!(f, "Expr::{}(..)", name)
    }
}

impl<T, E> Expr<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Lower the tree bottom-up into an executable effect.
    pub fn lower(&self) -> Effect<T, E> {
        match self {
            Expr::Base(effect) => effect.clone(),
            Expr::Retry { inner, policy } => retry(inner.lower(), policy.clone()),
            Expr::Tap { inner, observe } => {
                let observe = observe.clone();
                tap(inner.lower(), move |value| observe(value))
            }
            Expr::TapErr { inner, observe } => {
                let observe = observe.clone();
                tap_err(inner.lower(), move |error| observe(error))
            }
            Expr::Ensure {
                inner,
                predicate,
                error,
            } => {
                let predicate = predicate.clone();
                let error = error.clone();
                ensure(
                    inner.lower(),
                    move |value| predicate(value),
                    move |value| error(value),
                )
            }
            Expr::Reject {
                inner,
                predicate,
                error,
            } => {
                let predicate = predicate.clone();
                let error = error.clone();
                reject(
                    inner.lower(),
                    move |value| predicate(value),
                    move |value| error(value),
                )
            }
            Expr::RaceOk {
                inner,
                others,
                policy,
            } => {
                let mut effects = vec![inner.lower()];
                effects.extend(others.iter().cloned());
                race_ok(effects, *policy)
            }
            Expr::BestOf { inner, n, key } => {
                let key = key.clone();
                best_of(inner.lower(), *n, move |value| key(value))
            }
            Expr::BestOfMany { candidates, key } => {
                let key = key.clone();
                best_of_many(candidates.clone(), move |value| key(value))
            }
            Expr::Delay { inner, duration } => delay(inner.lower(), *duration),
            Expr::RateLimit { inner, policy } => rate_limit(inner.lower(), *policy),
            Expr::Erased(node) => node.lower(),
        }
    }
}

struct TimeoutExpr<T, E> {
    inner: Expr<T, E>,
    duration: Duration,
}

impl<T, E> Lower<T, TimeoutError<E>> for TimeoutExpr<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn lower(&self) -> Effect<T, TimeoutError<E>> {
        timeout(self.inner.lower(), self.duration)
    }
}

struct RecoverExpr<T, E> {
    inner: Expr<T, E>,
    default: T,
}

impl<T, E> Lower<T, Infallible> for RecoverExpr<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn lower(&self) -> Effect<T, Infallible> {
        recover(self.inner.lower(), self.default.clone())
    }
}

struct RecoverWithExpr<T, E> {
    inner: Expr<T, E>,
    handler: Arc<dyn Fn(E) -> T + Send + Sync>,
}

impl<T, E> Lower<T, Infallible> for RecoverWithExpr<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn lower(&self) -> Effect<T, Infallible> {
        let handler = self.handler.clone();
        recover_with(self.inner.lower(), move |error| handler(error))
    }
}

struct RepeatUntilExpr<T, E> {
    inner: Expr<T, E>,
    condition: SharedPredicate<T>,
    policy: RepeatPolicy,
}

impl<T, E> Lower<T, RepeatError<E>> for RepeatUntilExpr<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn lower(&self) -> Effect<T, RepeatError<E>> {
        let condition = self.condition.clone();
        repeat_until(
            self.inner.lower(),
            move |value| condition(value),
            self.policy,
        )
    }
}

struct BracketExpr<R, T, E> {
    acquire: Effect<R, E>,
    release: Arc<dyn Fn(R) -> BoxFuture<()> + Send + Sync>,
    use_fn: Arc<dyn Fn(R) -> Effect<T, E> + Send + Sync>,
}

impl<R, T, E> Lower<T, E> for BracketExpr<R, T, E>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn lower(&self) -> Effect<T, E> {
        let release = self.release.clone();
        let use_fn = self.use_fn.clone();
        bracket(
            self.acquire.clone(),
            move |resource| release(resource),
            move |resource| use_fn(resource),
        )
    }
}

/// Fluent builder over an [`Expr`] tree targeting [`Effect`].
#[derive(Debug)]
pub struct Flow<T, E> {
    expr: Expr<T, E>,
}

impl<T, E> Flow<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Record a retry.
    pub fn retry(self, policy: RetryPolicy<E>) -> Self {
        Flow {
            expr: Expr::Retry {
                inner: Box::new(self.expr),
                policy,
            },
        }
    }

    /// Record a fixed-delay retry. Shorthand for a [`RetryPolicy::fixed`].
    pub fn retry_times(self, times: u32, delay: Duration) -> Self {
        self.retry(RetryPolicy::fixed(times, delay))
    }

    /// Record a success observer.
    pub fn tap(self, observe: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Flow {
            expr: Expr::Tap {
                inner: Box::new(self.expr),
                observe: Arc::new(observe),
            },
        }
    }

    /// Record an error observer.
    pub fn tap_err(self, observe: impl Fn(&E) + Send + Sync + 'static) -> Self {
        Flow {
            expr: Expr::TapErr {
                inner: Box::new(self.expr),
                observe: Arc::new(observe),
            },
        }
    }

    /// Record a guard that fails values not satisfying the predicate.
    pub fn ensure(
        self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
        error: impl Fn(T) -> E + Send + Sync + 'static,
    ) -> Self {
        Flow {
            expr: Expr::Ensure {
                inner: Box::new(self.expr),
                predicate: Arc::new(predicate),
                error: Arc::new(error),
            },
        }
    }

    /// Record a guard that fails values matching the predicate.
    pub fn reject(
        self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
        error: impl Fn(T) -> E + Send + Sync + 'static,
    ) -> Self {
        Flow {
            expr: Expr::Reject {
                inner: Box::new(self.expr),
                predicate: Arc::new(predicate),
                error: Arc::new(error),
            },
        }
    }

    /// Record a race against alternatives, first success wins.
    pub fn race_ok(self, others: Vec<Effect<T, E>>, policy: RaceOkPolicy) -> Self {
        Flow {
            expr: Expr::RaceOk {
                inner: Box::new(self.expr),
                others,
                policy,
            },
        }
    }

    /// Record an n-way redundant run keeping the best success.
    pub fn best_of(self, n: usize, key: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        Flow {
            expr: Expr::BestOf {
                inner: Box::new(self.expr),
                n,
                key: Arc::new(key),
            },
        }
    }

    /// Record a sleep before the pipeline runs.
    pub fn delay(self, duration: Duration) -> Self {
        Flow {
            expr: Expr::Delay {
                inner: Box::new(self.expr),
                duration,
            },
        }
    }

    /// Record a token-bucket throttle.
    ///
    /// The bucket itself is created per compilation, so separately
    /// compiled pipelines never share one.
    pub fn rate_limit(self, policy: RateLimitPolicy) -> Self {
        Flow {
            expr: Expr::RateLimit {
                inner: Box::new(self.expr),
                policy,
            },
        }
    }

    /// Record a deadline. Widens the error channel to [`TimeoutError`].
    pub fn timeout(self, duration: Duration) -> Flow<T, TimeoutError<E>> {
        Flow {
            expr: Expr::Erased(Arc::new(TimeoutExpr {
                inner: self.expr,
                duration,
            })),
        }
    }

    /// Record a recovery to a default value. The error channel becomes
    /// uninhabited.
    pub fn recover(self, default: T) -> Flow<T, Infallible>
    where
        T: Clone + Sync,
    {
        Flow {
            expr: Expr::Erased(Arc::new(RecoverExpr {
                inner: self.expr,
                default,
            })),
        }
    }

    /// Record a recovery handler. The error channel becomes uninhabited.
    pub fn recover_with(self, handler: impl Fn(E) -> T + Send + Sync + 'static) -> Flow<T, Infallible> {
        Flow {
            expr: Expr::Erased(Arc::new(RecoverWithExpr {
                inner: self.expr,
                handler: Arc::new(handler),
            })),
        }
    }

    /// Record a repeat-until. Widens the error channel to [`RepeatError`].
    pub fn repeat_until(
        self,
        condition: impl Fn(&T) -> bool + Send + Sync + 'static,
        policy: RepeatPolicy,
    ) -> Flow<T, RepeatError<E>> {
        Flow {
            expr: Expr::Erased(Arc::new(RepeatUntilExpr {
                inner: self.expr,
                condition: Arc::new(condition),
                policy,
            })),
        }
    }

    /// Lower the recorded tree into an executable effect.
    ///
    /// Compiling is pure and repeatable: each call produces an
    /// independently executable effect with its own per-wrapper state.
    pub fn compile(&self) -> Effect<T, E> {
        self.expr.lower()
    }

    /// The recorded expression tree.
    pub fn expr(&self) -> &Expr<T, E> {
        &self.expr
    }
}

/// Start a fluent pipeline from an effect.
pub fn flow<T, E>(effect: Effect<T, E>) -> Flow<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Flow {
        expr: Expr::Base(effect),
    }
}

/// Start a fluent pipeline that selects the best among candidates.
///
/// # Panics
///
/// Panics if `candidates` is empty.
pub fn flow_many<T, E>(
    candidates: Vec<Effect<T, E>>,
    key: impl Fn(&T) -> f64 + Send + Sync + 'static,
) -> Flow<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    assert!(
        !candidates.is_empty(),
        "flow_many requires at least one candidate"
    );
    Flow {
        expr: Expr::BestOfMany {
            candidates,
            key: Arc::new(key),
        },
    }
}

/// Start a fluent pipeline with a bracketed resource.
pub fn flow_bracket<R, T, E, Rel, RelFut, Use>(
    acquire: Effect<R, E>,
    release: Rel,
    use_fn: Use,
) -> Flow<T, E>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    Rel: Fn(R) -> RelFut + Send + Sync + 'static,
    RelFut: Future<Output = ()> + Send + 'static,
    Use: Fn(R) -> Effect<T, E> + Send + Sync + 'static,
{
    Flow {
        expr: Expr::Erased(Arc::new(BracketExpr {
            acquire,
            release: Arc::new(move |resource| Box::pin(release(resource)) as BoxFuture<()>),
            use_fn: Arc::new(use_fn),
        })),
    }
}

/// Fluent builder for [`WriterEffect`] pipelines.
///
/// Unlike [`Flow`] this threads values directly - each method applies the
/// corresponding writer combinator immediately. Combinator application is
/// still lazy in the only sense that matters: nothing executes until the
/// compiled effect runs.
pub struct FlowWriter<T, E, A> {
    value: WriterEffect<T, E, A>,
}

impl<T, E, A> std::fmt::Debug for FlowWriter<T, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FlowWriter(..)")
    }
}

impl<T, E, A> FlowWriter<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Apply a retry.
    pub fn retry(self, policy: RetryPolicy<E>) -> Self {
        FlowWriter {
            value: retry_writer(self.value, policy),
        }
    }

    /// Apply a fixed-delay retry.
    pub fn retry_times(self, times: u32, delay: Duration) -> Self {
        self.retry(RetryPolicy::fixed(times, delay))
    }

    /// Apply a success observer.
    pub fn tap(self, observe: impl Fn(&T) + Send + Sync + 'static) -> Self {
        FlowWriter {
            value: tap_writer(self.value, observe),
        }
    }

    /// Apply an error observer.
    pub fn tap_err(self, observe: impl Fn(&E) + Send + Sync + 'static) -> Self {
        FlowWriter {
            value: tap_err_writer(self.value, observe),
        }
    }

    /// Apply a guard that fails values not satisfying the predicate.
    pub fn ensure(
        self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
        error: impl Fn(T) -> E + Send + Sync + 'static,
    ) -> Self {
        FlowWriter {
            value: ensure_writer(self.value, predicate, error),
        }
    }

    /// Apply a guard that fails values matching the predicate.
    pub fn reject(
        self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
        error: impl Fn(T) -> E + Send + Sync + 'static,
    ) -> Self {
        FlowWriter {
            value: reject_writer(self.value, predicate, error),
        }
    }

    /// Race against alternatives until the first success. Only the
    /// winner's log survives.
    pub fn race_ok(self, others: Vec<WriterEffect<T, E, A>>, policy: RaceOkPolicy) -> Self {
        let mut effects = vec![self.value];
        effects.extend(others);
        FlowWriter {
            value: race_ok_writer(effects, policy),
        }
    }

    /// Run the pipeline `n` times, keep the best success, merge logs.
    pub fn best_of(self, n: usize, key: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        FlowWriter {
            value: best_of_writer(self.value, n, key),
        }
    }

    /// Sleep before running.
    pub fn delay(self, duration: Duration) -> Self {
        FlowWriter {
            value: delay_writer(self.value, duration),
        }
    }

    /// Throttle with a token bucket.
    pub fn rate_limit(self, policy: RateLimitPolicy) -> Self {
        FlowWriter {
            value: rate_limit_writer(self.value, policy),
        }
    }

    /// Bound by a deadline. Widens the error channel to [`TimeoutError`].
    pub fn timeout(self, duration: Duration) -> FlowWriter<T, TimeoutError<E>, A> {
        FlowWriter {
            value: timeout_writer(self.value, duration),
        }
    }

    /// Recover to a default value. The error channel becomes uninhabited.
    pub fn recover(self, default: T) -> FlowWriter<T, Infallible, A>
    where
        T: Clone + Sync,
    {
        FlowWriter {
            value: recover_writer(self.value, default),
        }
    }

    /// Recover through a handler. The error channel becomes uninhabited.
    pub fn recover_with(
        self,
        handler: impl Fn(E) -> T + Send + Sync + 'static,
    ) -> FlowWriter<T, Infallible, A> {
        FlowWriter {
            value: recover_with_writer(self.value, handler),
        }
    }

    /// Repeat until the value satisfies the condition.
    pub fn repeat_until(
        self,
        condition: impl Fn(&T) -> bool + Send + Sync + 'static,
        policy: RepeatPolicy,
    ) -> FlowWriter<T, RepeatError<E>, A> {
        FlowWriter {
            value: repeat_until_writer(self.value, condition, policy),
        }
    }

    /// The assembled writer effect.
    pub fn compile(&self) -> WriterEffect<T, E, A> {
        self.value.clone()
    }
}

/// Start a fluent writer pipeline from a writer effect.
pub fn flow_writer<T, E, A>(effect: WriterEffect<T, E, A>) -> FlowWriter<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    FlowWriter { value: effect }
}

/// Start a fluent writer pipeline that selects the best among candidates.
///
/// # Panics
///
/// Panics if `candidates` is empty.
pub fn flow_many_writer<T, E, A>(
    candidates: Vec<WriterEffect<T, E, A>>,
    key: impl Fn(&T) -> f64 + Send + Sync + 'static,
) -> FlowWriter<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    FlowWriter {
        value: best_of_many_writer(candidates, key),
    }
}

/// One method per fluent combinator, for plugging custom effect types
/// into [`FlowM`].
///
/// An interpreter ties a monad type to the combinators it supports.
/// Implementations for [`Effect`] and [`WriterEffect`] ship with the
/// crate ([`EffectInterpreter`], [`WriterInterpreter`]); user effect types
/// implement the same trait to gain the fluent surface without the tree
/// layer. Type-changing operations (timeout, recover, repeat-until) are
/// deliberately absent here - they change the monad's type parameters and
/// therefore the interpreter type; use the concrete builders for those.
pub trait Interpreter {
    /// Success value of the monad.
    type Value: Send + 'static;
    /// Error value of the monad.
    type Error: Send + 'static;
    /// The effect type this interpreter drives.
    type Monad;

    /// Apply a retry policy.
    fn retry(monad: Self::Monad, policy: RetryPolicy<Self::Error>) -> Self::Monad;
    /// Observe success values.
    fn tap(monad: Self::Monad, observe: SharedObserver<Self::Value>) -> Self::Monad;
    /// Observe errors.
    fn tap_err(monad: Self::Monad, observe: SharedObserver<Self::Error>) -> Self::Monad;
    /// Sleep before running.
    fn delay(monad: Self::Monad, duration: Duration) -> Self::Monad;
    /// Throttle with a token bucket.
    fn rate_limit(monad: Self::Monad, policy: RateLimitPolicy) -> Self::Monad;
    /// Fail values not satisfying the predicate.
    fn ensure(
        monad: Self::Monad,
        predicate: SharedPredicate<Self::Value>,
        error: SharedErrorFactory<Self::Value, Self::Error>,
    ) -> Self::Monad;
    /// Fail values matching the predicate.
    fn reject(
        monad: Self::Monad,
        predicate: SharedPredicate<Self::Value>,
        error: SharedErrorFactory<Self::Value, Self::Error>,
    ) -> Self::Monad;
}

/// Fluent surface over any [`Interpreter`], threading values directly.
pub struct FlowM<I: Interpreter> {
    value: I::Monad,
}

impl<I: Interpreter> std::fmt::Debug for FlowM<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FlowM(..)")
    }
}

impl<I: Interpreter> FlowM<I> {
    /// Start a generic fluent pipeline.
    pub fn new(value: I::Monad) -> Self {
        FlowM { value }
    }

    /// Apply a retry policy.
    pub fn retry(self, policy: RetryPolicy<I::Error>) -> Self {
        FlowM {
            value: I::retry(self.value, policy),
        }
    }

    /// Observe success values.
    pub fn tap(self, observe: impl Fn(&I::Value) + Send + Sync + 'static) -> Self {
        FlowM {
            value: I::tap(self.value, Arc::new(observe)),
        }
    }

    /// Observe errors.
    pub fn tap_err(self, observe: impl Fn(&I::Error) + Send + Sync + 'static) -> Self {
        FlowM {
            value: I::tap_err(self.value, Arc::new(observe)),
        }
    }

    /// Sleep before running.
    pub fn delay(self, duration: Duration) -> Self {
        FlowM {
            value: I::delay(self.value, duration),
        }
    }

    /// Throttle with a token bucket.
    pub fn rate_limit(self, policy: RateLimitPolicy) -> Self {
        FlowM {
            value: I::rate_limit(self.value, policy),
        }
    }

    /// Fail values not satisfying the predicate.
    pub fn ensure(
        self,
        predicate: impl Fn(&I::Value) -> bool + Send + Sync + 'static,
        error: impl Fn(I::Value) -> I::Error + Send + Sync + 'static,
    ) -> Self {
        FlowM {
            value: I::ensure(self.value, Arc::new(predicate), Arc::new(error)),
        }
    }

    /// Fail values matching the predicate.
    pub fn reject(
        self,
        predicate: impl Fn(&I::Value) -> bool + Send + Sync + 'static,
        error: impl Fn(I::Value) -> I::Error + Send + Sync + 'static,
    ) -> Self {
        FlowM {
            value: I::reject(self.value, Arc::new(predicate), Arc::new(error)),
        }
    }

    /// Unwrap the assembled monad.
    pub fn into_inner(self) -> I::Monad {
        self.value
    }
}

/// [`Interpreter`] instance for [`Effect`].
pub struct EffectInterpreter<T, E>(PhantomData<fn() -> (T, E)>);

impl<T, E> std::fmt::Debug for EffectInterpreter<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EffectInterpreter")
    }
}

impl<T, E> Interpreter for EffectInterpreter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;
    type Monad = Effect<T, E>;

    fn retry(monad: Self::Monad, policy: RetryPolicy<E>) -> Self::Monad {
        retry(monad, policy)
    }

    fn tap(monad: Self::Monad, observe: SharedObserver<T>) -> Self::Monad {
        tap(monad, move |value| observe(value))
    }

    fn tap_err(monad: Self::Monad, observe: SharedObserver<E>) -> Self::Monad {
        tap_err(monad, move |error| observe(error))
    }

    fn delay(monad: Self::Monad, duration: Duration) -> Self::Monad {
        delay(monad, duration)
    }

    fn rate_limit(monad: Self::Monad, policy: RateLimitPolicy) -> Self::Monad {
        rate_limit(monad, policy)
    }

    fn ensure(
        monad: Self::Monad,
        predicate: SharedPredicate<T>,
        error: SharedErrorFactory<T, E>,
    ) -> Self::Monad {
        ensure(
            monad,
            move |value| predicate(value),
            move |value| error(value),
        )
    }

    fn reject(
        monad: Self::Monad,
        predicate: SharedPredicate<T>,
        error: SharedErrorFactory<T, E>,
    ) -> Self::Monad {
        reject(
            monad,
            move |value| predicate(value),
            move |value| error(value),
        )
    }
}

/// [`Interpreter`] instance for [`WriterEffect`].
pub struct WriterInterpreter<T, E, A>(PhantomData<fn() -> (T, E, A)>);

impl<T, E, A> std::fmt::Debug for WriterInterpreter<T, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WriterInterpreter")
    }
}

impl<T, E, A> Interpreter for WriterInterpreter<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    type Value = T;
    type Error = E;
    type Monad = WriterEffect<T, E, A>;

    fn retry(monad: Self::Monad, policy: RetryPolicy<E>) -> Self::Monad {
        retry_writer(monad, policy)
    }

    fn tap(monad: Self::Monad, observe: SharedObserver<T>) -> Self::Monad {
        tap_writer(monad, move |value| observe(value))
    }

    fn tap_err(monad: Self::Monad, observe: SharedObserver<E>) -> Self::Monad {
        tap_err_writer(monad, move |error| observe(error))
    }

    fn delay(monad: Self::Monad, duration: Duration) -> Self::Monad {
        delay_writer(monad, duration)
    }

    fn rate_limit(monad: Self::Monad, policy: RateLimitPolicy) -> Self::Monad {
        rate_limit_writer(monad, policy)
    }

    fn ensure(
        monad: Self::Monad,
        predicate: SharedPredicate<T>,
        error: SharedErrorFactory<T, E>,
    ) -> Self::Monad {
        ensure_writer(
            monad,
            move |value| predicate(value),
            move |value| error(value),
        )
    }

    fn reject(
        monad: Self::Monad,
        predicate: SharedPredicate<T>,
        error: SharedErrorFactory<T, E>,
    ) -> Self::Monad {
        reject_writer(
            monad,
            move |value| predicate(value),
            move |value| error(value),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_building_a_flow_executes_nothing() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let effect = Effect::<_, String>::new(move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        });

        let pipeline = flow(effect)
            .retry_times(3, Duration::ZERO)
            .tap(|_| {})
            .delay(Duration::ZERO);
        let compiled = pipeline.compile();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(compiled.run().await, Ok(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flow_retry_recovers_flaky_effect() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let effect = Effect::new(move || {
            let counter = counter.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err("flaky".to_string()),
                    n => Ok(n),
                }
            }
        });

        let compiled = flow(effect).retry_times(3, Duration::ZERO).compile();
        assert_eq!(compiled.run().await, Ok(2));
    }

    #[tokio::test]
    async fn test_compile_twice_yields_independent_effects() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let effect = Effect::<_, String>::new(move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        });

        // Burst of one: a shared bucket would force the second run to wait.
        let pipeline = flow(effect).rate_limit(RateLimitPolicy::per_second(2.0).with_burst(1));
        let first = pipeline.compile();
        let second = pipeline.compile();

        let start = Instant::now();
        assert!(first.run().await.is_ok());
        assert!(second.run().await.is_ok());
        // Each compiled effect drew from its own full bucket.
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_flow_timeout_changes_error_type() {
        let slow = Effect::<i32, String>::new(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1)
        });
        let compiled = flow(slow).timeout(Duration::from_millis(10)).compile();
        assert!(matches!(
            compiled.run().await,
            Err(TimeoutError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_flow_recover_makes_error_uninhabited() {
        let compiled = flow(Effect::<i32, _>::fail("down".to_string()))
            .recover(0)
            .compile();
        let value: i32 = compiled.run().await.unwrap();
        assert_eq!(value, 0);
    }

    #[tokio::test]
    async fn test_flow_many_selects_best() {
        let pipeline = flow_many(
            vec![
                Effect::<_, String>::pure(3.0f64),
                Effect::<_, String>::pure(7.0f64),
            ],
            |n| *n,
        );
        assert_eq!(pipeline.compile().run().await, Ok(7.0));
    }

    #[tokio::test]
    async fn test_flow_bracket_releases() {
        let releases = Arc::new(AtomicU32::new(0));
        let counter = releases.clone();
        let pipeline = flow_bracket(
            Effect::<_, String>::pure("conn"),
            move |_resource| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
            |resource| Effect::<_, String>::pure(resource.len()),
        );
        assert_eq!(pipeline.compile().run().await, Ok(4));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flow_writer_threads_logs() {
        let pipeline = flow_writer(crate::writer::writer_ok::<_, String, _>(5, ["start"]))
            .ensure(|n| *n > 0, |_| "not positive".to_string())
            .retry_times(2, Duration::ZERO);
        let (result, log) = pipeline.compile().run().await;
        assert_eq!(result, Ok(5));
        assert_eq!(log.entries(), &["start"]);
    }

    #[tokio::test]
    async fn test_flow_m_with_effect_interpreter() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let effect = Effect::new(move || {
            let counter = counter.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => Err("cold start".to_string()),
                    n => Ok(n),
                }
            }
        });

        let assembled = FlowM::<EffectInterpreter<u32, String>>::new(effect)
            .retry(RetryPolicy::fixed(3, Duration::ZERO))
            .ensure(|n| *n > 0, |n| format!("bad {}", n))
            .into_inner();
        assert_eq!(assembled.run().await, Ok(1));
    }

    #[tokio::test]
    async fn test_flow_m_with_writer_interpreter() {
        let assembled =
            FlowM::<WriterInterpreter<i32, String, &str>>::new(crate::writer::writer_ok(
                2,
                ["logged"],
            ))
            .tap(|_| {})
            .into_inner();
        let (result, log) = assembled.run().await;
        assert_eq!(result, Ok(2));
        assert_eq!(log.entries(), &["logged"]);
    }
}

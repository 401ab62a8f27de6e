//! The generic combinator protocol.
//!
//! Every combinator algorithm in [`crate::combinators`] is written exactly
//! once, against this module's [`Interp`] trait, and instantiated for each
//! concrete effect representation. An interpretation knows three things
//! about its effect type:
//!
//! - how to **split** a raw result into `(Result<Value, Error>, Ctx)`,
//!   where `Ctx` is a monoidal context (`()` for [`crate::Effect`], a
//!   [`Log`] for [`crate::WriterEffect`]),
//! - how to **rebuild** a raw result from those halves, and
//! - how to **wrap** a thunk producing raw results back into the effect
//!   type.
//!
//! The same retry loop, race, bracket, or traversal then works for any
//! representation; only the split/rebuild/wrap triple differs. User-defined
//! effect types gain every generic combinator by implementing `Interp` for
//! a marker type.
//!
//! # Laws
//!
//! For any raw value `r`: `rebuild(split(r)) == r`. `split` must be a pure
//! projection and `wrap` must produce a fresh lazy value each call, with no
//! hidden mutable state shared between invocations.
//!
//! # Example: a custom interpretation
//!
//! ```rust
//! use breakwater::{BoxFuture, Interp, Thunk};
//!
//! // A raw result carrying a step counter next to the outcome.
//! struct Counted<T, E>(Result<T, E>, u32);
//!
//! struct CountedEffect<T, E>(Thunk<Counted<T, E>>);
//!
//! struct CountedInterp;
//!
//! impl Interp for CountedInterp {
//!     type Value = i32;
//!     type Error = String;
//!     type Ctx = Vec<u32>;
//!     type Raw = Counted<i32, String>;
//!     type Monad = CountedEffect<i32, String>;
//!
//!     fn split(raw: Self::Raw) -> (Result<i32, String>, Vec<u32>) {
//!         (raw.0, vec![raw.1])
//!     }
//!
//!     fn rebuild(result: Result<i32, String>, ctx: Vec<u32>) -> Self::Raw {
//!         Counted(result, ctx.iter().sum())
//!     }
//!
//!     fn wrap(thunk: Thunk<Self::Raw>) -> Self::Monad {
//!         CountedEffect(thunk)
//!     }
//! }
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::effect::Effect;
use crate::log::Log;
use crate::monoid::Monoid;
use crate::writer::WriterEffect;

/// A boxed future that is Send.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A re-invocable lazy computation producing a raw effect result.
///
/// Thunks are the currency of the generic combinator core: every input
/// effect is handed to an algorithm as a thunk, and every algorithm hands
/// its own body back to [`Interp::wrap`] as one. Invoking a thunk twice
/// re-executes the underlying computation.
pub type Thunk<Raw> = Arc<dyn Fn() -> BoxFuture<Raw> + Send + Sync + 'static>;

/// Interpretation of an abstract effect shape.
///
/// Implementors tie together a concrete effect type (`Monad`), its raw
/// result type (`Raw`), and the decomposition of raw results into an
/// outcome plus a monoidal context. See the [module docs](self) for the
/// laws implementations must uphold.
pub trait Interp: 'static {
    /// Success value of the outcome.
    type Value: Send + 'static;
    /// Error value of the outcome.
    type Error: Send + 'static;
    /// Monoidal context carried next to the outcome (`()` when there is none).
    type Ctx: Monoid + Send + 'static;
    /// The raw result an execution produces.
    type Raw: Send + 'static;
    /// The wrapped effect type handed back to callers.
    type Monad;

    /// Project a raw result into its outcome and context halves.
    fn split(raw: Self::Raw) -> (Result<Self::Value, Self::Error>, Self::Ctx);

    /// Reassemble a raw result from an outcome and a context.
    fn rebuild(result: Result<Self::Value, Self::Error>, ctx: Self::Ctx) -> Self::Raw;

    /// Wrap a thunk of raw results back into the effect type.
    fn wrap(thunk: Thunk<Self::Raw>) -> Self::Monad;
}

/// Interpretation for [`Effect`]: the raw result *is* the outcome and the
/// context is unit.
pub struct EffectInterp<T, E>(PhantomData<fn() -> (T, E)>);

impl<T, E> std::fmt::Debug for EffectInterp<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EffectInterp")
    }
}

impl<T, E> Interp for EffectInterp<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;
    type Ctx = ();
    type Raw = Result<T, E>;
    type Monad = Effect<T, E>;

    fn split(raw: Self::Raw) -> (Result<T, E>, ()) {
        (raw, ())
    }

    fn rebuild(result: Result<T, E>, _ctx: ()) -> Self::Raw {
        result
    }

    fn wrap(thunk: Thunk<Self::Raw>) -> Self::Monad {
        Effect::from_thunk(thunk)
    }
}

/// Interpretation for [`WriterEffect`]: the raw result pairs the outcome
/// with its accumulated [`Log`], and contexts merge by concatenation.
pub struct WriterInterp<T, E, A>(PhantomData<fn() -> (T, E, A)>);

impl<T, E, A> std::fmt::Debug for WriterInterp<T, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WriterInterp")
    }
}

impl<T, E, A> Interp for WriterInterp<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    type Value = T;
    type Error = E;
    type Ctx = Log<A>;
    type Raw = (Result<T, E>, Log<A>);
    type Monad = WriterEffect<T, E, A>;

    fn split(raw: Self::Raw) -> (Result<T, E>, Log<A>) {
        raw
    }

    fn rebuild(result: Result<T, E>, ctx: Log<A>) -> Self::Raw {
        (result, ctx)
    }

    fn wrap(thunk: Thunk<Self::Raw>) -> Self::Monad {
        WriterEffect::from_thunk(thunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_effect_interp_round_trips() {
        let raw: Result<i32, String> = Ok(7);
        let (result, ctx) = EffectInterp::<i32, String>::split(raw);
        assert_eq!(EffectInterp::<i32, String>::rebuild(result, ctx), Ok(7));
    }

    #[tokio::test]
    async fn test_writer_interp_round_trips() {
        let raw = (Ok::<_, String>(7), Log::of(["a", "b"]));
        let (result, ctx) = WriterInterp::<i32, String, &str>::split(raw.clone());
        assert_eq!(
            WriterInterp::<i32, String, &str>::rebuild(result, ctx),
            raw
        );
    }

    #[tokio::test]
    async fn test_wrap_produces_runnable_effect() {
        let thunk: Thunk<Result<i32, String>> = Arc::new(|| Box::pin(async { Ok(1) }));
        let effect = EffectInterp::<i32, String>::wrap(thunk);
        assert_eq!(effect.run().await, Ok(1));
        // Re-invocable: wrapping does not consume the computation.
        assert_eq!(effect.run().await, Ok(1));
    }
}

//! # Breakwater
//!
//! > *"A breakwater takes the waves so the harbor doesn't have to"*
//!
//! A Rust library of resilience combinators for asynchronous effects.
//!
//! ## Philosophy
//!
//! **Breakwater** separates *what should happen when things go wrong* from
//! *the computation itself*:
//! - **Break** = failure-handling policy (retry, timeout, fallback, rate limits)
//! - **Water** = the effect (flowing, performing I/O)
//!
//! Every combinator algorithm is written once against an abstract effect
//! shape (the [`Interp`] protocol) and instantiated for two concrete
//! representations: [`Effect`] (a lazy async computation yielding
//! `Result<T, E>`) and [`WriterEffect`] (the same, accumulating a [`Log`]
//! alongside the result). Custom effect types plug into the identical
//! algorithms through the same protocol.
//!
//! ## Quick Example
//!
//! ```rust
//! use breakwater::{Effect, RetryPolicy};
//! use breakwater::combinators::retry;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let calls = Arc::new(AtomicU32::new(0));
//! let counter = calls.clone();
//!
//! // Fails twice, then succeeds.
//! let flaky = Effect::new(move || {
//!     let counter = counter.clone();
//!     async move {
//!         match counter.fetch_add(1, Ordering::SeqCst) {
//!             0 | 1 => Err("connection reset".to_string()),
//!             n => Ok(n),
//!         }
//!     }
//! });
//!
//! let resilient = retry(flaky, RetryPolicy::fixed(3, Duration::ZERO));
//! assert_eq!(resilient.run().await, Ok(2));
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! # });
//! ```
//!
//! ## Fluent pipelines
//!
//! The [`Flow`] builder records combinator applications as a tree and only
//! materializes an executable [`Effect`] when [`Flow::compile`] is called:
//!
//! ```rust
//! use breakwater::{flow, Effect, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let effect = flow(Effect::<_, String>::pure(21))
//!     .retry(RetryPolicy::fixed(3, Duration::ZERO))
//!     .delay(Duration::ZERO)
//!     .compile()
//!     .map(|n| n * 2);
//!
//! assert_eq!(effect.run().await, Ok(42));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod combinators;
pub mod effect;
pub mod error;
pub mod flow;
pub mod interp;
pub mod log;
pub mod monoid;
pub mod semigroup;
#[cfg(feature = "tracing")]
pub mod tracing;
pub mod writer;

// Re-exports
pub use combinators::race::{ErrorStrategy, RaceOkPolicy};
pub use combinators::rate_limit::RateLimitPolicy;
pub use combinators::repeat::RepeatPolicy;
pub use combinators::retry::{Backoff, RetryPolicy};
pub use effect::Effect;
pub use error::{RepeatError, TimeoutError};
pub use flow::{
    flow, flow_bracket, flow_many, flow_many_writer, flow_writer, EffectInterpreter, Expr, Flow,
    FlowM, FlowWriter, Interpreter, Lower, WriterInterpreter,
};
pub use interp::{BoxFuture, EffectInterp, Interp, Thunk, WriterInterp};
pub use log::Log;
pub use monoid::Monoid;
pub use semigroup::Semigroup;
pub use writer::WriterEffect;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::combinators::race::{ErrorStrategy, RaceOkPolicy};
    pub use crate::combinators::rate_limit::RateLimitPolicy;
    pub use crate::combinators::repeat::RepeatPolicy;
    pub use crate::combinators::retry::{Backoff, RetryPolicy};
    pub use crate::effect::Effect;
    pub use crate::error::{RepeatError, TimeoutError};
    pub use crate::flow::{flow, flow_bracket, flow_many, flow_many_writer, flow_writer, Flow, FlowWriter};
    pub use crate::log::Log;
    pub use crate::monoid::Monoid;
    pub use crate::semigroup::Semigroup;
    pub use crate::writer::WriterEffect;
}

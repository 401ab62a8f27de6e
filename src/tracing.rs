//! Tracing support for effects.
//!
//! Wraps an effect's execution in a `tracing` span. Feature-gated behind
//! `tracing`; without the feature this module does not exist.

use crate::effect::Effect;
use crate::writer::WriterEffect;

/// Extension trait for adding tracing instrumentation to effects.
pub trait EffectTracingExt<T, E> {
    /// Wrap every execution of this effect in the given span.
    ///
    /// The span is entered when an execution starts and exited when it
    /// completes, following the standard `tracing::Instrument` pattern
    /// for async code.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use breakwater::Effect;
    /// use breakwater::tracing::EffectTracingExt;
    ///
    /// let effect = Effect::<_, String>::pure(42)
    ///     .instrumented(tracing::info_span!("fetch_quote"));
    /// ```
    fn instrumented(self, span: tracing::Span) -> Self;
}

impl<T, E> EffectTracingExt<T, E> for Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn instrumented(self, span: tracing::Span) -> Self {
        let thunk = self.thunk();
        Effect::from_thunk(std::sync::Arc::new(move || {
            use tracing::Instrument as _;
            let fut = thunk();
            let span = span.clone();
            Box::pin(fut.instrument(span))
        }))
    }
}

impl<T, E, A> EffectTracingExt<T, E> for WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    fn instrumented(self, span: tracing::Span) -> Self {
        let thunk = self.thunk();
        WriterEffect::from_thunk(std::sync::Arc::new(move || {
            use tracing::Instrument as _;
            let fut = thunk();
            let span = span.clone();
            Box::pin(fut.instrument(span))
        }))
    }
}

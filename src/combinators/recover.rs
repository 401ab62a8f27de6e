//! Recovery: collapse the error channel.
//!
//! [`recover`] replaces any failure with a default value; [`recover_with`]
//! computes the replacement from the error. Either way the resulting error
//! type is [`std::convert::Infallible`] - the compiler knows the effect
//! can no longer fail.

use std::convert::Infallible;
use std::sync::Arc;

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::writer::WriterEffect;

/// Generic recover combinator: any error becomes the default value.
pub fn recover_m<In, Out>(thunk: Thunk<In::Raw>, default: In::Value) -> Out::Monad
where
    In: Interp,
    In::Value: Clone + Sync,
    Out: Interp<Value = In::Value, Error = Infallible, Ctx = In::Ctx>,
{
    recover_with_m::<In, Out, _>(thunk, move |_| default.clone())
}

/// Generic recover combinator with an error handler.
pub fn recover_with_m<In, Out, H>(thunk: Thunk<In::Raw>, handler: H) -> Out::Monad
where
    In: Interp,
    Out: Interp<Value = In::Value, Error = Infallible, Ctx = In::Ctx>,
    H: Fn(In::Error) -> In::Value + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    Out::wrap(Arc::new(move || {
        let thunk = thunk.clone();
        let handler = handler.clone();
        Box::pin(async move {
            let raw = thunk().await;
            let (result, ctx) = In::split(raw);
            match result {
                Ok(value) => Out::rebuild(Ok(value), ctx),
                Err(error) => Out::rebuild(Ok(handler(error)), ctx),
            }
        })
    }))
}

/// Replace any failure of an [`Effect`] with a default value.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::recover;
///
/// # tokio_test::block_on(async {
/// let effect = recover(Effect::<i32, _>::fail("down".to_string()), -1);
/// // The error type is now Infallible; unwrapping cannot panic.
/// let value: i32 = effect.run().await.unwrap();
/// assert_eq!(value, -1);
/// # });
/// ```
pub fn recover<T, E>(effect: Effect<T, E>, default: T) -> Effect<T, Infallible>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    recover_m::<EffectInterp<T, E>, EffectInterp<T, Infallible>>(effect.thunk(), default)
}

/// Turn any failure of an [`Effect`] into a value computed from the error.
pub fn recover_with<T, E, H>(effect: Effect<T, E>, handler: H) -> Effect<T, Infallible>
where
    T: Send + 'static,
    E: Send + 'static,
    H: Fn(E) -> T + Send + Sync + 'static,
{
    recover_with_m::<EffectInterp<T, E>, EffectInterp<T, Infallible>, H>(effect.thunk(), handler)
}

/// Replace any failure of a [`WriterEffect`] with a default value. The log
/// accumulated up to the failure is preserved.
pub fn recover_writer<T, E, A>(
    effect: WriterEffect<T, E, A>,
    default: T,
) -> WriterEffect<T, Infallible, A>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    recover_m::<WriterInterp<T, E, A>, WriterInterp<T, Infallible, A>>(effect.thunk(), default)
}

/// Turn any failure of a [`WriterEffect`] into a value computed from the
/// error. The log is preserved.
pub fn recover_with_writer<T, E, A, H>(
    effect: WriterEffect<T, E, A>,
    handler: H,
) -> WriterEffect<T, Infallible, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    H: Fn(E) -> T + Send + Sync + 'static,
{
    recover_with_m::<WriterInterp<T, E, A>, WriterInterp<T, Infallible, A>, H>(
        effect.thunk(),
        handler,
    )
}

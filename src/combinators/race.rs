//! Racing redundant computations.
//!
//! [`race`] returns whichever branch settles first, success or failure,
//! and cancels the rest. [`race_ok`] keeps going until the first success;
//! only if every branch fails does it report an error, chosen by the
//! [`RaceOkPolicy`].
//!
//! For writer effects, only the winning branch's log survives. Losing
//! branches may have logged speculatively; merging those logs would grow
//! without bound under heavy redundancy, so they are discarded with the
//! cancelled work.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::effect::Effect;
use crate::interp::{EffectInterp, Interp, Thunk, WriterInterp};
use crate::writer::WriterEffect;

/// Which failure to report when every `race_ok` branch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStrategy {
    /// The first failure observed (in completion order).
    First,
    /// The most recent failure observed.
    #[default]
    Last,
}

/// Configuration for [`race_ok`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceOkPolicy {
    /// Cancel still-running branches once a winner is found.
    pub cancel_pending: bool,
    /// Which failure to report when every branch fails.
    pub error_strategy: ErrorStrategy,
}

impl Default for RaceOkPolicy {
    fn default() -> Self {
        RaceOkPolicy {
            cancel_pending: true,
            error_strategy: ErrorStrategy::Last,
        }
    }
}

impl RaceOkPolicy {
    /// Keep losing branches running after a winner is found.
    pub fn detached() -> Self {
        RaceOkPolicy {
            cancel_pending: false,
            ..Default::default()
        }
    }

    /// Report the first observed failure instead of the last.
    pub fn first_error(mut self) -> Self {
        self.error_strategy = ErrorStrategy::First;
        self
    }
}

/// Generic race combinator: first settled result wins, the rest are
/// cancelled by dropping their unfinished futures.
///
/// # Panics
///
/// Panics if called with no thunks.
pub fn race_m<I>(thunks: Vec<Thunk<I::Raw>>) -> I::Monad
where
    I: Interp,
{
    assert!(!thunks.is_empty(), "race requires at least one effect");
    I::wrap(Arc::new(move || {
        let futures: Vec<_> = thunks.iter().map(|thunk| thunk()).collect();
        Box::pin(async move {
            let (raw, _index, _remaining) = futures::future::select_all(futures).await;
            raw
        })
    }))
}

/// Generic race-until-first-success combinator.
///
/// All branches are spawned as tasks and observed in completion order. The
/// first success wins; pending tasks are aborted iff the policy says so.
/// If every branch fails, the first- or last-observed failure is returned
/// per the policy.
///
/// # Panics
///
/// Panics if called with no thunks.
pub fn race_ok_m<I>(thunks: Vec<Thunk<I::Raw>>, policy: RaceOkPolicy) -> I::Monad
where
    I: Interp,
{
    assert!(!thunks.is_empty(), "race_ok requires at least one effect");
    I::wrap(Arc::new(move || {
        let thunks = thunks.clone();
        Box::pin(async move {
            let handles: Vec<tokio::task::JoinHandle<I::Raw>> =
                thunks.iter().map(|thunk| tokio::spawn(thunk())).collect();
            let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
            let mut pending: FuturesUnordered<_> = handles.into_iter().collect();

            let mut kept_failure: Option<I::Raw> = None;
            while let Some(joined) = pending.next().await {
                let raw = match joined {
                    Ok(raw) => raw,
                    Err(join_error) if join_error.is_panic() => {
                        std::panic::resume_unwind(join_error.into_panic())
                    }
                    Err(_) => continue,
                };
                let (result, ctx) = I::split(raw);
                match result {
                    Ok(value) => {
                        if policy.cancel_pending {
                            for abort in &aborts {
                                abort.abort();
                            }
                        }
                        return I::rebuild(Ok(value), ctx);
                    }
                    Err(error) => {
                        let raw = I::rebuild(Err(error), ctx);
                        match policy.error_strategy {
                            ErrorStrategy::First => {
                                if kept_failure.is_none() {
                                    kept_failure = Some(raw);
                                }
                            }
                            ErrorStrategy::Last => kept_failure = Some(raw),
                        }
                    }
                }
            }

            match kept_failure {
                Some(raw) => raw,
                None => unreachable!("race_ok observed no results from a non-empty set"),
            }
        })
    }))
}

/// Race [`Effect`]s: whichever settles first wins, success or failure.
///
/// # Examples
///
/// ```
/// use breakwater::Effect;
/// use breakwater::combinators::race;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let quick = Effect::<_, String>::pure(1);
/// let slow = Effect::<_, String>::new(|| async {
///     tokio::time::sleep(Duration::from_secs(5)).await;
///     Ok(2)
/// });
/// assert_eq!(race(vec![quick, slow]).run().await, Ok(1));
/// # });
/// ```
pub fn race<T, E>(effects: Vec<Effect<T, E>>) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    race_m::<EffectInterp<T, E>>(effects.iter().map(Effect::thunk).collect())
}

/// Race [`WriterEffect`]s. Only the winner's log is preserved.
pub fn race_writer<T, E, A>(effects: Vec<WriterEffect<T, E, A>>) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    race_m::<WriterInterp<T, E, A>>(effects.iter().map(WriterEffect::thunk).collect())
}

/// Race [`Effect`]s until the first success.
pub fn race_ok<T, E>(effects: Vec<Effect<T, E>>, policy: RaceOkPolicy) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    race_ok_m::<EffectInterp<T, E>>(effects.iter().map(Effect::thunk).collect(), policy)
}

/// Race [`WriterEffect`]s until the first success. Losing branches' logs
/// are discarded.
pub fn race_ok_writer<T, E, A>(
    effects: Vec<WriterEffect<T, E, A>>,
    policy: RaceOkPolicy,
) -> WriterEffect<T, E, A>
where
    T: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    race_ok_m::<WriterInterp<T, E, A>>(effects.iter().map(WriterEffect::thunk).collect(), policy)
}

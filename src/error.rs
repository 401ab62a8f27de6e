//! Structural error types raised by combinators.
//!
//! Combinators never let errors escape as panics; deadline expiry and
//! repeat-until exhaustion surface as first-class values on the error
//! channel. Both types widen a domain error `E` with an `Inner` variant so
//! the original error flows through unchanged when the combinator itself
//! did not fail.

use std::time::Duration;

/// Error channel of a deadline-bounded effect.
///
/// Wraps either the deadline expiry or an inner error the effect produced
/// before the deadline.
///
/// # Examples
///
/// ```
/// use breakwater::{Effect, TimeoutError};
/// use breakwater::combinators::timeout;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let slow = Effect::<i32, String>::new(|| async {
///     tokio::time::sleep(Duration::from_secs(10)).await;
///     Ok(42)
/// });
///
/// match timeout(slow, Duration::from_millis(10)).run().await {
///     Err(TimeoutError::Timeout { duration }) => {
///         assert_eq!(duration, Duration::from_millis(10));
///     }
///     _ => panic!("expected timeout"),
/// }
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutError<E> {
    /// The operation exceeded its deadline.
    Timeout {
        /// The deadline that was exceeded.
        duration: Duration,
    },
    /// The effect failed on its own before the deadline.
    Inner(E),
}

impl<E> TimeoutError<E> {
    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create an inner error.
    pub fn inner(error: E) -> Self {
        Self::Inner(error)
    }

    /// Returns true if this is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if this wraps an inner error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Get the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Timeout { .. } => None,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { duration } => write!(f, "operation timed out after {:?}", duration),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timeout { .. } => None,
            Self::Inner(e) => Some(e),
        }
    }
}

/// Error channel of a repeat-until effect.
///
/// `ConditionNotMet` carries how many rounds ran before giving up; `Inner`
/// wraps a failure of the underlying effect, which short-circuits the
/// repetition immediately.
///
/// # Examples
///
/// ```
/// use breakwater::{Effect, RepeatError, RepeatPolicy};
/// use breakwater::combinators::repeat_until;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let effect = Effect::<_, String>::pure(1);
/// let policy = RepeatPolicy::new(3);
///
/// match repeat_until(effect, |n| *n > 10, policy).run().await {
///     Err(RepeatError::ConditionNotMet { rounds }) => assert_eq!(rounds, 3),
///     _ => panic!("expected exhaustion"),
/// }
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatError<E> {
    /// Every round produced a value that failed the condition.
    ConditionNotMet {
        /// Number of rounds executed before giving up.
        rounds: u32,
    },
    /// The underlying effect failed; repetition stopped immediately.
    Inner(E),
}

impl<E> RepeatError<E> {
    /// Create a condition-not-met error.
    pub fn condition_not_met(rounds: u32) -> Self {
        Self::ConditionNotMet { rounds }
    }

    /// Create an inner error.
    pub fn inner(error: E) -> Self {
        Self::Inner(error)
    }

    /// Returns true if the repetition exhausted its rounds.
    pub fn is_condition_not_met(&self) -> bool {
        matches!(self, Self::ConditionNotMet { .. })
    }

    /// Get the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::ConditionNotMet { .. } => None,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RepeatError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConditionNotMet { rounds } => {
                write!(f, "condition not met after {} rounds", rounds)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RepeatError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConditionNotMet { .. } => None,
            Self::Inner(e) => Some(e),
        }
    }
}

//! End-to-end retry behavior across the public API.

use breakwater::combinators::{retry, retry_writer};
use breakwater::writer::WriterEffect;
use breakwater::{Effect, Log, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fails_n_times_then_succeeds(calls: Arc<AtomicU32>, failures: u32) -> Effect<u32, String> {
    Effect::new(move || {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                Err(format!("attempt {} failed", n))
            } else {
                Ok(n)
            }
        }
    })
}

#[tokio::test]
async fn retry_performs_exactly_the_budgeted_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let always_fails = fails_n_times_then_succeeds(calls.clone(), u32::MAX);

    let result = retry(always_fails, RetryPolicy::fixed(5, Duration::ZERO))
        .run()
        .await;

    assert_eq!(result, Err("attempt 4 failed".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn fails_twice_succeeds_within_three_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let effect = fails_n_times_then_succeeds(calls.clone(), 2);

    let result = retry(effect, RetryPolicy::fixed(3, Duration::ZERO))
        .run()
        .await;
    assert_eq!(result, Ok(2));
}

#[tokio::test]
async fn fails_twice_exhausts_two_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let effect = fails_n_times_then_succeeds(calls.clone(), 2);

    let result = retry(effect, RetryPolicy::fixed(2, Duration::ZERO))
        .run()
        .await;
    assert_eq!(result, Err("attempt 1 failed".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_retryable_error_stops_after_one_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let effect = fails_n_times_then_succeeds(calls.clone(), u32::MAX);

    let policy = RetryPolicy::fixed(10, Duration::ZERO).with_retry_on(|_: &String| false);
    let result = retry(effect, policy).run().await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fixed_backoff_waits_between_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let effect = fails_n_times_then_succeeds(calls.clone(), 2);

    let start = Instant::now();
    let result = retry(effect, RetryPolicy::fixed(3, Duration::from_millis(25)))
        .run()
        .await;
    assert_eq!(result, Ok(2));
    // Two retries, 25ms of backoff before each.
    assert!(start.elapsed() >= Duration::from_millis(45));
}

#[tokio::test]
async fn a_retried_effect_is_still_repeatable() {
    let calls = Arc::new(AtomicU32::new(0));
    let effect = fails_n_times_then_succeeds(calls.clone(), 1);
    let resilient = retry(effect, RetryPolicy::fixed(2, Duration::ZERO));

    assert_eq!(resilient.run().await, Ok(1));
    // A second execution re-enters the retry loop from scratch.
    assert_eq!(resilient.run().await, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_writer_returns_final_attempt_log_only() {
    let calls = Arc::new(AtomicU32::new(0));
    let effect = WriterEffect::<u32, String, String>::new(move || {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let log = Log::single(format!("attempt {}", n));
            if n < 2 {
                (Err(format!("failure {}", n)), log)
            } else {
                (Ok(n), log)
            }
        }
    });

    let (result, log) = retry_writer(effect, RetryPolicy::fixed(5, Duration::ZERO))
        .run()
        .await;
    assert_eq!(result, Ok(2));
    assert_eq!(log.entries(), &["attempt 2".to_string()]);
}

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use stepsim::{ErrorKind, RetryPolicy, ServiceError};

// Timers tick at millisecond granularity
fn assert_close(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_on_third_attempt_backs_off_exponentially() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1500));
    let calls = AtomicU32::new(0);
    let seen_at = Mutex::new(Vec::new());

    let result = policy
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            seen_at.lock().unwrap().push(Instant::now());
            async move {
                if n < 3 {
                    Err(ServiceError::rate_limited("429 quota"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    // 1. Success comes back untouched after exactly 3 invocations
    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // 2. Delay before attempt i+1 is initial * 2^(i-1)
    let times = seen_at.lock().unwrap();
    assert_close(times[1] - times[0], Duration::from_millis(1500));
    assert_close(times[2] - times[1], Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn test_first_attempt_success_has_no_delay() {
    let policy = RetryPolicy::default();
    let start = Instant::now();

    let result: Result<&str, ServiceError> = policy.run(|| async { Ok("fine") }).await;

    assert_eq!(result.unwrap(), "fine");
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_non_rate_limit_error_is_not_retried() {
    let policy = RetryPolicy::default();
    let calls = AtomicU32::new(0);

    let result: Result<(), ServiceError> = policy
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::transport("HTTP 500: backend exploded")) }
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1, "Transport errors must surface immediately");
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(err.message, "HTTP 500: backend exploded");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_error_is_not_retried() {
    let policy = RetryPolicy::default();
    let calls = AtomicU32::new(0);

    let result: Result<(), ServiceError> = policy
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::malformed("expected value at line 1")) }
        })
        .await;

    assert_eq!(result.unwrap_err().kind, ErrorKind::Malformed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_rate_limit_exhausts_retries() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1500));
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<(), ServiceError> = policy
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(ServiceError::rate_limited(format!("attempt {}", n))) }
        })
        .await;

    // retries + 1 invocations, the last error is the one propagated
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let err = result.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.message, "attempt 4");

    // 1500 + 3000 + 6000
    assert_close(start.elapsed(), Duration::from_millis(10_500));
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_means_single_attempt() {
    let policy = RetryPolicy::new(0, Duration::from_millis(1500));
    let calls = AtomicU32::new(0);

    let result: Result<(), ServiceError> = policy
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::rate_limited("429")) }
        })
        .await;

    assert!(result.unwrap_err().is_rate_limited());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_delay_schedule() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts(), 4);
    assert_eq!(policy.delay_after(1), Duration::from_millis(1500));
    assert_eq!(policy.delay_after(2), Duration::from_millis(3000));
    assert_eq!(policy.delay_after(3), Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn test_waits_follow_delay_schedule() {
    let policy = RetryPolicy::new(5, Duration::from_millis(40));
    let waits = Mutex::new(Vec::new());
    let last = Mutex::new(Instant::now());

    let _: Result<(), ServiceError> = policy
        .run(|| {
            let now = Instant::now();
            let mut prev = last.lock().unwrap();
            waits.lock().unwrap().push(now - *prev);
            *prev = now;
            async { Err(ServiceError::rate_limited("429")) }
        })
        .await;

    let waits = waits.into_inner().unwrap();
    assert_eq!(waits.len(), 6);
    for (attempt, wait) in waits.iter().enumerate().skip(1) {
        assert_close(*wait, policy.delay_after(attempt as u32));
    }
}

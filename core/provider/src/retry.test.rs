use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use super::*;

#[tokio::test]
async fn test_retry_success_first_attempt() {
    let executor = RetryExecutor::new(RetryConfig::default());
    let attempts = AtomicU32::new(0);

    let result = executor
        .execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ProviderError>(42) }
        })
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_success_after_failures() {
    let config = RetryConfig::default().with_max_attempts(5);
    let executor = RetryExecutor::new(config);
    let attempts = AtomicU32::new(0);

    let result = executor
        .execute(|| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(ProviderError::Transport("connection failed".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhausted() {
    let config = RetryConfig::default().with_max_attempts(3);
    let executor = RetryExecutor::new(config);
    let attempts = AtomicU32::new(0);

    let result: Result<i32, ProviderError> = executor
        .execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Transport("always fails".to_string())) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_fatal_error_not_retried() {
    let config = RetryConfig::default().with_max_attempts(5);
    let executor = RetryExecutor::new(config);
    let attempts = AtomicU32::new(0);

    let result: Result<i32, ProviderError> = executor
        .execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                // Auth errors are not retryable
                Err(ProviderError::AuthenticationFailed("invalid key".to_string()))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_no_retry_config() {
    let executor = RetryExecutor::new(RetryConfig::no_retry());
    let attempts = AtomicU32::new(0);

    let result: Result<i32, ProviderError> = executor
        .execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Transport("fail".to_string())) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_respects_retry_after() {
    let config = RetryConfig::default()
        .with_max_attempts(2)
        .with_base_delay_ms(10_000)
        .with_respect_retry_after(true);

    let executor = RetryExecutor::new(config);
    let attempts = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let result = executor
        .execute(|| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt == 1 {
                    // Short retry-after should be used instead of long backoff
                    Err(ProviderError::RateLimited {
                        message: "rate limited".to_string(),
                        retry_after: Some(Duration::from_millis(10)),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    let elapsed = start.elapsed();
    assert_eq!(result.unwrap(), 42);
    assert!(elapsed >= Duration::from_millis(10));
    assert!(elapsed < Duration::from_secs(1));
}

struct RecordingObserver {
    retries: Mutex<Vec<(u32, Duration)>>,
    exhausted: Mutex<Option<(u32, String)>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            retries: Mutex::new(Vec::new()),
            exhausted: Mutex::new(None),
        }
    }
}

impl RetryObserver for RecordingObserver {
    fn on_retry(&self, attempt: u32, delay: Duration, _error: &ProviderError) {
        self.retries.lock().unwrap().push((attempt, delay));
    }

    fn on_exhausted(&self, attempts: u32, error: &ProviderError) {
        *self.exhausted.lock().unwrap() = Some((attempts, error.to_string()));
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_delays_follow_backoff_schedule() {
    let observer = Arc::new(RecordingObserver::new());
    let executor = RetryExecutor::new(RetryConfig::default()).with_observer(observer.clone());

    let attempts = AtomicU32::new(0);
    let result = executor
        .execute(|| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(ProviderError::Transport("connection reset".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let retries = observer.retries.lock().unwrap();
    assert_eq!(retries.len(), 2);
    // Delay k lands within +/- 20% of 1000ms * 2^k
    for (i, (_, delay)) in retries.iter().enumerate() {
        let base = 1000.0 * 2f64.powi(i as i32);
        let ms = delay.as_secs_f64() * 1000.0;
        assert!(
            ms >= base * 0.8 - 1e-6 && ms <= base * 1.2 + 1e-6,
            "delay {i} out of bounds: {ms}ms (base {base}ms)"
        );
    }
    assert!(retries[0].1 < retries[1].1, "delays must increase");

    assert!(observer.exhausted.lock().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_retry_observer_exhausted() {
    let config = RetryConfig::default().with_max_attempts(2);
    let observer = Arc::new(RecordingObserver::new());
    let executor = RetryExecutor::new(config).with_observer(observer.clone());

    let result: Result<i32, ProviderError> = executor
        .execute(|| async { Err(ProviderError::Transport("fail".to_string())) })
        .await;

    assert!(result.is_err());
    let exhausted = observer.exhausted.lock().unwrap();
    let (attempts, message) = exhausted.as_ref().unwrap();
    assert_eq!(*attempts, 2);
    assert!(message.contains("fail"));
}

#[test]
fn test_config_builder() {
    let config = RetryConfig::default()
        .with_max_attempts(5)
        .with_base_delay_ms(200)
        .with_max_delay_ms(60_000)
        .with_multiplier(3.0)
        .with_jitter_ratio(0.1)
        .with_respect_retry_after(false);

    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.base_delay_ms, 200);
    assert_eq!(config.max_delay_ms, 60_000);
    assert_eq!(config.multiplier, 3.0);
    assert_eq!(config.jitter_ratio, 0.1);
    assert!(!config.respect_retry_after);
}

#[test]
fn test_jitter_ratio_clamped() {
    let config = RetryConfig::default().with_jitter_ratio(2.0);
    assert_eq!(config.jitter_ratio, 1.0);

    let config = RetryConfig::default().with_jitter_ratio(-0.5);
    assert_eq!(config.jitter_ratio, 0.0);
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: RetryConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.base_delay_ms, 1000);
    assert_eq!(config.max_delay_ms, 30_000);
    assert_eq!(config.multiplier, 2.0);
    assert_eq!(config.jitter_ratio, 0.2);
    assert!(config.respect_retry_after);

    let config: RetryConfig = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.base_delay_ms, 1000);
}

#[test]
fn test_backoff_base_schedule() {
    let config = RetryConfig::default();
    assert_eq!(config.backoff_base(1), Duration::from_millis(1000));
    assert_eq!(config.backoff_base(2), Duration::from_millis(2000));
    assert_eq!(config.backoff_base(3), Duration::from_millis(4000));

    let capped = RetryConfig::default().with_max_delay_ms(3000);
    assert_eq!(capped.backoff_base(3), Duration::from_millis(3000));
    assert_eq!(capped.backoff_base(10), Duration::from_millis(3000));
}

#[test]
fn test_calculate_delay_within_jitter_bounds() {
    let executor = RetryExecutor::new(RetryConfig::default());
    let error = ProviderError::Transport("reset".to_string());

    for attempt in 1..=3u32 {
        let base = 1000.0 * 2f64.powi(attempt as i32 - 1);
        for _ in 0..100 {
            let ms = executor.calculate_delay(attempt, &error).as_secs_f64() * 1000.0;
            assert!(
                ms >= base * 0.8 - 1e-6 && ms <= base * 1.2 + 1e-6,
                "attempt {attempt}: {ms}ms outside +/- 20% of {base}ms"
            );
        }
    }
}

#[test]
fn test_jitter_bands_do_not_overlap() {
    // With ratio 0.2 the +20% band of attempt n sits below the -20%
    // band of attempt n+1, so sampled delays always increase.
    let executor = RetryExecutor::new(RetryConfig::default());
    let error = ProviderError::Transport("reset".to_string());

    for attempt in 1..3u32 {
        let current_max = (0..50)
            .map(|_| executor.calculate_delay(attempt, &error))
            .max()
            .unwrap();
        let next_min = (0..50)
            .map(|_| executor.calculate_delay(attempt + 1, &error))
            .min()
            .unwrap();
        assert!(current_max < next_min);
    }
}

#[test]
fn test_calculate_delay_ignores_retry_after_when_disabled() {
    let config = RetryConfig::default().with_respect_retry_after(false);
    let executor = RetryExecutor::new(config);
    let error = ProviderError::RateLimited {
        message: "rate limited".to_string(),
        retry_after: Some(Duration::from_secs(20)),
    };

    let delay = executor.calculate_delay(1, &error);
    // Falls back to the backoff schedule instead of the 20s hint
    assert!(delay <= Duration::from_millis(1200));
}

#[test]
fn test_calculate_delay_caps_retry_after() {
    let config = RetryConfig::default().with_max_delay_ms(5000);
    let executor = RetryExecutor::new(config);
    let error = ProviderError::RateLimited {
        message: "rate limited".to_string(),
        retry_after: Some(Duration::from_secs(120)),
    };

    assert_eq!(
        executor.calculate_delay(1, &error),
        Duration::from_secs(5)
    );
}

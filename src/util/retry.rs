// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Errors that know whether a later attempt might succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Bounded exponential backoff policy.
///
/// The defaults mirror the drive provider guidance: 4 attempts, 1 second
/// initial delay, doubling after every failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: usize,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after every failed attempt
    pub backoff: f64,

    /// Optional upper bound for a single delay
    pub max_delay: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            backoff: 2.0,
            max_delay: None,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: usize, initial_delay: Duration, backoff: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff,
            max_delay: None,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay to wait after the given (zero based) failed attempt.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.min(30) as i32);
        let ceiling = self.max_delay.unwrap_or(Duration::MAX);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map(|delay| delay.min(ceiling))
            .unwrap_or(ceiling)
    }
}

/// Run `operation` until it succeeds, fails with a non-transient error, or
/// the attempt budget of `config` is spent.
///
/// The last transient error is returned as-is once attempts run out.
pub async fn retry_transient<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Debug,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if !e.is_transient() || attempt >= max_attempts {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt - 1);
                warn!(
                    "Transient error in {} (attempt {}/{}), retrying in {}ms: {:?}",
                    operation_name,
                    attempt,
                    max_attempts,
                    delay.as_millis(),
                    e
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Custom error type for testing
    #[derive(Debug, Clone)]
    struct TestError {
        message: String,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            self.message.contains("RateLimit")
        }
    }

    fn fast_config(max_attempts: usize) -> RetryConfig {
        RetryConfig::new(max_attempts, Duration::from_millis(1), 2.0)
    }

    #[test]
    fn test_default_config_matches_provider_guidance() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.backoff, 2.0);
        assert_eq!(config.max_delay, None);
    }

    #[test]
    fn test_delay_for_attempt_doubles() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_for_attempt_capped() {
        let config = RetryConfig::default().with_max_delay(Duration::from_millis(1500));
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(1500));
    }

    #[test]
    fn test_delay_for_attempt_saturates_on_huge_backoff() {
        let config = RetryConfig::new(4, Duration::from_secs(1), 1e300);
        assert_eq!(config.delay_for_attempt(1), Duration::MAX);

        let config = RetryConfig::new(4, Duration::from_secs(1), f64::INFINITY)
            .with_max_delay(Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_for_attempt_ignores_nan_backoff() {
        let config = RetryConfig::new(4, Duration::from_millis(10), f64::NAN);
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let result = retry_transient(&fast_config(3), "test_operation", || async {
            Ok::<i32, TestError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_retries() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_transient(&fast_config(4), "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(TestError {
                        message: "RateLimit exceeded".to_string(),
                    })
                } else {
                    Ok(100)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 100);
        // 2 failures + 1 success
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_non_transient_error_propagates_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_transient(&fast_config(5), "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, TestError>(TestError {
                    message: "NotFound".to_string(),
                })
            }
        })
        .await;

        assert_eq!(result.unwrap_err().message, "NotFound");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_attempts_exhausted() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_transient(&fast_config(4), "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, TestError>(TestError {
                    message: "RateLimit exceeded".to_string(),
                })
            }
        })
        .await;

        let error = result.unwrap_err();
        assert!(error.is_transient());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_zero_attempts_still_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_transient(&fast_config(0), "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, TestError>(TestError {
                    message: "RateLimit exceeded".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exponential_backoff() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let start = std::time::Instant::now();
        let config = RetryConfig::new(3, Duration::from_millis(50), 2.0);

        let result = retry_transient(&config, "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(TestError {
                        message: "RateLimit exceeded".to_string(),
                    })
                } else {
                    Ok(400)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 400);
        // 50ms + 100ms
        assert!(start.elapsed().as_millis() >= 140);
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 5000,
        }
    }
}

pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Retry a future with exponential backoff.
    pub async fn retry<F, Fut, T, E>(&self, operation_name: &str, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.retry_if(operation_name, f, |_| true).await
    }

    /// Retry a future with exponential backoff, but only for errors the
    /// predicate considers transient.
    pub async fn retry_if<F, Fut, T, E, P>(
        &self,
        operation_name: &str,
        mut f: F,
        retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !retryable(&e) {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(backoff).await;

                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        })
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32, String> = fast_policy()
            .retry("flaky", || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32, String> = fast_policy()
            .retry_if(
                "fatal",
                || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err("bad data".to_string())
                },
                |_| false,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

//! 通用重试机制模块
//!
//! 提供带指数退避的重试逻辑，数据库连接和 LLM 调用共用

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 通用重试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 最大尝试次数（包含第一次）
    pub max_attempts: u32,
    /// 初始延迟
    pub initial_delay: Duration,
    /// 最大延迟
    pub max_delay: Duration,
    /// 退避乘数
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// 只尝试一次
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// 计算第 n 次重试的延迟
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped_delay = (delay_ms as u64).min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped_delay)
    }
}

/// 通用可重试错误模式
pub const COMMON_RETRYABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection closed",
    "timed out",
    "timeout",
    "temporarily unavailable",
    "too many connections",
    "too many requests",
    "rate limit",
    "server is busy",
    "broken pipe",
    "could not connect",
    "error sending request",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
];

/// 判断错误是否可重试
pub fn is_retryable_error(error: &str) -> bool {
    let error_lower = error.to_lowercase();
    COMMON_RETRYABLE_PATTERNS
        .iter()
        .any(|pattern| error_lower.contains(pattern))
}

/// 带条件重试的异步操作执行器
///
/// 只有当 `should_retry` 返回 true 时才会重试，否则立即返回错误
pub async fn with_conditional_retry<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt + 1 >= max_attempts || !should_retry(&e) {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "Operation failed, giving up"
                    );
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts, Duration::from_millis(1), Duration::from_millis(5))
    }

    async fn retry_always<F, Fut>(config: &RetryConfig, operation: F) -> Result<i32, &'static str>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<i32, &'static str>>,
    {
        with_conditional_retry(config, "test", operation, |_| true).await
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let result: Result<i32, &str> =
            retry_always(&fast_config(3), || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let counter = AtomicU32::new(0);

        let result: Result<i32, &str> = retry_always(&fast_config(3), || {
            let count = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err("temporary error")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_all_failures() {
        let counter = AtomicU32::new(0);

        let result: Result<i32, &str> = retry_always(&fast_config(3), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err("permanent error") }
        })
        .await;

        assert_eq!(result.unwrap_err(), "permanent error");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conditional_retry_stops_on_non_retryable() {
        let counter = AtomicU32::new(0);

        let result: Result<i32, &str> = with_conditional_retry(
            &fast_config(5),
            "test",
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent error") }
            },
            |e| is_retryable_error(e),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let counter = AtomicU32::new(0);
        let config = fast_config(0);

        let _: Result<i32, &str> = retry_always(&config, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err("boom") }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new(5, Duration::from_millis(100), Duration::from_secs(5));

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("connection refused"));
        assert!(is_retryable_error("operation timed out"));
        assert!(is_retryable_error("HTTP 429 Too Many Requests"));
        assert!(is_retryable_error("503 Service Unavailable"));
        assert!(!is_retryable_error("401 Unauthorized"));
        assert!(!is_retryable_error("invalid model"));
    }
}

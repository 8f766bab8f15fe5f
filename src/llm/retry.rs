use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::client::{DynLlmClient, LlmClient};
use super::types::{LlmRequest, LlmResponse};
use crate::error::{QuestFlowError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn normalized(self) -> Self {
        let max_attempts = self.max_attempts.max(1);
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_millis(1)
        } else {
            self.backoff_base
        };
        Self {
            max_attempts,
            backoff_base,
            backoff_max: self.backoff_max.max(backoff_base),
        }
    }

    /// 优先使用后端建议的等待时间，否则指数退避
    pub fn delay_for(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        if let Some(delay) = suggested {
            return delay;
        }
        let shift = attempt.saturating_sub(1).min(31);
        let delay = self.backoff_base.saturating_mul(1_u32 << shift);
        delay.min(self.backoff_max)
    }
}

/// 包装客户端，遇到限流时等待重试
///
/// 只重试 `RateLimited`，其他错误原样返回
pub struct RetryingClient {
    inner: DynLlmClient,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: DynLlmClient, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy: policy.normalized(),
        }
    }

    pub fn wrap(inner: DynLlmClient) -> DynLlmClient {
        Arc::new(Self::new(inner, RetryPolicy::default()))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl LlmClient for RetryingClient {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let mut attempt = 1_u32;
        loop {
            match self.inner.complete(request.clone()).await {
                Err(QuestFlowError::RateLimited { retry_after })
                    if attempt < self.policy.max_attempts =>
                {
                    let delay = self.policy.delay_for(attempt, retry_after);
                    warn!(
                        model = %self.inner.model(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited; waiting before retry"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Throttled {
        failures_left: Mutex<u32>,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl LlmClient for Throttled {
        fn model(&self) -> &str {
            "throttled"
        }

        async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
            *self.calls.lock() += 1;
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(QuestFlowError::RateLimited {
                    retry_after: Some(Duration::from_secs(2)),
                });
            }
            Ok(LlmResponse::text("ok"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let inner = Arc::new(Throttled {
            failures_left: Mutex::new(2),
            calls: Mutex::new(0),
        });
        let client = RetryingClient::new(inner.clone(), RetryPolicy::default());
        let started = tokio::time::Instant::now();
        let response = client
            .complete(LlmRequest::new(None, Vec::new()))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(*inner.calls.lock(), 3);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let inner = Arc::new(Throttled {
            failures_left: Mutex::new(10),
            calls: Mutex::new(0),
        });
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let client = RetryingClient::new(inner.clone(), policy);
        let err = client
            .complete(LlmRequest::new(None, Vec::new()))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(*inner.calls.lock(), 3);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(350),
        }
        .normalized();
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(350));
        assert_eq!(
            policy.delay_for(3, Some(Duration::from_secs(1))),
            Duration::from_secs(1)
        );
    }
}

//! Retry wrapper for any provider.

use std::time::Duration;

use async_trait::async_trait;

use vocabtrainer_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo};

use crate::error::ProviderError;

const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retries transient failures with exponential backoff.
///
/// Authentication failures, unknown models and other permanent
/// [`ProviderError`]s are returned immediately. A rate-limit `retry-after`
/// replaces the current backoff delay.
pub struct RetryingProvider {
    inner: Box<dyn LlmProvider>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Box<dyn LlmProvider>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let mut retry_delay = self.base_delay;
        let mut attempt = 0;
        loop {
            let err = match self.inner.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let provider_err = err.downcast_ref::<ProviderError>();
            if provider_err.is_some_and(ProviderError::is_permanent) {
                return Err(err);
            }
            if attempt >= self.max_retries {
                tracing::warn!("{} failed after {} attempts: {err}", self.inner.name(), attempt + 1);
                return Err(err);
            }
            if let Some(ms) = provider_err.and_then(ProviderError::retry_after_ms) {
                retry_delay = Duration::from_millis(ms).min(MAX_DELAY);
            }

            attempt += 1;
            tracing::warn!(
                "{} call failed ({err}), retry {attempt}/{} in {}ms",
                self.inner.name(),
                self.max_retries,
                retry_delay.as_millis()
            );
            tokio::time::sleep(retry_delay).await;
            retry_delay = retry_delay.saturating_mul(2).min(MAX_DELAY);
        }
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        self.inner.available_models()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use vocabtrainer_core::traits::TokenUsage;

    /// Fails with the queued errors, then succeeds.
    struct Flaky {
        errors: Mutex<VecDeque<ProviderError>>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl LlmProvider for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.errors.lock().unwrap().pop_front() {
                return Err(err.into());
            }
            Ok(GenerateResponse {
                content: "ok".into(),
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn provider(errors: Vec<ProviderError>, max_retries: u32) -> (RetryingProvider, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let flaky = Flaky {
            errors: Mutex::new(errors.into()),
            calls: calls.clone(),
        };
        (
            RetryingProvider::new(Box::new(flaky), max_retries, Duration::from_millis(100)),
            calls,
        )
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "m".into(),
            prompt: "p".into(),
            system_prompt: None,
            max_tokens: 10,
            temperature: 0.0,
            json_response: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let (provider, calls) = provider(
            vec![
                ProviderError::NetworkError("reset".into()),
                ProviderError::ApiError {
                    status: 503,
                    message: "overloaded".into(),
                },
            ],
            3,
        );
        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let (provider, calls) = provider(vec![ProviderError::AuthenticationFailed("bad".into())], 3);
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("authentication"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let (provider, calls) = provider(
            (0..5).map(|_| ProviderError::Timeout(120)).collect(),
            2,
        );
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_sets_delay() {
        let (provider, _) = provider(
            vec![ProviderError::RateLimited {
                retry_after_ms: 7_000,
            }],
            1,
        );
        let start = tokio::time::Instant::now();
        provider.generate(&request()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(7_000));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_is_capped() {
        let (provider, calls) = provider(
            vec![ProviderError::RateLimited {
                retry_after_ms: u64::MAX,
            }],
            1,
        );
        let start = tokio::time::Instant::now();
        provider.generate(&request()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() <= MAX_DELAY + Duration::from_secs(1));
    }
}

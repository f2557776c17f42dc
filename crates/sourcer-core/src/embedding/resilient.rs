//! Fallback chain with retries and circuit breaking around the providers.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::EmbeddingError;
use super::provider::{Embedding, EmbeddingProvider};
use crate::config::BreakerConfig;
use crate::constants::validate_embedding_dim;
use crate::resilience::{CircuitBreaker, RetryPolicy, retry_with_backoff};

struct Guarded {
    provider: Arc<dyn EmbeddingProvider>,
    breaker: CircuitBreaker,
}

/// Wraps a primary (and optional secondary) provider with per-provider
/// circuit breakers and bounded retries. The fallback order is fixed:
/// primary, then secondary. The local provider never participates here; it
/// is only ever selected explicitly by configuration.
pub struct ResilientEmbedder {
    chain: Vec<Guarded>,
    retry: RetryPolicy,
    expected_dim: usize,
}

impl ResilientEmbedder {
    pub fn new(
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Option<Arc<dyn EmbeddingProvider>>,
        breaker_config: BreakerConfig,
        retry: RetryPolicy,
        expected_dim: usize,
    ) -> Self {
        let mut chain = vec![Guarded {
            breaker: CircuitBreaker::new(primary.name(), breaker_config),
            provider: primary,
        }];
        if let Some(secondary) = secondary {
            chain.push(Guarded {
                breaker: CircuitBreaker::new(secondary.name(), breaker_config),
                provider: secondary,
            });
        }
        Self {
            chain,
            retry,
            expected_dim,
        }
    }

    /// Per-provider breaker states, for health reporting.
    pub fn breaker_states(&self) -> Vec<(&'static str, crate::resilience::CircuitState)> {
        self.chain
            .iter()
            .map(|g| (g.breaker.name(), g.breaker.current_state()))
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for ResilientEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut last_error: Option<EmbeddingError> = None;

        for guarded in &self.chain {
            if !guarded.breaker.allow_request() {
                tracing::debug!(provider = guarded.provider.name(), "circuit open, skipping");
                last_error = Some(EmbeddingError::Unavailable {
                    message: format!("circuit open for {}", guarded.provider.name()),
                });
                continue;
            }

            let result = retry_with_backoff(&self.retry, EmbeddingError::is_retryable, || {
                guarded.provider.embed(text)
            })
            .await;

            match result {
                Ok(embedding) => {
                    validate_embedding_dim(embedding.vector.len(), self.expected_dim)?;
                    guarded.breaker.record_success();
                    return Ok(embedding);
                }
                Err(EmbeddingError::InvalidInput { reason }) => {
                    // Bad input fails identically everywhere; do not burn the
                    // fallback chain or the breaker on it.
                    return Err(EmbeddingError::InvalidInput { reason });
                }
                Err(error) => {
                    guarded.breaker.record_failure();
                    tracing::warn!(
                        provider = guarded.provider.name(),
                        error = %error,
                        "embedding provider failed, trying next"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or(EmbeddingError::Unavailable {
            message: "no embedding providers configured".to_string(),
        }))
    }

    fn dimensions(&self) -> usize {
        self.expected_dim
    }

    fn model_version(&self) -> &str {
        self.chain[0].provider.model_version()
    }

    fn name(&self) -> &'static str {
        self.chain[0].provider.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::provider::l2_normalize;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FlakyProvider {
        name: &'static str,
        dim: usize,
        fail_first: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(EmbeddingError::Unavailable {
                    message: "down".to_string(),
                });
            }
            let mut vector = vec![1.0; self.dim];
            l2_normalize(&mut vector);
            Ok(Embedding {
                vector,
                provider: self.name.to_string(),
                model_version: "m1".to_string(),
            })
        }

        fn dimensions(&self) -> usize {
            self.dim
        }

        fn model_version(&self) -> &str {
            "m1"
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn flaky(name: &'static str, dim: usize, fail_first: u32) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            name,
            dim,
            fail_first,
            calls: AtomicU32::new(0),
        })
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn falls_back_to_secondary() {
        let primary = flaky("primary", 4, u32::MAX);
        let secondary = flaky("secondary", 4, 0);
        let embedder = ResilientEmbedder::new(
            primary,
            Some(secondary),
            BreakerConfig::default(),
            fast_retry(),
            4,
        );

        let embedding = embedder.embed("hello").await.unwrap();
        assert_eq!(embedding.provider, "secondary");
    }

    #[tokio::test]
    async fn both_down_is_unavailable() {
        let embedder = ResilientEmbedder::new(
            flaky("primary", 4, u32::MAX),
            Some(flaky("secondary", 4, u32::MAX)),
            BreakerConfig::default(),
            fast_retry(),
            4,
        );
        assert!(matches!(
            embedder.embed("hello").await,
            Err(EmbeddingError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_input_does_not_fall_back() {
        struct RejectingProvider;
        #[async_trait]
        impl EmbeddingProvider for RejectingProvider {
            async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
                Err(EmbeddingError::InvalidInput {
                    reason: "too weird".to_string(),
                })
            }
            fn dimensions(&self) -> usize {
                4
            }
            fn model_version(&self) -> &str {
                "m1"
            }
            fn name(&self) -> &'static str {
                "primary"
            }
        }

        let secondary = flaky("secondary", 4, 0);
        let secondary_calls = Arc::clone(&secondary);
        let embedder = ResilientEmbedder::new(
            Arc::new(RejectingProvider),
            Some(secondary),
            BreakerConfig::default(),
            fast_retry(),
            4,
        );

        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::InvalidInput { .. })
        ));
        assert_eq!(secondary_calls.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_fatal() {
        let embedder = ResilientEmbedder::new(
            flaky("primary", 3, 0),
            None,
            BreakerConfig::default(),
            fast_retry(),
            4,
        );
        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::DimensionMismatch(_))
        ));
    }

    #[tokio::test]
    async fn breaker_opens_and_skips_provider() {
        let primary = flaky("primary", 4, u32::MAX);
        let primary_calls = Arc::clone(&primary);
        let embedder = ResilientEmbedder::new(
            primary,
            Some(flaky("secondary", 4, 0)),
            BreakerConfig {
                failure_threshold: 2,
                cooldown: Duration::from_secs(60),
            },
            fast_retry(),
            4,
        );

        for _ in 0..3 {
            let _ = embedder.embed("x").await;
        }
        let after_open = primary_calls.calls.load(Ordering::SeqCst);
        let _ = embedder.embed("x").await;
        // Circuit is open: no further calls reach the primary.
        assert_eq!(primary_calls.calls.load(Ordering::SeqCst), after_open);
    }
}

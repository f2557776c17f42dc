//! The rerank engine: deterministic cache, provider fallback, invariant
//! enforcement, order-preserving failure branch.

use std::sync::Arc;
use std::time::Duration;

use super::error::RerankError;
use super::provider::{RerankDoc, RerankProvider, RerankedItem};
use crate::cache::{Namespace, TenantCache};
use crate::config::BreakerConfig;
use crate::constants::MAX_RERANK_DOCSET;
use crate::context::TenantContext;
use crate::hashing;
use crate::resilience::CircuitBreaker;

/// Result of a rerank request.
#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub items: Vec<RerankedItem>,
    /// `false` when the fallback branch produced the ordering.
    pub applied: bool,
    /// `true` when the ordering came from the cache.
    pub cached: bool,
}

struct GuardedProvider {
    provider: Arc<dyn RerankProvider>,
    breaker: CircuitBreaker,
}

/// Orchestrates cache lookups, the provider chain, and output validation.
pub struct RerankEngine {
    providers: Vec<GuardedProvider>,
    cache: Arc<TenantCache>,
    timeout: Duration,
    weights_version: String,
}

impl RerankEngine {
    pub fn new(
        primary: Arc<dyn RerankProvider>,
        secondary: Option<Arc<dyn RerankProvider>>,
        cache: Arc<TenantCache>,
        breaker_config: BreakerConfig,
        timeout: Duration,
        weights_version: impl Into<String>,
    ) -> Self {
        let mut providers = vec![GuardedProvider {
            breaker: CircuitBreaker::new("rerank-primary", breaker_config),
            provider: primary,
        }];
        if let Some(secondary) = secondary {
            providers.push(GuardedProvider {
                breaker: CircuitBreaker::new("rerank-secondary", breaker_config),
                provider: secondary,
            });
        }
        Self {
            providers,
            cache,
            timeout,
            weights_version: weights_version.into(),
        }
    }

    /// Model version of the primary provider; part of the cache key.
    pub fn model_version(&self) -> &str {
        self.providers[0].provider.model_version()
    }

    /// `true` when every provider's breaker is closed.
    pub fn is_healthy(&self) -> bool {
        self.providers.iter().all(|g| g.breaker.is_healthy())
    }

    /// Reranks `docs`. Never fails: the worst case is the input ordering
    /// with scores derived from hybrid scores and `applied = false`.
    pub async fn rerank(
        &self,
        ctx: &TenantContext,
        jd_text: &str,
        jd_hash: &str,
        docs: &[RerankDoc],
    ) -> RerankOutcome {
        if docs.is_empty() {
            return RerankOutcome {
                items: Vec::new(),
                applied: false,
                cached: false,
            };
        }
        if docs.len() > MAX_RERANK_DOCSET {
            tracing::warn!(
                docset = docs.len(),
                cap = MAX_RERANK_DOCSET,
                "rerank docset over cap, serving fallback order"
            );
            return self.fallback(docs);
        }

        let docset_pairs: Vec<(String, String)> = docs
            .iter()
            .map(|d| (d.candidate_id.clone(), d.rationale_input.clone()))
            .collect();
        let docset_hash = hashing::docset_hash(&docset_pairs);
        let cache_suffix = hashing::rerank_cache_key(
            ctx.tenant_id(),
            jd_hash,
            &docset_hash,
            self.model_version(),
            &self.weights_version,
        );

        if let Some(items) = self
            .cache
            .get::<Vec<RerankedItem>>(Namespace::Rerank, ctx.tenant_id(), &cache_suffix)
            .await
        {
            tracing::debug!(request_id = ctx.request_id(), "rerank cache hit");
            return RerankOutcome {
                items,
                applied: true,
                cached: true,
            };
        }

        for guarded in &self.providers {
            if !guarded.breaker.allow_request() {
                tracing::debug!(
                    model = guarded.provider.model_version(),
                    "rerank circuit open, skipping provider"
                );
                continue;
            }

            let call = guarded.provider.rerank(jd_text, docs);
            let result = match tokio::time::timeout(ctx.budget(self.timeout), call).await {
                Ok(result) => result,
                Err(_) => Err(RerankError::ProviderTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
            };

            match result.and_then(|items| validate_items(items, docs)) {
                Ok(items) => {
                    guarded.breaker.record_success();
                    self.cache
                        .set(Namespace::Rerank, ctx.tenant_id(), &cache_suffix, &items)
                        .await;
                    return RerankOutcome {
                        items,
                        applied: true,
                        cached: false,
                    };
                }
                Err(error) => {
                    guarded.breaker.record_failure();
                    tracing::warn!(
                        model = guarded.provider.model_version(),
                        request_id = ctx.request_id(),
                        error = %error,
                        "rerank provider failed"
                    );
                    if !error.is_fallback_worthy() {
                        break;
                    }
                }
            }
        }

        self.fallback(docs)
    }

    /// Input-order fallback. Scores are the hybrid scores normalized to the
    /// pool maximum, so relative ordering survives in the response shape.
    fn fallback(&self, docs: &[RerankDoc]) -> RerankOutcome {
        let max = docs
            .iter()
            .map(|d| d.hybrid_score)
            .fold(f64::EPSILON, f64::max);
        let items = docs
            .iter()
            .map(|doc| RerankedItem {
                candidate_id: doc.candidate_id.clone(),
                score: (doc.hybrid_score / max).clamp(0.0, 1.0),
                reason: None,
            })
            .collect();
        RerankOutcome {
            items,
            applied: false,
            cached: false,
        }
    }
}

/// Enforces the output invariants: a permutation of the input ids (each
/// exactly once) with scores clamped into `[0, 1]`. A violation lands in the
/// parse-failure branch, never in the cache.
fn validate_items(
    mut items: Vec<RerankedItem>,
    docs: &[RerankDoc],
) -> Result<Vec<RerankedItem>, RerankError> {
    if items.len() != docs.len() {
        return Err(RerankError::ParseFailure {
            reason: format!("expected {} items, got {}", docs.len(), items.len()),
        });
    }

    let mut expected: std::collections::HashSet<&str> =
        docs.iter().map(|d| d.candidate_id.as_str()).collect();
    for item in &items {
        if !expected.remove(item.candidate_id.as_str()) {
            return Err(RerankError::ParseFailure {
                reason: format!("unknown or duplicate candidate id {}", item.candidate_id),
            });
        }
    }

    for item in &mut items {
        if item.score.is_nan() {
            return Err(RerankError::ParseFailure {
                reason: format!("NaN score for {}", item.candidate_id),
            });
        }
        item.score = item.score.clamp(0.0, 1.0);
    }
    Ok(items)
}

impl std::fmt::Debug for RerankEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankEngine")
            .field("providers", &self.providers.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, TenantCache};
    use crate::config::CacheTtls;
    use crate::rerank::provider::MockRerankProvider;
    use std::sync::atomic::Ordering;

    fn docs(n: usize) -> Vec<RerankDoc> {
        (0..n)
            .map(|i| RerankDoc {
                candidate_id: format!("c{i}"),
                rationale_input: format!("title {i}"),
                hybrid_score: 1.0 - i as f64 * 0.1,
            })
            .collect()
    }

    fn engine_with(
        primary: Arc<MockRerankProvider>,
        secondary: Option<Arc<MockRerankProvider>>,
    ) -> RerankEngine {
        let cache = Arc::new(TenantCache::new(
            Arc::new(MemoryCache::default()),
            CacheTtls::default(),
            4096,
        ));
        RerankEngine::new(
            primary,
            secondary.map(|s| s as Arc<dyn RerankProvider>),
            cache,
            BreakerConfig::default(),
            Duration::from_millis(200),
            "wv-test",
        )
    }

    #[tokio::test]
    async fn success_is_cached_and_deterministic() {
        let primary = Arc::new(MockRerankProvider::new("m1"));
        let engine = engine_with(Arc::clone(&primary), None);
        let ctx = TenantContext::new("t1");
        let pool = docs(3);

        let first = engine.rerank(&ctx, "jd", "jdhash", &pool).await;
        assert!(first.applied);
        assert!(!first.cached);
        assert_eq!(first.items.len(), 3);

        let second = engine.rerank(&ctx, "jd", "jdhash", &pool).await;
        assert!(second.cached);
        assert_eq!(second.items, first.items);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_secondary_provider() {
        let primary = Arc::new(MockRerankProvider::new("m1"));
        primary.fail_with(Some(|| RerankError::Upstream {
            message: "500".to_string(),
        }));
        let secondary = Arc::new(MockRerankProvider::new("m2"));
        let engine = engine_with(Arc::clone(&primary), Some(Arc::clone(&secondary)));

        let outcome = engine.rerank(&TenantContext::new("t1"), "jd", "h", &docs(2)).await;
        assert!(outcome.applied);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn total_failure_preserves_input_order() {
        let primary = Arc::new(MockRerankProvider::new("m1"));
        primary.fail_with(Some(|| RerankError::ParseFailure {
            reason: "garbage".to_string(),
        }));
        let engine = engine_with(Arc::clone(&primary), None);

        let pool = docs(3);
        let outcome = engine.rerank(&TenantContext::new("t1"), "jd", "h", &pool).await;
        assert!(!outcome.applied);
        let ids: Vec<&str> = outcome.items.iter().map(|i| i.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2"]);
        // Top hybrid score normalizes to 1.0.
        assert!((outcome.items[0].score - 1.0).abs() < 1e-9);

        // Parse failures never write the cache: a retry calls the provider
        // again.
        let _ = engine.rerank(&TenantContext::new("t1"), "jd", "h", &pool).await;
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn validation_rejects_missing_and_duplicate_ids() {
        let pool = docs(2);
        let missing = vec![RerankedItem {
            candidate_id: "c0".to_string(),
            score: 0.9,
            reason: None,
        }];
        assert!(validate_items(missing, &pool).is_err());

        let duplicated = vec![
            RerankedItem {
                candidate_id: "c0".to_string(),
                score: 0.9,
                reason: None,
            },
            RerankedItem {
                candidate_id: "c0".to_string(),
                score: 0.8,
                reason: None,
            },
        ];
        assert!(validate_items(duplicated, &pool).is_err());
    }

    #[tokio::test]
    async fn validation_clamps_scores() {
        let pool = docs(2);
        let wild = vec![
            RerankedItem {
                candidate_id: "c1".to_string(),
                score: 3.5,
                reason: None,
            },
            RerankedItem {
                candidate_id: "c0".to_string(),
                score: -1.0,
                reason: None,
            },
        ];
        let validated = validate_items(wild, &pool).unwrap();
        assert_eq!(validated[0].score, 1.0);
        assert_eq!(validated[1].score, 0.0);
    }

    #[tokio::test]
    async fn empty_docset_short_circuits() {
        let primary = Arc::new(MockRerankProvider::new("m1"));
        let engine = engine_with(Arc::clone(&primary), None);
        let outcome = engine.rerank(&TenantContext::new("t1"), "jd", "h", &[]).await;
        assert!(outcome.items.is_empty());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weights_version_changes_cache_key() {
        let primary = Arc::new(MockRerankProvider::new("m1"));
        let cache = Arc::new(TenantCache::new(
            Arc::new(MemoryCache::default()),
            CacheTtls::default(),
            4096,
        ));
        let engine_a = RerankEngine::new(
            Arc::clone(&primary) as Arc<dyn RerankProvider>,
            None,
            Arc::clone(&cache),
            BreakerConfig::default(),
            Duration::from_millis(200),
            "wv-1",
        );
        let engine_b = RerankEngine::new(
            Arc::clone(&primary) as Arc<dyn RerankProvider>,
            None,
            cache,
            BreakerConfig::default(),
            Duration::from_millis(200),
            "wv-2",
        );

        let ctx = TenantContext::new("t1");
        let pool = docs(2);
        let _ = engine_a.rerank(&ctx, "jd", "h", &pool).await;
        let _ = engine_b.rerank(&ctx, "jd", "h", &pool).await;
        // Different weights versions miss each other's cache entries.
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }
}

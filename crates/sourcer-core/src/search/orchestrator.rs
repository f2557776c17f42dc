//! Pipeline orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use super::error::SearchError;
use super::types::{
    CandidateMatch, HybridSearchRequest, MlTrajectoryStatus, PipelineMetrics, SearchMeta,
    SearchResponse,
};
use crate::cache::{Namespace, TenantCache};
use crate::config::{Config, StageBudgets};
use crate::constants::{ENGINE_VERSION, MAX_RESULT_LIMIT, STAGE2_KEEP, STAGE3_KEEP};
use crate::context::TenantContext;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::hashing;
use crate::rerank::{RerankDoc, RerankEngine};
use crate::scoring::{
    self, JdFeatures, ScoredCandidate, SignalWeights, build_rationale, compare_scored,
    score_candidate,
};
use crate::store::{CandidateDocument, RecallLimits, VectorStore};
use crate::trajectory::{
    ShadowComparisonRecord, ShadowRecorder, TrajectoryApi, TrajectoryPrediction,
};

/// Shared dependencies, cheap to clone per request.
#[derive(Clone)]
pub struct SearchDeps {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// `None` when Stage 3 is disabled by configuration.
    pub rerank: Option<Arc<RerankEngine>>,
    /// `None` when ML trajectory is disabled.
    pub ml: Option<Arc<dyn TrajectoryApi>>,
    pub shadow: Arc<ShadowRecorder>,
    pub cache: Arc<TenantCache>,
}

/// Pipeline knobs, resolved once from [`Config`].
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub weights_version: String,
    pub cache_purge: bool,
    pub budgets: StageBudgets,
    pub per_method_limit: usize,
    pub shadow_enabled: bool,
    pub manager_keywords_override: Option<String>,
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            weights_version: config.weights_version.clone(),
            cache_purge: config.search_cache_purge,
            budgets: config.stage_budgets,
            per_method_limit: crate::constants::DEFAULT_PER_METHOD_LIMIT,
            shadow_enabled: config.shadow_mode_enabled,
            manager_keywords_override: config.role_type_manager_keywords.clone(),
        }
    }
}

/// Runs the three-stage pipeline.
pub struct SearchOrchestrator {
    deps: SearchDeps,
    settings: SearchSettings,
}

impl SearchOrchestrator {
    pub fn new(deps: SearchDeps, settings: SearchSettings) -> Self {
        Self { deps, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<TenantCache> {
        &self.deps.cache
    }

    /// Executes a hybrid search for `ctx`.
    #[tracing::instrument(
        skip(self, ctx, request),
        fields(
            tenant_id = ctx.tenant_id(),
            request_id = ctx.request_id(),
            cross_tenant_access = ctx.is_cross_tenant(),
        )
    )]
    pub async fn search(
        &self,
        ctx: &TenantContext,
        request: &HybridSearchRequest,
    ) -> Result<SearchResponse, SearchError> {
        let jd_text = request.jd_text.trim();
        if jd_text.is_empty() {
            return Err(SearchError::BadInput {
                reason: "jdText must contain non-whitespace characters".to_string(),
            });
        }
        let limit = request.effective_limit();
        if limit == 0 || limit > MAX_RESULT_LIMIT {
            return Err(SearchError::BadInput {
                reason: format!("limit must be between 1 and {MAX_RESULT_LIMIT}"),
            });
        }

        let jd_hash = hashing::job_fingerprint(jd_text);
        let filters = request.store_filters();
        // Filtered requests get their own cache entries; the unfiltered key
        // keeps the documented shape.
        let hybrid_suffix = if filters.is_empty() {
            format!("{jd_hash}:{}", self.settings.weights_version)
        } else {
            let filter_hash = hashing::docset_hash(&[
                ("locations".to_string(), filters.locations.join(",")),
                ("seniority".to_string(), filters.seniority.join(",")),
            ]);
            format!("{jd_hash}:{}:{filter_hash}", self.settings.weights_version)
        };

        if !self.settings.cache_purge
            && let Some(mut cached) = self
                .deps
                .cache
                .get::<SearchResponse>(Namespace::Hybrid, ctx.tenant_id(), &hybrid_suffix)
                .await
        {
            tracing::debug!("hybrid cache hit");
            metrics::counter!("search_cache_hits_total").increment(1);
            cached.meta.cache_hit = true;
            cached.results.truncate(limit);
            return Ok(cached);
        }

        // Stage 1: retrieval.
        let stage1_start = Instant::now();
        let query_vector = self.query_embedding(ctx, jd_text, &jd_hash).await?;

        let limits = RecallLimits {
            per_method_limit: self.settings.per_method_limit,
        };
        let recall = tokio::time::timeout(
            ctx.budget(self.settings.budgets.recall),
            self.deps.store.hybrid_search(
                ctx.tenant_id(),
                query_vector.as_deref(),
                jd_text,
                limits,
                &filters,
            ),
        )
        .await
        .map_err(|_| SearchError::Timeout { stage: "recall" })?
        .map_err(|e| SearchError::ServiceUnavailable {
            message: e.to_string(),
        })?;

        let mut degraded = recall.degraded();
        let mut documents = recall.documents;
        // The store already applies the tenant predicate; this is the
        // belt-and-suspenders drop for anything that slipped through.
        if !ctx.is_cross_tenant() {
            documents.retain(|d| d.tenant_id == ctx.tenant_id());
        }
        let stage1_count = documents.len();
        let stage1_ms = stage1_start.elapsed().as_millis() as u64;
        tracing::info!(
            stage1_count,
            degraded,
            cross_tenant_access = ctx.is_cross_tenant(),
            "stage 1 recall complete"
        );

        // Stage 2: signal scoring.
        let stage2_start = Instant::now();
        let jd_features = JdFeatures::extract(
            jd_text,
            self.settings.manager_keywords_override.as_deref(),
        );
        let weights = SignalWeights::for_role(jd_features.role_type);
        let now = Utc::now();

        let mut scored: Vec<ScoredCandidate> = documents
            .into_iter()
            .map(|document| {
                let scores = score_candidate(&document, &jd_features, &weights, now);
                ScoredCandidate { document, scores }
            })
            .collect();
        scored.sort_by(compare_scored);
        scored.truncate(STAGE2_KEEP);
        let stage2_count = scored.len();

        let (ml_status, ml_predictions) = self.shadow_predictions(ctx, &scored).await;
        let stage2_ms = stage2_start.elapsed().as_millis() as u64;

        // Stage 3: rerank.
        let stage3_start = Instant::now();
        let mut rerank_applied = false;
        let mut stage3_count = 0;
        let mut llm_reasons: HashMap<String, String> = HashMap::new();

        if ctx.expired() {
            tracing::warn!("deadline exhausted before rerank, serving stage-2 order");
            degraded = true;
        } else if let Some(engine) = &self.deps.rerank {
            let head_len = scored.len().min(STAGE3_KEEP);
            if head_len > 0 {
                let docs: Vec<RerankDoc> = scored[..head_len]
                    .iter()
                    .map(|s| RerankDoc {
                        candidate_id: s.document.candidate_id.clone(),
                        rationale_input: rationale_input(&s.document),
                        hybrid_score: s.document.hybrid_score,
                    })
                    .collect();

                let outcome = engine.rerank(ctx, jd_text, &jd_hash, &docs).await;
                if outcome.applied {
                    rerank_applied = true;
                    stage3_count = head_len.min(limit);
                    let order: HashMap<String, f64> = outcome
                        .items
                        .iter()
                        .map(|i| (i.candidate_id.clone(), i.score))
                        .collect();
                    for item in outcome.items {
                        if let Some(reason) = item.reason {
                            llm_reasons.insert(item.candidate_id, reason);
                        }
                    }
                    let mut head: Vec<ScoredCandidate> = scored.drain(..head_len).collect();
                    head.sort_by(|a, b| {
                        let score_a = order.get(&a.document.candidate_id).copied().unwrap_or(0.0);
                        let score_b = order.get(&b.document.candidate_id).copied().unwrap_or(0.0);
                        score_b
                            .total_cmp(&score_a)
                            .then_with(|| a.document.candidate_id.cmp(&b.document.candidate_id))
                    });
                    head.extend(scored.drain(..));
                    scored = head;
                }
            }
        }
        let stage3_ms = stage3_start.elapsed().as_millis() as u64;

        // Assemble.
        let results_full: Vec<CandidateMatch> = scored
            .iter()
            .take(MAX_RESULT_LIMIT)
            .map(|candidate| {
                let id = &candidate.document.candidate_id;
                let mut rationale = build_rationale(
                    candidate,
                    &jd_features,
                    &weights,
                    llm_reasons.get(id).cloned(),
                );
                if !request.include_debug {
                    rationale.breakdown = None;
                }
                CandidateMatch {
                    candidate_id: id.clone(),
                    overall: candidate.scores.overall,
                    signal_scores: candidate.scores,
                    rationale,
                    ml_trajectory: ml_predictions.get(id).cloned(),
                }
            })
            .collect();

        let response = SearchResponse {
            results: results_full,
            meta: SearchMeta {
                engine_version: ENGINE_VERSION.to_string(),
                weights_version: self.settings.weights_version.clone(),
                rerank_applied,
                degraded,
                cache_hit: false,
                ml_trajectory: ml_status,
                pipeline_metrics: PipelineMetrics {
                    stage1_count,
                    stage2_count,
                    stage3_count,
                    stage1_ms,
                    stage2_ms,
                    stage3_ms,
                },
            },
        };

        // Writes happen even under cachePurge; only reads are disabled.
        self.deps
            .cache
            .set(Namespace::Hybrid, ctx.tenant_id(), &hybrid_suffix, &response)
            .await;

        metrics::counter!("searches_total").increment(1);
        metrics::histogram!("search_stage1_ms").record(stage1_ms as f64);
        metrics::histogram!("search_stage2_ms").record(stage2_ms as f64);
        metrics::histogram!("search_stage3_ms").record(stage3_ms as f64);

        let mut out = response;
        out.results.truncate(limit);
        Ok(out)
    }

    /// Query embedding with a read-through cache keyed by JD fingerprint and
    /// model version.
    async fn query_embedding(
        &self,
        ctx: &TenantContext,
        jd_text: &str,
        jd_hash: &str,
    ) -> Result<Option<Vec<f32>>, SearchError> {
        let suffix = format!("{jd_hash}:{}", self.deps.embedder.model_version());
        if let Some(vector) = self
            .deps
            .cache
            .get::<Vec<f32>>(Namespace::Embed, ctx.tenant_id(), &suffix)
            .await
        {
            return Ok(Some(vector));
        }

        let budget = ctx.budget(self.settings.budgets.embed);
        match tokio::time::timeout(budget, self.deps.embedder.embed(jd_text)).await {
            Ok(Ok(embedding)) => {
                self.deps
                    .cache
                    .set(Namespace::Embed, ctx.tenant_id(), &suffix, &embedding.vector)
                    .await;
                Ok(Some(embedding.vector))
            }
            Ok(Err(EmbeddingError::InvalidInput { reason })) => {
                Err(SearchError::BadInput { reason })
            }
            Ok(Err(error)) => Err(SearchError::ServiceUnavailable {
                message: format!("query embedding unavailable: {error}"),
            }),
            Err(_) => Err(SearchError::ServiceUnavailable {
                message: "query embedding timed out".to_string(),
            }),
        }
    }

    /// Shadow-mode ML predictions for the rerank head. Never fails the
    /// request; ranking is already fixed by the time these arrive.
    async fn shadow_predictions(
        &self,
        ctx: &TenantContext,
        scored: &[ScoredCandidate],
    ) -> (MlTrajectoryStatus, HashMap<String, TrajectoryPrediction>) {
        let Some(ml) = &self.deps.ml else {
            return (MlTrajectoryStatus::Disabled, HashMap::new());
        };

        let top_ids: Vec<String> = scored
            .iter()
            .take(STAGE3_KEEP)
            .map(|s| s.document.candidate_id.clone())
            .collect();

        let budget = ctx.budget(self.settings.budgets.ml);
        let predictions = match tokio::time::timeout(budget, ml.predict(ctx, &top_ids)).await {
            Ok(Ok(predictions)) => predictions,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "ML trajectory unavailable");
                return (MlTrajectoryStatus::Unavailable, HashMap::new());
            }
            Err(_) => {
                tracing::warn!(
                    budget_ms = budget.as_millis() as u64,
                    "ML trajectory timed out"
                );
                return (MlTrajectoryStatus::Unavailable, HashMap::new());
            }
        };

        if self.settings.shadow_enabled {
            let now = Utc::now();
            for candidate in scored.iter().take(STAGE3_KEEP) {
                let fields = &candidate.document.fields;
                let Some(rule) = scoring::trajectory::classify(
                    &fields.title_history,
                    &fields.stint_months,
                ) else {
                    continue;
                };
                let Some(prediction) = predictions.get(&candidate.document.candidate_id) else {
                    continue;
                };
                self.deps.shadow.record(ShadowComparisonRecord::compare(
                    &candidate.document.candidate_id,
                    fields.current_title.as_deref(),
                    prediction.clone(),
                    rule,
                    now,
                ));
            }
        }

        (MlTrajectoryStatus::Healthy, predictions)
    }
}

/// Minimal rationale input for the rerank prompt: title, skills, and a
/// summary fragment. Kept short to bound prompt size for a 50-doc set.
fn rationale_input(document: &CandidateDocument) -> String {
    let fields = &document.fields;
    let title = fields.current_title.as_deref().unwrap_or("unknown title");
    let skills = if fields.skills.is_empty() {
        "none listed".to_string()
    } else {
        fields.skills.join(", ")
    };
    let summary: String = fields.search_text.chars().take(160).collect();
    format!("{title} | skills: {skills} | {summary}")
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("weights_version", &self.settings.weights_version)
            .finish()
    }
}

//! Rerank service handler.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use sourcer::constants::MAX_RERANK_DOCSET;
use sourcer::hashing;
use sourcer::rerank::{RerankDoc, RerankedItem};

use super::error::GatewayError;
use super::state::RerankState;
use super::tenant::tenant_context;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankBody {
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub jd_text: String,
    pub docset: Vec<DocsetItem>,
    /// Model override is not honored per-request; the engine's configured
    /// chain decides. Present for wire compatibility.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsetItem {
    pub candidate_id: String,
    pub rationale_input: String,
    #[serde(default)]
    pub hybrid_score: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankResponse {
    pub results: Vec<RerankedItem>,
    pub rerank_applied: bool,
    pub cached: bool,
}

pub async fn rerank_handler(
    State(state): State<RerankState>,
    headers: HeaderMap,
    Json(body): Json<RerankBody>,
) -> Result<Json<RerankResponse>, GatewayError> {
    let config = &state.shared.config;
    let ctx = tenant_context(
        &headers,
        &config.headers,
        config.cross_tenant_identity.as_deref(),
    )?;
    if let Some(body_tenant) = &body.tenant_id
        && !ctx.is_cross_tenant()
        && body_tenant != ctx.tenant_id()
    {
        return Err(GatewayError::Forbidden);
    }

    state.shared.limiter.admit(ctx.tenant_id())?;

    let engine = state
        .engine
        .get()
        .ok_or_else(|| GatewayError::ServiceUnavailable("initializing".to_string()))?;

    let jd_text = body.jd_text.trim();
    if jd_text.is_empty() {
        return Err(GatewayError::BadInput("jdText is required".to_string()));
    }
    if body.docset.is_empty() {
        return Err(GatewayError::BadInput("docset is empty".to_string()));
    }
    if body.docset.len() > MAX_RERANK_DOCSET {
        return Err(GatewayError::BadInput(format!(
            "docset exceeds the {MAX_RERANK_DOCSET}-candidate cap"
        )));
    }
    if let Some(model) = &body.model {
        tracing::debug!(model = %model, "per-request model override ignored");
    }

    let docs: Vec<RerankDoc> = body
        .docset
        .into_iter()
        .map(|item| RerankDoc {
            candidate_id: item.candidate_id,
            rationale_input: item.rationale_input,
            hybrid_score: item.hybrid_score,
        })
        .collect();

    let jd_hash = hashing::job_fingerprint(jd_text);
    let outcome = engine.rerank(&ctx, jd_text, &jd_hash, &docs).await;

    metrics::counter!("reranks_total", "applied" => outcome.applied.to_string()).increment(1);

    Ok(Json(RerankResponse {
        results: outcome.items,
        rerank_applied: outcome.applied,
        cached: outcome.cached,
    }))
}

//! Search service handler.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;

use sourcer::search::{HybridSearchRequest, SearchResponse};

use super::error::GatewayError;
use super::state::SearchState;
use super::tenant::tenant_context;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(flatten)]
    pub request: HybridSearchRequest,
}

pub async fn hybrid_handler(
    State(state): State<SearchState>,
    headers: HeaderMap,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, GatewayError> {
    let config = &state.shared.config;
    let ctx = tenant_context(
        &headers,
        &config.headers,
        config.cross_tenant_identity.as_deref(),
    )?;

    // The validated header is the tenant of record; a mismatching body
    // tenant is an attempted cross-tenant read.
    if let Some(body_tenant) = &body.tenant_id
        && !ctx.is_cross_tenant()
        && body_tenant != ctx.tenant_id()
    {
        return Err(GatewayError::Forbidden);
    }

    state.shared.limiter.admit(ctx.tenant_id())?;

    let orchestrator = state
        .orchestrator
        .get()
        .ok_or_else(|| GatewayError::ServiceUnavailable("initializing".to_string()))?;

    let budgets = &config.stage_budgets;
    let deadline = budgets.embed + budgets.recall + budgets.scoring + budgets.rerank + budgets.ml
        + std::time::Duration::from_millis(200);
    let ctx = ctx.with_deadline(deadline);

    let response = orchestrator.search(&ctx, &body.request).await?;
    Ok(Json(response))
}

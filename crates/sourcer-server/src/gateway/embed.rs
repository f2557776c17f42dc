//! Embed service handlers: profile ingestion and query embedding.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use sourcer::profile::{CandidateProfile, SearchableProfile};
use sourcer::store::{CHUNK_TYPE_PROFILE, DocumentFields, EmbeddingRecord};

use super::error::GatewayError;
use super::state::EmbedState;
use super::tenant::tenant_context;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub entity_id: String,
    #[serde(default)]
    pub chunk_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub profile: Option<CandidateProfile>,
    #[serde(default)]
    pub metadata: Option<UpsertMetadata>,
}

/// Request-level metadata the caller may attach alongside the profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMetadata {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub analysis_confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponse {
    pub entity_id: String,
    pub model_version: String,
    pub provider: String,
    pub dim: usize,
    pub skipped: bool,
}

pub async fn upsert_handler(
    State(state): State<EmbedState>,
    headers: HeaderMap,
    Json(body): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, GatewayError> {
    let config = &state.shared.config;
    let ctx = tenant_context(
        &headers,
        &config.headers,
        config.cross_tenant_identity.as_deref(),
    )?;
    if ctx.is_cross_tenant() {
        // The bypass identity is read-only.
        return Err(GatewayError::Forbidden);
    }
    if let Some(body_tenant) = &body.tenant_id
        && body_tenant != ctx.tenant_id()
    {
        return Err(GatewayError::Forbidden);
    }

    let deps = state
        .deps
        .get()
        .ok_or_else(|| GatewayError::ServiceUnavailable("initializing".to_string()))?;

    if body.entity_id.trim().is_empty() {
        return Err(GatewayError::BadInput("entityId is required".to_string()));
    }

    let (searchable, mut fields) = match (&body.profile, &body.text) {
        (Some(profile), _) => {
            let searchable = SearchableProfile::from_profile(profile);
            if searchable.is_empty() {
                return Err(GatewayError::Unprocessable(
                    "profile has no serializable content".to_string(),
                ));
            }
            let fields = DocumentFields::from_profile(profile, searchable.text());
            (searchable, fields)
        }
        (None, Some(text)) => {
            let searchable = SearchableProfile::from_text(text.clone());
            if searchable.is_empty() {
                return Err(GatewayError::BadInput("text is empty".to_string()));
            }
            let fields = DocumentFields {
                search_text: searchable.text().to_string(),
                ..DocumentFields::default()
            };
            (searchable, fields)
        }
        (None, None) => {
            return Err(GatewayError::BadInput(
                "either text or profile is required".to_string(),
            ));
        }
    };

    if let Some(metadata) = &body.metadata {
        fields.location = metadata.location.clone().or(fields.location);
        fields.analysis_confidence = metadata.analysis_confidence.or(fields.analysis_confidence);
    }

    let chunk_type = body
        .chunk_type
        .clone()
        .unwrap_or_else(|| CHUNK_TYPE_PROFILE.to_string());

    let stored_hash = deps
        .store
        .get_text_hash(ctx.tenant_id(), &body.entity_id, &chunk_type)
        .await?;
    if stored_hash.as_deref() == Some(searchable.text_hash()) {
        tracing::debug!(
            tenant_id = ctx.tenant_id(),
            entity_id = %body.entity_id,
            "text unchanged, skipping re-embed"
        );
        return Ok(Json(UpsertResponse {
            entity_id: body.entity_id,
            model_version: deps.embedder.model_version().to_string(),
            provider: deps.embedder.name().to_string(),
            dim: deps.embedder.dimensions(),
            skipped: true,
        }));
    }

    let embedding = deps.embedder.embed(searchable.text()).await?;
    let dim = embedding.vector.len();

    let record = EmbeddingRecord {
        tenant_id: ctx.tenant_id().to_string(),
        entity_id: body.entity_id.clone(),
        chunk_type,
        vector: embedding.vector,
        model_version: embedding.model_version.clone(),
        provider: embedding.provider.clone(),
        text_hash: searchable.text_hash().to_string(),
        metadata: fields,
    };
    deps.store.upsert(&record).await?;

    metrics::counter!("embed_upserts_total").increment(1);
    tracing::info!(
        tenant_id = ctx.tenant_id(),
        request_id = ctx.request_id(),
        entity_id = %body.entity_id,
        provider = %embedding.provider,
        "embedding upserted"
    );

    Ok(Json(UpsertResponse {
        entity_id: body.entity_id,
        model_version: embedding.model_version,
        provider: embedding.provider,
        dim,
        skipped: false,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub vector: Vec<f32>,
    pub provider: String,
    pub model_version: String,
}

pub async fn query_handler(
    State(state): State<EmbedState>,
    headers: HeaderMap,
    Json(body): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, GatewayError> {
    let config = &state.shared.config;
    let ctx = tenant_context(
        &headers,
        &config.headers,
        config.cross_tenant_identity.as_deref(),
    )?;

    let deps = state
        .deps
        .get()
        .ok_or_else(|| GatewayError::ServiceUnavailable("initializing".to_string()))?;

    if body.text.trim().is_empty() {
        return Err(GatewayError::BadInput("text is required".to_string()));
    }

    let embedding = deps.embedder.embed(&body.text).await?;
    tracing::debug!(
        tenant_id = ctx.tenant_id(),
        request_id = ctx.request_id(),
        "query embedded"
    );

    Ok(Json(QueryResponse {
        vector: embedding.vector,
        provider: embedding.provider,
        model_version: embedding.model_version,
    }))
}

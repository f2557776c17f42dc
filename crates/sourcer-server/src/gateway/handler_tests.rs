//! Router-level tests over mock backends.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use sourcer::cache::{MemoryCache, TenantCache};
use sourcer::config::{BreakerConfig, CacheTtls, Config};
use sourcer::embedding::{EmbeddingProvider, LocalEmbedder};
use sourcer::readiness::{DependencyStatus, Readiness};
use sourcer::rerank::{MockRerankProvider, RerankEngine, RerankProvider};
use sourcer::search::{SearchDeps, SearchOrchestrator, SearchSettings};
use sourcer::store::{
    CHUNK_TYPE_PROFILE, DocumentFields, EmbeddingRecord, MockVectorStore, VectorStore,
};
use sourcer::trajectory::ShadowRecorder;

use super::state::{EmbedDeps, EmbedState, RerankState, SearchState, Shared};
use super::tenant::TenantRateLimiter;
use super::{embed_router, rerank_router, search_router};

const DIM: usize = 8;

fn shared(readiness: Arc<Readiness>, rps: u32, burst: u32) -> Arc<Shared> {
    Shared::new(
        Arc::new(Config::default()),
        readiness,
        None,
        Arc::new(TenantRateLimiter::new(rps, burst)),
    )
}

fn ready(deps: &[&'static str]) -> Arc<Readiness> {
    let readiness = Readiness::new(deps);
    for dep in deps {
        readiness.set(*dep, DependencyStatus::Ok);
    }
    readiness
}

fn cache() -> Arc<TenantCache> {
    Arc::new(TenantCache::new(
        Arc::new(MemoryCache::default()),
        CacheTtls::default(),
        4096,
    ))
}

fn embed_app() -> (Router, Arc<MockVectorStore>) {
    let store = Arc::new(MockVectorStore::new(DIM));
    let state = EmbedState::new(shared(ready(&["store", "embedder"]), 100, 100));
    state
        .deps
        .set(EmbedDeps {
            store: Arc::clone(&store) as Arc<dyn VectorStore>,
            embedder: Arc::new(LocalEmbedder::new(DIM, 4096)),
        })
        .ok()
        .unwrap();
    (embed_router(state), store)
}

async fn seed_candidate(store: &MockVectorStore, id: &str, text: &str) {
    let embedder = LocalEmbedder::new(DIM, 4096);
    let embedding = embedder.embed(text).await.unwrap();
    store
        .upsert(&EmbeddingRecord {
            tenant_id: "t1".to_string(),
            entity_id: id.to_string(),
            chunk_type: CHUNK_TYPE_PROFILE.to_string(),
            vector: embedding.vector,
            model_version: embedding.model_version,
            provider: embedding.provider,
            text_hash: sourcer::hashing::text_hash(text),
            metadata: DocumentFields {
                current_title: Some("Senior Go Engineer".to_string()),
                skills: vec!["go".to_string()],
                search_text: text.to_string(),
                ..DocumentFields::default()
            },
        })
        .await
        .unwrap();
}

fn search_app_with(store: Arc<MockVectorStore>, rps: u32, burst: u32) -> Router {
    let state = SearchState::new(shared(ready(&["store", "cache", "embedder"]), rps, burst));
    let rerank_provider = Arc::new(MockRerankProvider::new("m1")) as Arc<dyn RerankProvider>;
    let shared_cache = cache();
    let engine = Arc::new(RerankEngine::new(
        rerank_provider,
        None,
        Arc::clone(&shared_cache),
        BreakerConfig::default(),
        Duration::from_millis(200),
        "wv-test",
    ));
    let deps = SearchDeps {
        store: store as Arc<dyn VectorStore>,
        embedder: Arc::new(LocalEmbedder::new(DIM, 4096)),
        rerank: Some(engine),
        ml: None,
        shadow: Arc::new(ShadowRecorder::default()),
        cache: shared_cache,
    };
    let settings = SearchSettings {
        weights_version: "wv-test".to_string(),
        cache_purge: false,
        budgets: Default::default(),
        per_method_limit: 300,
        shadow_enabled: false,
        manager_keywords_override: None,
    };
    state
        .orchestrator
        .set(Arc::new(SearchOrchestrator::new(deps, settings)))
        .ok()
        .unwrap();
    search_router(state)
}

fn rerank_app() -> Router {
    let state = RerankState::new(shared(ready(&["cache"]), 100, 100));
    let provider = Arc::new(MockRerankProvider::new("m1")) as Arc<dyn RerankProvider>;
    let engine = Arc::new(RerankEngine::new(
        provider,
        None,
        cache(),
        BreakerConfig::default(),
        Duration::from_millis(200),
        "wv-test",
    ));
    state.engine.set(engine).ok().unwrap();
    rerank_router(state)
}

fn post(uri: &str, tenant: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant-id", tenant);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn ready_gates_on_initialization() {
    let readiness = Readiness::new(&["store"]);
    let state = EmbedState::new(shared(Arc::clone(&readiness), 100, 100));
    let app = embed_router(state);

    let response = app
        .clone()
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "initializing");

    readiness.set("store", DependencyStatus::Ok);
    let response = app
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_dependency_map() {
    let readiness = Readiness::new(&["store", "embedder"]);
    readiness.set("store", DependencyStatus::Ok);
    readiness.set(
        "embedder",
        DependencyStatus::Degraded {
            reason: "probe failed".to_string(),
        },
    );
    let state = EmbedState::new(shared(readiness, 100, 100));
    let app = embed_router(state);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["dependencies"]["store"], "ok");
    assert!(
        body["dependencies"]["embedder"]
            .as_str()
            .unwrap()
            .starts_with("degraded")
    );
}

#[tokio::test]
async fn metrics_endpoint_responds() {
    let (app, _) = embed_app();
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn embed_upsert_then_skip_on_unchanged_text() {
    let (app, store) = embed_app();

    let body = serde_json::json!({
        "entityId": "c1",
        "profile": {
            "identifier": "c1",
            "displayName": "Jane Doe",
            "currentTitle": "Senior Go Engineer",
            "skills": [{"name": "go"}, {"name": "postgres"}]
        }
    });

    let response = app
        .clone()
        .oneshot(post("/embed/upsert", Some("t1"), body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["skipped"], false);
    assert_eq!(first["dim"], DIM as u64);
    assert_eq!(store.record_count(), 1);

    let response = app
        .oneshot(post("/embed/upsert", Some("t1"), body))
        .await
        .unwrap();
    let second = body_json(response).await;
    assert_eq!(second["skipped"], true);
    assert_eq!(store.record_count(), 1);
}

#[tokio::test]
async fn embed_upsert_requires_tenant() {
    let (app, _) = embed_app();
    let response = app
        .oneshot(post(
            "/embed/upsert",
            None,
            serde_json::json!({"entityId": "c1", "text": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn embed_upsert_rejects_empty_payloads() {
    let (app, _) = embed_app();

    let response = app
        .clone()
        .oneshot(post(
            "/embed/upsert",
            Some("t1"),
            serde_json::json!({"entityId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post(
            "/embed/upsert",
            Some("t1"),
            serde_json::json!({"entityId": "c1", "profile": {"identifier": "c1"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn embed_query_returns_vector() {
    let (app, _) = embed_app();
    let response = app
        .oneshot(post(
            "/embed/query",
            Some("t1"),
            serde_json::json!({"text": "senior go engineer"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["vector"].as_array().unwrap().len(), DIM);
    assert_eq!(body["provider"], "local");
}

#[tokio::test]
async fn search_happy_path() {
    let store = Arc::new(MockVectorStore::new(DIM));
    seed_candidate(&store, "c1", "senior go engineer postgres").await;
    let app = search_app_with(store, 100, 100);

    let response = app
        .oneshot(post(
            "/search/hybrid",
            Some("t1"),
            serde_json::json!({"jdText": "senior go engineer", "limit": 5}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["results"][0]["candidateId"], "c1");
    assert_eq!(body["meta"]["weightsVersion"], "wv-test");
    assert_eq!(body["meta"]["rerankApplied"], true);
}

#[tokio::test]
async fn search_requires_tenant_and_consistent_body() {
    let store = Arc::new(MockVectorStore::new(DIM));
    let app = search_app_with(store, 100, 100);

    let response = app
        .clone()
        .oneshot(post(
            "/search/hybrid",
            None,
            serde_json::json!({"jdText": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post(
            "/search/hybrid",
            Some("t1"),
            serde_json::json!({"tenantId": "t2", "jdText": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn search_initializing_returns_503() {
    let state = SearchState::new(shared(ready(&["store"]), 100, 100));
    let app = search_router(state);

    let response = app
        .oneshot(post(
            "/search/hybrid",
            Some("t1"),
            serde_json::json!({"jdText": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn search_rate_limit_returns_429_with_hint() {
    let store = Arc::new(MockVectorStore::new(DIM));
    seed_candidate(&store, "c1", "go engineer").await;
    let app = search_app_with(store, 1, 1);

    let request = serde_json::json!({"jdText": "go engineer"});
    let first = app
        .clone()
        .oneshot(post("/search/hybrid", Some("t1"), request.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post("/search/hybrid", Some("t1"), request))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn search_rejects_bad_limits() {
    let store = Arc::new(MockVectorStore::new(DIM));
    let app = search_app_with(store, 100, 100);

    let response = app
        .oneshot(post(
            "/search/hybrid",
            Some("t1"),
            serde_json::json!({"jdText": "go", "limit": 99}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rerank_round_trip() {
    let app = rerank_app();
    let response = app
        .oneshot(post(
            "/rerank",
            Some("t1"),
            serde_json::json!({
                "jdText": "senior go engineer",
                "docset": [
                    {"candidateId": "c1", "rationaleInput": "Senior Go Engineer | go, postgres", "hybridScore": 0.9},
                    {"candidateId": "c2", "rationaleInput": "Junior Dev | react", "hybridScore": 0.4}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rerankApplied"], true);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rerank_rejects_empty_docset() {
    let app = rerank_app();
    let response = app
        .oneshot(post(
            "/rerank",
            Some("t1"),
            serde_json::json!({"jdText": "x", "docset": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wildcard_tenant_needs_bypass_identity() {
    let (app, _) = embed_app();
    let request = Request::builder()
        .method("POST")
        .uri("/embed/query")
        .header("content-type", "application/json")
        .header("x-tenant-id", "*")
        .header("x-user-id", "anyone")
        .body(Body::from(
            serde_json::json!({"text": "hello"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    // No bypass identity is configured in the default config.
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

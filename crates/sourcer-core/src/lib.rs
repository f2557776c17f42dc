//! # Sourcer
//!
//! Hybrid retrieval and ranking pipeline for multi-tenant candidate search.
//!
//! Given a job description, Sourcer returns a ranked candidate list with
//! match rationale, drawn from a corpus of enriched profiles:
//!
//! ```text
//! JD → query embedding → hybrid recall (ANN + full-text, RRF) →
//!      signal scoring (8 signals) → LLM rerank → response
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sourcer::config::Config;
//!
//! # fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("listening on {}", config.socket_addr());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`store`] - Postgres/pgvector adapter: schema, upsert, hybrid recall
//! - [`cache`] - Tenant-scoped namespaced cache (Redis or in-process)
//! - [`embedding`] - Pluggable text→vector providers with fallback chain
//! - [`scoring`] - Deterministic signal scoring and JD feature extraction
//! - [`rerank`] - LLM rerank engine with deterministic cache
//! - [`trajectory`] - ML trajectory client and shadow-mode comparison
//! - [`search`] - The three-stage orchestrator
//! - [`readiness`] - Lazy dependency initialization and status reporting
//!
//! ## Feature flags
//!
//! | Feature | Purpose |
//! |---------|---------|
//! | `mock` | Mock store/providers for tests and examples |

#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod embedding;
pub mod hashing;
pub mod profile;
pub mod readiness;
pub mod rerank;
pub mod resilience;
pub mod scoring;
pub mod search;
pub mod store;
pub mod trajectory;

pub use cache::{CacheBackend, CacheError, CacheHealth, MemoryCache, Namespace, RedisCache, TenantCache};
pub use config::{Config, ConfigError, Environment, ProviderKind};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use context::{TENANT_WILDCARD, TenantContext};
pub use embedding::{
    Embedding, EmbeddingError, EmbeddingProvider, LocalEmbedder, RemoteEmbedder, ResilientEmbedder,
};
pub use hashing::{docset_hash, hash_tenant_id, job_fingerprint, rerank_cache_key, text_hash};
pub use profile::{CandidateProfile, SearchableProfile, SkillEntry, WorkStint};
pub use readiness::{DependencyStatus, InitError, Readiness, ReadyState, init_with_retries};
pub use rerank::{RerankEngine, RerankError, RerankOutcome};
pub use scoring::{JdFeatures, MatchRationale, RoleType, SignalScores, SignalWeights};
pub use search::{
    CandidateMatch, HybridSearchRequest, SearchDeps, SearchError, SearchOrchestrator,
    SearchResponse, SearchSettings,
};
pub use store::{
    CandidateDocument, EmbeddingRecord, PgVectorStore, StoreError, StoreHealth, VectorStore,
};
#[cfg(any(test, feature = "mock"))]
pub use store::MockVectorStore;
pub use trajectory::{
    HttpTrajectoryClient, ShadowRecorder, TrajectoryApi, TrajectoryError, TrajectoryPrediction,
};
#[cfg(any(test, feature = "mock"))]
pub use trajectory::MockTrajectoryClient;

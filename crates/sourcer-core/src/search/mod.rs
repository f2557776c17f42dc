//! The three-stage search pipeline.
//!
//! Stage 1 retrieves a wide candidate pool (hybrid recall + RRF fusion),
//! Stage 2 scores it with the deterministic signals, Stage 3 reranks the
//! head with the LLM engine. Every stage has a time budget; every
//! dependency failure degrades the response instead of failing it, except
//! the case where no recall path is available at all.

pub mod error;
pub mod orchestrator;
pub mod types;


pub use error::SearchError;
pub use orchestrator::{SearchDeps, SearchOrchestrator, SearchSettings};
pub use types::{
    CandidateMatch, HybridSearchRequest, MlTrajectoryStatus, PipelineMetrics, SearchMeta,
    SearchResponse,
};

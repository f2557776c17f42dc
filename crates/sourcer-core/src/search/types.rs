//! Search request/response wire shapes.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_RESULT_LIMIT;
use crate::scoring::{MatchRationale, SignalScores};
use crate::store::SearchFilters;
use crate::trajectory::TrajectoryPrediction;

/// A hybrid search request, post header-validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridSearchRequest {
    pub jd_text: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_debug: bool,
    #[serde(default)]
    pub filters: Option<RequestFilters>,
}

/// Optional request-level filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilters {
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub seniority: Vec<String>,
}

impl HybridSearchRequest {
    /// Effective result limit, capped by contract.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(MAX_RESULT_LIMIT)
    }

    pub fn store_filters(&self) -> SearchFilters {
        match &self.filters {
            Some(filters) => SearchFilters {
                locations: filters.locations.clone(),
                seniority: filters.seniority.clone(),
            },
            None => SearchFilters::default(),
        }
    }
}

/// ML trajectory availability reported in response meta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MlTrajectoryStatus {
    Healthy,
    Unavailable,
    Disabled,
}

/// Per-stage candidate counts and latencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub stage1_count: usize,
    pub stage2_count: usize,
    pub stage3_count: usize,
    pub stage1_ms: u64,
    pub stage2_ms: u64,
    pub stage3_ms: u64,
}

/// One ranked candidate in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMatch {
    pub candidate_id: String,
    pub overall: f64,
    pub signal_scores: SignalScores,
    pub rationale: MatchRationale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ml_trajectory: Option<TrajectoryPrediction>,
}

/// Response envelope metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub engine_version: String,
    pub weights_version: String,
    pub rerank_applied: bool,
    pub degraded: bool,
    pub cache_hit: bool,
    pub ml_trajectory: MlTrajectoryStatus,
    pub pipeline_metrics: PipelineMetrics,
}

/// The full hybrid search response. Cached whole under the hybrid key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<CandidateMatch>,
    pub meta: SearchMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_with_defaults() {
        let request: HybridSearchRequest =
            serde_json::from_str(r#"{"jdText":"Senior Go engineer"}"#).unwrap();
        assert_eq!(request.effective_limit(), MAX_RESULT_LIMIT);
        assert!(!request.include_debug);
        assert!(request.store_filters().is_empty());
    }

    #[test]
    fn filters_carry_through() {
        let request: HybridSearchRequest = serde_json::from_str(
            r#"{"jdText":"x","limit":5,"filters":{"seniority":["senior"],"locations":["berlin"]}}"#,
        )
        .unwrap();
        let filters = request.store_filters();
        assert_eq!(filters.seniority, vec!["senior"]);
        assert_eq!(filters.locations, vec!["berlin"]);
        assert_eq!(request.effective_limit(), 5);
    }

    #[test]
    fn response_round_trips_through_json() {
        let response = SearchResponse {
            results: vec![],
            meta: SearchMeta {
                engine_version: "0.3.0".to_string(),
                weights_version: "wv-test".to_string(),
                rerank_applied: false,
                degraded: false,
                cache_hit: false,
                ml_trajectory: MlTrajectoryStatus::Disabled,
                pipeline_metrics: PipelineMetrics::default(),
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("engineVersion"));
        assert!(json.contains("ml_trajectory\":\"disabled\"") || json.contains("\"mlTrajectory\":\"disabled\""));
        let back: SearchResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.meta.weights_version, "wv-test");
    }
}

//! Scoring result shapes exposed in search responses.

use serde::{Deserialize, Serialize};

use crate::store::CandidateDocument;

/// Role archetype the weight table is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Ic,
    Manager,
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::Ic => "ic",
            RoleType::Manager => "manager",
        }
    }
}

/// The eight named signals. Every component is in `[0, 1]`; `overall` is the
/// weighted sum under the active weights version.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalScores {
    pub vector_similarity: f64,
    pub skills_exact: f64,
    pub skills_inferred: f64,
    pub seniority_alignment: f64,
    pub recency_boost: f64,
    pub company_relevance: f64,
    pub trajectory_fit: f64,
    pub overall: f64,
}

impl SignalScores {
    /// All-neutral scores (every input missing).
    pub fn neutral() -> Self {
        Self {
            vector_similarity: super::NEUTRAL_SCORE,
            skills_exact: super::NEUTRAL_SCORE,
            skills_inferred: super::NEUTRAL_SCORE,
            seniority_alignment: super::NEUTRAL_SCORE,
            recency_boost: super::NEUTRAL_SCORE,
            company_relevance: super::NEUTRAL_SCORE,
            trajectory_fit: super::NEUTRAL_SCORE,
            overall: super::NEUTRAL_SCORE,
        }
    }

    /// The seven component signals with their wire names, in weight-table
    /// order.
    pub fn components(&self) -> [(&'static str, f64); 7] {
        [
            ("vectorSimilarity", self.vector_similarity),
            ("skillsExact", self.skills_exact),
            ("skillsInferred", self.skills_inferred),
            ("seniorityAlignment", self.seniority_alignment),
            ("recencyBoost", self.recency_boost),
            ("companyRelevance", self.company_relevance),
            ("trajectoryFit", self.trajectory_fit),
        ]
    }
}

/// Where a skill chip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSource {
    Explicit,
    Inferred,
}

/// One skill shown in the match rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillChip {
    pub name: String,
    pub confidence: f64,
    pub source: SkillSource,
}

/// Human-readable explanation of a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRationale {
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub skill_chips: Vec<SkillChip>,
    pub breakdown: Option<SignalScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_narrative: Option<String>,
}

/// A candidate with its Stage-2 scores attached.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub document: CandidateDocument,
    pub scores: SignalScores,
}

//! Role-typed signal weight tables.
//!
//! Each table sums to 1.0; `overall` is the plain dot product of weights and
//! signals. The active table is identified by the deployment's weights
//! version, which travels in responses and cache keys.

use super::types::{RoleType, SignalScores};

/// Weights for the seven component signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalWeights {
    pub vector_similarity: f64,
    pub skills_exact: f64,
    pub skills_inferred: f64,
    pub seniority_alignment: f64,
    pub recency_boost: f64,
    pub company_relevance: f64,
    pub trajectory_fit: f64,
}

impl SignalWeights {
    /// Default table for the given role type.
    pub fn for_role(role: RoleType) -> Self {
        match role {
            RoleType::Ic => Self {
                vector_similarity: 0.30,
                skills_exact: 0.25,
                skills_inferred: 0.10,
                seniority_alignment: 0.10,
                recency_boost: 0.10,
                company_relevance: 0.05,
                trajectory_fit: 0.10,
            },
            RoleType::Manager => Self {
                vector_similarity: 0.25,
                skills_exact: 0.20,
                skills_inferred: 0.10,
                seniority_alignment: 0.15,
                recency_boost: 0.05,
                company_relevance: 0.10,
                trajectory_fit: 0.15,
            },
        }
    }

    /// Sum of all weights. 1.0 for the built-in tables.
    pub fn total(&self) -> f64 {
        self.vector_similarity
            + self.skills_exact
            + self.skills_inferred
            + self.seniority_alignment
            + self.recency_boost
            + self.company_relevance
            + self.trajectory_fit
    }

    /// Weighted sum of the component signals.
    pub fn overall(&self, scores: &SignalScores) -> f64 {
        self.vector_similarity * scores.vector_similarity
            + self.skills_exact * scores.skills_exact
            + self.skills_inferred * scores.skills_inferred
            + self.seniority_alignment * scores.seniority_alignment
            + self.recency_boost * scores.recency_boost
            + self.company_relevance * scores.company_relevance
            + self.trajectory_fit * scores.trajectory_fit
    }
}

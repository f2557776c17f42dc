//! Store row shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::CandidateProfile;

/// A persisted embedding, unique by `(tenant_id, entity_id, chunk_type)`.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub tenant_id: String,
    pub entity_id: String,
    pub chunk_type: String,
    pub vector: Vec<f32>,
    pub model_version: String,
    pub provider: String,
    pub text_hash: String,
    pub metadata: DocumentFields,
}

/// Candidate fields carried in the store's `metadata` column. This is the
/// denormalized slice of the profile the ranking stages need; the
/// operational store keeps the full record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<f64>,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub title_keywords: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub analysis_confidence: Option<f64>,
    /// Title sequence, oldest first. Drives rule-based trajectory.
    #[serde(default)]
    pub title_history: Vec<String>,
    /// Stint lengths in months, aligned with `title_history`.
    #[serde(default)]
    pub stint_months: Vec<f64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Canonical searchable text; doubles as the full-text corpus.
    #[serde(default)]
    pub search_text: String,
}

impl DocumentFields {
    /// Projects a normalized profile into the stored shape.
    pub fn from_profile(profile: &CandidateProfile, search_text: &str) -> Self {
        let title_keywords = profile
            .current_title
            .as_deref()
            .map(|t| {
                t.split_whitespace()
                    .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let title_history: Vec<String> = profile
            .work_history
            .iter()
            .map(|s| s.title.clone())
            .filter(|t| !t.trim().is_empty())
            .collect();
        let stint_months: Vec<f64> = if profile
            .work_history
            .iter()
            .all(|s| s.started_at.is_some() && s.ended_at.is_some())
        {
            profile
                .work_history
                .iter()
                .filter_map(|s| match (s.started_at, s.ended_at) {
                    (Some(start), Some(end)) if end > start => {
                        Some((end - start).num_days() as f64 / 30.44)
                    }
                    _ => None,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            full_name: profile.display_name.clone(),
            current_title: profile.current_title.clone(),
            skills: profile
                .skills
                .iter()
                .map(|s| s.name.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            experience_years: profile.experience_years,
            seniority: profile.seniority_level.as_ref().map(|s| s.to_lowercase()),
            companies: profile.companies.clone(),
            domains: profile.domains.clone(),
            keywords: profile.keywords.clone(),
            title_keywords,
            location: None,
            analysis_confidence: None,
            title_history,
            stint_months,
            updated_at: profile.last_updated_at,
            search_text: search_text.to_string(),
        }
    }
}

/// One fused retrieval row handed to signal scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDocument {
    pub candidate_id: String,
    pub tenant_id: String,
    /// Cosine similarity from the vector path; `None` when the row was only
    /// found by text recall.
    pub vector_score: Option<f64>,
    /// Normalized full-text rank; `None` when only the vector path found it.
    pub text_score: Option<f64>,
    /// RRF-fused score used for Stage-1 ordering.
    pub hybrid_score: f64,
    #[serde(flatten)]
    pub fields: DocumentFields,
}

/// Result of a hybrid recall, with per-path degradation flags.
#[derive(Debug, Clone, Default)]
pub struct RecallOutcome {
    pub documents: Vec<CandidateDocument>,
    /// `false` when the vector path failed or was skipped.
    pub vector_path_ok: bool,
    /// `false` when the full-text path failed.
    pub text_path_ok: bool,
}

impl RecallOutcome {
    /// `true` when at least one recall path failed.
    pub fn degraded(&self) -> bool {
        !(self.vector_path_ok && self.text_path_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::SkillEntry;

    #[test]
    fn from_profile_lowercases_and_extracts_title_keywords() {
        let profile = CandidateProfile {
            identifier: "c1".to_string(),
            current_title: Some("Senior Backend Engineer".to_string()),
            skills: vec![SkillEntry::new("Go"), SkillEntry::new("Postgres")],
            seniority_level: Some("Senior".to_string()),
            ..CandidateProfile::default()
        };
        let fields = DocumentFields::from_profile(&profile, "text");
        assert_eq!(fields.skills, vec!["go", "postgres"]);
        assert_eq!(fields.seniority.as_deref(), Some("senior"));
        assert_eq!(fields.title_keywords, vec!["senior", "backend", "engineer"]);
        assert_eq!(fields.search_text, "text");
    }

    #[test]
    fn recall_outcome_degradation() {
        let healthy = RecallOutcome {
            documents: vec![],
            vector_path_ok: true,
            text_path_ok: true,
        };
        assert!(!healthy.degraded());

        let degraded = RecallOutcome {
            documents: vec![],
            vector_path_ok: false,
            text_path_ok: true,
        };
        assert!(degraded.degraded());
    }

    #[test]
    fn document_fields_json_round_trip() {
        let fields = DocumentFields {
            full_name: Some("Jane".to_string()),
            skills: vec!["go".to_string()],
            search_text: "t".to_string(),
            ..DocumentFields::default()
        };
        let json = serde_json::to_string(&fields).unwrap();
        let back: DocumentFields = serde_json::from_str(&json).unwrap();
        assert_eq!(fields, back);
    }
}

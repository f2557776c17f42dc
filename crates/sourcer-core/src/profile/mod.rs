//! Candidate profiles and their canonical searchable serialization.
//!
//! The searchable form is the single text representation used both as
//! embedding input and as the full-text corpus, so it must be deterministic:
//! fixed section order, sorted list fields, and no dependence on the field
//! order of the incoming JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hashing;

/// A skill with an optional extraction confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl SkillEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confidence: None,
        }
    }
}

/// One entry of a candidate's work history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkStint {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Normalized view of an enriched candidate profile, as delivered by the
/// enrichment collaborator. The operational store remains the source of
/// truth; this is the shape the pipeline consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub current_company: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    #[serde(default)]
    pub experience_years: Option<f64>,
    #[serde(default)]
    pub seniority_level: Option<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub work_history: Vec<WorkStint>,
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Canonical text serialization of a [`CandidateProfile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchableProfile {
    text: String,
    text_hash: String,
}

impl SearchableProfile {
    /// Builds the canonical serialization. Identical profiles (regardless of
    /// list order) produce identical text and hash.
    pub fn from_profile(profile: &CandidateProfile) -> Self {
        let mut sections: Vec<String> = Vec::with_capacity(10);

        if let Some(name) = non_empty(&profile.display_name) {
            sections.push(format!("name: {}", name.trim()));
        }
        if let Some(title) = non_empty(&profile.current_title) {
            sections.push(format!("title: {}", title.trim()));
        }
        if let Some(company) = non_empty(&profile.current_company) {
            sections.push(format!("company: {}", company.trim()));
        }
        if let Some(summary) = non_empty(&profile.summary) {
            sections.push(format!("summary: {}", summary.trim()));
        }

        let mut skills: Vec<String> = profile
            .skills
            .iter()
            .filter(|s| !s.name.trim().is_empty())
            .map(|s| s.name.trim().to_lowercase())
            .collect();
        skills.sort();
        skills.dedup();
        if !skills.is_empty() {
            sections.push(format!("skills: {}", skills.join("; ")));
        }

        if let Some(years) = profile.experience_years {
            sections.push(format!("experience_years: {:.1}", years));
        }
        if let Some(seniority) = non_empty(&profile.seniority_level) {
            sections.push(format!("seniority: {}", seniority.trim().to_lowercase()));
        }

        for (label, values) in [
            ("companies", &profile.companies),
            ("domains", &profile.domains),
            ("keywords", &profile.keywords),
        ] {
            let mut sorted: Vec<String> = values
                .iter()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string())
                .collect();
            sorted.sort();
            sorted.dedup();
            if !sorted.is_empty() {
                sections.push(format!("{}: {}", label, sorted.join("; ")));
            }
        }

        let text = sections.join("\n");
        let text_hash = hashing::text_hash(&text);
        Self { text, text_hash }
    }

    /// Wraps raw pre-serialized text (the upsert endpoint accepts either).
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = text.trim().to_string();
        let text_hash = hashing::text_hash(&text);
        Self { text, text_hash }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_hash(&self) -> &str {
        &self.text_hash
    }

    /// A profile with no serializable content is unprocessable.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn non_empty(field: &Option<String>) -> Option<&String> {
    field.as_ref().filter(|v| !v.trim().is_empty())
}

//! Job-description feature extraction.
//!
//! Rule-based: skills come from a closed vocabulary (the same one the
//! transferability graph covers), seniority from the title ladder keywords,
//! and the IC/Manager role type from a configurable keyword list. The
//! role-type decision is logged with the keyword that triggered it.

use std::collections::HashSet;

use super::seniority::SeniorityLevel;
use super::skills;
use super::types::RoleType;

/// Skills the extractor recognizes in free-form JD text, in canonical form.
const SKILL_VOCABULARY: &[&str] = &[
    "go",
    "rust",
    "java",
    "kotlin",
    "python",
    "javascript",
    "typescript",
    "nodejs",
    "react",
    "vue",
    "postgres",
    "mysql",
    "sql",
    "kafka",
    "rabbitmq",
    "pubsub",
    "redis",
    "kubernetes",
    "docker",
    "aws",
    "google cloud",
    "terraform",
    "pulumi",
    "grpc",
    "rest",
    "graphql",
    "machine learning",
    "leadership",
    "hiring",
];

/// Domain labels recognized in JD text.
const DOMAIN_VOCABULARY: &[&str] = &[
    "fintech",
    "healthcare",
    "e-commerce",
    "logistics",
    "security",
    "infrastructure",
    "data platform",
    "advertising",
    "gaming",
];

const DEFAULT_MANAGER_KEYWORDS: &[&str] = &[
    "manager",
    "management",
    "director",
    "head of",
    "vp of",
    "vice president",
    "reports",
    "headcount",
    "people leadership",
];

/// Features derived from a JD, consumed by signal scoring.
#[derive(Debug, Clone)]
pub struct JdFeatures {
    /// Canonical required skills found in the text.
    pub required_skills: Vec<String>,
    pub target_seniority: SeniorityLevel,
    pub role_type: RoleType,
    pub domains: Vec<String>,
}

impl JdFeatures {
    /// Extracts features from `jd_text`. `manager_keywords_override` is the
    /// configured replacement for the built-in manager keyword list.
    pub fn extract(jd_text: &str, manager_keywords_override: Option<&str>) -> Self {
        let lower = jd_text.to_lowercase();
        let tokens: HashSet<String> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '.' && c != '-' && c != '+')
            .map(|t| t.trim_matches('.').to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut required_skills = Vec::new();
        for skill in SKILL_VOCABULARY {
            let found = if skill.contains(' ') {
                lower.contains(skill)
            } else {
                tokens.contains(*skill)
                    || tokens
                        .iter()
                        .any(|t| skills::normalize(t) == *skill)
            };
            if found {
                required_skills.push(skill.to_string());
            }
        }

        let domains: Vec<String> = DOMAIN_VOCABULARY
            .iter()
            .filter(|d| lower.contains(*d))
            .map(|d| d.to_string())
            .collect();

        let target_seniority = SeniorityLevel::from_title(&lower);

        let override_list: Vec<String>;
        let manager_keywords: Vec<&str> = match manager_keywords_override {
            Some(list) => {
                override_list = list
                    .split(',')
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                override_list.iter().map(|s| s.as_str()).collect()
            }
            None => DEFAULT_MANAGER_KEYWORDS.to_vec(),
        };

        let matched_keyword = manager_keywords.iter().find(|k| lower.contains(*k));
        let role_type = match matched_keyword {
            Some(keyword) => {
                tracing::debug!(keyword, "classified JD as manager role");
                RoleType::Manager
            }
            None => RoleType::Ic,
        };

        Self {
            required_skills,
            target_seniority,
            role_type,
            domains,
        }
    }
}

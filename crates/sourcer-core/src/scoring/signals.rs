//! Signal computation, ordering and rationale assembly.

use chrono::{DateTime, Utc};

use super::jd::JdFeatures;
use super::seniority::{self, SeniorityLevel};
use super::skills;
use super::trajectory;
use super::types::{MatchRationale, ScoredCandidate, SignalScores, SkillChip, SkillSource};
use super::weights::SignalWeights;
use super::{NEUTRAL_SCORE, clamp_signal};
use crate::store::CandidateDocument;

const RECENCY_FRESH_DAYS: i64 = 183;
const RECENCY_AGING_DAYS: i64 = 548;

/// Computes all eight signals for one candidate. `now` is passed in so a
/// request scores every candidate against the same clock.
pub fn score_candidate(
    document: &CandidateDocument,
    jd: &JdFeatures,
    weights: &SignalWeights,
    now: DateTime<Utc>,
) -> SignalScores {
    let fields = &document.fields;

    let vector_similarity = document
        .vector_score
        .map(clamp_signal)
        .unwrap_or(NEUTRAL_SCORE);

    let (skills_exact, skills_inferred) = skill_signals(&fields.skills, &jd.required_skills);

    let candidate_level = candidate_seniority(fields);
    let seniority_alignment = seniority::alignment(candidate_level, jd.target_seniority);

    let recency_boost = recency_signal(fields.updated_at, now);

    let company_relevance = company_signal(&fields.companies, &fields.domains, &jd.domains);

    let trajectory_fit =
        trajectory::fit_signal(trajectory::classify(&fields.title_history, &fields.stint_months));

    let mut scores = SignalScores {
        vector_similarity: clamp_signal(vector_similarity),
        skills_exact: clamp_signal(skills_exact),
        skills_inferred: clamp_signal(skills_inferred),
        seniority_alignment: clamp_signal(seniority_alignment),
        recency_boost: clamp_signal(recency_boost),
        company_relevance: clamp_signal(company_relevance),
        trajectory_fit: clamp_signal(trajectory_fit),
        overall: 0.0,
    };
    scores.overall = clamp_signal(weights.overall(&scores));
    scores
}

/// Ordering for ranked output: `overall` descending, ties broken by
/// `skills_exact`, then `recency_boost`, then `vector_similarity`, then
/// candidate id ascending.
pub fn compare_scored(a: &ScoredCandidate, b: &ScoredCandidate) -> std::cmp::Ordering {
    b.scores
        .overall
        .total_cmp(&a.scores.overall)
        .then_with(|| b.scores.skills_exact.total_cmp(&a.scores.skills_exact))
        .then_with(|| b.scores.recency_boost.total_cmp(&a.scores.recency_boost))
        .then_with(|| {
            b.scores
                .vector_similarity
                .total_cmp(&a.scores.vector_similarity)
        })
        .then_with(|| a.document.candidate_id.cmp(&b.document.candidate_id))
}

fn skill_signals(candidate_skills: &[String], required: &[String]) -> (f64, f64) {
    if required.is_empty() || candidate_skills.is_empty() {
        return (NEUTRAL_SCORE, NEUTRAL_SCORE);
    }

    let mut exact_hits = 0usize;
    let mut inferred_credit = 0.0f64;
    for req in required {
        let exact = candidate_skills.iter().any(|c| skills::exact_match(c, req));
        if exact {
            exact_hits += 1;
            inferred_credit += 1.0;
        } else {
            inferred_credit += skills::transfer_weight(candidate_skills, req);
        }
    }

    let n = required.len() as f64;
    (exact_hits as f64 / n, inferred_credit / n)
}

fn candidate_seniority(fields: &crate::store::DocumentFields) -> SeniorityLevel {
    if let Some(label) = fields.seniority.as_deref() {
        let level = SeniorityLevel::from_label(label);
        if level != SeniorityLevel::Unknown {
            return level;
        }
    }
    fields
        .current_title
        .as_deref()
        .map(SeniorityLevel::from_title)
        .unwrap_or(SeniorityLevel::Unknown)
}

fn recency_signal(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(updated_at) = updated_at else {
        return NEUTRAL_SCORE;
    };
    let age_days = (now - updated_at).num_days();
    if age_days < RECENCY_FRESH_DAYS {
        1.0
    } else if age_days <= RECENCY_AGING_DAYS {
        0.7
    } else {
        0.4
    }
}

fn company_signal(companies: &[String], candidate_domains: &[String], jd_domains: &[String]) -> f64 {
    if jd_domains.is_empty() || (companies.is_empty() && candidate_domains.is_empty()) {
        return NEUTRAL_SCORE;
    }
    let matched = jd_domains
        .iter()
        .filter(|d| candidate_domains.iter().any(|cd| cd.eq_ignore_ascii_case(d)))
        .count();
    matched as f64 / jd_domains.len() as f64
}

/// Builds the per-candidate rationale from the highest and lowest weighted
/// contributions, plus the reranker's reason text when one exists.
pub fn build_rationale(
    scored: &ScoredCandidate,
    jd: &JdFeatures,
    weights: &SignalWeights,
    llm_narrative: Option<String>,
) -> MatchRationale {
    let scores = &scored.scores;
    let weighted: [(&'static str, f64, f64); 7] = [
        ("vectorSimilarity", scores.vector_similarity, weights.vector_similarity),
        ("skillsExact", scores.skills_exact, weights.skills_exact),
        ("skillsInferred", scores.skills_inferred, weights.skills_inferred),
        (
            "seniorityAlignment",
            scores.seniority_alignment,
            weights.seniority_alignment,
        ),
        ("recencyBoost", scores.recency_boost, weights.recency_boost),
        (
            "companyRelevance",
            scores.company_relevance,
            weights.company_relevance,
        ),
        ("trajectoryFit", scores.trajectory_fit, weights.trajectory_fit),
    ];

    let mut ranked: Vec<&(&'static str, f64, f64)> = weighted.iter().collect();
    ranked.sort_by(|a, b| (b.1 * b.2).total_cmp(&(a.1 * a.2)));

    let strengths: Vec<String> = ranked
        .iter()
        .filter(|(_, score, _)| *score >= 0.7)
        .take(3)
        .map(|(name, score, _)| format!("strong {} ({:.2})", describe(name), score))
        .collect();

    let concerns: Vec<String> = ranked
        .iter()
        .rev()
        .filter(|(_, score, _)| *score < NEUTRAL_SCORE)
        .take(3)
        .map(|(name, score, _)| format!("weak {} ({:.2})", describe(name), score))
        .collect();

    let candidate_skills = &scored.document.fields.skills;
    let mut skill_chips = Vec::new();
    if !candidate_skills.is_empty() {
        for req in &jd.required_skills {
            if candidate_skills.iter().any(|c| skills::exact_match(c, req)) {
                skill_chips.push(SkillChip {
                    name: req.clone(),
                    confidence: 1.0,
                    source: SkillSource::Explicit,
                });
            } else {
                let weight = skills::transfer_weight(candidate_skills, req);
                if weight > 0.0 {
                    skill_chips.push(SkillChip {
                        name: req.clone(),
                        confidence: weight,
                        source: SkillSource::Inferred,
                    });
                }
            }
        }
    }

    MatchRationale {
        strengths,
        concerns,
        skill_chips,
        breakdown: Some(*scores),
        llm_narrative,
    }
}

fn describe(signal: &str) -> &'static str {
    match signal {
        "vectorSimilarity" => "semantic fit",
        "skillsExact" => "required skills coverage",
        "skillsInferred" => "transferable skills",
        "seniorityAlignment" => "seniority alignment",
        "recencyBoost" => "profile recency",
        "companyRelevance" => "company background relevance",
        "trajectoryFit" => "career trajectory",
        _ => "signal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::RoleType;
    use crate::store::DocumentFields;

    fn doc(id: &str, fields: DocumentFields, vector_score: Option<f64>) -> CandidateDocument {
        CandidateDocument {
            candidate_id: id.to_string(),
            tenant_id: "t1".to_string(),
            vector_score,
            text_score: None,
            hybrid_score: 0.0,
            fields,
        }
    }

    fn jd() -> JdFeatures {
        JdFeatures::extract("Senior Go backend engineer, Postgres, Kafka", None)
    }

    fn weights() -> SignalWeights {
        SignalWeights::for_role(RoleType::Ic)
    }

    #[test]
    fn empty_candidate_scores_all_neutral_but_vector() {
        let scores = score_candidate(
            &doc("c5", DocumentFields::default(), Some(0.42)),
            &jd(),
            &weights(),
            Utc::now(),
        );
        assert_eq!(scores.skills_exact, 0.5);
        assert_eq!(scores.skills_inferred, 0.5);
        assert_eq!(scores.seniority_alignment, 0.5);
        assert_eq!(scores.recency_boost, 0.5);
        assert_eq!(scores.company_relevance, 0.5);
        assert_eq!(scores.trajectory_fit, 0.5);
        assert!((scores.vector_similarity - 0.42).abs() < 1e-9);
        assert!(scores.overall > 0.0 && scores.overall <= 1.0);
    }

    #[test]
    fn overall_is_weighted_sum_within_tolerance() {
        let now = Utc::now();
        let fields = DocumentFields {
            skills: vec!["go".to_string(), "postgres".to_string(), "kafka".to_string()],
            seniority: Some("senior".to_string()),
            updated_at: Some(now - chrono::Duration::days(30)),
            ..DocumentFields::default()
        };
        let scores = score_candidate(&doc("c1", fields, Some(0.9)), &jd(), &weights(), now);
        let expected = weights().overall(&scores);
        assert!((scores.overall - expected).abs() < 1e-6);
        assert_eq!(scores.skills_exact, 1.0);
        assert_eq!(scores.recency_boost, 1.0);
        assert_eq!(scores.seniority_alignment, 1.0);
    }

    #[test]
    fn inferred_skills_credit_transfer_edges() {
        let fields = DocumentFields {
            // rust→go transfers at 0.7; no postgres or kafka knowledge.
            skills: vec!["rust".to_string()],
            ..DocumentFields::default()
        };
        let scores = score_candidate(&doc("c2", fields, None), &jd(), &weights(), Utc::now());
        assert_eq!(scores.skills_exact, 0.0);
        assert!((scores.skills_inferred - 0.7 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn recency_tiers() {
        let now = Utc::now();
        let mk = |days: i64| {
            let fields = DocumentFields {
                skills: vec!["go".to_string()],
                updated_at: Some(now - chrono::Duration::days(days)),
                ..DocumentFields::default()
            };
            score_candidate(&doc("c", fields, None), &jd(), &weights(), now).recency_boost
        };
        assert_eq!(mk(30), 1.0);
        assert_eq!(mk(200), 0.7);
        assert_eq!(mk(600), 0.4);
    }

    #[test]
    fn tie_breaks_follow_the_chain() {
        let base = SignalScores::neutral();
        let mk = |id: &str, overall: f64, exact: f64| ScoredCandidate {
            document: doc(id, DocumentFields::default(), None),
            scores: SignalScores {
                overall,
                skills_exact: exact,
                ..base
            },
        };

        let mut pool = vec![
            mk("c3", 0.8, 0.2),
            mk("c1", 0.9, 0.5),
            mk("c2", 0.8, 0.6),
        ];
        pool.sort_by(compare_scored);
        let ids: Vec<&str> = pool.iter().map(|c| c.document.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);

        // Full tie falls back to lexicographic id.
        let mut tied = vec![mk("cb", 0.5, 0.5), mk("ca", 0.5, 0.5)];
        tied.sort_by(compare_scored);
        assert_eq!(tied[0].document.candidate_id, "ca");
    }

    #[test]
    fn no_nan_with_all_null_fields() {
        let scores = score_candidate(
            &doc("c5", DocumentFields::default(), None),
            &JdFeatures::extract("", None),
            &weights(),
            Utc::now(),
        );
        for (_, value) in scores.components() {
            assert!(!value.is_nan());
        }
        assert!(!scores.overall.is_nan());
    }

    #[test]
    fn rationale_reflects_extremes() {
        let now = Utc::now();
        let fields = DocumentFields {
            skills: vec!["go".to_string(), "postgres".to_string(), "kafka".to_string()],
            seniority: Some("senior".to_string()),
            updated_at: Some(now - chrono::Duration::days(700)),
            ..DocumentFields::default()
        };
        let document = doc("c1", fields, Some(0.95));
        let scores = score_candidate(&document, &jd(), &weights(), now);
        let rationale = build_rationale(
            &ScoredCandidate {
                document,
                scores,
            },
            &jd(),
            &weights(),
            Some("Strong backend match".to_string()),
        );

        assert!(!rationale.strengths.is_empty());
        assert!(
            rationale
                .concerns
                .iter()
                .any(|c| c.contains("profile recency"))
        );
        assert_eq!(rationale.llm_narrative.as_deref(), Some("Strong backend match"));
        assert!(
            rationale
                .skill_chips
                .iter()
                .all(|chip| chip.source == SkillSource::Explicit)
        );
        assert!(rationale.breakdown.is_some());
    }
}

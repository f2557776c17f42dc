//! The ordered seniority ladder.
//!
//! A closed set: unknown titles map to [`SeniorityLevel::Unknown`], which
//! scores neutral instead of excluding the candidate.

use serde::{Deserialize, Serialize};

/// Ordered seniority levels, distance-normalized for alignment scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityLevel {
    Intern,
    Junior,
    Mid,
    Senior,
    Staff,
    Principal,
    Director,
    CLevel,
    Unknown,
}

/// Distance between the lowest and highest known rungs.
pub const LADDER_SPAN: f64 = 7.0;

impl SeniorityLevel {
    /// Numeric rung, `None` for unknown.
    pub fn rank(&self) -> Option<u8> {
        match self {
            SeniorityLevel::Intern => Some(0),
            SeniorityLevel::Junior => Some(1),
            SeniorityLevel::Mid => Some(2),
            SeniorityLevel::Senior => Some(3),
            SeniorityLevel::Staff => Some(4),
            SeniorityLevel::Principal => Some(5),
            SeniorityLevel::Director => Some(6),
            SeniorityLevel::CLevel => Some(7),
            SeniorityLevel::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeniorityLevel::Intern => "intern",
            SeniorityLevel::Junior => "junior",
            SeniorityLevel::Mid => "mid",
            SeniorityLevel::Senior => "senior",
            SeniorityLevel::Staff => "staff",
            SeniorityLevel::Principal => "principal",
            SeniorityLevel::Director => "director",
            SeniorityLevel::CLevel => "c_level",
            SeniorityLevel::Unknown => "unknown",
        }
    }

    /// Parses a stored seniority label (already lowercased by ingestion).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "intern" | "internship" => SeniorityLevel::Intern,
            "junior" | "entry" | "associate" => SeniorityLevel::Junior,
            "mid" | "intermediate" | "mid-level" => SeniorityLevel::Mid,
            "senior" => SeniorityLevel::Senior,
            "staff" => SeniorityLevel::Staff,
            "principal" | "distinguished" => SeniorityLevel::Principal,
            "director" | "vp" | "head" => SeniorityLevel::Director,
            "c_level" | "c-level" | "cto" | "ceo" | "cpo" | "ciso" => SeniorityLevel::CLevel,
            _ => SeniorityLevel::Unknown,
        }
    }

    /// Infers a level from a free-form job title.
    pub fn from_title(title: &str) -> Self {
        let lower = title.to_lowercase();
        let has = |needle: &str| lower.contains(needle);

        if has("cto") || has("ceo") || has("chief") {
            SeniorityLevel::CLevel
        } else if has("vp ") || has("vice president") || has("director") || has("head of") {
            SeniorityLevel::Director
        } else if has("principal") || has("distinguished") {
            SeniorityLevel::Principal
        } else if has("staff") {
            SeniorityLevel::Staff
        } else if has("senior") || has("sr.") || has("sr ") {
            SeniorityLevel::Senior
        } else if has("junior") || has("jr.") || has("jr ") || has("associate") || has("entry") {
            SeniorityLevel::Junior
        } else if has("intern") {
            SeniorityLevel::Intern
        } else if has("engineer") || has("developer") || has("manager") || has("designer") {
            // A bare discipline title with no modifier reads as mid-level.
            SeniorityLevel::Mid
        } else {
            SeniorityLevel::Unknown
        }
    }
}

/// `1 − normalized ladder distance`; either side unknown scores neutral.
pub fn alignment(candidate: SeniorityLevel, target: SeniorityLevel) -> f64 {
    match (candidate.rank(), target.rank()) {
        (Some(c), Some(t)) => 1.0 - (c as f64 - t as f64).abs() / LADDER_SPAN,
        _ => super::NEUTRAL_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_ordered() {
        assert!(SeniorityLevel::Intern < SeniorityLevel::Junior);
        assert!(SeniorityLevel::Senior < SeniorityLevel::Staff);
        assert!(SeniorityLevel::Director < SeniorityLevel::CLevel);
    }

    #[test]
    fn title_inference() {
        assert_eq!(
            SeniorityLevel::from_title("Senior Backend Engineer"),
            SeniorityLevel::Senior
        );
        assert_eq!(
            SeniorityLevel::from_title("Staff Platform Engineer"),
            SeniorityLevel::Staff
        );
        assert_eq!(
            SeniorityLevel::from_title("Junior Frontend Dev"),
            SeniorityLevel::Junior
        );
        assert_eq!(
            SeniorityLevel::from_title("Engineering Manager"),
            SeniorityLevel::Mid
        );
        assert_eq!(
            SeniorityLevel::from_title("VP of Engineering"),
            SeniorityLevel::Director
        );
        assert_eq!(
            SeniorityLevel::from_title("Basket Weaver"),
            SeniorityLevel::Unknown
        );
    }

    #[test]
    fn perfect_alignment_scores_one() {
        assert_eq!(alignment(SeniorityLevel::Senior, SeniorityLevel::Senior), 1.0);
    }

    #[test]
    fn distance_reduces_alignment() {
        let close = alignment(SeniorityLevel::Senior, SeniorityLevel::Staff);
        let far = alignment(SeniorityLevel::Intern, SeniorityLevel::CLevel);
        assert!(close > far);
        assert!((far - 0.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_scores_neutral() {
        assert_eq!(
            alignment(SeniorityLevel::Unknown, SeniorityLevel::Senior),
            0.5
        );
        assert_eq!(
            alignment(SeniorityLevel::Senior, SeniorityLevel::Unknown),
            0.5
        );
    }
}

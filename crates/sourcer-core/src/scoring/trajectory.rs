//! Rule-based career trajectory classification.
//!
//! Works over the candidate's title sequence (oldest first) and stint
//! lengths. No trained model here; the ML service's predictions run in
//! shadow mode and never drive ranking.

use serde::{Deserialize, Serialize};

use super::seniority::SeniorityLevel;

/// Transitions considered when classifying direction.
const DIRECTION_WINDOW: usize = 3;

const FAST_MONTHS: f64 = 18.0;
const NORMAL_MONTHS: f64 = 36.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Upward,
    Lateral,
    Downward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Velocity {
    Fast,
    Normal,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    TechnicalGrowth,
    LeadershipTrack,
    LateralMove,
    CareerPivot,
}

/// Classified trajectory for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub direction: Direction,
    pub velocity: Velocity,
    #[serde(rename = "type")]
    pub track_type: TrackType,
}

const LEADERSHIP_KEYWORDS: &[&str] = &[
    "manager", "director", "head", "vp", "vice president", "lead", "chief",
];

/// Classifies a title sequence. Returns `None` for fewer than two titles
/// (no transition to classify): the caller substitutes the neutral signal.
pub fn classify(title_history: &[String], stint_months: &[f64]) -> Option<TrajectorySummary> {
    if title_history.len() < 2 {
        return None;
    }

    let levels: Vec<Option<u8>> = title_history
        .iter()
        .map(|t| SeniorityLevel::from_title(t).rank())
        .collect();

    Some(TrajectorySummary {
        direction: classify_direction(&levels),
        velocity: classify_velocity(title_history.len(), stint_months),
        track_type: classify_track(title_history, &levels),
    })
}

/// Maps a classified (or absent) trajectory onto the `[0, 1]` signal.
pub fn fit_signal(summary: Option<TrajectorySummary>) -> f64 {
    let Some(summary) = summary else {
        return super::NEUTRAL_SCORE;
    };
    let direction = match summary.direction {
        Direction::Upward => 1.0,
        Direction::Lateral => 0.6,
        Direction::Downward => 0.2,
    };
    let velocity = match summary.velocity {
        Velocity::Fast => 1.0,
        Velocity::Normal => 0.7,
        Velocity::Slow => 0.4,
    };
    0.6 * direction + 0.4 * velocity
}

fn classify_direction(levels: &[Option<u8>]) -> Direction {
    // Sum level deltas over the last few known transitions. Unknown titles
    // do not contribute and never exclude.
    let known: Vec<u8> = levels.iter().filter_map(|l| *l).collect();
    if known.len() < 2 {
        return Direction::Lateral;
    }
    let window_start = known.len().saturating_sub(DIRECTION_WINDOW + 1);
    let window = &known[window_start..];
    let delta: i32 = window
        .windows(2)
        .map(|pair| pair[1] as i32 - pair[0] as i32)
        .sum();
    match delta.cmp(&0) {
        std::cmp::Ordering::Greater => Direction::Upward,
        std::cmp::Ordering::Equal => Direction::Lateral,
        std::cmp::Ordering::Less => Direction::Downward,
    }
}

fn classify_velocity(title_count: usize, stint_months: &[f64]) -> Velocity {
    let transitions = title_count.saturating_sub(1);
    if transitions == 0 || stint_months.is_empty() {
        return Velocity::Normal;
    }
    let total: f64 = stint_months.iter().sum();
    let average = total / transitions as f64;
    if average < FAST_MONTHS {
        Velocity::Fast
    } else if average <= NORMAL_MONTHS {
        Velocity::Normal
    } else {
        Velocity::Slow
    }
}

fn classify_track(titles: &[String], levels: &[Option<u8>]) -> TrackType {
    let first = titles.first().map(|t| t.to_lowercase()).unwrap_or_default();
    let last = titles.last().map(|t| t.to_lowercase()).unwrap_or_default();

    let was_leadership = LEADERSHIP_KEYWORDS.iter().any(|k| first.contains(k));
    let is_leadership = LEADERSHIP_KEYWORDS.iter().any(|k| last.contains(k));
    if is_leadership && !was_leadership {
        return TrackType::LeadershipTrack;
    }

    let known: Vec<u8> = levels.iter().filter_map(|l| *l).collect();
    let grew = known.len() >= 2 && known.last() > known.first();
    if grew && !is_leadership {
        return TrackType::TechnicalGrowth;
    }

    // Same rung, different discipline: no shared substantive tokens between
    // the first and last titles reads as a pivot.
    let shared = shared_tokens(&first, &last);
    if shared == 0 {
        TrackType::CareerPivot
    } else {
        TrackType::LateralMove
    }
}

fn shared_tokens(a: &str, b: &str) -> usize {
    const STOPWORDS: &[&str] = &[
        "senior", "junior", "staff", "principal", "lead", "of", "the", "intern",
    ];
    let tokens_a: std::collections::HashSet<&str> = a
        .split_whitespace()
        .filter(|t| !STOPWORDS.contains(t))
        .collect();
    b.split_whitespace()
        .filter(|t| !STOPWORDS.contains(t))
        .filter(|t| tokens_a.contains(t))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn too_short_history_is_unclassified() {
        assert!(classify(&titles(&["Engineer"]), &[]).is_none());
        assert!(classify(&[], &[]).is_none());
    }

    #[test]
    fn upward_technical_growth() {
        let summary = classify(
            &titles(&["Engineer", "Senior Engineer", "Staff Engineer"]),
            &[24.0, 30.0],
        )
        .unwrap();
        assert_eq!(summary.direction, Direction::Upward);
        assert_eq!(summary.track_type, TrackType::TechnicalGrowth);
    }

    #[test]
    fn leadership_transition() {
        let summary = classify(
            &titles(&["Senior Engineer", "Engineering Manager"]),
            &[36.0],
        )
        .unwrap();
        assert_eq!(summary.track_type, TrackType::LeadershipTrack);
    }

    #[test]
    fn downward_direction() {
        let summary = classify(
            &titles(&["Director of Engineering", "Senior Engineer"]),
            &[24.0],
        )
        .unwrap();
        assert_eq!(summary.direction, Direction::Downward);
    }

    #[test]
    fn velocity_thresholds() {
        let fast = classify(&titles(&["Engineer", "Senior Engineer"]), &[12.0]).unwrap();
        assert_eq!(fast.velocity, Velocity::Fast);

        let normal = classify(&titles(&["Engineer", "Senior Engineer"]), &[30.0]).unwrap();
        assert_eq!(normal.velocity, Velocity::Normal);

        let slow = classify(&titles(&["Engineer", "Senior Engineer"]), &[60.0]).unwrap();
        assert_eq!(slow.velocity, Velocity::Slow);
    }

    #[test]
    fn missing_months_fall_back_to_normal() {
        let summary = classify(&titles(&["Engineer", "Senior Engineer"]), &[]).unwrap();
        assert_eq!(summary.velocity, Velocity::Normal);
    }

    #[test]
    fn unknown_titles_do_not_exclude() {
        let summary = classify(&titles(&["Basket Weaver", "Llama Groomer"]), &[12.0]).unwrap();
        assert_eq!(summary.direction, Direction::Lateral);
        assert_eq!(summary.track_type, TrackType::CareerPivot);
    }

    #[test]
    fn pivot_vs_lateral() {
        let pivot = classify(&titles(&["Backend Engineer", "Product Designer"]), &[24.0]).unwrap();
        assert_eq!(pivot.track_type, TrackType::CareerPivot);

        let lateral = classify(
            &titles(&["Backend Engineer", "Platform Engineer"]),
            &[24.0],
        )
        .unwrap();
        assert_eq!(lateral.track_type, TrackType::LateralMove);
    }

    #[test]
    fn fit_signal_mapping() {
        assert_eq!(fit_signal(None), 0.5);
        let best = fit_signal(Some(TrajectorySummary {
            direction: Direction::Upward,
            velocity: Velocity::Fast,
            track_type: TrackType::TechnicalGrowth,
        }));
        assert!((best - 1.0).abs() < 1e-9);
        let worst = fit_signal(Some(TrajectorySummary {
            direction: Direction::Downward,
            velocity: Velocity::Slow,
            track_type: TrackType::LateralMove,
        }));
        assert!(worst < 0.5);
    }
}

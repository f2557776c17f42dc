//! Shadow-mode comparison between ML predictions and rule-based trajectory.
//!
//! Records are buffered in a bounded ring and flushed to structured logs
//! (target `shadow`) on interval or when full. The promotion decision is a
//! read-only consumer of those logs; nothing here feeds back into ranking.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::client::TrajectoryPrediction;
use crate::scoring::trajectory::fit_signal;
use crate::scoring::{Direction, SeniorityLevel, TrajectorySummary, Velocity};

/// Hireability-vs-rule-fit delta above which a disagreement is significant.
const DISAGREEMENT_DELTA: f64 = 0.30;

const DEFAULT_CAPACITY: usize = 512;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Per-dimension agreement between ML and the rule-based classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub direction: bool,
    pub velocity: bool,
    #[serde(rename = "type")]
    pub track_type: bool,
}

/// One shadow comparison, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowComparisonRecord {
    pub timestamp: DateTime<Utc>,
    pub candidate_id: String,
    pub ml_prediction: TrajectoryPrediction,
    pub rule_based: TrajectorySummary,
    pub agreement: Agreement,
}

impl ShadowComparisonRecord {
    /// Compares one prediction against the rule-based classification.
    pub fn compare(
        candidate_id: &str,
        current_title: Option<&str>,
        ml: TrajectoryPrediction,
        rule: TrajectorySummary,
        now: DateTime<Utc>,
    ) -> Self {
        let agreement = Agreement {
            direction: implied_direction(current_title, &ml.next_role) == rule.direction,
            velocity: implied_velocity(&ml.tenure_months) == rule.velocity,
            track_type: implies_leadership(&ml.next_role)
                == matches!(
                    rule.track_type,
                    crate::scoring::TrackType::LeadershipTrack
                ),
        };
        Self {
            timestamp: now,
            candidate_id: candidate_id.to_string(),
            ml_prediction: ml,
            rule_based: rule,
            agreement,
        }
    }

    /// A disagreement worth a log line: direction or velocity differ and the
    /// ML hireability is far from the rule-based fit signal.
    pub fn significant_disagreement(&self) -> bool {
        let rule_fit = fit_signal(Some(self.rule_based));
        (!self.agreement.direction || !self.agreement.velocity)
            && (self.ml_prediction.hireability - rule_fit).abs() > DISAGREEMENT_DELTA
    }
}

fn implied_direction(current_title: Option<&str>, next_role: &str) -> Direction {
    let next = SeniorityLevel::from_title(next_role).rank();
    let current = current_title.and_then(|t| SeniorityLevel::from_title(t).rank());
    match (current, next) {
        (Some(current), Some(next)) if next > current => Direction::Upward,
        (Some(current), Some(next)) if next < current => Direction::Downward,
        _ => Direction::Lateral,
    }
}

fn implied_velocity(tenure: &super::client::TenureRange) -> Velocity {
    let midpoint = (tenure.min + tenure.max) as f64 / 2.0;
    if midpoint < 18.0 {
        Velocity::Fast
    } else if midpoint <= 36.0 {
        Velocity::Normal
    } else {
        Velocity::Slow
    }
}

fn implies_leadership(next_role: &str) -> bool {
    let lower = next_role.to_lowercase();
    ["manager", "director", "head", "vp", "chief"]
        .iter()
        .any(|k| lower.contains(k))
}

/// Bounded buffer of shadow records with interval flushing.
pub struct ShadowRecorder {
    buffer: Mutex<Ring>,
    capacity: usize,
    flush_interval: Duration,
}

struct Ring {
    records: VecDeque<ShadowComparisonRecord>,
    last_flush: Instant,
}

impl ShadowRecorder {
    pub fn new(capacity: usize, flush_interval: Duration) -> Self {
        Self {
            buffer: Mutex::new(Ring {
                records: VecDeque::with_capacity(capacity),
                last_flush: Instant::now(),
            }),
            capacity,
            flush_interval,
        }
    }

    /// Appends a record; drops the oldest when full. Flushes when the buffer
    /// fills or the interval has elapsed.
    pub fn record(&self, record: ShadowComparisonRecord) {
        if record.significant_disagreement() {
            tracing::info!(
                target: "shadow",
                candidate_id = %record.candidate_id,
                ml_next_role = %record.ml_prediction.next_role,
                ml_hireability = record.ml_prediction.hireability,
                direction_agrees = record.agreement.direction,
                velocity_agrees = record.agreement.velocity,
                "shadow disagreement"
            );
        }

        let mut ring = self.buffer.lock();
        if ring.records.len() >= self.capacity {
            ring.records.pop_front();
        }
        ring.records.push_back(record);

        let due = ring.records.len() >= self.capacity
            || ring.last_flush.elapsed() >= self.flush_interval;
        if due {
            Self::flush_locked(&mut ring);
        }
    }

    /// Forces a flush, e.g. on shutdown.
    pub fn flush(&self) {
        Self::flush_locked(&mut self.buffer.lock());
    }

    pub fn buffered(&self) -> usize {
        self.buffer.lock().records.len()
    }

    fn flush_locked(ring: &mut Ring) {
        if ring.records.is_empty() {
            ring.last_flush = Instant::now();
            return;
        }
        let total = ring.records.len();
        let direction_agree = ring.records.iter().filter(|r| r.agreement.direction).count();
        let velocity_agree = ring.records.iter().filter(|r| r.agreement.velocity).count();
        let track_agree = ring.records.iter().filter(|r| r.agreement.track_type).count();
        tracing::info!(
            target: "shadow",
            total,
            direction_agreement = direction_agree as f64 / total as f64,
            velocity_agreement = velocity_agree as f64 / total as f64,
            track_agreement = track_agree as f64 / total as f64,
            "shadow batch flushed"
        );
        ring.records.clear();
        ring.last_flush = Instant::now();
    }
}

impl Default for ShadowRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_FLUSH_INTERVAL)
    }
}

impl std::fmt::Debug for ShadowRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowRecorder")
            .field("buffered", &self.buffered())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::TrackType;
    use crate::trajectory::client::TenureRange;

    fn ml(next_role: &str, hireability: f64, min: u32, max: u32) -> TrajectoryPrediction {
        TrajectoryPrediction {
            next_role: next_role.to_string(),
            next_role_confidence: 0.9,
            tenure_months: TenureRange { min, max },
            hireability,
            low_confidence: false,
            uncertainty_reason: None,
        }
    }

    fn rule(direction: Direction, velocity: Velocity, track: TrackType) -> TrajectorySummary {
        TrajectorySummary {
            direction,
            velocity,
            track_type: track,
        }
    }

    #[test]
    fn agreement_on_matching_prediction() {
        let record = ShadowComparisonRecord::compare(
            "c1",
            Some("Senior Engineer"),
            ml("Staff Engineer", 0.9, 12, 20),
            rule(Direction::Upward, Velocity::Fast, TrackType::TechnicalGrowth),
            Utc::now(),
        );
        assert!(record.agreement.direction);
        assert!(record.agreement.velocity);
        assert!(record.agreement.track_type);
        assert!(!record.significant_disagreement());
    }

    #[test]
    fn disagreement_detected() {
        let record = ShadowComparisonRecord::compare(
            "c1",
            Some("Staff Engineer"),
            // ML says the next move is downward and slow.
            ml("Junior Engineer", 0.1, 48, 60),
            rule(Direction::Upward, Velocity::Fast, TrackType::TechnicalGrowth),
            Utc::now(),
        );
        assert!(!record.agreement.direction);
        assert!(!record.agreement.velocity);
        // rule fit = 1.0, hireability 0.1 → |Δ| > 0.3
        assert!(record.significant_disagreement());
    }

    #[test]
    fn leadership_track_agreement() {
        let record = ShadowComparisonRecord::compare(
            "c1",
            Some("Senior Engineer"),
            ml("Engineering Manager", 0.8, 20, 30),
            rule(Direction::Lateral, Velocity::Normal, TrackType::LeadershipTrack),
            Utc::now(),
        );
        assert!(record.agreement.track_type);
    }

    #[test]
    fn ring_drops_oldest_and_flushes() {
        let recorder = ShadowRecorder::new(4, Duration::from_secs(3600));
        for i in 0..4 {
            recorder.record(ShadowComparisonRecord::compare(
                &format!("c{i}"),
                Some("Engineer"),
                ml("Senior Engineer", 0.8, 20, 30),
                rule(Direction::Upward, Velocity::Normal, TrackType::TechnicalGrowth),
                Utc::now(),
            ));
        }
        // Hitting capacity triggers a flush, which clears the buffer.
        assert_eq!(recorder.buffered(), 0);
    }

    #[test]
    fn manual_flush_clears() {
        let recorder = ShadowRecorder::new(100, Duration::from_secs(3600));
        recorder.record(ShadowComparisonRecord::compare(
            "c1",
            None,
            ml("Engineer", 0.5, 20, 30),
            rule(Direction::Lateral, Velocity::Normal, TrackType::LateralMove),
            Utc::now(),
        ));
        assert_eq!(recorder.buffered(), 1);
        recorder.flush();
        assert_eq!(recorder.buffered(), 0);
    }
}

//! CategoryInvestment - Time-weighted expertise for one (agent, category) pair
//!
//! The investment keeps a bounded window of the most recent cultivation events
//! plus a separate all-time `cultivation_count`, so storage growth is decoupled
//! from activity reporting. The score is always recomputed from the window by
//! the caller and handed in through [`CategoryInvestment::set_score`], which is
//! the only way the score and level change.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{impact_in_range, CultivationEvent};
use super::level::{InvestmentLevel, LevelClassifier};
use crate::error::ValidationError;
use crate::{MAX_SCORE, MIN_SCORE};

/// Investment state for a single category of a single agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInvestment {
    category: String,
    level: InvestmentLevel,
    score: f64,
    first_invested: Option<DateTime<Utc>>,
    last_cultivated: Option<DateTime<Utc>>,
    cultivation_count: u64,
    cultivation_events: VecDeque<CultivationEvent>,
}

/// What [`CategoryInvestment::repair`] had to fix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub dropped_events: usize,
    pub truncated_events: usize,
    pub reordered_events: bool,
    pub count_raised: bool,
    pub score_clamped: bool,
    pub level_fixed: bool,
    pub timestamps_fixed: bool,
}

impl RepairReport {
    /// True if nothing needed fixing
    pub fn is_clean(&self) -> bool {
        *self == RepairReport::default()
    }
}

impl CategoryInvestment {
    /// Create an empty investment first invested at `at`
    pub fn new(category: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            level: InvestmentLevel::None,
            score: MIN_SCORE,
            first_invested: Some(at),
            last_cultivated: Some(at),
            cultivation_count: 0,
            cultivation_events: VecDeque::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn level(&self) -> InvestmentLevel {
        self.level
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn first_invested(&self) -> Option<DateTime<Utc>> {
        self.first_invested
    }

    pub fn last_cultivated(&self) -> Option<DateTime<Utc>> {
        self.last_cultivated
    }

    /// All-time number of recorded events, including evicted ones
    pub fn cultivation_count(&self) -> u64 {
        self.cultivation_count
    }

    /// Retained events, oldest first
    pub fn events(&self) -> impl ExactSizeIterator<Item = &CultivationEvent> + '_ {
        self.cultivation_events.iter()
    }

    pub fn event_count(&self) -> usize {
        self.cultivation_events.len()
    }

    /// Days elapsed since the last cultivation, or `None` if never cultivated
    pub fn days_since_cultivated(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_cultivated.map(|last| {
            let millis = (now - last).num_milliseconds().max(0);
            millis as f64 / 86_400_000.0
        })
    }

    /// Append an event to the window.
    ///
    /// The event is placed in timestamp order (after any events with the same
    /// timestamp). When the window exceeds `capacity` the oldest event is
    /// evicted. `cultivation_count` is incremented regardless of eviction.
    pub fn push_event(
        &mut self,
        event: CultivationEvent,
        capacity: usize,
    ) -> std::result::Result<(), ValidationError> {
        if !impact_in_range(event.impact) {
            return Err(ValidationError::ImpactOutOfRange(event.impact));
        }

        let at = event.timestamp;
        let position = self
            .cultivation_events
            .partition_point(|existing| existing.timestamp <= at);
        self.cultivation_events.insert(position, event);

        while self.cultivation_events.len() > capacity {
            self.cultivation_events.pop_front();
        }

        self.cultivation_count += 1;
        self.first_invested = Some(self.first_invested.map_or(at, |first| first.min(at)));
        self.last_cultivated = Some(self.last_cultivated.map_or(at, |last| last.max(at)));
        Ok(())
    }

    /// Set a freshly computed score, clamped to [0, 100], and reclassify.
    ///
    /// Returns the previous level.
    pub fn set_score(&mut self, score: f64) -> InvestmentLevel {
        let previous = self.level;
        self.score = clamp_score(score);
        self.level = LevelClassifier::classify(self.score);
        previous
    }

    /// Restore the invariants on data that did not come through
    /// [`push_event`](Self::push_event), e.g. a persisted document.
    pub fn repair(&mut self, capacity: usize) -> RepairReport {
        let mut report = RepairReport::default();

        let before = self.cultivation_events.len();
        self.cultivation_events.retain(|e| e.has_valid_impact());
        report.dropped_events = before - self.cultivation_events.len();

        let sorted = self
            .cultivation_events
            .iter()
            .zip(self.cultivation_events.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp);
        if !sorted {
            // Stable sort keeps insertion order for equal timestamps
            self.cultivation_events
                .make_contiguous()
                .sort_by_key(|e| e.timestamp);
            report.reordered_events = true;
        }

        while self.cultivation_events.len() > capacity {
            self.cultivation_events.pop_front();
            report.truncated_events += 1;
        }

        let retained = self.cultivation_events.len() as u64;
        if self.cultivation_count < retained {
            self.cultivation_count = retained;
            report.count_raised = true;
        }

        let clamped = clamp_score(self.score);
        if clamped != self.score {
            self.score = clamped;
            report.score_clamped = true;
        }
        let level = LevelClassifier::classify(self.score);
        if level != self.level {
            self.level = level;
            report.level_fixed = true;
        }

        let oldest = self.cultivation_events.front().map(|e| e.timestamp);
        let newest = self.cultivation_events.back().map(|e| e.timestamp);
        let first = match (self.first_invested, oldest) {
            (Some(first), Some(oldest)) => Some(first.min(oldest)),
            (first, oldest) => first.or(oldest),
        };
        let last = match (self.last_cultivated, newest) {
            (Some(last), Some(newest)) => Some(last.max(newest)),
            (last, newest) => last.or(newest),
        };
        let last = match (first, last) {
            (Some(first), Some(last)) if last < first => Some(first),
            (first, None) => first,
            (_, last) => last,
        };
        if first != self.first_invested || last != self.last_cultivated {
            self.first_invested = first;
            self.last_cultivated = last;
            report.timestamps_fixed = true;
        }

        report
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(at: DateTime<Utc>, impact: f64, context: &str) -> CultivationEvent {
        CultivationEvent::new(at, "Security", impact, None, context)
    }

    #[test]
    fn test_new_investment_is_empty() {
        let now = Utc::now();
        let inv = CategoryInvestment::new("Security", now);
        assert_eq!(inv.level(), InvestmentLevel::None);
        assert_eq!(inv.score(), 0.0);
        assert_eq!(inv.cultivation_count(), 0);
        assert_eq!(inv.first_invested(), Some(now));
    }

    #[test]
    fn test_window_evicts_oldest_but_count_keeps_growing() {
        let start = Utc::now();
        let mut inv = CategoryInvestment::new("Security", start);
        for i in 0..5 {
            inv.push_event(event(start + Duration::minutes(i), 0.5, &format!("e{i}")), 3)
                .unwrap();
        }
        assert_eq!(inv.event_count(), 3);
        assert_eq!(inv.cultivation_count(), 5);
        let contexts: Vec<_> = inv.events().map(|e| e.context.as_str()).collect();
        assert_eq!(contexts, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn test_events_kept_in_timestamp_order_with_insertion_tiebreak() {
        let start = Utc::now();
        let mut inv = CategoryInvestment::new("Security", start);
        inv.push_event(event(start + Duration::days(2), 0.1, "late"), 10).unwrap();
        inv.push_event(event(start, 0.1, "first-tie"), 10).unwrap();
        inv.push_event(event(start, 0.1, "second-tie"), 10).unwrap();
        let contexts: Vec<_> = inv.events().map(|e| e.context.as_str()).collect();
        assert_eq!(contexts, vec!["first-tie", "second-tie", "late"]);
        assert!(inv.last_cultivated() >= inv.first_invested());
    }

    #[test]
    fn test_push_rejects_invalid_impact() {
        let now = Utc::now();
        let mut inv = CategoryInvestment::new("Security", now);
        assert_eq!(
            inv.push_event(event(now, 1.5, "bad"), 10),
            Err(ValidationError::ImpactOutOfRange(1.5))
        );
        assert_eq!(inv.cultivation_count(), 0);
        assert_eq!(inv.event_count(), 0);
    }

    #[test]
    fn test_set_score_clamps_and_reclassifies() {
        let mut inv = CategoryInvestment::new("Security", Utc::now());
        let previous = inv.set_score(250.0);
        assert_eq!(previous, InvestmentLevel::None);
        assert_eq!(inv.score(), 100.0);
        assert_eq!(inv.level(), InvestmentLevel::Expert);

        inv.set_score(-3.0);
        assert_eq!(inv.score(), 0.0);
        assert_eq!(inv.level(), InvestmentLevel::None);

        inv.set_score(f64::NAN);
        assert_eq!(inv.score(), 0.0);
    }

    #[test]
    fn test_repair_fixes_tampered_document() {
        let now = Utc::now();
        let json = serde_json::json!({
            "category": "Security",
            "level": "expert",
            "score": 140.0,
            "first_invested": now,
            "last_cultivated": now - Duration::days(3),
            "cultivation_count": 1,
            "cultivation_events": [
                { "timestamp": now, "category": "Security", "learning_id": null, "impact": 0.4, "context": "b" },
                { "timestamp": now - Duration::days(1), "category": "Security", "learning_id": null, "impact": 0.2, "context": "a" },
                { "timestamp": now, "category": "Security", "learning_id": null, "impact": 7.0, "context": "bad" }
            ]
        });
        let mut inv: CategoryInvestment = serde_json::from_value(json).unwrap();
        let report = inv.repair(100);

        assert_eq!(report.dropped_events, 1);
        assert!(report.reordered_events);
        assert!(report.count_raised);
        assert!(report.score_clamped);
        assert!(report.timestamps_fixed);
        assert!(!report.level_fixed);
        assert_eq!(inv.cultivation_count(), 2);
        assert_eq!(inv.level(), LevelClassifier::classify(inv.score()));
        assert!(inv.last_cultivated() >= inv.first_invested());
        let contexts: Vec<_> = inv.events().map(|e| e.context.as_str()).collect();
        assert_eq!(contexts, vec!["a", "b"]);

        assert!(inv.repair(100).is_clean());
    }
}

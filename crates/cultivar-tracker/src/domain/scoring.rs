//! Investment score computation
//!
//! The score is recomputed from the retained event window on every change,
//! never kept as a running counter, so recomputing at the same instant is
//! always idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cultivar_common::{
    CategoryInvestment, CultivationEvent, InvestmentLevel, DEFAULT_EVENT_WINDOW, MAX_SCORE,
    MIN_SCORE,
};

/// Parameters of the time-weighted score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    /// Points contributed by an event of impact 1.0 before time weighting
    pub impact_scale: f64,
    /// Days during which an event receives a recency boost instead of decay
    pub grace_period_days: f64,
    /// Boost for a brand-new event, falling linearly to zero at the end of grace
    pub recency_boost: f64,
    /// Multiplicative loss per day once the grace period is over
    pub daily_decay_rate: f64,
    /// Minimum score drop counted as "decayed" in decay reports
    pub decay_epsilon: f64,
    /// Events retained per investment
    pub max_events: usize,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            impact_scale: 10.0,
            grace_period_days: 30.0,
            recency_boost: 0.2,
            daily_decay_rate: 0.02,
            decay_epsilon: 0.01,
            max_events: DEFAULT_EVENT_WINDOW,
        }
    }
}

impl ScoringParams {
    /// Weight of an event that is `age_days` old
    pub fn time_factor(&self, age_days: f64) -> f64 {
        let age = age_days.max(0.0);
        if age <= self.grace_period_days {
            1.0 + self.recency_boost * (1.0 - age / self.grace_period_days)
        } else {
            (1.0 - self.daily_decay_rate).powf(age - self.grace_period_days)
        }
    }

    /// Points a single event contributes at `now`
    #[inline]
    pub fn contribution(&self, event: &CultivationEvent, now: DateTime<Utc>) -> f64 {
        event.impact * self.impact_scale * self.time_factor(event.age_days(now))
    }

    /// Clamped score of an event window at `now`
    pub fn score_at<'a, I>(&self, events: I, now: DateTime<Utc>) -> f64
    where
        I: IntoIterator<Item = &'a CultivationEvent>,
    {
        let raw: f64 = events
            .into_iter()
            .map(|event| self.contribution(event, now))
            .sum();
        raw.clamp(MIN_SCORE, MAX_SCORE)
    }

    /// Recompute and store the score of `investment` at `now`.
    ///
    /// Returns the level the investment had before.
    pub fn rescore(&self, investment: &mut CategoryInvestment, now: DateTime<Utc>) -> InvestmentLevel {
        let score = self.score_at(investment.events(), now);
        investment.set_score(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn event(at: DateTime<Utc>, impact: f64) -> CultivationEvent {
        CultivationEvent::new(at, "Security", impact, None, "test")
    }

    #[test]
    fn test_time_factor_shape() {
        let params = ScoringParams::default();
        assert!((params.time_factor(0.0) - 1.2).abs() < 1e-12);
        assert!((params.time_factor(3.0) - 1.18).abs() < 1e-12);
        assert!((params.time_factor(15.0) - 1.1).abs() < 1e-12);
        assert!((params.time_factor(30.0) - 1.0).abs() < 1e-12);
        assert!((params.time_factor(31.0) - 0.98).abs() < 1e-12);
        assert!((params.time_factor(40.0) - 0.98f64.powi(10)).abs() < 1e-12);
    }

    #[test]
    fn test_single_fresh_event_capped_at_twelve() {
        let params = ScoringParams::default();
        let now = Utc::now();
        let score = params.score_at([event(now, 1.0)].iter(), now);
        assert!((score - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_secure_specialist_scenario() {
        let params = ScoringParams::default();
        let day0 = Utc::now();
        let day3 = day0 + Duration::days(3);

        let mut inv = CategoryInvestment::new("Security", day0);
        inv.push_event(event(day0, 0.8), 100).unwrap();
        params.rescore(&mut inv, day0);
        assert!((inv.score() - 9.6).abs() < 1e-9);
        assert_eq!(inv.level(), InvestmentLevel::Curious);

        inv.push_event(event(day3, 0.6), 100).unwrap();
        let previous = params.rescore(&mut inv, day3);
        assert_eq!(previous, InvestmentLevel::Curious);
        assert!((inv.score() - 16.64).abs() < 1e-9);
        assert_eq!(inv.level(), InvestmentLevel::Learning);
    }

    #[test]
    fn test_empty_window_scores_zero() {
        let params = ScoringParams::default();
        let mut inv = CategoryInvestment::new("Security", Utc::now());
        params.rescore(&mut inv, Utc::now());
        assert_eq!(inv.score(), 0.0);
        assert_eq!(inv.level(), InvestmentLevel::None);
    }

    #[test]
    fn test_zero_impact_is_inert() {
        let params = ScoringParams::default();
        let now = Utc::now();
        assert_eq!(params.score_at([event(now, 0.0)].iter(), now), 0.0);
    }

    #[test]
    fn test_score_saturates_at_hundred() {
        let params = ScoringParams::default();
        let now = Utc::now();
        let events: Vec<_> = (0..20).map(|_| event(now, 1.0)).collect();
        assert_eq!(params.score_at(events.iter(), now), 100.0);
    }

    proptest! {
        #[test]
        fn score_stays_bounded(
            impacts in proptest::collection::vec(0.0f64..=1.0, 0..150),
            ages in proptest::collection::vec(0i64..400, 150),
        ) {
            let params = ScoringParams::default();
            let now = Utc::now();
            let events: Vec<_> = impacts
                .iter()
                .zip(ages.iter())
                .map(|(impact, age)| event(now - Duration::days(*age), *impact))
                .collect();
            let score = params.score_at(events.iter(), now);
            prop_assert!((0.0..=100.0).contains(&score));
        }

        #[test]
        fn decay_is_monotonic_past_grace(
            impacts in proptest::collection::vec(0.0f64..=1.0, 1..20),
            extra_age in 31i64..200,
            delta in 1i64..120,
        ) {
            let params = ScoringParams::default();
            let now = Utc::now();
            let events: Vec<_> = impacts
                .iter()
                .map(|impact| event(now - Duration::days(extra_age), *impact))
                .collect();
            let earlier = params.score_at(events.iter(), now);
            let later = params.score_at(events.iter(), now + Duration::days(delta));
            prop_assert!(earlier >= later);
        }
    }
}

//! CultivationEvent - a timestamped unit of agent work

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single unit of agent work in a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultivationEvent {
    /// When the work happened
    pub timestamp: DateTime<Utc>,
    /// Canonical category name
    pub category: String,
    /// Learning item that triggered the work, if any
    pub learning_id: Option<String>,
    /// Magnitude of the work (0.0 - 1.0)
    pub impact: f64,
    /// Free-form description of what was done
    pub context: String,
}

impl CultivationEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        category: impl Into<String>,
        impact: f64,
        learning_id: Option<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            category: category.into(),
            learning_id,
            impact,
            context: context.into(),
        }
    }

    /// Whether the impact is a finite value in [0, 1]
    #[inline]
    pub fn has_valid_impact(&self) -> bool {
        impact_in_range(self.impact)
    }

    /// Age of this event at `now` in fractional days, floored at zero
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.timestamp).num_milliseconds().max(0);
        millis as f64 / 86_400_000.0
    }
}

/// Whether `impact` is a finite value in [0, 1]
#[inline]
pub fn impact_in_range(impact: f64) -> bool {
    impact.is_finite() && (0.0..=1.0).contains(&impact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_age_days_is_fractional() {
        let now = Utc::now();
        let event = CultivationEvent::new(now - Duration::hours(36), "Security", 0.5, None, "");
        assert!((event.age_days(now) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_future_event_has_zero_age() {
        let now = Utc::now();
        let event = CultivationEvent::new(now + Duration::days(2), "Security", 0.5, None, "");
        assert_eq!(event.age_days(now), 0.0);
    }

    #[test]
    fn test_impact_range() {
        assert!(impact_in_range(0.0));
        assert!(impact_in_range(1.0));
        assert!(!impact_in_range(1.5));
        assert!(!impact_in_range(-0.1));
        assert!(!impact_in_range(f64::NAN));
    }
}

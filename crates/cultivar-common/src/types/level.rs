//! InvestmentLevel - Ordinal expertise classification
//!
//! A level is always derived from a score; it is never stored or mutated on
//! its own. Thresholds are exclusive upper bounds:
//!
//! ```text
//! score <  5   NONE
//! score < 15   CURIOUS
//! score < 35   LEARNING
//! score < 60   PRACTICING
//! score < 85   PROFICIENT
//! otherwise    EXPERT
//! ```

use serde::{Deserialize, Serialize};

/// Ordinal investment level, ordered from `None` to `Expert`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentLevel {
    None,
    Curious,
    Learning,
    Practicing,
    Proficient,
    Expert,
}

/// Ascending (exclusive upper bound, level) pairs; anything above the last
/// bound is `Expert`.
const LEVEL_THRESHOLDS: [(f64, InvestmentLevel); 5] = [
    (5.0, InvestmentLevel::None),
    (15.0, InvestmentLevel::Curious),
    (35.0, InvestmentLevel::Learning),
    (60.0, InvestmentLevel::Practicing),
    (85.0, InvestmentLevel::Proficient),
];

impl InvestmentLevel {
    /// All levels in ascending order
    pub const ALL: [InvestmentLevel; 6] = [
        InvestmentLevel::None,
        InvestmentLevel::Curious,
        InvestmentLevel::Learning,
        InvestmentLevel::Practicing,
        InvestmentLevel::Proficient,
        InvestmentLevel::Expert,
    ];

    /// Lowest score that classifies as this level
    pub fn min_score(&self) -> f64 {
        match self {
            InvestmentLevel::None => 0.0,
            InvestmentLevel::Curious => 5.0,
            InvestmentLevel::Learning => 15.0,
            InvestmentLevel::Practicing => 35.0,
            InvestmentLevel::Proficient => 60.0,
            InvestmentLevel::Expert => 85.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentLevel::None => "none",
            InvestmentLevel::Curious => "curious",
            InvestmentLevel::Learning => "learning",
            InvestmentLevel::Practicing => "practicing",
            InvestmentLevel::Proficient => "proficient",
            InvestmentLevel::Expert => "expert",
        }
    }
}

impl std::fmt::Display for InvestmentLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvestmentLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvestmentLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown investment level: {s}"))
    }
}

/// Pure score → level mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelClassifier;

impl LevelClassifier {
    /// Classify a score. Non-finite scores classify as `None`.
    #[inline]
    pub fn classify(score: f64) -> InvestmentLevel {
        if !score.is_finite() {
            return InvestmentLevel::None;
        }
        LEVEL_THRESHOLDS
            .iter()
            .find(|(bound, _)| score < *bound)
            .map(|(_, level)| *level)
            .unwrap_or(InvestmentLevel::Expert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(LevelClassifier::classify(0.0), InvestmentLevel::None);
        assert_eq!(LevelClassifier::classify(4.999), InvestmentLevel::None);
        assert_eq!(LevelClassifier::classify(5.0), InvestmentLevel::Curious);
        assert_eq!(LevelClassifier::classify(9.6), InvestmentLevel::Curious);
        assert_eq!(LevelClassifier::classify(15.0), InvestmentLevel::Learning);
        assert_eq!(LevelClassifier::classify(16.64), InvestmentLevel::Learning);
        assert_eq!(LevelClassifier::classify(35.0), InvestmentLevel::Practicing);
        assert_eq!(LevelClassifier::classify(59.99), InvestmentLevel::Practicing);
        assert_eq!(LevelClassifier::classify(60.0), InvestmentLevel::Proficient);
        assert_eq!(LevelClassifier::classify(85.0), InvestmentLevel::Expert);
        assert_eq!(LevelClassifier::classify(100.0), InvestmentLevel::Expert);
    }

    #[test]
    fn test_min_score_round_trips_through_classifier() {
        for level in InvestmentLevel::ALL {
            assert_eq!(LevelClassifier::classify(level.min_score()), level);
        }
    }

    #[test]
    fn test_non_finite_is_none() {
        assert_eq!(LevelClassifier::classify(f64::NAN), InvestmentLevel::None);
        assert_eq!(LevelClassifier::classify(f64::INFINITY), InvestmentLevel::None);
    }

    #[test]
    fn test_level_serde_and_parse() {
        let json = serde_json::to_string(&InvestmentLevel::Proficient).unwrap();
        assert_eq!(json, "\"proficient\"");
        let parsed: InvestmentLevel = "EXPERT".parse().unwrap();
        assert_eq!(parsed, InvestmentLevel::Expert);
        assert!("wizard".parse::<InvestmentLevel>().is_err());
    }

    proptest! {
        #[test]
        fn classify_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(LevelClassifier::classify(lo) <= LevelClassifier::classify(hi));
        }
    }
}

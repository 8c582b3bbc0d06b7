//! Tracker configuration

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cultivar_common::{CultivarError, Result};

use crate::domain::category::CategoryRegistry;
use crate::domain::decay::PrunePolicy;
use crate::domain::ranking::RankingWeights;
use crate::domain::scoring::ScoringParams;

/// Investment tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Persistence configuration
    pub storage: StorageSettings,
    /// Score formula parameters
    pub scoring: ScoringParams,
    /// Opportunity ranking weights
    pub ranking: RankingWeights,
    /// Read-path settings
    pub query: QuerySettings,
    /// Category normalization
    pub categories: CategorySettings,
    /// Opt-in pruning of long-idle, near-zero investments
    pub pruning: PruneSettings,
}

impl TrackerConfig {
    /// Load configuration from defaults, `.env` and `CULTIVAR_*` variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        if let Ok(path) = std::env::var("CULTIVAR_STORE_PATH") {
            cfg.storage.path = PathBuf::from(path);
        }
        if let Some(v) = env_parse("CULTIVAR_LOCK_TIMEOUT_MS")? {
            cfg.storage.lock_timeout_ms = v;
        }
        if let Some(v) = env_parse("CULTIVAR_STALE_LOCK_SECS")? {
            cfg.storage.stale_lock_secs = v;
        }

        // Scoring settings
        if let Some(v) = env_parse("CULTIVAR_MAX_EVENTS")? {
            cfg.scoring.max_events = v;
        }

        // Query and ranking settings
        if let Some(v) = env_parse("CULTIVAR_STALENESS_DAYS")? {
            cfg.query.staleness_days = v;
        }
        if let Some(v) = env_parse("CULTIVAR_NEGLECT_THRESHOLD_DAYS")? {
            cfg.ranking.neglect_threshold_days = v;
        }

        // Category settings
        if let Ok(list) = std::env::var("CULTIVAR_CATEGORIES") {
            cfg.categories.registered = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = env_parse("CULTIVAR_STRICT_CATEGORIES")? {
            cfg.categories.strict = v;
        }

        // Pruning settings
        if let Some(v) = env_parse("CULTIVAR_PRUNE_ENABLED")? {
            cfg.pruning.enabled = v;
        }
        if let Some(v) = env_parse("CULTIVAR_PRUNE_MAX_SCORE")? {
            cfg.pruning.policy.max_score = v;
        }
        if let Some(v) = env_parse("CULTIVAR_PRUNE_MIN_IDLE_DAYS")? {
            cfg.pruning.policy.min_idle_days = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would break the score or ranking invariants
    pub fn validate(&self) -> Result<()> {
        if self.scoring.max_events == 0 {
            return Err(CultivarError::Config("scoring.max_events must be at least 1".into()));
        }
        if !(self.scoring.grace_period_days > 0.0) {
            return Err(CultivarError::Config("scoring.grace_period_days must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.scoring.daily_decay_rate) {
            return Err(CultivarError::Config("scoring.daily_decay_rate must be within [0, 1)".into()));
        }
        if !(self.scoring.impact_scale >= 0.0) || !(self.scoring.recency_boost >= 0.0) {
            return Err(CultivarError::Config(
                "scoring.impact_scale and scoring.recency_boost must be non-negative".into(),
            ));
        }
        if !(self.ranking.neglect_bonus_per_day >= 0.0) || !(self.ranking.neglect_bonus_cap >= 0.0) {
            return Err(CultivarError::Config("ranking neglect bonus must be non-negative".into()));
        }
        if !(self.ranking.neglect_threshold_days.is_finite() && self.ranking.neglect_threshold_days >= 0.0) {
            return Err(CultivarError::Config(
                "ranking.neglect_threshold_days must be finite and non-negative".into(),
            ));
        }
        if self.query.default_top_n == 0 {
            return Err(CultivarError::Config("query.default_top_n must be at least 1".into()));
        }
        if !(self.query.staleness_days >= 0.0) {
            return Err(CultivarError::Config("query.staleness_days must be non-negative".into()));
        }
        if self.categories.strict && self.categories.registered.is_empty() {
            return Err(CultivarError::Config(
                "strict category mode needs at least one registered category".into(),
            ));
        }
        Ok(())
    }

    /// Build the category registry described by these settings
    pub fn category_registry(&self) -> CategoryRegistry {
        if self.categories.strict {
            CategoryRegistry::strict(&self.categories.registered)
        } else {
            CategoryRegistry::with_names(&self.categories.registered)
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CultivarError::Config(format!("{key}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path of the JSON store; the lock lives next to it as `<path>.lock`
    pub path: PathBuf,
    /// How long a writer waits for the exclusive lock
    pub lock_timeout_ms: u64,
    /// Age after which a lock file is considered abandoned
    pub stale_lock_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(crate::DEFAULT_STORE_PATH),
            lock_timeout_ms: crate::DEFAULT_LOCK_TIMEOUT_MS,
            stale_lock_secs: crate::DEFAULT_STALE_LOCK_SECS,
        }
    }
}

/// Read-path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Days without cultivation before a category needs attention
    pub staleness_days: f64,
    /// Default number of ranked opportunities
    pub default_top_n: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            staleness_days: crate::DEFAULT_STALENESS_DAYS,
            default_top_n: crate::DEFAULT_TOP_N,
        }
    }
}

/// Category normalization settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorySettings {
    /// Preferred spellings; in strict mode the only accepted names
    pub registered: Vec<String>,
    /// Reject categories that are not registered
    pub strict: bool,
}

/// Pruning settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneSettings {
    /// Whether the decay binary prunes after decaying
    pub enabled: bool,
    pub policy: PrunePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TrackerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.scoring.max_events, 100);
        assert_eq!(cfg.query.staleness_days, 7.0);
        assert!(!cfg.pruning.enabled);
        assert!(!cfg.category_registry().is_strict());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut cfg = TrackerConfig::default();
        cfg.scoring.max_events = 0;
        assert!(matches!(cfg.validate(), Err(CultivarError::Config(_))));
    }

    #[test]
    fn test_strict_without_categories_rejected() {
        let mut cfg = TrackerConfig::default();
        cfg.categories.strict = true;
        assert!(cfg.validate().is_err());

        cfg.categories.registered = vec!["Security".into()];
        assert!(cfg.validate().is_ok());
        assert!(cfg.category_registry().is_strict());
    }

    #[test]
    fn test_zero_default_top_n_rejected() {
        let mut cfg = TrackerConfig::default();
        cfg.query.default_top_n = 0;
        assert!(matches!(cfg.validate(), Err(CultivarError::Config(_))));
    }

    #[test]
    fn test_non_finite_neglect_threshold_rejected() {
        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            let mut cfg = TrackerConfig::default();
            cfg.ranking.neglect_threshold_days = bad;
            assert!(matches!(cfg.validate(), Err(CultivarError::Config(_))), "{bad}");
        }
    }

    #[test]
    fn test_config_round_trips_as_json() {
        let cfg = TrackerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrackerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scoring, cfg.scoring);
    }
}

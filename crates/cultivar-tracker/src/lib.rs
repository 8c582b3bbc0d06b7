//! # Cultivar Tracker
//!
//! Converts discrete units of agent work ("cultivation events") into a
//! decaying, time-weighted expertise score per (agent, category) pair,
//! classifies that score into ordinal levels, and ranks future work against
//! existing expertise.
//!
//! ## Score Formula
//!
//! ```text
//! score(now) = clamp( Σ e.impact × 10 × time_factor(age_days(e, now)), 0, 100 )
//!
//! time_factor(d) = 1.0 + 0.2 × (1 − d/30)    d ≤ 30   (recency boost)
//!                = 0.98^(d − 30)              d > 30   (2%/day decay)
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     InvestmentTracker                         │
//! │  ┌────────────┐ ┌───────────┐ ┌──────────────┐ ┌───────────┐  │
//! │  │ Cultivation│ │   Decay   │ │ Opportunity  │ │  Expert   │  │
//! │  │  Recorder  │ │  Engine   │ │   Ranker     │ │  Query    │  │
//! │  └─────┬──────┘ └─────┬─────┘ └──────┬───────┘ └─────┬─────┘  │
//! │        │   load→mutate→save (locked) │   load (read-only)     │
//! │  ┌─────┴──────────────┴──────────────┴───────────────┴─────┐  │
//! │  │                   InvestmentStore                        │  │
//! │  │       (JSON file + lock file, or in-memory)              │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is synchronous: every public call is bounded in-memory work plus
//! at most one locked file round trip. Scheduling decay is left to the caller
//! (see the `cultivar-decay` binary).

pub mod config;
pub mod domain;
pub mod infra;
pub mod tracker;

// Re-export core types
pub use cultivar_common::{
    CategoryInvestment, CultivarError, CultivationEvent, InvestmentLevel, LearningItem,
    LevelClassifier, PortfolioSnapshot, Result, ValidationError,
};
pub use domain::category::CategoryRegistry;
pub use domain::decay::{DecayEngine, DecayReport, LevelChange, PrunePolicy, PruneReport};
pub use domain::query::{CategoryExpert, ExpertQuery, InvestmentSummary, StaleCategory};
pub use domain::ranking::{CultivationOpportunity, LevelBonuses, OpportunityRanker, RankingWeights};
pub use domain::recorder::CultivationRecorder;
pub use domain::scoring::ScoringParams;
pub use tracker::InvestmentTracker;

// Re-export infrastructure
pub use infra::file_store::FileInvestmentStore;
pub use infra::memory_store::InMemoryInvestmentStore;
pub use infra::store::InvestmentStore;

/// Default number of opportunities returned by the ranker
pub const DEFAULT_TOP_N: usize = 10;

/// Days without cultivation before a category is reported as stale
pub const DEFAULT_STALENESS_DAYS: f64 = 7.0;

/// Default exclusive-lock wait before a retryable conflict is reported
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Lock files older than this are treated as abandoned by a crashed writer
pub const DEFAULT_STALE_LOCK_SECS: u64 = 30;

/// Default location of the persisted store
pub const DEFAULT_STORE_PATH: &str = "data/agent_investments.json";

//! # Cultivar Common
//!
//! Shared types and errors for the Cultivar agent investment tracker.
//!
//! ## Core Types
//!
//! - [`InvestmentLevel`]: Ordinal expertise level derived from a score
//! - [`LevelClassifier`]: Pure score → level mapping
//! - [`CultivationEvent`]: A timestamped unit of agent work in a category
//! - [`CategoryInvestment`]: Time-weighted expertise for one (agent, category) pair
//! - [`PortfolioSnapshot`]: The complete persisted investment document
//! - [`LearningItem`]: Externally supplied candidate work item

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{CultivarError, Result, ValidationError};
pub use types::{
    event::CultivationEvent,
    investment::{CategoryInvestment, RepairReport},
    learning::LearningItem,
    level::{InvestmentLevel, LevelClassifier},
    snapshot::{AgentPortfolio, PortfolioSnapshot, SCHEMA_VERSION},
};

/// Cultivar version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum investment score value
pub const MAX_SCORE: f64 = 100.0;

/// Minimum investment score value
pub const MIN_SCORE: f64 = 0.0;

/// Default number of cultivation events retained per investment
pub const DEFAULT_EVENT_WINDOW: usize = 100;

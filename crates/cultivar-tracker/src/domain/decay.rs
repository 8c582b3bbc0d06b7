//! Decay engine
//!
//! Recomputes every stored investment for elapsed time without adding
//! events. Because scores are a pure function of (window, now), running the
//! same pass twice with the same `now` changes nothing the second time.
//!
//! Also hosts the opt-in pruning pass. Nothing is ever pruned implicitly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use cultivar_common::{InvestmentLevel, Result};

use super::scoring::ScoringParams;
use crate::infra::store::InvestmentStore;

/// Outcome of a decay pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecayReport {
    /// When the pass was evaluated
    pub evaluated_at: Option<DateTime<Utc>>,
    /// Agents with at least one investment
    pub agents_processed: usize,
    /// Investments recomputed
    pub investments_processed: usize,
    /// Investments whose score dropped by more than the decay epsilon
    pub investments_decayed: usize,
    /// Investments that moved to a different level
    pub level_changes: Vec<LevelChange>,
}

/// A level transition observed during a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelChange {
    pub agent: String,
    pub category: String,
    pub from: InvestmentLevel,
    pub to: InvestmentLevel,
}

/// Which investments an explicit prune removes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrunePolicy {
    /// Only investments at or below this score are candidates
    pub max_score: f64,
    /// ...and only if idle for at least this many days
    pub min_idle_days: f64,
}

impl Default for PrunePolicy {
    fn default() -> Self {
        Self {
            max_score: 1.0,
            min_idle_days: 90.0,
        }
    }
}

impl PrunePolicy {
    fn matches(&self, score: f64, idle_days: Option<f64>) -> bool {
        score <= self.max_score && idle_days.is_some_and(|days| days >= self.min_idle_days)
    }
}

/// Outcome of a prune pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneReport {
    /// (agent, category) pairs removed
    pub removed: Vec<(String, String)>,
    /// Agents left without any investment and dropped
    pub agents_removed: usize,
}

/// Recomputes scores for elapsed time
pub struct DecayEngine {
    store: Arc<dyn InvestmentStore>,
    scoring: ScoringParams,
}

impl DecayEngine {
    pub fn new(store: Arc<dyn InvestmentStore>, scoring: ScoringParams) -> Self {
        Self { store, scoring }
    }

    /// Recompute every investment at `now` in a single locked pass.
    ///
    /// Either the whole pass is persisted or none of it is.
    #[instrument(skip(self))]
    pub fn apply_decay(&self, now: DateTime<Utc>) -> Result<DecayReport> {
        let scoring = &self.scoring;
        let report = self.store.transact(|snapshot| {
            let mut report = DecayReport {
                evaluated_at: Some(now),
                agents_processed: snapshot.agents().count(),
                ..DecayReport::default()
            };

            for (agent, investment) in snapshot.investments_mut() {
                let before = investment.score();
                let previous = scoring.rescore(investment, now);
                report.investments_processed += 1;

                if before - investment.score() > scoring.decay_epsilon {
                    report.investments_decayed += 1;
                }
                if previous != investment.level() {
                    report.level_changes.push(LevelChange {
                        agent: agent.to_string(),
                        category: investment.category().to_string(),
                        from: previous,
                        to: investment.level(),
                    });
                }
            }
            Ok(report)
        })?;

        info!(
            agents = report.agents_processed,
            investments = report.investments_processed,
            decayed = report.investments_decayed,
            level_changes = report.level_changes.len(),
            "Decay pass completed"
        );
        Ok(report)
    }

    /// Remove investments matching `policy`. Only ever called explicitly.
    #[instrument(skip(self))]
    pub fn prune(&self, policy: &PrunePolicy, now: DateTime<Utc>) -> Result<PruneReport> {
        let report = self.store.transact(|snapshot| {
            let candidates: Vec<(String, String)> = snapshot
                .investments
                .iter()
                .flat_map(|(agent, portfolio)| {
                    portfolio
                        .iter()
                        .filter(|(_, inv)| policy.matches(inv.score(), inv.days_since_cultivated(now)))
                        .map(move |(category, _)| (agent.clone(), category.clone()))
                })
                .collect();

            let agents_before = snapshot.agents().count();
            for (agent, category) in &candidates {
                snapshot.remove(agent, category);
            }

            Ok(PruneReport {
                agents_removed: agents_before - snapshot.agents().count(),
                removed: candidates,
            })
        })?;

        info!(
            removed = report.removed.len(),
            agents_removed = report.agents_removed,
            "Prune pass completed"
        );
        Ok(report)
    }
}

//! Cultivation opportunity ranking
//!
//! Ranks externally supplied learning items against an agent's current
//! investments. Two independent incentives compete:
//!
//! - **investment bonus**: deepen an area the agent is already strong in
//! - **neglect bonus**: re-engage a category that has gone stale
//!
//! ```text
//! cultivation_score(item) = max over item.categories (investment_bonus + neglect_bonus)
//!                           + item.base_score
//! ```
//!
//! Items with equal scores keep their input order.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use cultivar_common::{AgentPortfolio, InvestmentLevel, LearningItem, Result, ValidationError};

use super::category::CategoryRegistry;
use crate::infra::store::InvestmentStore;

/// Investment bonus per level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelBonuses {
    pub none: f64,
    pub curious: f64,
    pub learning: f64,
    pub practicing: f64,
    pub proficient: f64,
    pub expert: f64,
}

impl Default for LevelBonuses {
    fn default() -> Self {
        Self {
            none: 0.0,
            curious: 2.0,
            learning: 5.0,
            practicing: 10.0,
            proficient: 15.0,
            expert: 20.0,
        }
    }
}

impl LevelBonuses {
    pub fn get(&self, level: InvestmentLevel) -> f64 {
        match level {
            InvestmentLevel::None => self.none,
            InvestmentLevel::Curious => self.curious,
            InvestmentLevel::Learning => self.learning,
            InvestmentLevel::Practicing => self.practicing,
            InvestmentLevel::Proficient => self.proficient,
            InvestmentLevel::Expert => self.expert,
        }
    }
}

/// Tunable weights of the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    /// Reward for deepening an existing level
    pub level_bonus: LevelBonuses,
    /// Days without cultivation before the neglect bonus starts accruing
    pub neglect_threshold_days: f64,
    /// Neglect bonus gained per day past the threshold
    pub neglect_bonus_per_day: f64,
    /// Upper bound of the neglect bonus
    pub neglect_bonus_cap: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            level_bonus: LevelBonuses::default(),
            neglect_threshold_days: 7.0,
            neglect_bonus_per_day: 0.5,
            neglect_bonus_cap: 25.0,
        }
    }
}

impl RankingWeights {
    /// Bonus for the agent's current level in a category
    pub fn investment_bonus(&self, level: InvestmentLevel) -> f64 {
        self.level_bonus.get(level)
    }

    /// Bonus for a category left idle for `days_since_cultivated`.
    ///
    /// Categories never cultivated (`None`) get nothing: there is no
    /// expertise to atrophy.
    pub fn neglect_bonus(&self, days_since_cultivated: Option<f64>) -> f64 {
        match days_since_cultivated {
            Some(days) if days > self.neglect_threshold_days => ((days - self.neglect_threshold_days)
                * self.neglect_bonus_per_day)
                .min(self.neglect_bonus_cap),
            _ => 0.0,
        }
    }
}

/// A ranked learning item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultivationOpportunity {
    pub item: LearningItem,
    pub cultivation_score: f64,
    /// Category that produced the best bonus; `None` for untagged items
    pub category: Option<String>,
    pub current_level: InvestmentLevel,
    pub investment_bonus: f64,
    pub neglect_bonus: f64,
    pub days_since_cultivated: Option<f64>,
}

/// Ranks learning items against an agent's investments
pub struct OpportunityRanker {
    store: Arc<dyn InvestmentStore>,
    registry: Arc<CategoryRegistry>,
    weights: RankingWeights,
}

impl OpportunityRanker {
    pub fn new(
        store: Arc<dyn InvestmentStore>,
        registry: Arc<CategoryRegistry>,
        weights: RankingWeights,
    ) -> Self {
        Self {
            store,
            registry,
            weights,
        }
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    pub fn find_cultivation_opportunities(
        &self,
        agent: &str,
        available_learnings: &[LearningItem],
        top_n: usize,
    ) -> Result<Vec<CultivationOpportunity>> {
        self.find_cultivation_opportunities_at(agent, available_learnings, top_n, Utc::now())
    }

    /// Rank `available_learnings` for `agent` as of `now`, best first
    #[instrument(skip(self, available_learnings), fields(items = available_learnings.len()))]
    pub fn find_cultivation_opportunities_at(
        &self,
        agent: &str,
        available_learnings: &[LearningItem],
        top_n: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<CultivationOpportunity>> {
        let agent = agent.trim();
        if agent.is_empty() {
            return Err(ValidationError::EmptyAgent.into());
        }
        if top_n == 0 {
            return Err(ValidationError::InvalidTopN(top_n).into());
        }
        if let Some(bad) = available_learnings.iter().find(|i| !i.base_score.is_finite()) {
            return Err(ValidationError::InvalidBaseScore { id: bad.id.clone() }.into());
        }

        let snapshot = self.store.load()?;
        let empty = AgentPortfolio::new();
        let portfolio = snapshot.all_for_agent(agent).unwrap_or(&empty);

        let mut ranked: Vec<CultivationOpportunity> = available_learnings
            .iter()
            .map(|item| {
                let categories = item
                    .categories
                    .iter()
                    .filter(|c| !c.trim().is_empty())
                    .map(|c| self.registry.resolve(c, &snapshot));
                self.score_item(item, categories, portfolio, now)
            })
            .collect();

        // Stable sort: equal scores keep input order
        ranked.sort_by(|a, b| {
            OrderedFloat(b.cultivation_score).cmp(&OrderedFloat(a.cultivation_score))
        });
        ranked.truncate(top_n);

        debug!(agent = %agent, returned = ranked.len(), "Ranked cultivation opportunities");
        Ok(ranked)
    }

    fn score_item(
        &self,
        item: &LearningItem,
        categories: impl Iterator<Item = String>,
        portfolio: &AgentPortfolio,
        now: DateTime<Utc>,
    ) -> CultivationOpportunity {
        let mut best: Option<(String, InvestmentLevel, f64, f64, Option<f64>)> = None;

        for category in categories {
            let investment = portfolio.get(&category);
            let level = investment.map_or(InvestmentLevel::None, |inv| inv.level());
            let days = investment.and_then(|inv| inv.days_since_cultivated(now));
            let investment_bonus = self.weights.investment_bonus(level);
            let neglect_bonus = self.weights.neglect_bonus(days);

            let better = match &best {
                None => true,
                Some((_, _, ib, nb, _)) => {
                    (investment_bonus + neglect_bonus).partial_cmp(&(ib + nb)) == Some(Ordering::Greater)
                }
            };
            if better {
                best = Some((category, level, investment_bonus, neglect_bonus, days));
            }
        }

        match best {
            Some((category, level, investment_bonus, neglect_bonus, days)) => CultivationOpportunity {
                item: item.clone(),
                cultivation_score: investment_bonus + neglect_bonus + item.base_score,
                category: Some(category),
                current_level: level,
                investment_bonus,
                neglect_bonus,
                days_since_cultivated: days,
            },
            None => CultivationOpportunity {
                item: item.clone(),
                cultivation_score: item.base_score,
                category: None,
                current_level: InvestmentLevel::None,
                investment_bonus: 0.0,
                neglect_bonus: 0.0,
                days_since_cultivated: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scoring::ScoringParams;
    use crate::infra::memory_store::InMemoryInvestmentStore;
    use chrono::Duration;
    use cultivar_common::{CategoryInvestment, CultivationEvent, PortfolioSnapshot};

    /// Investment whose only event sits at `last`, scored at `scored_at`
    fn investment(category: &str, impacts: &[f64], last: DateTime<Utc>, scored_at: DateTime<Utc>) -> CategoryInvestment {
        let mut inv = CategoryInvestment::new(category, last);
        for impact in impacts {
            inv.push_event(CultivationEvent::new(last, category, *impact, None, ""), 100)
                .unwrap();
        }
        ScoringParams::default().rescore(&mut inv, scored_at);
        inv
    }

    fn ranker(snapshot: PortfolioSnapshot) -> OpportunityRanker {
        OpportunityRanker::new(
            Arc::new(InMemoryInvestmentStore::with_snapshot(snapshot)),
            Arc::new(CategoryRegistry::open()),
            RankingWeights::default(),
        )
    }

    #[test]
    fn test_bonus_functions() {
        let weights = RankingWeights::default();
        assert_eq!(weights.investment_bonus(InvestmentLevel::None), 0.0);
        assert_eq!(weights.investment_bonus(InvestmentLevel::Proficient), 15.0);
        assert_eq!(weights.neglect_bonus(None), 0.0);
        assert_eq!(weights.neglect_bonus(Some(3.0)), 0.0);
        assert_eq!(weights.neglect_bonus(Some(7.0)), 0.0);
        assert_eq!(weights.neglect_bonus(Some(17.0)), 5.0);
        assert_eq!(weights.neglect_bonus(Some(500.0)), 25.0);
    }

    #[test]
    fn test_investment_bonus_dominates_when_both_fresh() {
        let now = Utc::now();
        let mut snapshot = PortfolioSnapshot::new();
        // 6 × 1.0 × 10 × 1.2 = 72 → PROFICIENT
        snapshot.upsert("alice", investment("Security", &[1.0; 6], now, now));
        // 0.2 × 10 × 1.2 = 2.4 → NONE
        snapshot.upsert("alice", investment("Gardening", &[0.2], now, now));
        assert_eq!(snapshot.get("alice", "Security").unwrap().level(), InvestmentLevel::Proficient);
        assert_eq!(snapshot.get("alice", "Gardening").unwrap().level(), InvestmentLevel::None);

        let items = vec![
            LearningItem::new("g", "Composting", 5.0).with_category("Gardening"),
            LearningItem::new("s", "Fuzzing", 5.0).with_category("Security"),
        ];
        let ranked = ranker(snapshot)
            .find_cultivation_opportunities_at("alice", &items, 10, now)
            .unwrap();
        assert_eq!(ranked[0].item.id, "s");
        assert_eq!(ranked[0].cultivation_score, 20.0);
        assert_eq!(ranked[1].item.id, "g");
        assert_eq!(ranked[1].cultivation_score, 5.0);
    }

    #[test]
    fn test_neglect_bonus_flips_ordering() {
        let now = Utc::now();
        let stale = now - Duration::days(65);
        let mut snapshot = PortfolioSnapshot::new();
        snapshot.upsert("alice", investment("Security", &[1.0; 6], now - Duration::hours(6), now));
        snapshot.upsert("alice", investment("Gardening", &[0.2], stale, now));
        assert_eq!(snapshot.get("alice", "Gardening").unwrap().level(), InvestmentLevel::None);

        let items = vec![
            LearningItem::new("s", "Fuzzing", 5.0).with_category("Security"),
            LearningItem::new("g", "Composting", 5.0).with_category("Gardening"),
        ];
        let ranked = ranker(snapshot)
            .find_cultivation_opportunities_at("alice", &items, 10, now)
            .unwrap();
        assert_eq!(ranked[0].item.id, "g");
        assert_eq!(ranked[0].neglect_bonus, 25.0);
        assert_eq!(ranked[0].investment_bonus, 0.0);
        assert_eq!(ranked[1].item.id, "s");
        assert_eq!(ranked[1].neglect_bonus, 0.0);
    }

    #[test]
    fn test_max_over_categories_and_untagged_items() {
        let now = Utc::now();
        let mut snapshot = PortfolioSnapshot::new();
        snapshot.upsert("alice", investment("Rust", &[1.0; 6], now, now));

        let items = vec![
            LearningItem::new("plain", "Misc", 1.0),
            LearningItem::new("multi", "Async Rust", 1.0)
                .with_category("Unknown")
                .with_category("rust"),
        ];
        let ranked = ranker(snapshot)
            .find_cultivation_opportunities_at("alice", &items, 10, now)
            .unwrap();
        assert_eq!(ranked[0].item.id, "multi");
        assert_eq!(ranked[0].category.as_deref(), Some("Rust"));
        assert_eq!(ranked[1].category, None);
        assert_eq!(ranked[1].cultivation_score, 1.0);
    }

    #[test]
    fn test_ties_keep_input_order_and_top_n_truncates() {
        let items: Vec<_> = (0..5)
            .map(|i| LearningItem::new(format!("item-{i}"), "Same", 3.0))
            .collect();
        let ranked = ranker(PortfolioSnapshot::new())
            .find_cultivation_opportunities("newcomer", &items, 3)
            .unwrap();
        let ids: Vec<_> = ranked.iter().map(|o| o.item.id.as_str()).collect();
        assert_eq!(ids, vec!["item-0", "item-1", "item-2"]);
    }

    #[test]
    fn test_invalid_arguments() {
        let ranker = ranker(PortfolioSnapshot::new());
        let items = vec![LearningItem::new("nan", "Broken", f64::NAN)];
        assert!(ranker.find_cultivation_opportunities("alice", &[], 0).is_err());
        assert!(ranker.find_cultivation_opportunities(" ", &[], 5).is_err());
        assert!(ranker.find_cultivation_opportunities("alice", &items, 5).is_err());
    }
}

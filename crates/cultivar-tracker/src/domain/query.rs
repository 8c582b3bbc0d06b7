//! Read-only expertise queries
//!
//! Cross-agent expert lookups and per-agent summaries used by whatever
//! process routes work to agents. Nothing here writes to the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cultivar_common::{
    AgentPortfolio, CategoryInvestment, InvestmentLevel, Result, ValidationError,
};

use super::category::CategoryRegistry;
use crate::infra::store::InvestmentStore;

/// An agent qualifying as an expert in a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryExpert {
    pub agent: String,
    pub investment: CategoryInvestment,
}

/// A category that has not been cultivated for longer than the staleness threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleCategory {
    pub category: String,
    /// Whole days since last cultivation
    pub days_since: i64,
    pub level: InvestmentLevel,
    pub score: f64,
}

/// Overview of one agent's portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentSummary {
    pub agent: String,
    pub total_investments: usize,
    /// All-time cultivation events across categories
    pub total_cultivations: u64,
    /// Count per level; every level is present
    pub level_distribution: BTreeMap<InvestmentLevel, usize>,
    pub strongest_category: Option<String>,
    /// Most stale first
    pub needs_cultivation: Vec<StaleCategory>,
}

pub struct ExpertQuery {
    store: Arc<dyn InvestmentStore>,
    registry: Arc<CategoryRegistry>,
    staleness_days: f64,
}

impl ExpertQuery {
    pub fn new(
        store: Arc<dyn InvestmentStore>,
        registry: Arc<CategoryRegistry>,
        staleness_days: f64,
    ) -> Self {
        Self {
            store,
            registry,
            staleness_days,
        }
    }

    /// An agent's investments, optionally only those at or above `min_level`
    pub fn get_agent_investments(
        &self,
        agent: &str,
        min_level: Option<InvestmentLevel>,
    ) -> Result<AgentPortfolio> {
        let agent = validated_agent(agent)?;
        let snapshot = self.store.load()?;
        let floor = min_level.unwrap_or(InvestmentLevel::None);

        Ok(snapshot
            .all_for_agent(agent)
            .map(|portfolio| {
                portfolio
                    .iter()
                    .filter(|(_, inv)| inv.level() >= floor)
                    .map(|(category, inv)| (category.clone(), inv.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Agents whose level in `category` is at least `min_level`, highest score first
    #[instrument(skip(self))]
    pub fn get_category_experts(
        &self,
        category: &str,
        min_level: InvestmentLevel,
    ) -> Result<Vec<CategoryExpert>> {
        if category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory.into());
        }
        let snapshot = self.store.load()?;
        let category = self.registry.resolve(category, &snapshot);

        let mut experts: Vec<CategoryExpert> = snapshot
            .all_for_category(&category)
            .filter(|(_, inv)| inv.level() >= min_level)
            .map(|(agent, inv)| CategoryExpert {
                agent: agent.to_string(),
                investment: inv.clone(),
            })
            .collect();

        // Agent order from the snapshot is alphabetical; stable sort keeps it for ties
        experts.sort_by(|a, b| {
            OrderedFloat(b.investment.score()).cmp(&OrderedFloat(a.investment.score()))
        });
        Ok(experts)
    }

    pub fn get_investment_summary(&self, agent: &str) -> Result<InvestmentSummary> {
        self.get_investment_summary_at(agent, Utc::now())
    }

    /// Summary of `agent`'s portfolio as of `now`
    pub fn get_investment_summary_at(
        &self,
        agent: &str,
        now: DateTime<Utc>,
    ) -> Result<InvestmentSummary> {
        let agent = validated_agent(agent)?;
        let snapshot = self.store.load()?;
        let empty = AgentPortfolio::new();
        let portfolio = snapshot.all_for_agent(agent).unwrap_or(&empty);

        let mut level_distribution: BTreeMap<InvestmentLevel, usize> =
            InvestmentLevel::ALL.into_iter().map(|level| (level, 0)).collect();
        for inv in portfolio.values() {
            *level_distribution.entry(inv.level()).or_default() += 1;
        }

        let strongest_category = portfolio
            .values()
            .filter(|inv| inv.score() > 0.0)
            .max_by_key(|inv| OrderedFloat(inv.score()))
            .map(|inv| inv.category().to_string());

        let mut needs_cultivation: Vec<StaleCategory> = portfolio
            .values()
            .filter_map(|inv| {
                let days = inv.days_since_cultivated(now)?;
                (days > self.staleness_days).then(|| StaleCategory {
                    category: inv.category().to_string(),
                    days_since: days.floor() as i64,
                    level: inv.level(),
                    score: inv.score(),
                })
            })
            .collect();
        needs_cultivation.sort_by(|a, b| b.days_since.cmp(&a.days_since));

        Ok(InvestmentSummary {
            agent: agent.to_string(),
            total_investments: portfolio.len(),
            total_cultivations: portfolio.values().map(|inv| inv.cultivation_count()).sum(),
            level_distribution,
            strongest_category,
            needs_cultivation,
        })
    }
}

fn validated_agent(agent: &str) -> Result<&str> {
    let agent = agent.trim();
    if agent.is_empty() {
        return Err(ValidationError::EmptyAgent.into());
    }
    Ok(agent)
}

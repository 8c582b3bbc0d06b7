//! PortfolioSnapshot - the complete persisted investment document
//!
//! ```text
//! { "last_updated": ts|null, "version": "1.0",
//!   "investments": { agent: { category: CategoryInvestment } } }
//! ```
//!
//! Ordered maps keep the serialized form deterministic.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::investment::{CategoryInvestment, RepairReport};

/// Persisted schema version
pub const SCHEMA_VERSION: &str = "1.0";

/// category → investment for a single agent
pub type AgentPortfolio = BTreeMap<String, CategoryInvestment>;

/// All investments of all agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub investments: BTreeMap<String, AgentPortfolio>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for PortfolioSnapshot {
    fn default() -> Self {
        Self {
            last_updated: None,
            version: default_version(),
            investments: BTreeMap::new(),
        }
    }
}

impl PortfolioSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.investments.values().all(|p| p.is_empty())
    }

    pub fn get(&self, agent: &str, category: &str) -> Option<&CategoryInvestment> {
        self.investments.get(agent)?.get(category)
    }

    pub fn get_mut(&mut self, agent: &str, category: &str) -> Option<&mut CategoryInvestment> {
        self.investments.get_mut(agent)?.get_mut(category)
    }

    /// Insert or replace the investment keyed by its own category
    pub fn upsert(&mut self, agent: &str, investment: CategoryInvestment) {
        self.investments
            .entry(agent.to_string())
            .or_default()
            .insert(investment.category().to_string(), investment);
    }

    pub fn all_for_agent(&self, agent: &str) -> Option<&AgentPortfolio> {
        self.investments.get(agent)
    }

    /// Every agent's investment in `category`, ordered by agent name
    pub fn all_for_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a CategoryInvestment)> + 'a {
        self.investments
            .iter()
            .filter_map(move |(agent, portfolio)| {
                portfolio.get(category).map(|inv| (agent.as_str(), inv))
            })
    }

    /// Remove one investment, dropping the agent once it has none left
    pub fn remove(&mut self, agent: &str, category: &str) -> Option<CategoryInvestment> {
        let portfolio = self.investments.get_mut(agent)?;
        let removed = portfolio.remove(category);
        if portfolio.is_empty() {
            self.investments.remove(agent);
        }
        removed
    }

    pub fn agents(&self) -> impl Iterator<Item = &str> + '_ {
        self.investments.keys().map(String::as_str)
    }

    /// Distinct category names across all agents
    pub fn categories(&self) -> BTreeSet<&str> {
        self.investments
            .values()
            .flat_map(|p| p.keys().map(String::as_str))
            .collect()
    }

    pub fn investment_count(&self) -> usize {
        self.investments.values().map(|p| p.len()).sum()
    }

    /// Mutable walk over every (agent, investment) pair
    pub fn investments_mut(
        &mut self,
    ) -> impl Iterator<Item = (&str, &mut CategoryInvestment)> + '_ {
        self.investments.iter_mut().flat_map(|(agent, portfolio)| {
            portfolio
                .values_mut()
                .map(move |inv| (agent.as_str(), inv))
        })
    }

    /// Repair every investment; returns only the entries that needed fixing
    pub fn repair(&mut self, capacity: usize) -> Vec<(String, String, RepairReport)> {
        let mut repaired = Vec::new();
        for (agent, portfolio) in self.investments.iter_mut() {
            for (category, investment) in portfolio.iter_mut() {
                let report = investment.repair(capacity);
                if !report.is_clean() {
                    repaired.push((agent.clone(), category.clone(), report));
                }
            }
        }
        repaired
    }
}

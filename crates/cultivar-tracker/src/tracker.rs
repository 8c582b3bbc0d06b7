//! InvestmentTracker facade
//!
//! Wires one store and one category registry into the recorder, decay
//! engine, ranker and query components so callers deal with a single handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use cultivar_common::{
    AgentPortfolio, CategoryInvestment, InvestmentLevel, LearningItem, Result,
};

use crate::config::TrackerConfig;
use crate::domain::decay::{DecayEngine, DecayReport, PrunePolicy, PruneReport};
use crate::domain::query::{CategoryExpert, ExpertQuery, InvestmentSummary};
use crate::domain::ranking::{CultivationOpportunity, OpportunityRanker};
use crate::domain::recorder::CultivationRecorder;
use crate::infra::file_store::FileInvestmentStore;
use crate::infra::store::InvestmentStore;

/// Single entry point to the investment tracker
pub struct InvestmentTracker {
    config: TrackerConfig,
    store: Arc<dyn InvestmentStore>,
    recorder: CultivationRecorder,
    decay: DecayEngine,
    ranker: OpportunityRanker,
    query: ExpertQuery,
}

impl InvestmentTracker {
    /// Open a tracker backed by the JSON file named in `config`
    pub fn open(config: TrackerConfig) -> Result<Self> {
        let store = FileInvestmentStore::from_settings(&config.storage, config.scoring.max_events);
        info!(path = %store.path().display(), "Opening investment store");
        Self::with_store(Arc::new(store), config)
    }

    /// Build a tracker over an arbitrary store
    pub fn with_store(store: Arc<dyn InvestmentStore>, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(config.category_registry());

        Ok(Self {
            recorder: CultivationRecorder::new(store.clone(), registry.clone(), config.scoring.clone()),
            decay: DecayEngine::new(store.clone(), config.scoring.clone()),
            ranker: OpportunityRanker::new(store.clone(), registry.clone(), config.ranking.clone()),
            query: ExpertQuery::new(store.clone(), registry, config.query.staleness_days),
            store,
            config,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn InvestmentStore> {
        &self.store
    }

    /// Record a cultivation event for `agent` in `category` happening now
    pub fn record_cultivation(
        &self,
        agent: &str,
        category: &str,
        impact: f64,
        learning_id: Option<&str>,
        context: &str,
    ) -> Result<CategoryInvestment> {
        self.recorder.record(agent, category, impact, learning_id, context)
    }

    /// Record a cultivation event that happened at `at`
    pub fn record_cultivation_at(
        &self,
        agent: &str,
        category: &str,
        impact: f64,
        learning_id: Option<&str>,
        context: &str,
        at: DateTime<Utc>,
    ) -> Result<CategoryInvestment> {
        self.recorder.record_at(agent, category, impact, learning_id, context, at)
    }

    pub fn get_agent_investments(
        &self,
        agent: &str,
        min_level: Option<InvestmentLevel>,
    ) -> Result<AgentPortfolio> {
        self.query.get_agent_investments(agent, min_level)
    }

    pub fn get_category_experts(
        &self,
        category: &str,
        min_level: InvestmentLevel,
    ) -> Result<Vec<CategoryExpert>> {
        self.query.get_category_experts(category, min_level)
    }

    /// Rank `available_learnings` for `agent`; `None` uses the configured default count
    pub fn find_cultivation_opportunities(
        &self,
        agent: &str,
        available_learnings: &[LearningItem],
        top_n: Option<usize>,
    ) -> Result<Vec<CultivationOpportunity>> {
        self.find_cultivation_opportunities_at(agent, available_learnings, top_n, Utc::now())
    }

    pub fn find_cultivation_opportunities_at(
        &self,
        agent: &str,
        available_learnings: &[LearningItem],
        top_n: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CultivationOpportunity>> {
        let top_n = top_n.unwrap_or(self.config.query.default_top_n);
        self.ranker
            .find_cultivation_opportunities_at(agent, available_learnings, top_n, now)
    }

    pub fn get_investment_summary(&self, agent: &str) -> Result<InvestmentSummary> {
        self.query.get_investment_summary(agent)
    }

    pub fn get_investment_summary_at(
        &self,
        agent: &str,
        now: DateTime<Utc>,
    ) -> Result<InvestmentSummary> {
        self.query.get_investment_summary_at(agent, now)
    }

    /// Recompute every investment for time elapsed up to the current instant
    pub fn apply_decay(&self) -> Result<DecayReport> {
        self.apply_decay_at(Utc::now())
    }

    /// Recompute every investment for time elapsed up to `now`
    pub fn apply_decay_at(&self, now: DateTime<Utc>) -> Result<DecayReport> {
        self.decay.apply_decay(now)
    }

    /// Remove investments matching `policy`
    pub fn prune(&self, policy: &PrunePolicy, now: DateTime<Utc>) -> Result<PruneReport> {
        self.decay.prune(policy, now)
    }

    /// Prune with the configured policy, if pruning is enabled
    pub fn prune_if_enabled(&self, now: DateTime<Utc>) -> Result<Option<PruneReport>> {
        if !self.config.pruning.enabled {
            return Ok(None);
        }
        self.prune(&self.config.pruning.policy, now).map(Some)
    }
}

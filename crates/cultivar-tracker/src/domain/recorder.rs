//! Cultivation recording
//!
//! Appends a cultivation event to an (agent, category) investment, recomputes
//! the score over the retained window, reclassifies and persists, all inside
//! one locked store transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use cultivar_common::{
    types::event::impact_in_range, CategoryInvestment, CultivationEvent, Result, ValidationError,
};

use super::category::CategoryRegistry;
use super::scoring::ScoringParams;
use crate::infra::store::InvestmentStore;

/// Records cultivation events against the store
pub struct CultivationRecorder {
    store: Arc<dyn InvestmentStore>,
    registry: Arc<CategoryRegistry>,
    scoring: ScoringParams,
}

impl CultivationRecorder {
    pub fn new(
        store: Arc<dyn InvestmentStore>,
        registry: Arc<CategoryRegistry>,
        scoring: ScoringParams,
    ) -> Self {
        Self {
            store,
            registry,
            scoring,
        }
    }

    /// Record a cultivation event happening now
    pub fn record(
        &self,
        agent: &str,
        category: &str,
        impact: f64,
        learning_id: Option<&str>,
        context: &str,
    ) -> Result<CategoryInvestment> {
        self.record_at(agent, category, impact, learning_id, context, Utc::now())
    }

    /// Record a cultivation event that happened at `at`.
    ///
    /// Input is validated before the store is touched; invalid input is
    /// rejected, never clamped. The score is recomputed at the latest of `at`
    /// and the last cultivation, so a backfilled event never makes newer
    /// events look fresher than they are.
    #[instrument(skip(self, learning_id, context))]
    pub fn record_at(
        &self,
        agent: &str,
        category: &str,
        impact: f64,
        learning_id: Option<&str>,
        context: &str,
        at: DateTime<Utc>,
    ) -> Result<CategoryInvestment> {
        let agent = agent.trim();
        if agent.is_empty() {
            return Err(ValidationError::EmptyAgent.into());
        }
        if !impact_in_range(impact) {
            return Err(ValidationError::ImpactOutOfRange(impact).into());
        }
        self.registry.validate(category)?;

        let capacity = self.scoring.max_events;
        self.store.transact(|snapshot| {
            let category = self.registry.canonicalize(category, snapshot)?;
            let event = CultivationEvent::new(
                at,
                category.clone(),
                impact,
                learning_id.map(str::to_string),
                context,
            );

            let mut investment = snapshot
                .get(agent, &category)
                .cloned()
                .unwrap_or_else(|| CategoryInvestment::new(category.clone(), at));
            investment.push_event(event, capacity)?;
            let evaluated_at = investment.last_cultivated().map_or(at, |last| last.max(at));
            let previous = self.scoring.rescore(&mut investment, evaluated_at);

            if previous != investment.level() {
                info!(
                    agent = %agent,
                    category = %category,
                    from = %previous,
                    to = %investment.level(),
                    score = investment.score(),
                    "Investment level changed"
                );
            } else {
                debug!(score = investment.score(), count = investment.cultivation_count(), "Cultivation recorded");
            }

            snapshot.upsert(agent, investment.clone());
            Ok(investment)
        })
    }
}

//! In-memory store for tests and embedding

use chrono::Utc;
use parking_lot::Mutex;

use cultivar_common::{PortfolioSnapshot, Result};

use super::store::InvestmentStore;

/// Snapshot held behind a mutex; `update` mutates a copy and commits it only
/// on success.
#[derive(Debug, Default)]
pub struct InMemoryInvestmentStore {
    snapshot: Mutex<PortfolioSnapshot>,
}

impl InMemoryInvestmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: PortfolioSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl InvestmentStore for InMemoryInvestmentStore {
    fn load(&self) -> Result<PortfolioSnapshot> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &PortfolioSnapshot) -> Result<()> {
        *self.snapshot.lock() = snapshot.clone();
        Ok(())
    }

    fn update(&self, mutate: &mut dyn FnMut(&mut PortfolioSnapshot) -> Result<()>) -> Result<()> {
        let mut guard = self.snapshot.lock();
        let mut working = guard.clone();
        mutate(&mut working)?;
        working.last_updated = Some(Utc::now());
        *guard = working;
        Ok(())
    }
}

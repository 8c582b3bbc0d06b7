//! InvestmentStore - durable (agent, category) → CategoryInvestment map
//!
//! Concurrency contract: every load → mutate → save sequence goes through
//! [`InvestmentStore::update`], which holds the backend's exclusive lock for
//! the whole sequence. If the mutation fails nothing is written.

use cultivar_common::{PortfolioSnapshot, Result};

/// Storage backend for the investment portfolio
pub trait InvestmentStore: Send + Sync {
    /// Read the persisted snapshot.
    ///
    /// Corrupt data is recovered to an empty snapshot with a warning; only
    /// genuine I/O failures are returned as errors.
    fn load(&self) -> Result<PortfolioSnapshot>;

    /// Atomically replace the persisted snapshot
    fn save(&self, snapshot: &PortfolioSnapshot) -> Result<()>;

    /// Locked load → mutate → save. Nothing is saved if `mutate` fails.
    fn update(&self, mutate: &mut dyn FnMut(&mut PortfolioSnapshot) -> Result<()>) -> Result<()>;

    /// Number of loads that had to recover from corrupt data
    fn corruption_recoveries(&self) -> u64 {
        0
    }
}

impl dyn InvestmentStore {
    /// Run `f` inside [`update`](InvestmentStore::update) and hand back its value
    pub fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PortfolioSnapshot) -> Result<T>,
    {
        let mut f = Some(f);
        let mut output = None;
        self.update(&mut |snapshot| {
            let f = f.take().ok_or_else(|| {
                cultivar_common::CultivarError::Internal("transaction body ran twice".into())
            })?;
            output = Some(f(snapshot)?);
            Ok(())
        })?;
        output.ok_or_else(|| {
            cultivar_common::CultivarError::Internal("transaction produced no value".into())
        })
    }
}

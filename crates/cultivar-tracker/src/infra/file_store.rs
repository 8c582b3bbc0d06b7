//! JSON file store
//!
//! The snapshot is a single JSON document. Writes go to a temp file in the
//! same directory, are fsynced, then renamed over the target, so a crash never
//! leaves a half-written store. Every write holds `<path>.lock`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use cultivar_common::{CultivarError, PortfolioSnapshot, Result, DEFAULT_EVENT_WINDOW};

use super::lock::StoreLock;
use super::store::InvestmentStore;
use crate::config::StorageSettings;

/// File-backed investment store
#[derive(Debug)]
pub struct FileInvestmentStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    stale_lock_after: Duration,
    /// Event window enforced when repairing loaded data
    max_events: usize,
    recoveries: AtomicU64,
}

impl FileInvestmentStore {
    /// Store at `path` with default lock settings
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let settings = StorageSettings {
            path: path.into(),
            ..StorageSettings::default()
        };
        Self::from_settings(&settings, DEFAULT_EVENT_WINDOW)
    }

    pub fn from_settings(settings: &StorageSettings, max_events: usize) -> Self {
        let mut lock_name = settings.path.as_os_str().to_os_string();
        lock_name.push(".lock");
        Self {
            path: settings.path.clone(),
            lock_path: PathBuf::from(lock_name),
            lock_timeout: Duration::from_millis(settings.lock_timeout_ms),
            stale_lock_after: Duration::from_secs(settings.stale_lock_secs),
            max_events,
            recoveries: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn lock(&self) -> Result<StoreLock> {
        if let Some(parent) = self.lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        StoreLock::acquire(&self.lock_path, self.lock_timeout, self.stale_lock_after)
    }

    /// Read without taking the lock; callers that mutate must hold it.
    fn read_unlocked(&self) -> Result<PortfolioSnapshot> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PortfolioSnapshot::new());
            }
            Err(e) => {
                return Err(CultivarError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(PortfolioSnapshot::new());
        }

        let mut snapshot: PortfolioSnapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.recoveries.fetch_add(1, Ordering::Relaxed);
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Investment store is corrupt; continuing with an empty store until the next save"
                );
                return Ok(PortfolioSnapshot::new());
            }
        };

        for (agent, category, report) in snapshot.repair(self.max_events) {
            warn!(agent = %agent, category = %category, ?report, "Repaired persisted investment");
        }

        Ok(snapshot)
    }

    fn write_unlocked(&self, snapshot: &PortfolioSnapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "investments.json".to_string());
        let tmp = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::now_v7()));

        let data = serde_json::to_vec_pretty(snapshot)?;
        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(CultivarError::Storage(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            )));
        }

        // Flush the directory entry so the rename survives a crash
        if let Ok(dir_file) = fs::File::open(&dir) {
            let _ = dir_file.sync_all();
        }

        debug!(path = %self.path.display(), bytes = data.len(), "Investment store saved");
        Ok(())
    }
}

impl InvestmentStore for FileInvestmentStore {
    fn load(&self) -> Result<PortfolioSnapshot> {
        self.read_unlocked()
    }

    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    fn save(&self, snapshot: &PortfolioSnapshot) -> Result<()> {
        let lock = self.lock()?;
        lock.ensure_held()?;
        self.write_unlocked(snapshot)
    }

    fn update(&self, mutate: &mut dyn FnMut(&mut PortfolioSnapshot) -> Result<()>) -> Result<()> {
        let lock = self.lock()?;
        let mut snapshot = self.read_unlocked()?;
        mutate(&mut snapshot)?;
        snapshot.last_updated = Some(Utc::now());
        // A holder that outlived the staleness threshold must not overwrite the new owner
        lock.ensure_held()?;
        self.write_unlocked(&snapshot)
    }

    fn corruption_recoveries(&self) -> u64 {
        self.recoveries.load(Ordering::Relaxed)
    }
}

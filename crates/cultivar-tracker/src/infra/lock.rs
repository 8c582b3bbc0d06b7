//! Advisory cross-process lock backed by a lock file
//!
//! The lock file is created with `create_new`, so exactly one process can hold
//! it, and carries a unique owner token. A holder only ever deletes the file
//! while it still carries its own token.
//!
//! A lock file older than the staleness threshold is assumed to belong to a
//! crashed writer. Reclaiming it happens under a short-lived `<lock>.reclaim`
//! guard and only removes the exact file that was judged stale, so two
//! waiters can never both take over the same stale lock. Release takes the
//! same guard.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};
use uuid::Uuid;

use cultivar_common::{CultivarError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long a release waits for the reclaim guard before leaving the file behind
const RELEASE_WAIT: Duration = Duration::from_secs(1);

/// RAII guard; the lock file is removed on drop if it is still ours
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    token: String,
}

impl StoreLock {
    /// Acquire the lock at `path`, waiting at most `timeout`.
    ///
    /// Returns [`CultivarError::ConcurrencyConflict`] when the wait expires.
    pub fn acquire(path: &Path, timeout: Duration, stale_after: Duration) -> Result<Self> {
        let token = Uuid::now_v7().to_string();
        let start = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let written = file
                        .write_all(token.as_bytes())
                        .and_then(|_| file.sync_all());
                    if let Err(e) = written {
                        let _ = fs::remove_file(path);
                        return Err(CultivarError::Storage(format!(
                            "failed to write lock {}: {}",
                            path.display(),
                            e
                        )));
                    }
                    debug!(lock = %path.display(), waited_ms = start.elapsed().as_millis() as u64, "Store lock acquired");
                    return Ok(Self {
                        path: path.to_path_buf(),
                        token,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(owner) = stale_owner(path, stale_after) {
                        if reclaim(path, &owner, stale_after) {
                            continue;
                        }
                    }
                    if start.elapsed() >= timeout {
                        return Err(CultivarError::ConcurrencyConflict {
                            resource: path.display().to_string(),
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(CultivarError::Storage(format!(
                        "failed to create lock {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fails with a retryable conflict if the lock was reclaimed from under us.
    ///
    /// Call right before committing a write.
    pub fn ensure_held(&self) -> Result<()> {
        if owned_by(&self.path, &self.token) {
            return Ok(());
        }
        warn!(lock = %self.path.display(), "Store lock was reclaimed while held");
        Err(CultivarError::ConcurrencyConflict {
            resource: self.path.display().to_string(),
            waited_ms: 0,
        })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let deadline = Instant::now() + RELEASE_WAIT;
        let guard = loop {
            // Release never reclaims a crashed guard; it only waits for it
            match ReclaimGuard::try_acquire(&self.path, None) {
                Some(guard) => break Some(guard),
                None if Instant::now() >= deadline => break None,
                None => std::thread::sleep(POLL_INTERVAL),
            }
        };
        let Some(_guard) = guard else {
            warn!(lock = %self.path.display(), "Reclaim guard busy; leaving store lock to go stale");
            return;
        };
        if owned_by(&self.path, &self.token) {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn owned_by(path: &Path, token: &str) -> bool {
    fs::read_to_string(path).is_ok_and(|owner| owner == token)
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
        .is_some_and(|age| age > stale_after)
}

/// Owner token of the lock at `path` if the lock is stale
fn stale_owner(path: &Path, stale_after: Duration) -> Option<String> {
    if !is_stale(path, stale_after) {
        return None;
    }
    fs::read_to_string(path).ok()
}

/// Remove the stale lock at `path` if it still carries `owner`.
///
/// Returns true if the caller should retry acquisition right away.
fn reclaim(path: &Path, owner: &str, stale_after: Duration) -> bool {
    let Some(_guard) = ReclaimGuard::try_acquire(path, Some(stale_after)) else {
        return false;
    };
    if !(owned_by(path, owner) && is_stale(path, stale_after)) {
        return true;
    }
    warn!(lock = %path.display(), "Removing stale store lock");
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => e.kind() == ErrorKind::NotFound,
    }
}

/// Serializes stale-lock removal and lock release
struct ReclaimGuard {
    path: PathBuf,
}

impl ReclaimGuard {
    /// Take the guard next to `lock` without waiting.
    ///
    /// With `stale_after`, a guard left behind by a crashed process is removed
    /// so a later attempt can succeed.
    fn try_acquire(lock: &Path, stale_after: Option<Duration>) -> Option<Self> {
        let mut name = lock.as_os_str().to_os_string();
        name.push(".reclaim");
        let path = PathBuf::from(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Some(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if stale_after.is_some_and(|after| is_stale(&path, after)) {
                    warn!(guard = %path.display(), "Removing abandoned reclaim guard");
                    let _ = fs::remove_file(&path);
                }
                None
            }
            Err(_) => None,
        }
    }
}

impl Drop for ReclaimGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(30);

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.lock");
        {
            let lock = StoreLock::acquire(&path, Duration::from_millis(100), LONG).unwrap();
            assert!(lock.path().exists());
            assert!(lock.ensure_held().is_ok());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_held_lock_times_out_as_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.lock");
        let _held = StoreLock::acquire(&path, Duration::from_millis(100), LONG).unwrap();

        let err = StoreLock::acquire(&path, Duration::from_millis(60), LONG).unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, CultivarError::ConcurrencyConflict { .. }));
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.lock");
        fs::write(&path, "crashed writer").unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let lock = StoreLock::acquire(&path, Duration::from_millis(100), Duration::from_millis(10)).unwrap();
        assert!(lock.ensure_held().is_ok());
    }

    #[test]
    fn test_slow_holder_does_not_release_new_owners_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.lock");
        let stale_after = Duration::from_millis(10);

        let slow = StoreLock::acquire(&path, Duration::from_millis(100), stale_after).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let current = StoreLock::acquire(&path, Duration::from_millis(100), stale_after).unwrap();

        assert!(slow.ensure_held().unwrap_err().is_retryable());
        drop(slow);
        assert!(path.exists());
        assert!(current.ensure_held().is_ok());

        drop(current);
        assert!(!path.exists());
    }

    #[test]
    fn test_reclaim_skips_lock_with_a_different_owner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.lock");
        fs::write(&path, "new-owner").unwrap();
        std::thread::sleep(Duration::from_millis(50));

        // Judged stale while it belonged to "old-owner"; the file changed hands since
        reclaim(&path, "old-owner", Duration::from_millis(10));
        assert_eq!(fs::read_to_string(&path).unwrap(), "new-owner");

        assert!(reclaim(&path, "new-owner", Duration::from_millis(10)));
        assert!(!path.exists());
    }

    #[test]
    fn test_busy_reclaim_guard_blocks_takeover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.lock");
        fs::write(&path, "crashed writer").unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let guard = ReclaimGuard::try_acquire(&path, None).unwrap();
        assert!(!reclaim(&path, "crashed writer", Duration::from_secs(5)));
        assert!(path.exists());
        drop(guard);

        assert!(reclaim(&path, "crashed writer", Duration::from_millis(10)));
        assert!(!path.exists());
    }
}

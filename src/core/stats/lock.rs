//! Advisory locking for the statistics file.
//!
//! The statistics file is replaced by rename on every flush, so its inode
//! changes. The lock is therefore taken on a sidecar file next to it
//! (`<stats>.lock`) that is never replaced.

use crate::error::StatsError;
use std::fs::{File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Pause between attempts while waiting for the lock
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// A held advisory lock, released on drop
#[derive(Debug)]
pub struct StatsLock {
    file: File,
    path: PathBuf,
}

impl StatsLock {
    /// Path of the lock file guarding `stats_path`
    pub fn path_for(stats_path: &Path) -> PathBuf {
        let mut name = stats_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        stats_path.with_file_name(name)
    }

    /// Try to take the lock, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` if another holder kept it for the whole interval.
    pub fn acquire(
        lock_path: &Path,
        mode: LockMode,
        timeout: Duration,
    ) -> Result<Option<StatsLock>, StatsError> {
        let file = open_lock_file(lock_path).map_err(|source| StatsError::Lock {
            path: lock_path.to_path_buf(),
            source,
        })?;

        let deadline = Instant::now() + timeout;
        loop {
            let attempt = match mode {
                LockMode::Shared => file.try_lock_shared(),
                LockMode::Exclusive => file.try_lock(),
            };

            match attempt {
                Ok(()) => {
                    return Ok(Some(StatsLock {
                        file,
                        path: lock_path.to_path_buf(),
                    }))
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(TryLockError::Error(source)) => {
                    return Err(StatsError::Lock {
                        path: lock_path.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }

    /// Check that the platform supports locking at `lock_path`.
    ///
    /// A lock currently held elsewhere counts as supported.
    pub fn probe(lock_path: &Path) -> io::Result<()> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock() {
            Ok(()) => file.unlock(),
            Err(TryLockError::WouldBlock) => Ok(()),
            Err(TryLockError::Error(e)) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StatsLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_path_sits_next_to_stats_file() {
        let path = StatsLock::path_for(Path::new("/library/Photo_Organizer_Statistics.json"));
        assert_eq!(
            path,
            Path::new("/library/Photo_Organizer_Statistics.json.lock")
        );
    }

    #[test]
    fn exclusive_lock_excludes_second_holder() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("stats.json.lock");

        let held = StatsLock::acquire(&lock_path, LockMode::Exclusive, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(held.path(), lock_path.as_path());

        let second =
            StatsLock::acquire(&lock_path, LockMode::Exclusive, Duration::from_millis(60)).unwrap();
        assert!(second.is_none());

        drop(held);
        let third = StatsLock::acquire(&lock_path, LockMode::Exclusive, Duration::ZERO).unwrap();
        assert!(third.is_some());
    }

    #[test]
    fn shared_locks_coexist() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("stats.json.lock");

        let first = StatsLock::acquire(&lock_path, LockMode::Shared, Duration::ZERO).unwrap();
        let second = StatsLock::acquire(&lock_path, LockMode::Shared, Duration::ZERO).unwrap();
        assert!(first.is_some());
        assert!(second.is_some());
    }

    #[test]
    fn probe_succeeds_on_local_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        assert!(StatsLock::probe(&temp_dir.path().join("stats.json.lock")).is_ok());
    }

    #[test]
    fn unopenable_lock_file_is_an_error() {
        let result = StatsLock::acquire(
            Path::new("/nonexistent/dir/stats.json.lock"),
            LockMode::Exclusive,
            Duration::ZERO,
        );
        assert!(matches!(result, Err(StatsError::Lock { .. })));
    }
}

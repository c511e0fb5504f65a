//! The single owner of the statistics record.

use super::lock::{LockMode, StatsLock};
use super::record::{Adjustment, Category, PersistedStatistics, StatisticsRecord};
use crate::error::StatsError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// File name of the statistics file inside the destination root
pub const STATS_FILE_NAME: &str = "Photo_Organizer_Statistics.json";

/// When the in-memory record is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Flush after this many operations
    pub every_ops: u32,
    /// Flush once this much time has passed with pending operations
    pub interval: Duration,
    /// Longest wait for the file lock before deferring
    pub lock_timeout: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            every_ops: 10,
            interval: Duration::from_secs(30),
            lock_timeout: Duration::from_secs(2),
        }
    }
}

/// Result of a flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Nothing pending
    Clean,
    /// Operations pending but neither trigger has fired
    NotDue,
    /// Record written to disk
    Written,
    /// Lock not acquired in time; retried on the next trigger
    Deferred,
}

/// Durable, single-writer statistics counters
#[derive(Debug)]
pub struct StatisticsStore {
    path: PathBuf,
    lock_path: PathBuf,
    record: StatisticsRecord,
    policy: FlushPolicy,
    pending_ops: u32,
    last_flush: Instant,
}

impl StatisticsStore {
    /// Default location of the statistics file for a destination root
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(STATS_FILE_NAME)
    }

    /// Load the record from `path`.
    ///
    /// Never fails: a missing file starts from zero, an unreadable or
    /// invalid one starts from zero with a warning.
    pub fn load(path: impl Into<PathBuf>, policy: FlushPolicy) -> Self {
        let path = path.into();
        let lock_path = StatsLock::path_for(&path);

        let record = match Self::read_guarded(&path, &lock_path, policy.lock_timeout) {
            Ok(Some(persisted)) => persisted.record(),
            Ok(None) => StatisticsRecord::default(),
            Err(e) => {
                warn!(error = %e, "Statistics reset to zero");
                StatisticsRecord::default()
            }
        };

        debug!(path = %path.display(), ?record, "Statistics loaded");

        Self {
            path,
            lock_path,
            record,
            policy,
            pending_ops: 0,
            last_flush: Instant::now(),
        }
    }

    /// Read the persisted statistics without taking ownership of them.
    ///
    /// `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<PersistedStatistics>, StatsError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StatsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StatsError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn read_guarded(
        path: &Path,
        lock_path: &Path,
        timeout: Duration,
    ) -> Result<Option<PersistedStatistics>, StatsError> {
        // Replacement is atomic, so reading without the lock is still consistent
        let _guard = match StatsLock::acquire(lock_path, LockMode::Shared, timeout) {
            Ok(guard) => guard,
            Err(e) => {
                debug!(error = %e, "Reading statistics without a lock");
                None
            }
        };
        Self::read(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Current in-memory counters
    pub fn snapshot(&self) -> StatisticsRecord {
        self.record
    }

    /// Operations not yet written to disk
    pub fn pending_ops(&self) -> u32 {
        self.pending_ops
    }

    /// Count one completed operation
    pub fn record_event(&mut self, category: Category, files: u64, bytes: u64) {
        self.record.record(category, files, bytes);
        self.pending_ops = self.pending_ops.saturating_add(1);
    }

    /// Transfer an amount between categories
    pub fn adjust(&mut self, from: Category, to: Category, files: u64, bytes: u64) -> Adjustment {
        let adjustment = self.record.adjust(from, to, files, bytes);
        if !adjustment.is_pure_transfer() {
            warn!(
                %from,
                %to,
                new_files = adjustment.new_files,
                new_bytes = adjustment.new_bytes,
                "Adjustment exceeded the recorded amount; remainder counted as new"
            );
        }
        self.pending_ops = self.pending_ops.saturating_add(1);
        adjustment
    }

    /// Flush if either trigger has fired
    pub fn maybe_flush(&mut self) -> Result<FlushOutcome, StatsError> {
        self.maybe_flush_at(Instant::now())
    }

    /// `maybe_flush` against an explicit clock reading
    pub fn maybe_flush_at(&mut self, now: Instant) -> Result<FlushOutcome, StatsError> {
        if self.pending_ops == 0 {
            return Ok(FlushOutcome::Clean);
        }

        let count_due = self.pending_ops >= self.policy.every_ops;
        let time_due = now.saturating_duration_since(self.last_flush) >= self.policy.interval;

        if count_due || time_due {
            self.write_at(now)
        } else {
            Ok(FlushOutcome::NotDue)
        }
    }

    /// Write the record unconditionally
    pub fn flush_now(&mut self) -> Result<FlushOutcome, StatsError> {
        self.write_at(Instant::now())
    }

    fn write_at(&mut self, now: Instant) -> Result<FlushOutcome, StatsError> {
        let Some(_guard) =
            StatsLock::acquire(&self.lock_path, LockMode::Exclusive, self.policy.lock_timeout)?
        else {
            warn!(path = %self.path.display(), "Statistics lock busy, flush deferred");
            return Ok(FlushOutcome::Deferred);
        };

        let persisted = PersistedStatistics::new(self.record, Some(Local::now().to_rfc3339()));
        self.write_atomically(&persisted)?;

        info!(
            files_moved = self.record.files_moved,
            files_duplicated = self.record.files_duplicated,
            files_deleted = self.record.files_deleted,
            ops = self.pending_ops,
            "Statistics saved"
        );

        self.pending_ops = 0;
        self.last_flush = now;
        Ok(FlushOutcome::Written)
    }

    fn write_atomically(&self, persisted: &PersistedStatistics) -> Result<(), StatsError> {
        let write_error = |source| StatsError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_error)?;

        let json = serde_json::to_vec_pretty(persisted)
            .map_err(|e| write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
        temp.write_all(&json).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(&self.path).map_err(|e| write_error(e.error))?;

        Ok(())
    }
}

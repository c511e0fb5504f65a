//! The organizer: one candidate at a time, start to finish.

use super::builder::OrganizerBuilder;
use crate::core::classifier::{ClassifiedTarget, PathClassifier};
use crate::core::executor::FileOperationExecutor;
use crate::core::media::{is_ignored, Candidate};
use crate::core::resolver::{duplicate_name, Divert, DuplicateResolver, DuplicateVerdict};
use crate::core::stats::{FlushOutcome, StatisticsRecord, StatisticsStore};
use crate::error::{FileOpError, FingerprintError};
use crate::events::{Event, EventSender, FileEvent, ServiceEvent, StatisticsEvent, SweepSummary};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Why a path was not processed at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No longer exists (already handled, or removed by someone else)
    Vanished,
    /// Not directly inside the source directory
    OutsideSource,
    /// A download marker or similar file that is never organized
    Ignored,
    /// A directory or other non-regular file
    NotAFile,
}

/// Why a file was left in place for a later pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferReason {
    /// Could not read the file or its counterpart for comparison
    Fingerprint(String),
    /// The move or delete failed
    FileOperation(String),
    /// The file could not be inspected
    Unreadable(String),
}

impl std::fmt::Display for DeferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferReason::Fingerprint(msg) => write!(f, "fingerprint failed: {}", msg),
            DeferReason::FileOperation(msg) => write!(f, "file operation failed: {}", msg),
            DeferReason::Unreadable(msg) => write!(f, "unreadable: {}", msg),
        }
    }
}

impl From<FingerprintError> for DeferReason {
    fn from(e: FingerprintError) -> Self {
        DeferReason::Fingerprint(e.to_string())
    }
}

impl From<FileOpError> for DeferReason {
    fn from(e: FileOpError) -> Self {
        DeferReason::FileOperation(e.to_string())
    }
}

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Filed at its destination
    Moved { to: PathBuf },
    /// Deleted because identical content was already filed
    DuplicateDeleted { existing: PathBuf },
    /// Placed into a duplicates area
    MovedToDuplicates { to: PathBuf },
    /// Took the place of a newer file, which was diverted (or deleted if the
    /// duplicates area already held it)
    ReplacedExisting {
        to: PathBuf,
        displaced_to: Option<PathBuf>,
    },
    Skipped(SkipReason),
    Deferred(DeferReason),
}

impl ProcessOutcome {
    /// Whether the file left the source directory
    pub fn is_completed(&self) -> bool {
        !matches!(self, ProcessOutcome::Skipped(_) | ProcessOutcome::Deferred(_))
    }
}

/// Classifies, deduplicates and files candidates, keeping statistics
pub struct Organizer {
    source: PathBuf,
    destination: PathBuf,
    classifier: PathClassifier,
    resolver: DuplicateResolver,
    executor: FileOperationExecutor,
    stats: StatisticsStore,
    delete_duplicates: bool,
    events: EventSender,
}

impl Organizer {
    /// Create a new organizer builder
    pub fn builder() -> OrganizerBuilder {
        OrganizerBuilder::new()
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn from_parts(
        source: PathBuf,
        destination: PathBuf,
        classifier: PathClassifier,
        resolver: DuplicateResolver,
        executor: FileOperationExecutor,
        stats: StatisticsStore,
        delete_duplicates: bool,
        events: EventSender,
    ) -> Self {
        Self {
            source,
            destination,
            classifier,
            resolver,
            executor,
            stats,
            delete_duplicates,
            events,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Current in-memory statistics
    pub fn statistics(&self) -> StatisticsRecord {
        self.stats.snapshot()
    }

    /// Process one path and flush statistics if a trigger fired
    pub fn process(&mut self, path: &Path) -> ProcessOutcome {
        let outcome = match self.admit(path) {
            Ok(candidate) => self.organize(candidate),
            Err(outcome) => outcome,
        };

        match &outcome {
            ProcessOutcome::Deferred(reason) => {
                warn!(path = %path.display(), %reason, "Left in source for a later pass");
                self.events.send(Event::File(FileEvent::Deferred {
                    path: path.to_path_buf(),
                    reason: reason.to_string(),
                }));
            }
            ProcessOutcome::Skipped(reason) => {
                debug!(path = %path.display(), ?reason, "Skipped");
            }
            _ => {
                self.maybe_flush();
            }
        }

        outcome
    }

    fn admit(&self, path: &Path) -> Result<Candidate, ProcessOutcome> {
        if is_ignored(path) {
            return Err(ProcessOutcome::Skipped(SkipReason::Ignored));
        }

        let parent = path
            .parent()
            .map(|p| p.canonicalize())
            .transpose()
            .map_err(|_| ProcessOutcome::Skipped(SkipReason::Vanished))?;
        if parent.as_deref() != Some(self.source.as_path()) {
            return Err(ProcessOutcome::Skipped(SkipReason::OutsideSource));
        }

        Candidate::from_path(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ProcessOutcome::Skipped(SkipReason::Vanished),
            io::ErrorKind::InvalidInput => ProcessOutcome::Skipped(SkipReason::NotAFile),
            _ => ProcessOutcome::Deferred(DeferReason::Unreadable(e.to_string())),
        })
    }

    fn organize(&mut self, candidate: Candidate) -> ProcessOutcome {
        let target = self.classifier.classify(candidate);
        debug!(
            path = %target.candidate.path.display(),
            subpath = %target.subpath.display(),
            source = ?target.capture.map(|c| c.source),
            "Classified"
        );

        let verdict = match self.resolver.resolve(&target, &self.destination) {
            Ok(verdict) => verdict,
            Err(e) => return ProcessOutcome::Deferred(e.into()),
        };

        let result = match verdict {
            DuplicateVerdict::Unique => self.file_unique(&target),
            DuplicateVerdict::IdenticalToExisting { existing } => {
                if self.delete_duplicates {
                    self.executor
                        .delete_duplicate(&target.candidate, &existing, &mut self.stats)
                        .map(|()| ProcessOutcome::DuplicateDeleted { existing })
                        .map_err(DeferReason::from)
                } else {
                    self.divert(&target)
                }
            }
            DuplicateVerdict::ConflictingNameDifferentContent {
                divert: Divert::Incoming,
                ..
            } => self.divert_with_dedupe(&target),
            DuplicateVerdict::ConflictingNameDifferentContent {
                existing,
                divert: Divert::Existing,
            } => self.replace_existing(&target, &existing),
        };

        result.unwrap_or_else(ProcessOutcome::Deferred)
    }

    fn file_unique(&mut self, target: &ClassifiedTarget) -> Result<ProcessOutcome, DeferReason> {
        let to = target.destination_path(&self.destination);
        self.executor
            .move_into_place(&target.candidate, &to, &mut self.stats)?;
        Ok(ProcessOutcome::Moved { to })
    }

    /// Move the candidate into its duplicates area under a free name
    fn divert(&mut self, target: &ClassifiedTarget) -> Result<ProcessOutcome, DeferReason> {
        let dupes = target.duplicates_dir(&self.destination);
        let name = duplicate_name(
            &dupes,
            &target.file_name,
            target.capture.as_ref().map(|c| &c.taken),
        );
        let to = dupes.join(name);

        self.executor
            .divert_to_duplicates(&target.candidate, &to, &mut self.stats)?;
        Ok(ProcessOutcome::MovedToDuplicates { to })
    }

    /// Divert, unless the duplicates area already holds the same content
    fn divert_with_dedupe(
        &mut self,
        target: &ClassifiedTarget,
    ) -> Result<ProcessOutcome, DeferReason> {
        if self.delete_duplicates {
            let dupes = target.duplicates_dir(&self.destination);
            if let Some(existing) = self.resolver.find_identical_in(&target.candidate.path, &dupes)? {
                self.executor
                    .delete_duplicate(&target.candidate, &existing, &mut self.stats)?;
                return Ok(ProcessOutcome::DuplicateDeleted { existing });
            }
        }
        self.divert(target)
    }

    /// Displace a newer filed file into the duplicates area and take its name
    fn replace_existing(
        &mut self,
        target: &ClassifiedTarget,
        existing: &Path,
    ) -> Result<ProcessOutcome, DeferReason> {
        let dupes = target.duplicates_dir(&self.destination);

        let identical = if self.delete_duplicates {
            self.resolver.find_identical_in(existing, &dupes)?
        } else {
            None
        };

        let displaced_to = match identical {
            Some(held) => {
                self.executor
                    .delete_reclassified(existing, &held, &mut self.stats)?;
                None
            }
            None => {
                let name = duplicate_name(
                    &dupes,
                    &target.file_name,
                    target.capture.as_ref().map(|c| &c.taken),
                );
                let to = dupes.join(name);
                self.executor
                    .reclassify_to_duplicates(existing, &to, &mut self.stats)?;
                Some(to)
            }
        };

        let to = target.destination_path(&self.destination);
        self.executor
            .move_into_place(&target.candidate, &to, &mut self.stats)?;
        Ok(ProcessOutcome::ReplacedExisting { to, displaced_to })
    }

    /// Files currently in the source directory, oldest modification first
    pub fn source_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<(SystemTime, PathBuf)> = WalkDir::new(&self.source)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && !is_ignored(entry.path()))
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((modified, entry.into_path()))
            })
            .collect();
        files.sort();
        files.into_iter().map(|(_, path)| path).collect()
    }

    /// Process every file already in the source directory.
    ///
    /// Files modified less than `settle` ago are left for the monitor.
    pub fn sweep(&mut self, settle: Duration) -> SweepSummary {
        let start = Instant::now();
        let files = self.source_files();
        let total = files.len();
        let mut summary = SweepSummary::default();

        self.events.send(Event::Service(ServiceEvent::SweepStarted { total }));

        for (i, path) in files.into_iter().enumerate() {
            let settled = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(|modified| modified.elapsed().unwrap_or(Duration::ZERO) >= settle)
                .unwrap_or(true);

            if settled {
                match self.process(&path) {
                    ProcessOutcome::Moved { .. } | ProcessOutcome::ReplacedExisting { .. } => {
                        summary.moved += 1
                    }
                    ProcessOutcome::DuplicateDeleted { .. } => summary.deleted += 1,
                    ProcessOutcome::MovedToDuplicates { .. } => summary.duplicated += 1,
                    ProcessOutcome::Skipped(_) => summary.skipped += 1,
                    ProcessOutcome::Deferred(_) => summary.deferred += 1,
                }
            } else {
                summary.deferred += 1;
            }

            self.events.send(Event::Service(ServiceEvent::SweepProgress {
                completed: i + 1,
                total,
                current: path,
            }));
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            moved = summary.moved,
            deleted = summary.deleted,
            duplicated = summary.duplicated,
            deferred = summary.deferred,
            "Sweep complete"
        );
        self.events.send(Event::Service(ServiceEvent::SweepCompleted { summary }));
        summary
    }

    /// Flush statistics if a trigger fired. Failures are logged and retried later.
    pub fn maybe_flush(&mut self) -> FlushOutcome {
        let result = self.stats.maybe_flush();
        self.report_flush(result)
    }

    /// Flush statistics unconditionally
    pub fn flush_now(&mut self) -> FlushOutcome {
        let result = self.stats.flush_now();
        self.report_flush(result)
    }

    fn report_flush(
        &self,
        result: Result<FlushOutcome, crate::error::StatsError>,
    ) -> FlushOutcome {
        let outcome = result.unwrap_or_else(|e| {
            warn!(error = %e, "Statistics flush failed");
            FlushOutcome::Deferred
        });

        if matches!(outcome, FlushOutcome::Written | FlushOutcome::Deferred) {
            self.events.send(Event::Statistics(StatisticsEvent::Flushed {
                outcome,
                record: self.stats.snapshot(),
            }));
        }
        outcome
    }

    /// Log a statistics summary after a quiet period and persist it
    pub fn report_idle(&mut self) -> FlushOutcome {
        let record = self.stats.snapshot();
        info!(
            files_moved = record.files_moved,
            bytes_moved = record.bytes_moved,
            files_duplicated = record.files_duplicated,
            bytes_duplicated = record.bytes_duplicated,
            files_deleted = record.files_deleted,
            bytes_deleted = record.bytes_deleted,
            "Idle; statistics summary"
        );
        self.events
            .send(Event::Statistics(StatisticsEvent::IdleReport { record }));
        self.flush_now()
    }

    /// Flush and return the final statistics
    pub fn shutdown(mut self) -> StatisticsRecord {
        self.flush_now();
        let record = self.stats.snapshot();
        info!(
            files_moved = record.files_moved,
            files_duplicated = record.files_duplicated,
            files_deleted = record.files_deleted,
            "Organizer stopped"
        );
        record
    }
}

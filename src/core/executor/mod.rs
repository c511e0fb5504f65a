//! # Executor Module
//!
//! Performs the physical move or delete for a verdict and records it.
//!
//! Each operation follows the same order: mutate the filesystem, then update
//! the statistics, then write the activity log line and emit an event. A
//! failed mutation leaves the statistics untouched and the file where it was.
//!
//! Moves never overwrite. The destination is claimed atomically, either as a
//! hard link to the source or, when linking is not possible (another
//! filesystem, no link support), as a newly created copy. Only then is the
//! source removed.

use crate::core::media::Candidate;
use crate::core::stats::{Category, StatisticsStore};
use crate::error::FileOpError;
use crate::events::{Event, EventSender, FileEvent};
use crate::logging::ACTIVITY_TARGET;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Carries out file operations and keeps statistics in step with them
pub struct FileOperationExecutor {
    events: EventSender,
}

impl FileOperationExecutor {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// Unique verdict: file the candidate at `destination`
    pub fn move_into_place(
        &self,
        candidate: &Candidate,
        destination: &Path,
        stats: &mut StatisticsStore,
    ) -> Result<(), FileOpError> {
        relocate(&candidate.path, destination)?;
        stats.record_event(Category::Moved, 1, candidate.size);

        info!(
            target: ACTIVITY_TARGET,
            verdict = "unique",
            from = %candidate.path.display(),
            to = %destination.display(),
            bytes = candidate.size,
            "File moved"
        );
        self.events.send(Event::File(FileEvent::Moved {
            from: candidate.path.clone(),
            to: destination.to_path_buf(),
            bytes: candidate.size,
        }));
        Ok(())
    }

    /// Identical verdict: remove the redundant candidate
    pub fn delete_duplicate(
        &self,
        candidate: &Candidate,
        existing: &Path,
        stats: &mut StatisticsStore,
    ) -> Result<(), FileOpError> {
        remove(&candidate.path)?;
        stats.record_event(Category::Deleted, 1, candidate.size);

        info!(
            target: ACTIVITY_TARGET,
            verdict = "identical",
            from = %candidate.path.display(),
            existing = %existing.display(),
            bytes = candidate.size,
            "Duplicate deleted"
        );
        self.events.send(Event::File(FileEvent::DuplicateDeleted {
            path: candidate.path.clone(),
            existing: existing.to_path_buf(),
            bytes: candidate.size,
        }));
        Ok(())
    }

    /// Conflicting or kept duplicate: move the candidate into a duplicates area
    pub fn divert_to_duplicates(
        &self,
        candidate: &Candidate,
        destination: &Path,
        stats: &mut StatisticsStore,
    ) -> Result<(), FileOpError> {
        relocate(&candidate.path, destination)?;
        stats.record_event(Category::Duplicated, 1, candidate.size);

        info!(
            target: ACTIVITY_TARGET,
            verdict = "duplicate",
            from = %candidate.path.display(),
            to = %destination.display(),
            bytes = candidate.size,
            "Moved to duplicates"
        );
        self.events.send(Event::File(FileEvent::MovedToDuplicates {
            from: candidate.path.clone(),
            to: destination.to_path_buf(),
            bytes: candidate.size,
        }));
        Ok(())
    }

    /// Move an already filed (and counted as moved) file into a duplicates area.
    ///
    /// Transfers its count from moved to duplicated. Returns the file size.
    pub fn reclassify_to_duplicates(
        &self,
        filed: &Path,
        destination: &Path,
        stats: &mut StatisticsStore,
    ) -> Result<u64, FileOpError> {
        let size = file_size(filed)?;
        relocate(filed, destination)?;
        stats.adjust(Category::Moved, Category::Duplicated, 1, size);

        info!(
            target: ACTIVITY_TARGET,
            verdict = "reclassified",
            from = %filed.display(),
            to = %destination.display(),
            bytes = size,
            "Filed copy moved to duplicates"
        );
        self.events.send(Event::File(FileEvent::Reclassified {
            from: filed.to_path_buf(),
            to: Some(destination.to_path_buf()),
            bytes: size,
        }));
        Ok(size)
    }

    /// Delete an already filed file whose content is held elsewhere.
    ///
    /// Transfers its count from moved to deleted. Returns the file size.
    pub fn delete_reclassified(
        &self,
        filed: &Path,
        identical_to: &Path,
        stats: &mut StatisticsStore,
    ) -> Result<u64, FileOpError> {
        let size = file_size(filed)?;
        remove(filed)?;
        stats.adjust(Category::Moved, Category::Deleted, 1, size);

        info!(
            target: ACTIVITY_TARGET,
            verdict = "reclassified",
            from = %filed.display(),
            existing = %identical_to.display(),
            bytes = size,
            "Filed copy deleted as duplicate"
        );
        self.events.send(Event::File(FileEvent::Reclassified {
            from: filed.to_path_buf(),
            to: None,
            bytes: size,
        }));
        Ok(size)
    }
}

fn file_size(path: &Path) -> Result<u64, FileOpError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        _ => Err(FileOpError::SourceMissing {
            path: path.to_path_buf(),
        }),
    }
}

fn remove(path: &Path) -> Result<(), FileOpError> {
    fs::remove_file(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            FileOpError::SourceMissing {
                path: path.to_path_buf(),
            }
        } else {
            FileOpError::Delete {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Move `from` to `to` without ever replacing an existing file
fn relocate(from: &Path, to: &Path) -> Result<(), FileOpError> {
    if !from.is_file() {
        return Err(FileOpError::SourceMissing {
            path: from.to_path_buf(),
        });
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| FileOpError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    match fs::hard_link(from, to) {
        Ok(()) => remove_source(from, to),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(FileOpError::DestinationExists {
            path: to.to_path_buf(),
        }),
        Err(e) => {
            debug!(from = %from.display(), to = %to.display(), error = %e, "hard link failed, copying");
            copy_verify_remove(from, to)
        }
    }
}

/// Drop the source once `to` holds the content; on failure leave exactly one copy, at the source
fn remove_source(from: &Path, to: &Path) -> Result<(), FileOpError> {
    if let Err(source) = fs::remove_file(from) {
        if let Err(e) = fs::remove_file(to) {
            warn!(path = %to.display(), error = %e, "Could not remove copy after failed move");
        }
        return Err(FileOpError::Delete {
            path: from.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn copy_verify_remove(from: &Path, to: &Path) -> Result<(), FileOpError> {
    let move_error = |source| FileOpError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let mut reader = File::open(from).map_err(move_error)?;
    let metadata = reader.metadata().map_err(move_error)?;
    let expected = metadata.len();

    let mut writer = match OpenOptions::new().write(true).create_new(true).open(to) {
        Ok(writer) => writer,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(FileOpError::DestinationExists {
                path: to.to_path_buf(),
            })
        }
        Err(e) => return Err(move_error(e)),
    };

    let copied = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    if let Err(e) = copied {
        drop(writer);
        discard_copy(to);
        return Err(move_error(e));
    }

    // Keep-oldest compares modification times, so carry them over
    if let Err(e) = metadata.modified().and_then(|modified| writer.set_modified(modified)) {
        debug!(path = %to.display(), error = %e, "Could not preserve modification time");
    }
    drop(writer);

    let actual = fs::metadata(to).map(|m| m.len()).unwrap_or(0);
    if actual != expected {
        // Incomplete copy: keep the source
        discard_copy(to);
        return Err(FileOpError::CopyVerification {
            path: to.to_path_buf(),
            expected,
            actual,
        });
    }

    drop(reader);
    remove_source(from, to)
}

fn discard_copy(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Could not remove partial copy");
    }
}

//! # Resolver Module
//!
//! Decides what happens when a candidate's destination is already occupied.
//!
//! ## Verdicts
//! - **Unique** - nothing at the destination, move the candidate there
//! - **IdenticalToExisting** - same bytes already filed, the candidate is redundant
//! - **ConflictingNameDifferentContent** - same name, different bytes; one of the
//!   two files is diverted into the duplicates area, the other keeps the name
//!
//! The existing destination file is never overwritten. Fingerprint failures are
//! returned to the caller so the candidate can be retried later.

mod naming;

pub use naming::duplicate_name;

use crate::core::classifier::ClassifiedTarget;
use crate::core::hasher::ContentHasher;
use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// How a same-name, different-content collision is settled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Always divert the incoming file (the existing file is never touched)
    #[default]
    DivertIncoming,
    /// Keep whichever file was modified first at the destination name
    KeepOldest,
}

/// Which file of a conflicting pair goes to the duplicates area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divert {
    Incoming,
    Existing,
}

/// Outcome of comparing a candidate with its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateVerdict {
    Unique,
    IdenticalToExisting { existing: PathBuf },
    ConflictingNameDifferentContent { existing: PathBuf, divert: Divert },
}

/// Compares candidates against the destination using a content hasher
pub struct DuplicateResolver {
    hasher: Box<dyn ContentHasher>,
    policy: ConflictPolicy,
}

impl DuplicateResolver {
    pub fn new(hasher: Box<dyn ContentHasher>, policy: ConflictPolicy) -> Self {
        Self { hasher, policy }
    }

    /// Compare a classified candidate with whatever already sits at its destination
    pub fn resolve(
        &self,
        target: &ClassifiedTarget,
        root: &Path,
    ) -> Result<DuplicateVerdict, FingerprintError> {
        let existing = target.destination_path(root);

        if !existing.is_file() {
            return Ok(DuplicateVerdict::Unique);
        }

        if self.hasher.identical(&target.candidate.path, &existing)? {
            return Ok(DuplicateVerdict::IdenticalToExisting { existing });
        }

        let divert = match self.policy {
            ConflictPolicy::DivertIncoming => Divert::Incoming,
            ConflictPolicy::KeepOldest => {
                if existing_is_newer(target.candidate.modified, &existing) {
                    Divert::Existing
                } else {
                    Divert::Incoming
                }
            }
        };

        Ok(DuplicateVerdict::ConflictingNameDifferentContent { existing, divert })
    }

    /// Search `folder` (non-recursively) for a file with the same content as `file`
    pub fn find_identical_in(
        &self,
        file: &Path,
        folder: &Path,
    ) -> Result<Option<PathBuf>, FingerprintError> {
        let io_error = |path: &Path, source| FingerprintError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = fs::metadata(file).map_err(|e| io_error(file, e))?.len();

        let entries = match fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(folder, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| io_error(folder, e))?;
            let path = entry.path();
            if path == file {
                continue;
            }

            let same_size = entry
                .metadata()
                .map(|m| m.is_file() && m.len() == size)
                .unwrap_or(false);

            if same_size && self.hasher.identical(file, &path)? {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }
}

fn existing_is_newer(candidate_modified: SystemTime, existing: &Path) -> bool {
    fs::metadata(existing)
        .and_then(|m| m.modified())
        .map(|existing_modified| existing_modified > candidate_modified)
        .unwrap_or(false)
}

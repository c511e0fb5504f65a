//! Organizer construction and startup checks.

use super::organizer::Organizer;
use crate::config::Settings;
use crate::core::classifier::{ClassifierConfig, PathClassifier};
use crate::core::executor::FileOperationExecutor;
use crate::core::hasher::{ContentHasher, Xxh3Hasher};
use crate::core::metadata::{select_probe, MetadataProbe};
use crate::core::resolver::{ConflictPolicy, DuplicateResolver};
use crate::core::stats::{FlushPolicy, StatisticsStore, StatsLock};
use crate::error::{ConfigError, OrganizerError, StartupError};
use crate::events::{null_sender, EventSender};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Builder for an [`Organizer`]
pub struct OrganizerBuilder {
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    probe: Option<Box<dyn MetadataProbe>>,
    hasher: Option<Box<dyn ContentHasher>>,
    classifier: ClassifierConfig,
    conflict_policy: ConflictPolicy,
    delete_duplicates: bool,
    flush_policy: FlushPolicy,
    stats_path: Option<PathBuf>,
    events: Option<EventSender>,
}

impl OrganizerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            destination: None,
            probe: None,
            hasher: None,
            classifier: ClassifierConfig::default(),
            conflict_policy: ConflictPolicy::default(),
            delete_duplicates: true,
            flush_policy: FlushPolicy::default(),
            stats_path: None,
            events: None,
        }
    }

    /// Apply every option from loaded settings
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.source = settings.paths.source_dir.clone();
        self.destination = settings.paths.destination_root.clone();
        self.probe = Some(select_probe(settings.organize.embedded_metadata));
        self.classifier = settings.classifier_config();
        self.conflict_policy = settings.duplicates.conflict_policy;
        self.delete_duplicates = settings.duplicates.delete;
        self.flush_policy = settings.flush_policy();
        self
    }

    /// Directory new files arrive in
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Root of the dated library
    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// Capture-time reader (defaults to embedded EXIF/container metadata)
    pub fn probe(mut self, probe: Box<dyn MetadataProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Content comparison (defaults to XXH3 with byte verification)
    pub fn hasher(mut self, hasher: Box<dyn ContentHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn classifier_config(mut self, config: ClassifierConfig) -> Self {
        self.classifier = config;
        self
    }

    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Delete exact duplicates (`true`) or keep them in the duplicates area
    pub fn delete_duplicates(mut self, delete: bool) -> Self {
        self.delete_duplicates = delete;
        self
    }

    pub fn flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Statistics file location (defaults to the destination root)
    pub fn stats_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stats_path = Some(path.into());
        self
    }

    pub fn events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the startup checks and build the organizer.
    ///
    /// Fails if the source directory is unusable, the destination root cannot
    /// be written, or the platform offers no file locking.
    pub fn build(self) -> Result<Organizer, OrganizerError> {
        let source = self.source.ok_or(ConfigError::Missing {
            key: "paths.source_dir",
        })?;
        let destination = self.destination.ok_or(ConfigError::Missing {
            key: "paths.destination_root",
        })?;

        let source = check_source(&source)?;
        let destination = check_destination(&destination)?;
        if source == destination {
            return Err(ConfigError::SameDirectories { path: source }.into());
        }

        let stats_path = self
            .stats_path
            .unwrap_or_else(|| StatisticsStore::path_in(&destination));
        let lock_path = StatsLock::path_for(&stats_path);
        StatsLock::probe(&lock_path).map_err(|source| StartupError::LockUnavailable {
            path: lock_path.clone(),
            source,
        })?;

        let stats = StatisticsStore::load(stats_path, self.flush_policy);
        let events = self.events.unwrap_or_else(null_sender);
        let probe = self.probe.unwrap_or_else(|| select_probe(true));

        info!(
            source = %source.display(),
            destination = %destination.display(),
            embedded_metadata = probe.is_available(),
            delete_duplicates = self.delete_duplicates,
            conflict_policy = ?self.conflict_policy,
            "Organizer started"
        );

        Ok(Organizer::from_parts(
            source,
            destination,
            PathClassifier::new(probe, self.classifier),
            DuplicateResolver::new(
                self.hasher.unwrap_or_else(|| Box::new(Xxh3Hasher)),
                self.conflict_policy,
            ),
            FileOperationExecutor::new(events.clone()),
            stats,
            self.delete_duplicates,
            events,
        ))
    }
}

impl Default for OrganizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_source(path: &Path) -> Result<PathBuf, StartupError> {
    let unavailable = |source| StartupError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let canonical = path.canonicalize().map_err(unavailable)?;
    if !canonical.is_dir() {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a directory",
        )));
    }
    Ok(canonical)
}

fn check_destination(path: &Path) -> Result<PathBuf, StartupError> {
    let unwritable = |source| StartupError::DestinationUnwritable {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(path).map_err(unwritable)?;
    let canonical = path.canonicalize().map_err(unwritable)?;
    NamedTempFile::new_in(&canonical).map_err(unwritable)?;
    Ok(canonical)
}

//! # Config Module
//!
//! Layered settings: `config.ini`, then `PHOTO_ORGANIZER__SECTION__KEY`
//! environment variables, then command-line overrides.
//!
//! ```ini
//! [paths]
//! source_dir = /volume1/inbox
//! destination_root = /volume1/photo
//!
//! [duplicates]
//! delete = true
//! conflict_policy = divert_incoming
//! ```

use crate::core::classifier::ClassifierConfig;
use crate::core::resolver::ConflictPolicy;
use crate::core::stats::FlushPolicy;
use crate::core::watcher::MonitorConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File as ConfigFile, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PHOTO_ORGANIZER";

/// `config.ini` in the user's configuration directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("photo-organizer").join("config.ini"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsSection {
    pub source_dir: Option<PathBuf>,
    pub destination_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DuplicatesSection {
    /// Delete exact duplicates instead of keeping them in the duplicates area
    pub delete: bool,
    pub conflict_policy: ConflictPolicy,
}

impl Default for DuplicatesSection {
    fn default() -> Self {
        Self {
            delete: true,
            conflict_policy: ConflictPolicy::DivertIncoming,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrganizeSection {
    pub rename_by_date: bool,
    pub file_date_fallback: bool,
    pub embedded_metadata: bool,
}

impl Default for OrganizeSection {
    fn default() -> Self {
        Self {
            rename_by_date: false,
            file_date_fallback: true,
            embedded_metadata: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatisticsSection {
    pub flush_every: u32,
    pub flush_interval_secs: u64,
    pub lock_timeout_ms: u64,
}

impl Default for StatisticsSection {
    fn default() -> Self {
        Self {
            flush_every: 10,
            flush_interval_secs: 30,
            lock_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub settle_secs: u64,
    pub rescan_interval_secs: u64,
    pub poll_interval_ms: u64,
    pub idle_report_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            settle_secs: 2,
            rescan_interval_secs: 10,
            poll_interval_ms: 1000,
            idle_report_secs: 60,
        }
    }
}

/// All settings, as read from every source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub duplicates: DuplicatesSection,
    #[serde(default)]
    pub organize: OrganizeSection,
    #[serde(default)]
    pub statistics: StatisticsSection,
    #[serde(default)]
    pub monitor: MonitorSection,
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub keep_duplicates: bool,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `config_path` must exist; without one, the default
    /// location is used if present.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let (file, required) = match config_path {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (default_config_path(), false),
        };

        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                ConfigFile::new(&file.to_string_lossy(), FileFormat::Ini).required(required),
            );
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "paths.source_dir",
                overrides
                    .source
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option(
                "paths.destination_root",
                overrides
                    .destination
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?;

        if overrides.keep_duplicates {
            builder = builder.set_override("duplicates.delete", false)?;
        }

        Ok(builder.build()?.try_deserialize::<Settings>()?)
    }

    /// Source directory, required
    pub fn source_dir(&self) -> Result<&Path, ConfigError> {
        non_empty(&self.paths.source_dir).ok_or(ConfigError::Missing {
            key: "paths.source_dir",
        })
    }

    /// Destination root, required
    pub fn destination_root(&self) -> Result<&Path, ConfigError> {
        non_empty(&self.paths.destination_root).ok_or(ConfigError::Missing {
            key: "paths.destination_root",
        })
    }

    /// Check that both directories are set and are not the same directory
    pub fn validate(&self) -> Result<(), ConfigError> {
        let source = self.source_dir()?;
        let destination = self.destination_root()?;

        let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
        if canonical(source) == canonical(destination) {
            return Err(ConfigError::SameDirectories {
                path: source.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        FlushPolicy {
            every_ops: self.statistics.flush_every.max(1),
            interval: Duration::from_secs(self.statistics.flush_interval_secs),
            lock_timeout: Duration::from_millis(self.statistics.lock_timeout_ms),
        }
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            file_date_fallback: self.organize.file_date_fallback,
            rename_by_date: self.organize.rename_by_date,
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            settle: Duration::from_secs(self.monitor.settle_secs),
            rescan_interval: Duration::from_secs(self.monitor.rescan_interval_secs),
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms.max(10)),
            idle_report: Duration::from_secs(self.monitor.idle_report_secs),
        }
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

//! # Classifier Module
//!
//! Maps a candidate to its place in the destination hierarchy.
//!
//! ## Layout
//! ```text
//! <root>/2023/06_Jun/IMG_20230615_1200.jpg   dated media
//! <root>/NoDateFound/clip.mov                 media without any capture date
//! <root>/Duplicates/                          holding area for dated/undated media
//! <root>/Unknown File Types/notes.pdf         everything else
//! <root>/Unknown File Types/Duplicates/       holding area for unknown types
//! ```

use crate::core::media::{Candidate, MediaKind};
use crate::core::metadata::{filesystem_capture_time, CaptureTime, MetadataProbe};
use chrono::{Datelike, NaiveDateTime};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Bucket for media whose capture date cannot be determined
pub const FALLBACK_BUCKET: &str = "NoDateFound";

/// Bucket for files that are neither images nor videos
pub const UNKNOWN_TYPES_DIR: &str = "Unknown File Types";

/// Name of a duplicates holding area
pub const DUPLICATES_DIR: &str = "Duplicates";

/// Classification options
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Use the filesystem date when embedded metadata has none
    pub file_date_fallback: bool,
    /// Rename dated files to `yyyymmdd_hhmmss.ext`
    pub rename_by_date: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            file_date_fallback: true,
            rename_by_date: false,
        }
    }
}

/// A candidate together with where it belongs
#[derive(Debug, Clone)]
pub struct ClassifiedTarget {
    pub candidate: Candidate,
    /// Directory relative to the destination root
    pub subpath: PathBuf,
    /// Final file name inside `subpath`
    pub file_name: OsString,
    /// Capture time, if one was found
    pub capture: Option<CaptureTime>,
}

impl ClassifiedTarget {
    pub fn has_capture_date(&self) -> bool {
        self.capture.is_some()
    }

    /// Absolute destination directory
    pub fn destination_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.subpath)
    }

    /// Absolute destination file path
    pub fn destination_path(&self, root: &Path) -> PathBuf {
        self.destination_dir(root).join(&self.file_name)
    }

    /// The duplicates area this target diverts into
    pub fn duplicates_dir(&self, root: &Path) -> PathBuf {
        duplicates_dir_for(root, self.candidate.kind)
    }
}

/// Destination subpath for a capture date: `{year}/{month:02}_{Mon}`, or the fallback bucket
pub fn subpath_for(taken: Option<NaiveDateTime>) -> PathBuf {
    match taken {
        Some(taken) => PathBuf::from(format!("{:04}", taken.year())).join(format!(
            "{:02}_{}",
            taken.month(),
            taken.format("%b")
        )),
        None => PathBuf::from(FALLBACK_BUCKET),
    }
}

/// The duplicates area for a media class
pub fn duplicates_dir_for(root: &Path, kind: MediaKind) -> PathBuf {
    if kind.is_media() {
        root.join(DUPLICATES_DIR)
    } else {
        root.join(UNKNOWN_TYPES_DIR).join(DUPLICATES_DIR)
    }
}

/// `yyyymmdd_hhmmss`
pub fn date_stamp(taken: &NaiveDateTime) -> String {
    taken.format("%Y%m%d_%H%M%S").to_string()
}

/// Decides the destination of each candidate
pub struct PathClassifier {
    probe: Box<dyn MetadataProbe>,
    config: ClassifierConfig,
}

impl PathClassifier {
    pub fn new(probe: Box<dyn MetadataProbe>, config: ClassifierConfig) -> Self {
        Self { probe, config }
    }

    /// Classify a candidate. Never fails: missing dates map to the fallback bucket.
    pub fn classify(&self, candidate: Candidate) -> ClassifiedTarget {
        let original_name = candidate.file_name().to_os_string();

        if !candidate.kind.is_media() {
            return ClassifiedTarget {
                candidate,
                subpath: PathBuf::from(UNKNOWN_TYPES_DIR),
                file_name: original_name,
                capture: None,
            };
        }

        let capture = self.capture_time(&candidate);
        let subpath = subpath_for(capture.map(|c| c.taken));

        let file_name = match capture {
            Some(capture) if self.config.rename_by_date => {
                OsString::from(format!("{}{}", date_stamp(&capture.taken), candidate.dotted_extension()))
            }
            _ => original_name,
        };

        ClassifiedTarget {
            candidate,
            subpath,
            file_name,
            capture,
        }
    }

    fn capture_time(&self, candidate: &Candidate) -> Option<CaptureTime> {
        self.probe
            .capture_time(&candidate.path, candidate.kind)
            .or_else(|| {
                if self.config.file_date_fallback {
                    filesystem_capture_time(&candidate.path)
                } else {
                    None
                }
            })
    }
}

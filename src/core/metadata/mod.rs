//! # Metadata Module
//!
//! Determines when a photo or video was captured.
//!
//! ## Sources
//! - **EXIF** - `DateTimeOriginal`, then `DateTimeDigitized`, then `DateTime`
//!   (with matching sub-second tags) for images, including HEIF containers
//! - **ISO base media** - `©day` user data, then the `mvhd` creation time, for
//!   MP4, MOV, M4V and 3GP files (one `mp4` reader serves all of them)
//! - **Filesystem** - the older of creation and modification time, used by the
//!   pipeline only when embedded metadata is unavailable
//!
//! Missing or corrupt metadata is never an error: probes return `None` and the
//! caller falls back.

mod exif_reader;
mod iso_media;

use crate::core::media::MediaKind;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where a capture time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Embedded EXIF tags
    Exif,
    /// Video container metadata
    Container,
    /// Filesystem timestamps
    FileSystem,
}

impl std::fmt::Display for DateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateSource::Exif => write!(f, "EXIF"),
            DateSource::Container => write!(f, "container"),
            DateSource::FileSystem => write!(f, "file date"),
        }
    }
}

/// An extracted capture timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTime {
    /// Wall-clock capture time (sub-second precision when the source has it)
    pub taken: NaiveDateTime,
    /// Which source produced it
    pub source: DateSource,
}

impl CaptureTime {
    pub fn new(taken: NaiveDateTime, source: DateSource) -> Self {
        Self { taken, source }
    }
}

/// Capability: given a file, return its capture time or `None`.
///
/// Implementations must be read-only and must not fail on missing or
/// corrupt metadata.
pub trait MetadataProbe: Send + Sync {
    /// Extract the capture time of a file
    fn capture_time(&self, path: &Path, kind: MediaKind) -> Option<CaptureTime>;

    /// Whether this probe can read embedded metadata at all
    fn is_available(&self) -> bool {
        true
    }
}

/// Reads EXIF for images and ISO base media boxes for videos
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedMetadataProbe;

impl MetadataProbe for EmbeddedMetadataProbe {
    fn capture_time(&self, path: &Path, kind: MediaKind) -> Option<CaptureTime> {
        match kind {
            MediaKind::Image => {
                exif_reader::capture_time(path).map(|taken| CaptureTime::new(taken, DateSource::Exif))
            }
            MediaKind::Video => iso_media::capture_time(path)
                .map(|taken| CaptureTime::new(taken, DateSource::Container)),
            MediaKind::Other => None,
        }
    }
}

/// Stand-in used when embedded metadata reading is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProbe;

impl MetadataProbe for UnavailableProbe {
    fn capture_time(&self, _path: &Path, _kind: MediaKind) -> Option<CaptureTime> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Pick the probe implementation once, at startup
pub fn select_probe(embedded_metadata: bool) -> Box<dyn MetadataProbe> {
    if embedded_metadata {
        Box::new(EmbeddedMetadataProbe)
    } else {
        Box::new(UnavailableProbe)
    }
}

/// The older of the file's creation and modification times, in local time
pub fn filesystem_capture_time(path: &Path) -> Option<CaptureTime> {
    let metadata = fs::metadata(path).ok()?;
    let oldest = [metadata.created().ok(), metadata.modified().ok()]
        .into_iter()
        .flatten()
        .min()?;
    let local: DateTime<Local> = oldest.into();
    Some(CaptureTime::new(local.naive_local(), DateSource::FileSystem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn unavailable_probe_never_returns_a_date() {
        let probe = select_probe(false);
        assert!(!probe.is_available());
        assert!(probe
            .capture_time(Path::new("/photos/a.jpg"), MediaKind::Image)
            .is_none());
    }

    #[test]
    fn embedded_probe_handles_missing_file() {
        let probe = select_probe(true);
        assert!(probe.is_available());
        assert!(probe
            .capture_time(Path::new("/nonexistent/file.jpg"), MediaKind::Image)
            .is_none());
        assert!(probe
            .capture_time(Path::new("/nonexistent/clip.mov"), MediaKind::Video)
            .is_none());
    }

    #[test]
    fn embedded_probe_treats_garbage_as_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"this is not a valid image file").unwrap();

        assert!(EmbeddedMetadataProbe
            .capture_time(&path, MediaKind::Image)
            .is_none());
    }

    #[test]
    fn embedded_probe_ignores_unknown_types() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();

        assert!(EmbeddedMetadataProbe
            .capture_time(&path, MediaKind::Other)
            .is_none());
    }

    #[test]
    fn filesystem_date_exists_for_regular_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.jpg");
        fs::write(&path, b"data").unwrap();

        let capture = filesystem_capture_time(&path).unwrap();
        assert_eq!(capture.source, DateSource::FileSystem);
    }

    #[test]
    fn filesystem_date_missing_file_is_none() {
        assert!(filesystem_capture_time(Path::new("/nonexistent/file.jpg")).is_none());
    }
}

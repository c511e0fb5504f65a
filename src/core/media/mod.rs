//! # Media Module
//!
//! Candidates discovered in the source directory and their media class.
//!
//! ## Media Classes
//! - **Image** - JPEG, PNG, HEIC, RAW formats and friends
//! - **Video** - MP4/MOV family and other common containers
//! - **Other** - anything else, routed to the unknown-types bucket

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif", "raw", "cr2",
    "nef", "orf", "sr2", "arw", "dng", "ico", "svg", "psd",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "mpg", "mpeg", "wmv", "flv", "webm", "3gp", "3g2", "mts",
    "m2ts", "ts",
];

/// Suffix of the alternate-stream marker files Windows attaches to downloads
const ZONE_IDENTIFIER_SUFFIX: &str = ".Zone.Identifier";

/// Broad media class of a file, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Detect the media class from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    /// Detect the media class of a path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Other)
    }

    /// Whether this is a photo or video (as opposed to an unknown type)
    pub fn is_media(&self) -> bool {
        !matches!(self, MediaKind::Other)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

/// Whether a file should never be picked up by the organizer
pub fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(ZONE_IDENTIFIER_SUFFIX))
        .unwrap_or(false)
}

/// A file discovered in the source directory, awaiting classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Path to the file in the source directory
    pub path: PathBuf,
    /// File size in bytes at discovery
    pub size: u64,
    /// Last modified time at discovery
    pub modified: SystemTime,
    /// Media class derived from the extension
    pub kind: MediaKind,
}

impl Candidate {
    /// Stat a file and build a candidate from it.
    ///
    /// Fails with `NotFound` if the file vanished, and with `InvalidInput`
    /// if the path is not a regular file.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            kind: MediaKind::from_path(path),
        })
    }

    /// The candidate's file name
    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_else(|| OsStr::new("unknown"))
    }

    /// The extension including its leading dot, or an empty string
    pub fn dotted_extension(&self) -> String {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn media_kind_from_extension_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension("jpg"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("JPG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("HEIC"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("mov"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("MP4"), MediaKind::Video);
    }

    #[test]
    fn unknown_extension_is_other() {
        assert_eq!(MediaKind::from_extension("pdf"), MediaKind::Other);
        assert_eq!(MediaKind::from_path(Path::new("/inbox/notes")), MediaKind::Other);
        assert!(!MediaKind::Other.is_media());
        assert!(MediaKind::Video.is_media());
    }

    #[test]
    fn zone_identifier_files_are_ignored() {
        assert!(is_ignored(Path::new("/inbox/IMG_0001.jpg.Zone.Identifier")));
        assert!(!is_ignored(Path::new("/inbox/IMG_0001.jpg")));
    }

    #[test]
    fn candidate_records_size_and_kind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.MOV");
        fs::write(&path, b"twelve bytes").unwrap();

        let candidate = Candidate::from_path(&path).unwrap();
        assert_eq!(candidate.size, 12);
        assert_eq!(candidate.kind, MediaKind::Video);
        assert_eq!(candidate.dotted_extension(), ".MOV");
        assert_eq!(candidate.file_name(), "clip.MOV");
    }

    #[test]
    fn candidate_from_missing_file_is_not_found() {
        let err = Candidate::from_path(Path::new("/nonexistent/file.jpg")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn candidate_rejects_directories() {
        let temp_dir = TempDir::new().unwrap();
        let err = Candidate::from_path(temp_dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}

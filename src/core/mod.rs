//! # Core Module
//!
//! The GUI-agnostic organizing engine.
//!
//! ## Modules
//! - `media` - Candidates and their media class
//! - `metadata` - Reads capture times from EXIF and video containers
//! - `classifier` - Maps a capture time to its place in the library
//! - `hasher` - Content fingerprints and exact comparison
//! - `resolver` - Decides whether a candidate duplicates what is already filed
//! - `stats` - Crash-safe running totals with advisory locking
//! - `executor` - Moves and deletes files, keeping statistics in step
//! - `pipeline` - Takes one candidate end-to-end
//! - `watcher` - Feeds settled files from the source directory
//! - `service` - The long-running loop around all of the above

pub mod classifier;
pub mod executor;
pub mod hasher;
pub mod media;
pub mod metadata;
pub mod pipeline;
pub mod resolver;
pub mod service;
pub mod stats;
pub mod watcher;

// Re-export commonly used types
pub use classifier::{ClassifiedTarget, PathClassifier};
pub use media::{Candidate, MediaKind};
pub use metadata::{CaptureTime, DateSource, MetadataProbe};
pub use pipeline::{Organizer, OrganizerBuilder, ProcessOutcome};
pub use resolver::{ConflictPolicy, DuplicateVerdict};
pub use service::{Service, ShutdownHandle};
pub use stats::{StatisticsRecord, StatisticsStore};

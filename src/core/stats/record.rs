//! In-memory counters and their on-disk representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics category of a completed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Filed into the dated hierarchy (or the unknown-types bucket)
    Moved,
    /// Placed into a duplicates area
    Duplicated,
    /// Removed as an exact duplicate
    Deleted,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Moved => write!(f, "moved"),
            Category::Duplicated => write!(f, "duplicated"),
            Category::Deleted => write!(f, "deleted"),
        }
    }
}

/// Six non-negative counters, two per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub files_moved: u64,
    pub bytes_moved: u64,
    pub files_duplicated: u64,
    pub bytes_duplicated: u64,
    pub files_deleted: u64,
    pub bytes_deleted: u64,
}

/// What an `adjust` actually did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adjustment {
    /// Files taken from the source category
    pub transferred_files: u64,
    /// Bytes taken from the source category
    pub transferred_bytes: u64,
    /// Files the source category could not cover, counted as new in the target
    pub new_files: u64,
    /// Bytes the source category could not cover, counted as new in the target
    pub new_bytes: u64,
}

impl Adjustment {
    pub fn is_pure_transfer(&self) -> bool {
        self.new_files == 0 && self.new_bytes == 0
    }
}

impl StatisticsRecord {
    pub fn files(&self, category: Category) -> u64 {
        match category {
            Category::Moved => self.files_moved,
            Category::Duplicated => self.files_duplicated,
            Category::Deleted => self.files_deleted,
        }
    }

    pub fn bytes(&self, category: Category) -> u64 {
        match category {
            Category::Moved => self.bytes_moved,
            Category::Duplicated => self.bytes_duplicated,
            Category::Deleted => self.bytes_deleted,
        }
    }

    pub fn total_files(&self) -> u64 {
        self.files_moved + self.files_duplicated + self.files_deleted
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_moved + self.bytes_duplicated + self.bytes_deleted
    }

    fn counters_mut(&mut self, category: Category) -> (&mut u64, &mut u64) {
        match category {
            Category::Moved => (&mut self.files_moved, &mut self.bytes_moved),
            Category::Duplicated => (&mut self.files_duplicated, &mut self.bytes_duplicated),
            Category::Deleted => (&mut self.files_deleted, &mut self.bytes_deleted),
        }
    }

    /// Count a new operation
    pub fn record(&mut self, category: Category, files: u64, bytes: u64) {
        let (f, b) = self.counters_mut(category);
        *f = f.saturating_add(files);
        *b = b.saturating_add(bytes);
    }

    /// Move an amount from one category to another.
    ///
    /// The target always grows by the full amount. The source shrinks by as
    /// much as it holds; anything it cannot cover (for example operations lost
    /// in a crash before they were flushed) is reported as new.
    pub fn adjust(&mut self, from: Category, to: Category, files: u64, bytes: u64) -> Adjustment {
        if from == to {
            return Adjustment {
                transferred_files: files,
                transferred_bytes: bytes,
                ..Adjustment::default()
            };
        }

        let (from_files, from_bytes) = self.counters_mut(from);
        let transferred_files = files.min(*from_files);
        let transferred_bytes = bytes.min(*from_bytes);
        *from_files -= transferred_files;
        *from_bytes -= transferred_bytes;

        self.record(to, files, bytes);

        Adjustment {
            transferred_files,
            transferred_bytes,
            new_files: files - transferred_files,
            new_bytes: bytes - transferred_bytes,
        }
    }
}

/// JSON layout of the statistics file.
///
/// Files written by older releases used `*_moved_to_destination` and
/// `*_moved_to_duplicates`; those names are accepted on read. When a file
/// holds both names for one counter, the current name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredStatistics")]
pub struct PersistedStatistics {
    pub files_moved: u64,
    pub bytes_moved: u64,
    pub files_duplicated: u64,
    pub bytes_duplicated: u64,
    pub files_deleted: u64,
    pub bytes_deleted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Every key the statistics file may carry, current and legacy
#[derive(Default, Deserialize)]
#[serde(default)]
struct StoredStatistics {
    files_moved: Option<u64>,
    bytes_moved: Option<u64>,
    files_duplicated: Option<u64>,
    bytes_duplicated: Option<u64>,
    files_deleted: Option<u64>,
    bytes_deleted: Option<u64>,
    last_updated: Option<String>,
    files_moved_to_destination: Option<u64>,
    bytes_moved_to_destination: Option<u64>,
    files_moved_to_duplicates: Option<u64>,
    bytes_moved_to_duplicates: Option<u64>,
}

impl From<StoredStatistics> for PersistedStatistics {
    fn from(stored: StoredStatistics) -> Self {
        Self {
            files_moved: stored.files_moved.or(stored.files_moved_to_destination).unwrap_or(0),
            bytes_moved: stored.bytes_moved.or(stored.bytes_moved_to_destination).unwrap_or(0),
            files_duplicated: stored
                .files_duplicated
                .or(stored.files_moved_to_duplicates)
                .unwrap_or(0),
            bytes_duplicated: stored
                .bytes_duplicated
                .or(stored.bytes_moved_to_duplicates)
                .unwrap_or(0),
            files_deleted: stored.files_deleted.unwrap_or(0),
            bytes_deleted: stored.bytes_deleted.unwrap_or(0),
            last_updated: stored.last_updated,
        }
    }
}

impl PersistedStatistics {
    pub fn new(record: StatisticsRecord, last_updated: Option<String>) -> Self {
        Self {
            files_moved: record.files_moved,
            bytes_moved: record.bytes_moved,
            files_duplicated: record.files_duplicated,
            bytes_duplicated: record.bytes_duplicated,
            files_deleted: record.files_deleted,
            bytes_deleted: record.bytes_deleted,
            last_updated,
        }
    }

    pub fn record(&self) -> StatisticsRecord {
        StatisticsRecord {
            files_moved: self.files_moved,
            bytes_moved: self.bytes_moved,
            files_duplicated: self.files_duplicated,
            bytes_duplicated: self.bytes_duplicated,
            files_deleted: self.files_deleted,
            bytes_deleted: self.bytes_deleted,
        }
    }
}

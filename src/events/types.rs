//! Event type definitions for progress reporting.

use crate::core::stats::{FlushOutcome, StatisticsRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-file outcomes
    File(FileEvent),
    /// Directory monitor events
    Monitor(MonitorEvent),
    /// Statistics persistence events
    Statistics(StatisticsEvent),
    /// Service lifecycle events
    Service(ServiceEvent),
}

/// What happened to a single candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileEvent {
    /// Filed into the destination hierarchy
    Moved { from: PathBuf, to: PathBuf, bytes: u64 },
    /// Removed because identical content already exists
    DuplicateDeleted {
        path: PathBuf,
        existing: PathBuf,
        bytes: u64,
    },
    /// Placed into a duplicates area
    MovedToDuplicates { from: PathBuf, to: PathBuf, bytes: u64 },
    /// A file already counted as moved was reclassified
    Reclassified {
        from: PathBuf,
        to: Option<PathBuf>,
        bytes: u64,
    },
    /// Left in place, to be retried on a later pass
    Deferred { path: PathBuf, reason: String },
}

/// Events from the directory monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Monitoring of the source directory began
    Started { path: PathBuf },
    /// Monitoring stopped
    Stopped { path: PathBuf },
    /// A path was queued for processing once settled
    Queued { path: PathBuf },
    /// The source directory was relisted
    Rescanned { queued: usize },
    /// The watcher reported an error; monitoring continues
    Error { message: String },
}

/// Events from the statistics store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatisticsEvent {
    /// A flush attempt finished
    Flushed {
        outcome: FlushOutcome,
        record: StatisticsRecord,
    },
    /// Periodic summary after a quiet period
    IdleReport { record: StatisticsRecord },
}

/// Service lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServiceEvent {
    /// The service is running
    Started {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A sweep over the existing source files began
    SweepStarted { total: usize },
    /// A sweep processed one more file
    SweepProgress {
        completed: usize,
        total: usize,
        current: PathBuf,
    },
    /// A sweep finished
    SweepCompleted { summary: SweepSummary },
    /// Shutdown was requested by a signal
    ShutdownRequested,
    /// The service stopped after its final flush
    Stopped { record: StatisticsRecord },
}

/// Tally of a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub moved: usize,
    pub deleted: usize,
    pub duplicated: usize,
    pub deferred: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl SweepSummary {
    pub fn processed(&self) -> usize {
        self.moved + self.deleted + self.duplicated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::File(FileEvent::Moved {
            from: PathBuf::from("/inbox/IMG_0001.jpg"),
            to: PathBuf::from("/library/2023/06_Jun/IMG_0001.jpg"),
            bytes: 2048,
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::File(FileEvent::Moved { bytes, .. }) => assert_eq!(bytes, 2048),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn sweep_summary_counts_completed_operations() {
        let summary = SweepSummary {
            moved: 3,
            deleted: 1,
            duplicated: 2,
            deferred: 4,
            skipped: 5,
            duration_ms: 10,
        };
        assert_eq!(summary.processed(), 6);
    }
}

//! # Statistics Module
//!
//! Running totals of moved, duplicated and deleted files.
//!
//! ## Lifecycle
//! 1. `StatisticsStore::load` once at startup (zero on absent or corrupt file)
//! 2. `record_event` / `adjust` after every completed file operation
//! 3. `maybe_flush` after every operation: writes after `every_ops`
//!    operations or `interval` elapsed, whichever comes first
//! 4. `flush_now` on shutdown
//!
//! Writes hold an exclusive advisory lock, go to a temporary file in the same
//! directory, and atomically replace the statistics file.

mod lock;
mod record;
mod store;

pub use lock::{LockMode, StatsLock};
pub use record::{Adjustment, Category, PersistedStatistics, StatisticsRecord};
pub use store::{FlushOutcome, FlushPolicy, StatisticsStore, STATS_FILE_NAME};

//! # Pipeline Module
//!
//! Takes one candidate path end-to-end.
//!
//! ## Stages
//! 1. **Admit** - skip ignored, vanished or out-of-source paths
//! 2. **Classify** - capture date to `yyyy/mm_MMM` (or a fallback bucket)
//! 3. **Resolve** - compare with whatever already occupies the destination
//! 4. **Execute** - move, delete or divert, and record the statistics
//! 5. **Flush** - persist statistics when a trigger fires
//!
//! Per-file failures become [`ProcessOutcome::Deferred`]; the file stays in
//! the source directory and is picked up again on a later pass.

mod builder;
mod organizer;

pub use builder::OrganizerBuilder;
pub use organizer::{DeferReason, Organizer, ProcessOutcome, SkipReason};

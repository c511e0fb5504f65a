//! # Photo Organizer
//!
//! Watches a drop folder and files photos and videos into a dated library.
//!
//! ## Behaviour
//! - **Date-partitioned library** - `yyyy/mm_MMM` from the capture time
//! - **Exact duplicates only** - content comparison, never guesses
//! - **Counted once** - statistics survive crashes and restarts
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - The organizing engine
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `config` - Layered settings (config.ini, environment, overrides)
//! - `logging` - Activity and application logs

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod logging;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};
pub use logging::{init_logging, init_tracing};

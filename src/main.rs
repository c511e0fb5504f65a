//! # photo-organizer CLI
//!
//! Command-line interface for the photo organizer.
//!
//! ## Usage
//! ```bash
//! photo-organizer run --source ~/Inbox --destination ~/Pictures/Library
//! photo-organizer sweep --keep-duplicates
//! photo-organizer stats --json
//! ```

mod cli;

use photo_organizer::Result;

fn main() -> Result<()> {
    cli::run()
}

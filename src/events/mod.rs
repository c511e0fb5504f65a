//! # Events Module
//!
//! Typed notifications from the organizer to any front end.
//!
//! ## Design
//! The engine emits events through a crossbeam channel; the CLI subscribes to
//! drive its progress bar. Events never influence what the engine does, and a
//! missing receiver is not an error.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::File(FileEvent::Moved { to, .. }) = event {
//!             println!("Filed {}", to.display());
//!         }
//!     }
//! });
//!
//! let organizer = Organizer::builder().events(sender).build()?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;

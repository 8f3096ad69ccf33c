//! On-demand archive streaming subsystem.
//!
//! # Data Flow
//! ```text
//! Request for a tar / tgz / zip endpoint
//!     → spawn_blocking worker
//!     → walk.rs (lexical walk, entry names, skip directories)
//!     → tar.rs / zip.rs (headers + content, single pass)
//!     → [compression::EncoderWriter for tgz]
//!     → channel.rs (bounded chunk channel)
//!     → streaming response body
//! ```
//!
//! # Design Decisions
//! - Nothing is buffered beyond a few chunks; archives of any size stream
//! - Client disconnect closes the channel and stops the walk
//! - Write errors end the walk and terminate the body with an error

pub mod channel;
pub mod tar;
pub mod walk;
pub mod zip;

pub use channel::{channel_body, ChannelWriter};
pub use walk::{entry_name, walk_entries, EntryKind, WalkEntry};

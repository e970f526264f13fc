//! Floyd Storage — durable, append-only-in-spirit persistence for sessions.
//!
//! One session is one self-describing JSON file under `<root>/sessions/`.
//! Writes are atomic (temp file + rename) so a reader never observes a
//! truncated record, and unknown fields on the record round-trip unchanged
//! so a future writer's additions survive an older build reading the file
//! back (see [`floyd_core::Session`]'s `extra` map).
//!
//! Construction only schedules creation of the storage directory; every
//! public method below awaits that same shared "ensure ready" future before
//! touching disk, closing the race where a `create` issued immediately after
//! construction would otherwise run before the directory exists.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod store;

pub use error::{StorageError, StorageResult};
pub use store::SessionStore;

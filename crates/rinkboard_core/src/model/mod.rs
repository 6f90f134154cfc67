//! Domain model for folders and rink drawings.
//!
//! # Responsibility
//! - Define the two persisted record kinds and their identifiers.
//! - Own the write-side label rule shared by folder names and drawing titles.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - A drawing references at most one owning folder.

pub mod drawing;
pub mod folder;
pub mod label;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the entity store contract: staged change sets, atomic commit,
//!   read-only queries.
//! - Isolate SQLite query details from lifecycle orchestration.
//! - Carry commit notifications to listing consumers.
//!
//! # Invariants
//! - Commits are all-or-nothing.
//! - Repository APIs return semantic errors (`FolderNotFound`,
//!   `DrawingNotFound`) in addition to DB transport errors.

pub mod change_feed;
pub mod entity_store;

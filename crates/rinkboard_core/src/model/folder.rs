//! Folder domain model.
//!
//! # Responsibility
//! - Define the named grouping that owns zero or more drawings.
//!
//! # Invariants
//! - `id` and `created_at` are assigned once and never change.
//! - Ownership lives on `Drawing::folder_id`; a folder holds no child list.

use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a folder.
pub type FolderId = Uuid;

/// Label shown when a stored folder name is empty.
pub const UNNAMED_FOLDER_LABEL: &str = "Unnamed Folder";

/// Named grouping of drawings, listed by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// Unix epoch milliseconds; sole ordering key for folder listings.
    pub created_at: i64,
}

impl Folder {
    /// Creates a folder with a fresh id stamped with the current time.
    ///
    /// Does not validate `name`; lifecycle services do that before staging.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, now_epoch_ms())
    }

    /// Creates a folder with caller-provided identity and timestamp.
    pub fn with_id(id: FolderId, name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
        }
    }

    /// Name for display, falling back to a placeholder when empty.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            UNNAMED_FOLDER_LABEL
        } else {
            self.name.as_str()
        }
    }
}

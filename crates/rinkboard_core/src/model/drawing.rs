//! Drawing domain model.
//!
//! # Responsibility
//! - Define the titled canvas record: background template plus opaque
//!   serialized stylus content.
//!
//! # Invariants
//! - `id` and `background` never change after creation.
//! - `canvas_data` starts empty and is only ever replaced wholesale.
//! - `folder_id == None` means the drawing is unfiled.

use crate::model::folder::FolderId;
use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a drawing.
pub type DrawingId = Uuid;

/// Label shown when a stored drawing title is empty.
pub const UNTITLED_DRAWING_LABEL: &str = "Untitled";

/// Rink image a drawing is annotated on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundTemplate {
    /// Full ice surface.
    #[default]
    HockeyRink,
    /// One half of the ice surface.
    HalfRink,
}

impl BackgroundTemplate {
    /// Every selectable template, in picker order.
    pub fn all() -> &'static [BackgroundTemplate] {
        &[Self::HockeyRink, Self::HalfRink]
    }

    /// Stable asset name, also used as the persisted value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HockeyRink => "hockey_rink",
            Self::HalfRink => "half_rink",
        }
    }

    /// Parses a persisted/asset name; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hockey_rink" => Some(Self::HockeyRink),
            "half_rink" => Some(Self::HalfRink),
            _ => None,
        }
    }
}

impl Display for BackgroundTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Titled canvas record combining a background and stylus content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: DrawingId,
    pub title: String,
    pub background: BackgroundTemplate,
    /// Serialized stylus drawing as produced by the capture surface.
    pub canvas_data: Vec<u8>,
    /// Owning folder; `None` for unfiled drawings.
    pub folder_id: Option<FolderId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds; advanced by content writes and moves.
    pub updated_at: i64,
}

impl Drawing {
    /// Creates an empty drawing with a fresh id.
    ///
    /// Does not validate `title`; lifecycle services do that before staging.
    pub fn new(
        title: impl Into<String>,
        background: BackgroundTemplate,
        folder_id: Option<FolderId>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            background,
            canvas_data: Vec::new(),
            folder_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Title for display, falling back to a placeholder when empty.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED_DRAWING_LABEL
        } else {
            self.title.as_str()
        }
    }

    /// Returns whether this drawing has no owning folder.
    pub fn is_unfiled(&self) -> bool {
        self.folder_id.is_none()
    }
}

//! Drawing lifecycle service.
//!
//! # Responsibility
//! - Create drawings (unfiled or inside a folder) with validated titles.
//! - Delete drawings, move them between folders and persist content changes.
//!
//! # Invariants
//! - A new drawing always starts with empty `canvas_data`.
//! - Content updates replace the blob wholesale; the last write wins.
//! - A content update for an unknown drawing is a logged no-op.

use crate::model::drawing::{BackgroundTemplate, Drawing, DrawingId};
use crate::model::folder::FolderId;
use crate::model::label::{validate_label, LabelValidationError};
use crate::repo::change_feed::{ChangeFeed, StoreEvent};
use crate::repo::entity_store::{ChangeSet, CommitReceipt, EntityStore, StoreError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Request model for creating one drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrawing {
    pub title: String,
    pub background: BackgroundTemplate,
    /// Folder to file the drawing in; `None` creates it unfiled.
    pub folder_id: Option<FolderId>,
}

impl NewDrawing {
    pub fn unfiled(title: impl Into<String>, background: BackgroundTemplate) -> Self {
        Self {
            title: title.into(),
            background,
            folder_id: None,
        }
    }

    pub fn in_folder(
        title: impl Into<String>,
        background: BackgroundTemplate,
        folder_id: FolderId,
    ) -> Self {
        Self {
            title: title.into(),
            background,
            folder_id: Some(folder_id),
        }
    }
}

/// Result of a content write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentWrite {
    /// Content was replaced and committed.
    Written,
    /// No drawing has this id; nothing changed.
    Missed,
}

/// Errors from drawing lifecycle operations.
#[derive(Debug)]
pub enum DrawingServiceError {
    /// Title fails the 1..=30 character rule.
    InvalidTitle(LabelValidationError),
    /// Target drawing does not exist.
    DrawingNotFound(DrawingId),
    /// Requested folder does not exist.
    FolderNotFound(FolderId),
    /// Commit or query failure; prior state is intact.
    Store(StoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for DrawingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle(err) => write!(f, "invalid drawing title: {err}"),
            Self::DrawingNotFound(id) => write!(f, "drawing not found: {id}"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent drawing state: {details}")
            }
        }
    }
}

impl Error for DrawingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTitle(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for DrawingServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DrawingNotFound(id) => Self::DrawingNotFound(id),
            StoreError::FolderNotFound(id) => Self::FolderNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Drawing lifecycle facade over an entity store.
pub struct DrawingService<S: EntityStore> {
    store: S,
    feed: ChangeFeed,
}

impl<S: EntityStore> DrawingService<S> {
    /// Creates a service with a private change feed.
    pub fn new(store: S) -> Self {
        Self::with_feed(store, ChangeFeed::new())
    }

    /// Creates a service publishing into a shared change feed.
    pub fn with_feed(store: S, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Creates one empty drawing and returns the stored record.
    pub fn create_drawing(&self, request: NewDrawing) -> Result<Drawing, DrawingServiceError> {
        validate_label(&request.title).map_err(DrawingServiceError::InvalidTitle)?;

        let drawing = Drawing::new(request.title, request.background, request.folder_id);
        let mut changes = ChangeSet::new();
        changes.insert_drawing(drawing.clone());
        self.commit("drawing_create", &changes)?;

        info!(
            "event=drawing_create module=service status=ok drawing_id={} background={} filed={}",
            drawing.id,
            drawing.background,
            drawing.folder_id.is_some()
        );
        self.feed.publish(&[StoreEvent::DrawingCreated {
            drawing_id: drawing.id,
            folder_id: drawing.folder_id,
        }]);
        self.store
            .get_drawing(drawing.id)?
            .ok_or(DrawingServiceError::InconsistentState(
                "created drawing not found in read-back",
            ))
    }

    /// Deletes one drawing.
    pub fn delete_drawing(&self, drawing_id: DrawingId) -> Result<(), DrawingServiceError> {
        let mut changes = ChangeSet::new();
        changes.delete_drawing(drawing_id);
        self.commit("drawing_delete", &changes)?;

        info!("event=drawing_delete module=service status=ok drawing_id={drawing_id}");
        self.feed.publish(&[StoreEvent::DrawingDeleted(drawing_id)]);
        Ok(())
    }

    /// Files a drawing into `folder_id`, or unfiles it with `None`.
    pub fn move_drawing(
        &self,
        drawing_id: DrawingId,
        folder_id: Option<FolderId>,
    ) -> Result<Drawing, DrawingServiceError> {
        let mut changes = ChangeSet::new();
        changes.set_drawing_folder(drawing_id, folder_id);
        self.commit("drawing_move", &changes)?;

        self.feed.publish(&[StoreEvent::DrawingMoved {
            drawing_id,
            folder_id,
        }]);
        self.store
            .get_drawing(drawing_id)?
            .ok_or(DrawingServiceError::InconsistentState(
                "moved drawing not found in read-back",
            ))
    }

    /// Replaces the serialized stylus content of one drawing.
    ///
    /// Commits synchronously; capture callbacks should go through
    /// [`crate::service::content_writer::ContentSink`] instead.
    pub fn update_content(
        &self,
        drawing_id: DrawingId,
        content: Vec<u8>,
    ) -> Result<ContentWrite, DrawingServiceError> {
        let content_len = content.len();
        let mut changes = ChangeSet::new();
        changes.set_drawing_content(drawing_id, content);
        let receipt = self.commit("drawing_update_content", &changes)?;

        if receipt.missed_content.contains(&drawing_id) {
            warn!(
                "event=drawing_update_content module=service status=miss drawing_id={drawing_id}"
            );
            return Ok(ContentWrite::Missed);
        }

        debug!(
            "event=drawing_update_content module=service status=ok drawing_id={drawing_id} bytes={content_len}"
        );
        self.feed
            .publish(&[StoreEvent::DrawingContentChanged(drawing_id)]);
        Ok(ContentWrite::Written)
    }

    /// Loads one drawing by id.
    pub fn get_drawing(&self, drawing_id: DrawingId) -> Result<Option<Drawing>, DrawingServiceError> {
        self.store.get_drawing(drawing_id).map_err(Into::into)
    }

    fn commit(
        &self,
        event: &'static str,
        changes: &ChangeSet,
    ) -> Result<CommitReceipt, DrawingServiceError> {
        self.store.commit(changes).map_err(|err| {
            error!("event={event} module=service status=error error={err}");
            DrawingServiceError::from(err)
        })
    }
}

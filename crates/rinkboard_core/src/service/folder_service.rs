//! Folder lifecycle service.
//!
//! # Responsibility
//! - Validate folder names before anything is staged.
//! - Create, rename and delete folders through single-commit change sets.
//!
//! # Invariants
//! - Folder deletion always names the fate of owned drawings
//!   ([`FolderDeleteMode`]); there is no default.
//! - Cascade deletion stages every drawing removal before the folder removal,
//!   and both land in one transaction.
//! - Events are published only after a successful commit.

use crate::model::drawing::DrawingId;
use crate::model::folder::{Folder, FolderId};
use crate::model::label::{validate_label, LabelValidationError};
use crate::repo::change_feed::{ChangeFeed, StoreEvent};
use crate::repo::entity_store::{ChangeSet, CommitReceipt, EntityStore, StoreError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// What happens to owned drawings when a folder is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderDeleteMode {
    /// Delete the folder and every drawing it owns.
    DeleteDrawings,
    /// Delete only the folder; owned drawings become unfiled.
    KeepDrawings,
}

impl FolderDeleteMode {
    /// Maps a "delete drawings too" choice to a mode.
    pub fn from_cascade(cascade: bool) -> Self {
        if cascade {
            Self::DeleteDrawings
        } else {
            Self::KeepDrawings
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::DeleteDrawings => "delete_drawings",
            Self::KeepDrawings => "keep_drawings",
        }
    }
}

/// Errors from folder lifecycle operations.
#[derive(Debug)]
pub enum FolderServiceError {
    /// Name fails the 1..=30 character rule.
    InvalidName(LabelValidationError),
    /// Target folder does not exist.
    FolderNotFound(FolderId),
    /// Commit or query failure; prior state is intact.
    Store(StoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for FolderServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "invalid folder name: {err}"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent folder state: {details}")
            }
        }
    }
}

impl Error for FolderServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for FolderServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::FolderNotFound(id) => Self::FolderNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Outcome of a committed folder deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDeletion {
    pub folder_id: FolderId,
    pub mode: FolderDeleteMode,
    /// Drawings removed together with the folder.
    pub deleted_drawings: Vec<DrawingId>,
    /// Drawings that became unfiled.
    pub detached_drawings: Vec<DrawingId>,
}

/// Folder lifecycle facade over an entity store.
pub struct FolderService<S: EntityStore> {
    store: S,
    feed: ChangeFeed,
}

impl<S: EntityStore> FolderService<S> {
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

    /// Creates one folder stamped with the current time.
    pub fn create_folder(&self, name: impl Into<String>) -> Result<Folder, FolderServiceError> {
        let name = name.into();
        validate_label(&name).map_err(FolderServiceError::InvalidName)?;

        let folder = Folder::new(name);
        let mut changes = ChangeSet::new();
        changes.insert_folder(folder.clone());
        self.commit("folder_create", &changes)?;

        info!(
            "event=folder_create module=service status=ok folder_id={}",
            folder.id
        );
        self.feed.publish(&[StoreEvent::FolderCreated(folder.id)]);
        self.store
            .get_folder(folder.id)?
            .ok_or(FolderServiceError::InconsistentState(
                "created folder not found in read-back",
            ))
    }

    /// Renames one folder under the same rule as creation.
    pub fn rename_folder(
        &self,
        folder_id: FolderId,
        name: impl Into<String>,
    ) -> Result<Folder, FolderServiceError> {
        let name = name.into();
        validate_label(&name).map_err(FolderServiceError::InvalidName)?;

        let mut changes = ChangeSet::new();
        changes.rename_folder(folder_id, name);
        self.commit("folder_rename", &changes)?;

        self.feed.publish(&[StoreEvent::FolderRenamed(folder_id)]);
        self.store
            .get_folder(folder_id)?
            .ok_or(FolderServiceError::InconsistentState(
                "renamed folder not found in read-back",
            ))
    }

    /// Deletes one folder, cascading to or detaching its drawings.
    ///
    /// Irreversible once committed.
    pub fn delete_folder(
        &self,
        folder_id: FolderId,
        mode: FolderDeleteMode,
    ) -> Result<FolderDeletion, FolderServiceError> {
        let mut changes = ChangeSet::new();
        match mode {
            FolderDeleteMode::DeleteDrawings => changes.delete_folder_drawings(folder_id),
            FolderDeleteMode::KeepDrawings => changes.detach_folder_drawings(folder_id),
        };
        changes.delete_folder(folder_id);

        let receipt = self.commit("folder_delete", &changes)?;
        info!(
            "event=folder_delete module=service status=ok folder_id={} mode={} deleted_drawings={} detached_drawings={}",
            folder_id,
            mode.as_str(),
            receipt.deleted_drawings.len(),
            receipt.detached_drawings.len()
        );

        let deletion = FolderDeletion {
            folder_id,
            mode,
            deleted_drawings: receipt.deleted_drawings,
            detached_drawings: receipt.detached_drawings,
        };
        self.feed.publish(&[StoreEvent::FolderDeleted {
            folder_id,
            deleted_drawings: deletion.deleted_drawings.clone(),
            detached_drawings: deletion.detached_drawings.clone(),
        }]);
        Ok(deletion)
    }

    /// Loads one folder by id.
    pub fn get_folder(&self, folder_id: FolderId) -> Result<Option<Folder>, FolderServiceError> {
        self.store.get_folder(folder_id).map_err(Into::into)
    }

    fn commit(
        &self,
        event: &'static str,
        changes: &ChangeSet,
    ) -> Result<CommitReceipt, FolderServiceError> {
        self.store.commit(changes).map_err(|err| {
            error!("event={event} module=service status=error error={err}");
            FolderServiceError::from(err)
        })
    }
}

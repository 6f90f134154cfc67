//! Read-only listing projections for folder and drawing screens.
//!
//! # Invariants
//! - Listing calls never stage or commit changes.
//! - Folders are ordered by creation time, oldest first.
//! - The unfiled listing never contains a drawing with an owning folder.

use crate::model::drawing::Drawing;
use crate::model::folder::{Folder, FolderId};
use crate::repo::entity_store::{DrawingQuery, EntityStore, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from listing queries.
#[derive(Debug)]
pub enum ListingError {
    /// Requested folder does not exist.
    FolderNotFound(FolderId),
    /// Query failure.
    Store(StoreError),
}

impl Display for ListingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ListingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::FolderNotFound(_) => None,
        }
    }
}

impl From<StoreError> for ListingError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Folder row for the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSummary {
    pub folder: Folder,
    pub drawing_count: u64,
}

/// Listing facade over an entity store.
pub struct ListingService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> ListingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All folders, oldest first.
    pub fn list_folders(&self) -> Result<Vec<Folder>, ListingError> {
        self.store.list_folders().map_err(Into::into)
    }

    /// Drawings that belong to no folder.
    pub fn list_unfiled_drawings(&self) -> Result<Vec<Drawing>, ListingError> {
        self.store
            .list_drawings(&DrawingQuery::unfiled())
            .map_err(Into::into)
    }

    /// Drawings owned by one folder.
    pub fn list_drawings_in(&self, folder_id: FolderId) -> Result<Vec<Drawing>, ListingError> {
        if self.store.get_folder(folder_id)?.is_none() {
            return Err(ListingError::FolderNotFound(folder_id));
        }
        self.store
            .list_drawings(&DrawingQuery::in_folder(folder_id))
            .map_err(Into::into)
    }

    /// Folders in listing order with their drawing counts.
    pub fn folder_overview(&self) -> Result<Vec<FolderSummary>, ListingError> {
        let folders = self.store.list_folders()?;
        let mut summaries = Vec::with_capacity(folders.len());
        for folder in folders {
            let drawing_count = self.store.count_drawings_in(folder.id)?;
            summaries.push(FolderSummary {
                folder,
                drawing_count,
            });
        }
        Ok(summaries)
    }
}

//! Core domain logic for rinkboard.
//! This crate is the single source of truth for folder/drawing invariants.

pub mod capability;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use capability::capture::{bind_capture_surface, CaptureSurface, ContentChangedHandler};
pub use capability::export::{
    export_with_authorization, ExportError, ImageExporter, PhotoAuthorization, RenderedImage,
};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::drawing::{BackgroundTemplate, Drawing, DrawingId, UNTITLED_DRAWING_LABEL};
pub use model::folder::{Folder, FolderId, UNNAMED_FOLDER_LABEL};
pub use model::label::{validate_label, LabelValidationError, MAX_LABEL_CHARS};
pub use repo::change_feed::{ChangeFeed, StoreEvent, SubscriptionId};
pub use repo::entity_store::{
    ChangeSet, CommitReceipt, DrawingQuery, DrawingScope, EntityStore, SqliteEntityStore,
    StagedChange, StoreError, StoreResult,
};
pub use service::content_writer::{
    CommitFailure, ContentSink, ContentWriter, ContentWriterError,
};
pub use service::drawing_service::{ContentWrite, DrawingService, DrawingServiceError, NewDrawing};
pub use service::folder_service::{
    FolderDeleteMode, FolderDeletion, FolderService, FolderServiceError,
};
pub use service::listing_service::{FolderSummary, ListingError, ListingService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Entity store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Stage folder/drawing mutations in a [`ChangeSet`] and apply them with
//!   all-or-nothing commit semantics.
//! - Provide read-only queries over committed state.
//!
//! # Invariants
//! - One `commit` is one `IMMEDIATE` transaction; any failing staged change
//!   rolls back every change before it.
//! - Staged changes are applied in staging order.
//! - Queries never write.
//! - A folder can only be deleted once it owns no drawings (enforced by the
//!   `drawings.folder_uuid` foreign key).

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::drawing::{BackgroundTemplate, Drawing, DrawingId};
use crate::model::folder::{Folder, FolderId};
use crate::model::now_epoch_ms;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const FOLDER_SELECT_SQL: &str = "SELECT uuid, name, created_at FROM folders";

const DRAWING_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    background,
    canvas_data,
    folder_uuid,
    created_at,
    updated_at
FROM drawings";

/// Result type used by entity store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from entity store commits and queries.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// A staged change targets a folder that does not exist.
    FolderNotFound(FolderId),
    /// A staged change targets a drawing that does not exist.
    DrawingNotFound(DrawingId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::DrawingNotFound(id) => write!(f, "drawing not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "entity store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One staged mutation awaiting commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedChange {
    InsertFolder(Folder),
    InsertDrawing(Drawing),
    RenameFolder {
        folder_id: FolderId,
        name: String,
    },
    DeleteFolder(FolderId),
    DeleteDrawing(DrawingId),
    /// Attaches a drawing to a folder, or detaches it with `None`.
    SetDrawingFolder {
        drawing_id: DrawingId,
        folder_id: Option<FolderId>,
    },
    /// Clears the folder reference of every drawing owned by the folder.
    DetachFolderDrawings(FolderId),
    /// Deletes every drawing owned by the folder.
    DeleteFolderDrawings(FolderId),
    /// Replaces drawing content wholesale. A missing drawing is not an error.
    SetDrawingContent {
        drawing_id: DrawingId,
        content: Vec<u8>,
    },
}

/// Ordered batch of staged mutations applied by one commit.
///
/// A change set is borrowed by [`EntityStore::commit`], so a caller keeps the
/// staged state after a failed commit and may retry it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<StagedChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_folder(&mut self, folder: Folder) -> &mut Self {
        self.push(StagedChange::InsertFolder(folder))
    }

    pub fn insert_drawing(&mut self, drawing: Drawing) -> &mut Self {
        self.push(StagedChange::InsertDrawing(drawing))
    }

    pub fn rename_folder(&mut self, folder_id: FolderId, name: impl Into<String>) -> &mut Self {
        self.push(StagedChange::RenameFolder {
            folder_id,
            name: name.into(),
        })
    }

    pub fn delete_folder(&mut self, folder_id: FolderId) -> &mut Self {
        self.push(StagedChange::DeleteFolder(folder_id))
    }

    pub fn delete_drawing(&mut self, drawing_id: DrawingId) -> &mut Self {
        self.push(StagedChange::DeleteDrawing(drawing_id))
    }

    pub fn set_drawing_folder(
        &mut self,
        drawing_id: DrawingId,
        folder_id: Option<FolderId>,
    ) -> &mut Self {
        self.push(StagedChange::SetDrawingFolder {
            drawing_id,
            folder_id,
        })
    }

    pub fn detach_folder_drawings(&mut self, folder_id: FolderId) -> &mut Self {
        self.push(StagedChange::DetachFolderDrawings(folder_id))
    }

    pub fn delete_folder_drawings(&mut self, folder_id: FolderId) -> &mut Self {
        self.push(StagedChange::DeleteFolderDrawings(folder_id))
    }

    pub fn set_drawing_content(&mut self, drawing_id: DrawingId, content: Vec<u8>) -> &mut Self {
        self.push(StagedChange::SetDrawingContent {
            drawing_id,
            content,
        })
    }

    /// Staged changes in application order.
    pub fn changes(&self) -> &[StagedChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn push(&mut self, change: StagedChange) -> &mut Self {
        self.changes.push(change);
        self
    }
}

/// Summary of what one successful commit did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Number of staged changes applied.
    pub applied: usize,
    /// Drawings removed by bulk `DeleteFolderDrawings` changes.
    pub deleted_drawings: Vec<DrawingId>,
    /// Drawings unfiled by bulk `DetachFolderDrawings` changes.
    pub detached_drawings: Vec<DrawingId>,
    /// Content writes whose drawing no longer exists.
    pub missed_content: Vec<DrawingId>,
}

/// Folder filter for drawing queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawingScope {
    /// Every drawing.
    #[default]
    All,
    /// Drawings without an owning folder.
    Unfiled,
    /// Drawings owned by one folder.
    InFolder(FolderId),
}

/// Query options for listing drawings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawingQuery {
    pub scope: DrawingScope,
}

impl DrawingQuery {
    pub fn unfiled() -> Self {
        Self {
            scope: DrawingScope::Unfiled,
        }
    }

    pub fn in_folder(folder_id: FolderId) -> Self {
        Self {
            scope: DrawingScope::InFolder(folder_id),
        }
    }
}

/// Repository interface over the folder/drawing object graph.
pub trait EntityStore {
    /// Applies every staged change atomically.
    fn commit(&self, changes: &ChangeSet) -> StoreResult<CommitReceipt>;
    /// Loads one folder by id.
    fn get_folder(&self, folder_id: FolderId) -> StoreResult<Option<Folder>>;
    /// Loads one drawing by id.
    fn get_drawing(&self, drawing_id: DrawingId) -> StoreResult<Option<Drawing>>;
    /// Lists folders by `created_at ASC`, insertion order breaking ties.
    fn list_folders(&self) -> StoreResult<Vec<Folder>>;
    /// Lists drawings matching the query scope.
    fn list_drawings(&self, query: &DrawingQuery) -> StoreResult<Vec<Drawing>>;
    /// Counts drawings owned by one folder.
    fn count_drawings_in(&self, folder_id: FolderId) -> StoreResult<u64>;
}

/// SQLite-backed entity store.
#[derive(Clone, Copy)]
pub struct SqliteEntityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EntityStore for SqliteEntityStore<'_> {
    fn commit(&self, changes: &ChangeSet) -> StoreResult<CommitReceipt> {
        if changes.is_empty() {
            return Ok(CommitReceipt::default());
        }

        let started_at = Instant::now();
        let result = apply_change_set(self.conn, changes);
        match &result {
            Ok(receipt) => debug!(
                "event=store_commit module=repo status=ok changes={} missed_content={} duration_ms={}",
                receipt.applied,
                receipt.missed_content.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_commit module=repo status=error changes={} duration_ms={} error={}",
                changes.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn get_folder(&self, folder_id: FolderId) -> StoreResult<Option<Folder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FOLDER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([folder_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(row)?));
        }
        Ok(None)
    }

    fn get_drawing(&self, drawing_id: DrawingId) -> StoreResult<Option<Drawing>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DRAWING_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([drawing_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_drawing_row(row)?));
        }
        Ok(None)
    }

    fn list_folders(&self) -> StoreResult<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FOLDER_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(row)?);
        }
        Ok(folders)
    }

    fn list_drawings(&self, query: &DrawingQuery) -> StoreResult<Vec<Drawing>> {
        let filter = match query.scope {
            DrawingScope::All => "",
            DrawingScope::Unfiled => " WHERE folder_uuid IS NULL",
            DrawingScope::InFolder(_) => " WHERE folder_uuid = ?1",
        };
        let sql = format!("{DRAWING_SELECT_SQL}{filter} ORDER BY created_at ASC, rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match query.scope {
            DrawingScope::InFolder(folder_id) => stmt.query([folder_id.to_string()])?,
            DrawingScope::All | DrawingScope::Unfiled => stmt.query([])?,
        };

        let mut drawings = Vec::new();
        while let Some(row) = rows.next()? {
            drawings.push(parse_drawing_row(row)?);
        }
        Ok(drawings)
    }

    fn count_drawings_in(&self, folder_id: FolderId) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM drawings WHERE folder_uuid = ?1;",
            [folder_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

fn apply_change_set(conn: &Connection, changes: &ChangeSet) -> StoreResult<CommitReceipt> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut receipt = CommitReceipt::default();

    for change in changes.changes() {
        apply_change(&tx, change, &mut receipt)?;
        receipt.applied += 1;
    }

    tx.commit()?;
    Ok(receipt)
}

fn apply_change(
    tx: &Transaction<'_>,
    change: &StagedChange,
    receipt: &mut CommitReceipt,
) -> StoreResult<()> {
    match change {
        StagedChange::InsertFolder(folder) => {
            tx.execute(
                "INSERT INTO folders (uuid, name, created_at) VALUES (?1, ?2, ?3);",
                params![folder.id.to_string(), folder.name.as_str(), folder.created_at],
            )?;
        }
        StagedChange::InsertDrawing(drawing) => {
            if let Some(folder_id) = drawing.folder_id {
                ensure_folder_exists(tx, folder_id)?;
            }
            tx.execute(
                "INSERT INTO drawings (
                    uuid,
                    title,
                    background,
                    canvas_data,
                    folder_uuid,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    drawing.id.to_string(),
                    drawing.title.as_str(),
                    drawing.background.as_str(),
                    drawing.canvas_data.as_slice(),
                    drawing.folder_id.map(|value| value.to_string()),
                    drawing.created_at,
                    drawing.updated_at,
                ],
            )?;
        }
        StagedChange::RenameFolder { folder_id, name } => {
            let changed = tx.execute(
                "UPDATE folders SET name = ?2 WHERE uuid = ?1;",
                params![folder_id.to_string(), name.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::FolderNotFound(*folder_id));
            }
        }
        StagedChange::DeleteFolder(folder_id) => {
            let changed = tx.execute(
                "DELETE FROM folders WHERE uuid = ?1;",
                [folder_id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::FolderNotFound(*folder_id));
            }
        }
        StagedChange::DeleteDrawing(drawing_id) => {
            let changed = tx.execute(
                "DELETE FROM drawings WHERE uuid = ?1;",
                [drawing_id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::DrawingNotFound(*drawing_id));
            }
        }
        StagedChange::SetDrawingFolder {
            drawing_id,
            folder_id,
        } => {
            if let Some(folder_id) = folder_id {
                ensure_folder_exists(tx, *folder_id)?;
            }
            let changed = tx.execute(
                "UPDATE drawings
                 SET folder_uuid = ?2,
                     updated_at = ?3
                 WHERE uuid = ?1;",
                params![
                    drawing_id.to_string(),
                    folder_id.map(|value| value.to_string()),
                    now_epoch_ms(),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::DrawingNotFound(*drawing_id));
            }
        }
        StagedChange::DetachFolderDrawings(folder_id) => {
            ensure_folder_exists(tx, *folder_id)?;
            let owned = list_owned_drawing_ids(tx, *folder_id)?;
            tx.execute(
                "UPDATE drawings
                 SET folder_uuid = NULL,
                     updated_at = ?2
                 WHERE folder_uuid = ?1;",
                params![folder_id.to_string(), now_epoch_ms()],
            )?;
            receipt.detached_drawings.extend(owned);
        }
        StagedChange::DeleteFolderDrawings(folder_id) => {
            ensure_folder_exists(tx, *folder_id)?;
            let owned = list_owned_drawing_ids(tx, *folder_id)?;
            tx.execute(
                "DELETE FROM drawings WHERE folder_uuid = ?1;",
                [folder_id.to_string()],
            )?;
            receipt.deleted_drawings.extend(owned);
        }
        StagedChange::SetDrawingContent {
            drawing_id,
            content,
        } => {
            let changed = tx.execute(
                "UPDATE drawings
                 SET canvas_data = ?2,
                     updated_at = ?3
                 WHERE uuid = ?1;",
                params![drawing_id.to_string(), content.as_slice(), now_epoch_ms()],
            )?;
            if changed == 0 {
                receipt.missed_content.push(*drawing_id);
            }
        }
    }
    Ok(())
}

fn ensure_folder_exists(conn: &Connection, folder_id: FolderId) -> StoreResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM folders WHERE uuid = ?1;",
            [folder_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::FolderNotFound(folder_id)),
    }
}

fn list_owned_drawing_ids(conn: &Connection, folder_id: FolderId) -> StoreResult<Vec<DrawingId>> {
    let mut stmt = conn.prepare(
        "SELECT uuid
         FROM drawings
         WHERE folder_uuid = ?1
         ORDER BY created_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([folder_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "drawings.uuid")?);
    }
    Ok(ids)
}

fn parse_folder_row(row: &Row<'_>) -> StoreResult<Folder> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Folder {
        id: parse_uuid(&uuid_text, "folders.uuid")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_drawing_row(row: &Row<'_>) -> StoreResult<Drawing> {
    let uuid_text: String = row.get("uuid")?;
    let folder_id = row
        .get::<_, Option<String>>("folder_uuid")?
        .map(|value| parse_uuid(&value, "drawings.folder_uuid"))
        .transpose()?;

    let background_text: String = row.get("background")?;
    let background = BackgroundTemplate::parse(&background_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid background `{background_text}` in drawings.background"
        ))
    })?;

    Ok(Drawing {
        id: parse_uuid(&uuid_text, "drawings.uuid")?,
        title: row.get("title")?,
        background,
        canvas_data: row.get("canvas_data")?,
        folder_id,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

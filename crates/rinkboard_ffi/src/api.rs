//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose folder and drawing use cases to Dart via FRB.
//! - Map core errors into flat response envelopes the UI can render.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Ids cross the boundary as hyphenated UUID strings.
//! - Labels in list items are display labels; empty stored labels never
//!   reach the UI.
//! - Content saves only enqueue onto one process-wide background writer;
//!   commit failures surface on the next flush.

use log::warn;
use rinkboard_core::db::open_db;
use rinkboard_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    BackgroundTemplate, ChangeFeed, ContentWriter, ContentWriterError, Drawing, DrawingId,
    DrawingService, Folder, FolderDeleteMode, FolderService, ListingService, NewDrawing,
    SqliteEntityStore,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use uuid::Uuid;

const DB_FILE_NAME: &str = "rinkboard.sqlite3";
const DB_PATH_ENV: &str = "RINKBOARD_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
// Started on first content save against `resolve_db_path()`.
static CONTENT_WRITER: Mutex<Option<ContentWriter>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope for mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the created or affected entity.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: impl ToString) -> Self {
        Self {
            ok: true,
            id: Some(id.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Folder row for the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderItem {
    pub folder_id: String,
    /// Display label (`Unnamed Folder` when the stored name is empty).
    pub name: String,
    pub created_at_ms: i64,
    pub drawing_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderListResponse {
    pub ok: bool,
    pub items: Vec<FolderItem>,
    pub message: String,
}

/// Drawing row without the content payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingItem {
    pub drawing_id: String,
    /// Display label (`Untitled` when the stored title is empty).
    pub title: String,
    /// Background template name (`hockey_rink|half_rink`).
    pub background: String,
    pub folder_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub content_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingListResponse {
    pub ok: bool,
    pub items: Vec<DrawingItem>,
    pub message: String,
}

/// Single drawing with its serialized stylus content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingDetailResponse {
    pub ok: bool,
    pub item: Option<DrawingItem>,
    pub canvas_data: Vec<u8>,
    pub message: String,
}

/// Lists the background template names accepted by `drawing_create`.
#[flutter_rust_bridge::frb(sync)]
pub fn background_templates() -> Vec<String> {
    BackgroundTemplate::all()
        .iter()
        .map(|template| template.as_str().to_string())
        .collect()
}

/// Creates a folder.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `name` is used as given; 1..=30 characters.
#[flutter_rust_bridge::frb(sync)]
pub fn folder_create(name: String) -> ActionResponse {
    let result = with_store(|store| {
        FolderService::new(store)
            .create_folder(name)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(folder) => ActionResponse::success("Folder created.", folder.id),
        Err(err) => ActionResponse::failure(format!("folder_create failed: {err}")),
    }
}

/// Renames a folder under the same rule as creation.
#[flutter_rust_bridge::frb(sync)]
pub fn folder_rename(folder_id: String, name: String) -> ActionResponse {
    let result = parse_id("folder_id", &folder_id).and_then(|folder_id| {
        with_store(|store| {
            FolderService::new(store)
                .rename_folder(folder_id, name)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(folder) => ActionResponse::success("Folder renamed.", folder.id),
        Err(err) => ActionResponse::failure(format!("folder_rename failed: {err}")),
    }
}

/// Deletes a folder.
///
/// `delete_drawings = true` removes the folder's drawings with it;
/// `false` moves them to the unfiled list. Irreversible.
#[flutter_rust_bridge::frb(sync)]
pub fn folder_delete(folder_id: String, delete_drawings: bool) -> ActionResponse {
    let mode = FolderDeleteMode::from_cascade(delete_drawings);
    let result = parse_id("folder_id", &folder_id).and_then(|folder_id| {
        with_store(|store| {
            FolderService::new(store)
                .delete_folder(folder_id, mode)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(deletion) => {
            let message = match mode {
                FolderDeleteMode::DeleteDrawings => format!(
                    "Folder deleted with {} drawing(s).",
                    deletion.deleted_drawings.len()
                ),
                FolderDeleteMode::KeepDrawings => format!(
                    "Folder deleted; {} drawing(s) moved to unfiled.",
                    deletion.detached_drawings.len()
                ),
            };
            ActionResponse::success(message, deletion.folder_id)
        }
        Err(err) => ActionResponse::failure(format!("folder_delete failed: {err}")),
    }
}

/// Lists folders oldest first with their drawing counts.
#[flutter_rust_bridge::frb(sync)]
pub fn folders_list() -> FolderListResponse {
    let result = with_store(|store| {
        ListingService::new(store)
            .folder_overview()
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(summaries) => {
            let items = summaries
                .into_iter()
                .map(|summary| to_folder_item(&summary.folder, summary.drawing_count))
                .collect::<Vec<_>>();
            FolderListResponse {
                ok: true,
                message: format!("Found {} folder(s).", items.len()),
                items,
            }
        }
        Err(err) => FolderListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("folders_list failed: {err}"),
        },
    }
}

/// Creates an empty drawing, unfiled when `folder_id` is `None`.
#[flutter_rust_bridge::frb(sync)]
pub fn drawing_create(
    title: String,
    background: String,
    folder_id: Option<String>,
) -> ActionResponse {
    let result = parse_background(&background).and_then(|background| {
        let folder_id = parse_optional_id("folder_id", folder_id.as_deref())?;
        with_store(|store| {
            DrawingService::new(store)
                .create_drawing(NewDrawing {
                    title,
                    background,
                    folder_id,
                })
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(drawing) => ActionResponse::success("Drawing created.", drawing.id),
        Err(err) => ActionResponse::failure(format!("drawing_create failed: {err}")),
    }
}

/// Deletes one drawing.
#[flutter_rust_bridge::frb(sync)]
pub fn drawing_delete(drawing_id: String) -> ActionResponse {
    let result = parse_id("drawing_id", &drawing_id).and_then(|drawing_id| {
        with_store(|store| {
            DrawingService::new(store)
                .delete_drawing(drawing_id)
                .map_err(|err| err.to_string())?;
            Ok(drawing_id)
        })
    });
    match result {
        Ok(drawing_id) => ActionResponse::success("Drawing deleted.", drawing_id),
        Err(err) => ActionResponse::failure(format!("drawing_delete failed: {err}")),
    }
}

/// Files a drawing into a folder, or unfiles it when `folder_id` is `None`.
#[flutter_rust_bridge::frb(sync)]
pub fn drawing_move(drawing_id: String, folder_id: Option<String>) -> ActionResponse {
    let result = parse_id("drawing_id", &drawing_id).and_then(|drawing_id| {
        let folder_id = parse_optional_id("folder_id", folder_id.as_deref())?;
        with_store(|store| {
            DrawingService::new(store)
                .move_drawing(drawing_id, folder_id)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(drawing) => ActionResponse::success("Drawing moved.", drawing.id),
        Err(err) => ActionResponse::failure(format!("drawing_move failed: {err}")),
    }
}

/// Queues the full serialized stylus content of a drawing.
///
/// # FFI contract
/// - Sync call that only enqueues; the commit happens on the background
///   writer, so this is safe to call after every stroke.
/// - Rapid saves of one drawing coalesce; the last payload wins.
/// - An unknown id is logged by the writer and not treated as a failure.
/// - Commit failures are reported by `drawing_flush_content`.
#[flutter_rust_bridge::frb(sync)]
pub fn drawing_update_content(drawing_id: String, content: Vec<u8>) -> ActionResponse {
    let result = parse_id("drawing_id", &drawing_id).and_then(|drawing_id| {
        submit_content(drawing_id, content)?;
        Ok(drawing_id)
    });
    match result {
        Ok(drawing_id) => ActionResponse::success("Content queued.", drawing_id),
        Err(err) => ActionResponse::failure(format!("drawing_update_content failed: {err}")),
    }
}

/// Blocks until every queued content save is committed.
///
/// Call from the editor's close or explicit save action. `ok = false` means
/// content queued since the previous flush was lost; the message says how
/// many drawings were affected.
#[flutter_rust_bridge::frb(sync)]
pub fn drawing_flush_content() -> ActionResponse {
    match flush_content() {
        Ok(()) => ActionResponse {
            ok: true,
            id: None,
            message: "Content saved.".to_string(),
        },
        Err(err) => ActionResponse::failure(format!("drawing_flush_content failed: {err}")),
    }
}

/// Loads one drawing with its content.
#[flutter_rust_bridge::frb(sync)]
pub fn drawing_get(drawing_id: String) -> DrawingDetailResponse {
    // Queued saves land first so the editor reopens what it last sent.
    let flush_note = match flush_content() {
        Ok(()) => String::new(),
        Err(err) => format!(" Earlier content was not saved: {err}"),
    };
    let result = parse_id("drawing_id", &drawing_id).and_then(|drawing_id| {
        with_store(|store| {
            DrawingService::new(store)
                .get_drawing(drawing_id)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(Some(drawing)) => DrawingDetailResponse {
            ok: true,
            item: Some(to_drawing_item(&drawing)),
            canvas_data: drawing.canvas_data,
            message: format!("Drawing loaded.{flush_note}"),
        },
        Ok(None) => DrawingDetailResponse {
            ok: false,
            item: None,
            canvas_data: Vec::new(),
            message: format!("drawing_get failed: drawing not found: {drawing_id}.{flush_note}"),
        },
        Err(err) => DrawingDetailResponse {
            ok: false,
            item: None,
            canvas_data: Vec::new(),
            message: format!("drawing_get failed: {err}.{flush_note}"),
        },
    }
}

/// Lists drawings that belong to no folder.
#[flutter_rust_bridge::frb(sync)]
pub fn drawings_unfiled() -> DrawingListResponse {
    let result = with_store(|store| {
        ListingService::new(store)
            .list_unfiled_drawings()
            .map_err(|err| err.to_string())
    });
    to_drawing_list("drawings_unfiled", result)
}

/// Lists drawings owned by one folder.
#[flutter_rust_bridge::frb(sync)]
pub fn drawings_in_folder(folder_id: String) -> DrawingListResponse {
    let result = parse_id("folder_id", &folder_id).and_then(|folder_id| {
        with_store(|store| {
            ListingService::new(store)
                .list_drawings_in(folder_id)
                .map_err(|err| err.to_string())
        })
    });
    to_drawing_list("drawings_in_folder", result)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_store<T>(
    f: impl FnOnce(SqliteEntityStore<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("DB open failed: {err}"))?;
    let store = SqliteEntityStore::try_new(&conn)
        .map_err(|err| format!("store init failed: {err}"))?;
    f(store)
}

fn lock_content_writer() -> MutexGuard<'static, Option<ContentWriter>> {
    CONTENT_WRITER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn submit_content(drawing_id: DrawingId, content: Vec<u8>) -> Result<(), String> {
    let mut slot = lock_content_writer();
    if slot.is_none() {
        let writer = ContentWriter::spawn(resolve_db_path(), ChangeFeed::new())
            .map_err(|err| format!("content writer start failed: {err}"))?;
        *slot = Some(writer);
    }
    let submitted = match slot.as_ref() {
        Some(writer) => writer.sink().submit(drawing_id, content),
        None => Err(ContentWriterError::Closed),
    };
    if let Err(ContentWriterError::Closed) = submitted {
        // Writer thread exited; the next save starts a fresh one.
        *slot = None;
    }
    submitted.map_err(|err| err.to_string())
}

fn flush_content() -> Result<(), String> {
    let mut slot = lock_content_writer();
    let flushed = match slot.as_ref() {
        Some(writer) => writer.flush(),
        None => return Ok(()),
    };
    if let Err(ContentWriterError::Closed) = flushed {
        *slot = None;
    }
    flushed.map_err(|err| err.to_string())
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| {
        warn!("event=ffi_parse_id module=ffi status=error field={field} error={err}");
        format!("invalid {field} `{raw}`: {err}")
    })
}

fn parse_optional_id(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_id(field, value).map(Some),
    }
}

fn parse_background(raw: &str) -> Result<BackgroundTemplate, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(BackgroundTemplate::default());
    }
    BackgroundTemplate::parse(trimmed).ok_or_else(|| {
        format!(
            "unsupported background `{trimmed}`; expected {}",
            background_templates().join("|")
        )
    })
}

fn to_folder_item(folder: &Folder, drawing_count: u64) -> FolderItem {
    FolderItem {
        folder_id: folder.id.to_string(),
        name: folder.display_name().to_string(),
        created_at_ms: folder.created_at,
        drawing_count,
    }
}

fn to_drawing_item(drawing: &Drawing) -> DrawingItem {
    DrawingItem {
        drawing_id: drawing.id.to_string(),
        title: drawing.display_title().to_string(),
        background: drawing.background.as_str().to_string(),
        folder_id: drawing.folder_id.map(|id| id.to_string()),
        created_at_ms: drawing.created_at,
        updated_at_ms: drawing.updated_at,
        content_bytes: drawing.canvas_data.len() as u64,
    }
}

fn to_drawing_list(operation: &str, result: Result<Vec<Drawing>, String>) -> DrawingListResponse {
    match result {
        Ok(drawings) => {
            let items = drawings.iter().map(to_drawing_item).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No drawings.".to_string()
            } else {
                format!("Found {} drawing(s).", items.len())
            };
            DrawingListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => DrawingListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("{operation} failed: {err}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        background_templates, core_version, drawing_create, drawing_delete, drawing_get,
        drawing_flush_content, drawing_move, drawing_update_content, drawings_in_folder,
        drawings_unfiled, folder_create, folder_delete, folder_rename, folders_list, init_logging, ping,
    };
    use rinkboard_core::db::open_db;
    use rusqlite::OptionalExtension;

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/logs".to_string());
        assert!(error.contains("unsupported log level"));
    }

    #[test]
    fn background_templates_lists_both_rinks() {
        assert_eq!(background_templates(), vec!["hockey_rink", "half_rink"]);
    }

    #[test]
    fn folder_create_rejects_invalid_names() {
        let empty = folder_create(String::new());
        assert!(!empty.ok);
        assert!(empty.id.is_none());

        let long = folder_create("x".repeat(31));
        assert!(!long.ok, "{}", long.message);
    }

    #[test]
    fn folder_rename_rejects_malformed_id() {
        let response = folder_rename("not-a-uuid".to_string(), "Renamed".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("invalid folder_id"));
    }

    #[test]
    fn folder_with_drawing_flows_through_listing_and_content() {
        let folder = folder_create("Team A".to_string());
        assert!(folder.ok, "{}", folder.message);
        let folder_id = folder.id.expect("folder id");

        let drawing = drawing_create(
            "Game 1".to_string(),
            "half_rink".to_string(),
            Some(folder_id.clone()),
        );
        assert!(drawing.ok, "{}", drawing.message);
        let drawing_id = drawing.id.expect("drawing id");

        let queued = drawing_update_content(drawing_id.clone(), vec![0x01, 0x02]);
        assert!(queued.ok, "{}", queued.message);
        assert_eq!(queued.id.as_deref(), Some(drawing_id.as_str()));
        let flushed = drawing_flush_content();
        assert!(flushed.ok, "{}", flushed.message);

        let listed = drawings_in_folder(folder_id.clone());
        assert!(listed.ok, "{}", listed.message);
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].title, "Game 1");
        assert_eq!(listed.items[0].background, "half_rink");
        assert_eq!(listed.items[0].content_bytes, 2);

        let detail = drawing_get(drawing_id.clone());
        assert!(detail.ok, "{}", detail.message);
        assert_eq!(detail.canvas_data, vec![0x01, 0x02]);

        let folders = folders_list();
        let item = folders
            .items
            .iter()
            .find(|item| item.folder_id == folder_id)
            .expect("created folder listed");
        assert_eq!(item.drawing_count, 1);

        let unfiled = drawings_unfiled();
        assert!(!unfiled.items.iter().any(|item| item.drawing_id == drawing_id));
    }

    #[test]
    fn folder_delete_cascades_or_detaches() {
        let cascade = folder_create("Cascade".to_string()).id.expect("folder id");
        let doomed = drawing_create(
            "Doomed".to_string(),
            String::new(),
            Some(cascade.clone()),
        )
        .id
        .expect("drawing id");

        let keep = folder_create("Keep".to_string()).id.expect("folder id");
        let kept = drawing_create(
            "Kept".to_string(),
            "hockey_rink".to_string(),
            Some(keep.clone()),
        )
        .id
        .expect("drawing id");

        assert!(folder_delete(cascade, true).ok);
        assert!(folder_delete(keep.clone(), false).ok);

        let conn = open_db(super::resolve_db_path()).expect("open db");
        let doomed_row: Option<String> = conn
            .query_row(
                "SELECT uuid FROM drawings WHERE uuid = ?1",
                [doomed.as_str()],
                |row| row.get(0),
            )
            .optional()
            .expect("query doomed drawing");
        assert!(doomed_row.is_none());

        let kept_folder: Option<String> = conn
            .query_row(
                "SELECT folder_uuid FROM drawings WHERE uuid = ?1",
                [kept.as_str()],
                |row| row.get(0),
            )
            .expect("query kept drawing");
        assert!(kept_folder.is_none());

        assert!(!drawings_in_folder(keep).ok);
        assert!(drawings_unfiled()
            .items
            .iter()
            .any(|item| item.drawing_id == kept));
    }

    #[test]
    fn drawing_move_and_delete_round_trip() {
        let folder_id = folder_create("Moves".to_string()).id.expect("folder id");
        let drawing_id = drawing_create("Loose".to_string(), String::new(), None)
            .id
            .expect("drawing id");

        assert!(drawing_move(drawing_id.clone(), Some(folder_id.clone())).ok);
        assert_eq!(drawings_in_folder(folder_id.clone()).items.len(), 1);
        assert!(drawing_move(drawing_id.clone(), None).ok);
        assert!(drawings_in_folder(folder_id).items.is_empty());

        assert!(drawing_delete(drawing_id.clone()).ok);
        assert!(!drawing_get(drawing_id.clone()).ok);
        assert!(!drawing_delete(drawing_id).ok);
    }

    #[test]
    fn content_saves_for_unknown_drawing_are_not_failures() {
        let response = drawing_update_content(uuid::Uuid::new_v4().to_string(), vec![1]);
        assert!(response.ok, "{}", response.message);
        let flushed = drawing_flush_content();
        assert!(flushed.ok, "{}", flushed.message);
    }

    #[test]
    fn queued_strokes_coalesce_and_are_visible_on_reload() {
        let drawing_id = drawing_create("Strokes".to_string(), String::new(), None)
            .id
            .expect("drawing id");

        for step in 1..=20_u8 {
            let queued = drawing_update_content(drawing_id.clone(), vec![step; 3]);
            assert!(queued.ok, "{}", queued.message);
        }

        let detail = drawing_get(drawing_id);
        assert!(detail.ok, "{}", detail.message);
        assert_eq!(detail.canvas_data, vec![20, 20, 20]);
        assert_eq!(detail.item.expect("drawing item").content_bytes, 3);
    }

    #[test]
    fn content_save_rejects_malformed_id_without_queueing() {
        let response = drawing_update_content("stroke-1".to_string(), vec![1]);
        assert!(!response.ok);
        assert!(response.message.contains("invalid drawing_id"));
    }

    #[test]
    fn drawing_create_rejects_unknown_background() {
        let response = drawing_create("Odd".to_string(), "full_court".to_string(), None);
        assert!(!response.ok);
        assert!(response.message.contains("hockey_rink|half_rink"));
    }
}

use rinkboard_core::db::open_db_in_memory;
use rinkboard_core::{
    BackgroundTemplate, ChangeSet, Drawing, DrawingQuery, EntityStore, Folder, SqliteEntityStore,
    StoreError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn commit_inserts_folder_and_drawing_together() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let folder = Folder::new("Team A");
    let drawing = Drawing::new("Breakout", BackgroundTemplate::HockeyRink, Some(folder.id));
    let mut changes = ChangeSet::new();
    changes
        .insert_folder(folder.clone())
        .insert_drawing(drawing.clone());

    let receipt = store.commit(&changes).unwrap();
    assert_eq!(receipt.applied, 2);

    assert_eq!(store.get_folder(folder.id).unwrap(), Some(folder.clone()));
    let loaded = store.get_drawing(drawing.id).unwrap().unwrap();
    assert_eq!(loaded.folder_id, Some(folder.id));
    assert!(loaded.canvas_data.is_empty());
}

#[test]
fn failed_commit_applies_nothing_and_keeps_staged_changes() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let folder = Folder::new("Staged");
    let missing = Uuid::new_v4();
    let mut changes = ChangeSet::new();
    changes.insert_folder(folder.clone()).delete_drawing(missing);

    let err = store.commit(&changes).unwrap_err();
    assert!(matches!(err, StoreError::DrawingNotFound(id) if id == missing));
    assert!(store.get_folder(folder.id).unwrap().is_none());
    assert_eq!(changes.len(), 2);
}

#[test]
fn empty_change_set_commits_trivially() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let receipt = store.commit(&ChangeSet::new()).unwrap();
    assert_eq!(receipt.applied, 0);
}

#[test]
fn deleting_folder_that_still_owns_drawings_is_rejected() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let folder = Folder::new("Owner");
    let drawing = Drawing::new("Owned", BackgroundTemplate::HalfRink, Some(folder.id));
    let mut setup_changes = ChangeSet::new();
    setup_changes
        .insert_folder(folder.clone())
        .insert_drawing(drawing.clone());
    store.commit(&setup_changes).unwrap();

    let mut delete_only_folder = ChangeSet::new();
    delete_only_folder.delete_folder(folder.id);
    let err = store.commit(&delete_only_folder).unwrap_err();
    assert!(matches!(&err, StoreError::Db(db) if db.is_foreign_key_violation()));

    assert!(store.get_folder(folder.id).unwrap().is_some());
    assert_eq!(
        store.get_drawing(drawing.id).unwrap().unwrap().folder_id,
        Some(folder.id)
    );
}

#[test]
fn insert_drawing_into_unknown_folder_is_folder_not_found() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let folder_id = Uuid::new_v4();
    let mut changes = ChangeSet::new();
    changes.insert_drawing(Drawing::new(
        "Lost",
        BackgroundTemplate::HockeyRink,
        Some(folder_id),
    ));
    let err = store.commit(&changes).unwrap_err();
    assert!(matches!(err, StoreError::FolderNotFound(id) if id == folder_id));
}

#[test]
fn content_write_to_missing_drawing_is_reported_not_failed() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let drawing = Drawing::new("Real", BackgroundTemplate::HockeyRink, None);
    let missing = Uuid::new_v4();
    let mut changes = ChangeSet::new();
    changes
        .insert_drawing(drawing.clone())
        .set_drawing_content(missing, vec![9])
        .set_drawing_content(drawing.id, vec![1, 2, 3]);

    let receipt = store.commit(&changes).unwrap();
    assert_eq!(receipt.missed_content, vec![missing]);
    assert_eq!(
        store.get_drawing(drawing.id).unwrap().unwrap().canvas_data,
        vec![1, 2, 3]
    );
}

#[test]
fn queries_scope_drawings_by_folder() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let folder = Folder::new("Scoped");
    let filed = Drawing::new("Filed", BackgroundTemplate::HockeyRink, Some(folder.id));
    let loose = Drawing::new("Loose", BackgroundTemplate::HalfRink, None);
    let mut changes = ChangeSet::new();
    changes
        .insert_folder(folder.clone())
        .insert_drawing(filed.clone())
        .insert_drawing(loose.clone());
    store.commit(&changes).unwrap();

    let all = store.list_drawings(&DrawingQuery::default()).unwrap();
    assert_eq!(all.len(), 2);

    let unfiled = store.list_drawings(&DrawingQuery::unfiled()).unwrap();
    assert_eq!(unfiled.len(), 1);
    assert_eq!(unfiled[0].id, loose.id);

    let in_folder = store
        .list_drawings(&DrawingQuery::in_folder(folder.id))
        .unwrap();
    assert_eq!(in_folder.len(), 1);
    assert_eq!(in_folder[0].id, filed.id);
    assert_eq!(store.count_drawings_in(folder.id).unwrap(), 1);
}

#[test]
fn stored_labels_are_not_revalidated_on_read() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let folder_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO folders (uuid, name, created_at) VALUES (?1, '', 1);",
        [folder_id.to_string()],
    )
    .unwrap();
    let overlong = "x".repeat(64);
    let drawing_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO drawings (uuid, title, background, created_at, updated_at)
         VALUES (?1, ?2, 'half_rink', 1, 1);",
        [drawing_id.to_string(), overlong.clone()],
    )
    .unwrap();

    let folder = store.get_folder(folder_id).unwrap().unwrap();
    assert_eq!(folder.display_name(), "Unnamed Folder");
    let drawing = store.get_drawing(drawing_id).unwrap().unwrap();
    assert_eq!(drawing.title, overlong);
}

#[test]
fn invalid_persisted_uuid_is_rejected() {
    let conn = setup();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    conn.execute(
        "INSERT INTO folders (uuid, name, created_at) VALUES ('not-a-uuid', 'Bad', 1);",
        [],
    )
    .unwrap();

    let err = store.list_folders().unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

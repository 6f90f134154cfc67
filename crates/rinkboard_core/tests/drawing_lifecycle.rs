use rinkboard_core::db::open_db_in_memory;
use rinkboard_core::{
    BackgroundTemplate, ContentWrite, DrawingService, DrawingServiceError, EntityStore,
    FolderService, LabelValidationError, ListingService, NewDrawing, SqliteEntityStore,
    StoreEvent,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[test]
fn new_drawing_round_trips_with_empty_content() {
    let conn = open_db_in_memory().unwrap();
    let service = DrawingService::new(SqliteEntityStore::try_new(&conn).unwrap());

    let created = service
        .create_drawing(NewDrawing::unfiled("Breakout", BackgroundTemplate::HalfRink))
        .unwrap();
    let loaded = service.get_drawing(created.id).unwrap().unwrap();

    assert_eq!(loaded, created);
    assert_eq!(loaded.title, "Breakout");
    assert_eq!(loaded.background, BackgroundTemplate::HalfRink);
    assert!(loaded.canvas_data.is_empty());
    assert!(loaded.is_unfiled());
}

#[test]
fn create_drawing_rejects_invalid_titles() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let service = DrawingService::new(store);

    let empty = service
        .create_drawing(NewDrawing::unfiled("", BackgroundTemplate::HockeyRink))
        .unwrap_err();
    assert!(matches!(
        empty,
        DrawingServiceError::InvalidTitle(LabelValidationError::Empty)
    ));

    let long = service
        .create_drawing(NewDrawing::unfiled(
            "t".repeat(31),
            BackgroundTemplate::HockeyRink,
        ))
        .unwrap_err();
    assert!(matches!(long, DrawingServiceError::InvalidTitle(_)));

    assert!(ListingService::new(store)
        .list_unfiled_drawings()
        .unwrap()
        .is_empty());
}

#[test]
fn create_drawing_in_unknown_folder_fails_cleanly() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let service = DrawingService::new(store);
    let missing = Uuid::new_v4();

    let err = service
        .create_drawing(NewDrawing::in_folder(
            "Lost",
            BackgroundTemplate::HockeyRink,
            missing,
        ))
        .unwrap_err();
    assert!(matches!(err, DrawingServiceError::FolderNotFound(id) if id == missing));
    assert_eq!(service.feed().revision(), 0);
}

#[test]
fn last_content_write_wins() {
    let conn = open_db_in_memory().unwrap();
    let service = DrawingService::new(SqliteEntityStore::try_new(&conn).unwrap());
    let drawing = service
        .create_drawing(NewDrawing::unfiled("Forecheck", BackgroundTemplate::HockeyRink))
        .unwrap();

    let payloads = [vec![1_u8], vec![2, 2], vec![3, 3, 3]];
    for payload in &payloads {
        assert_eq!(
            service.update_content(drawing.id, payload.clone()).unwrap(),
            ContentWrite::Written
        );
    }

    let loaded = service.get_drawing(drawing.id).unwrap().unwrap();
    assert_eq!(loaded.canvas_data, vec![3, 3, 3]);
    assert!(loaded.updated_at >= drawing.updated_at);
}

#[test]
fn content_update_for_missing_drawing_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let service = DrawingService::new(SqliteEntityStore::try_new(&conn).unwrap());

    let outcome = service.update_content(Uuid::new_v4(), vec![9, 9]).unwrap();
    assert_eq!(outcome, ContentWrite::Missed);
    assert_eq!(service.feed().revision(), 0);
}

#[test]
fn team_folder_game_drawing_scenario() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let folders = FolderService::new(store);
    let drawings = DrawingService::with_feed(store, folders.feed().clone());
    let listing = ListingService::new(store);

    let team = folders.create_folder("Team A").unwrap();
    let game = drawings
        .create_drawing(NewDrawing::in_folder(
            "Game 1",
            BackgroundTemplate::HalfRink,
            team.id,
        ))
        .unwrap();
    drawings.update_content(game.id, vec![0x01, 0x02]).unwrap();

    let in_team = listing.list_drawings_in(team.id).unwrap();
    assert_eq!(in_team.len(), 1);
    assert_eq!(in_team[0].title, "Game 1");
    assert_eq!(in_team[0].background, BackgroundTemplate::HalfRink);
    assert_eq!(in_team[0].canvas_data, vec![0x01, 0x02]);
    assert_eq!(in_team[0].folder_id, Some(team.id));
    assert!(listing.list_unfiled_drawings().unwrap().is_empty());
}

#[test]
fn move_drawing_files_and_unfiles() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let folders = FolderService::new(store);
    let drawings = DrawingService::new(store);

    let folder = folders.create_folder("Practice").unwrap();
    let drawing = drawings
        .create_drawing(NewDrawing::unfiled("Drill", BackgroundTemplate::HockeyRink))
        .unwrap();

    let filed = drawings.move_drawing(drawing.id, Some(folder.id)).unwrap();
    assert_eq!(filed.folder_id, Some(folder.id));
    assert_eq!(store.count_drawings_in(folder.id).unwrap(), 1);

    let unfiled = drawings.move_drawing(drawing.id, None).unwrap();
    assert!(unfiled.is_unfiled());
    assert_eq!(store.count_drawings_in(folder.id).unwrap(), 0);

    let missing_folder = Uuid::new_v4();
    let err = drawings
        .move_drawing(drawing.id, Some(missing_folder))
        .unwrap_err();
    assert!(matches!(err, DrawingServiceError::FolderNotFound(id) if id == missing_folder));

    let err = drawings.move_drawing(Uuid::new_v4(), None).unwrap_err();
    assert!(matches!(err, DrawingServiceError::DrawingNotFound(_)));
}

#[test]
fn delete_drawing_removes_record_and_publishes() {
    let conn = open_db_in_memory().unwrap();
    let service = DrawingService::new(SqliteEntityStore::try_new(&conn).unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    service
        .feed()
        .subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    let drawing = service
        .create_drawing(NewDrawing::unfiled("Temp", BackgroundTemplate::HockeyRink))
        .unwrap();
    service.delete_drawing(drawing.id).unwrap();
    assert!(service.get_drawing(drawing.id).unwrap().is_none());

    let err = service.delete_drawing(drawing.id).unwrap_err();
    assert!(matches!(err, DrawingServiceError::DrawingNotFound(id) if id == drawing.id));

    let events = seen.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            StoreEvent::DrawingCreated {
                drawing_id: drawing.id,
                folder_id: None,
            },
            StoreEvent::DrawingDeleted(drawing.id),
        ]
    );
}

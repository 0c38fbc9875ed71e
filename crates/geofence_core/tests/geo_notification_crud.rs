use geofence_core::db::migrations::latest_version;
use geofence_core::db::open_db_in_memory;
use geofence_core::{
    GeoNotification, GeoNotificationRepository, NotificationPayload, RepoError,
    SqliteGeoNotificationRepository,
};
use rusqlite::Connection;

fn record(id: &str) -> GeoNotification {
    GeoNotification {
        id: id.to_string(),
        latitude: 52.52,
        longitude: 13.405,
        radius: 150.0,
        transition_type: 1,
        notification: None,
        url: None,
        authorization: None,
    }
}

#[test]
fn add_and_find_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();

    let mut geo = record("home");
    geo.notification = Some(NotificationPayload {
        title: None,
        text: "Welcome home".to_string(),
        vibrate: vec![1000],
        data: None,
    });
    geo.url = Some("https://example.test/hook".to_string());
    geo.authorization = Some("Bearer token".to_string());
    repo.add_or_update(&geo).unwrap();

    let loaded = repo.find_by_id("home").unwrap().unwrap();
    assert_eq!(loaded, geo);
}

#[test]
fn find_unknown_id_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();

    assert!(repo.find_by_id("nowhere").unwrap().is_none());
}

#[test]
fn add_or_update_is_last_write_wins_on_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();

    let mut geo = record("home");
    repo.add_or_update(&geo).unwrap();

    geo.radius = 400.0;
    geo.transition_type = 3;
    repo.add_or_update(&geo).unwrap();

    let all = repo.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].radius, 400.0);
    assert_eq!(all[0].transition_type, 3);
}

#[test]
fn get_all_returns_records_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();

    repo.add_or_update(&record("citadel")).unwrap();
    repo.add_or_update(&record("airport")).unwrap();
    repo.add_or_update(&record("bakery")).unwrap();

    let ids: Vec<String> = repo.get_all().unwrap().into_iter().map(|geo| geo.id).collect();
    assert_eq!(ids, vec!["airport", "bakery", "citadel"]);
}

#[test]
fn remove_deletes_record_and_reports_unknown_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();

    repo.add_or_update(&record("home")).unwrap();
    repo.remove("home").unwrap();
    assert!(repo.find_by_id("home").unwrap().is_none());

    let err = repo.remove("home").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == "home"));
}

#[test]
fn clear_removes_everything_and_counts_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();

    repo.add_or_update(&record("a")).unwrap();
    repo.add_or_update(&record("b")).unwrap();

    assert_eq!(repo.clear().unwrap(), 2);
    assert!(repo.get_all().unwrap().is_empty());
    assert_eq!(repo.clear().unwrap(), 0);
}

#[test]
fn validation_failure_blocks_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();

    let mut invalid = record("bad");
    invalid.transition_type = 0;

    let err = repo.add_or_update(&invalid).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(repo.get_all().unwrap().is_empty());
}

#[test]
fn corrupt_stored_row_surfaces_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO geo_notifications (id, data) VALUES ('broken', 'not json');",
        [],
    )
    .unwrap();

    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();
    let err = repo.find_by_id("broken").unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn stored_row_with_mismatched_record_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGeoNotificationRepository::try_new(&conn).unwrap();
    repo.add_or_update(&record("real")).unwrap();

    conn.execute(
        "UPDATE geo_notifications SET id = 'renamed' WHERE id = 'real';",
        [],
    )
    .unwrap();

    let err = repo.find_by_id("renamed").unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteGeoNotificationRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteGeoNotificationRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("geo_notifications"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE geo_notifications (id TEXT PRIMARY KEY NOT NULL);")
        .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteGeoNotificationRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "geo_notifications",
            column: "data"
        })
    ));
}

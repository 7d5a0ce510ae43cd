use phoenix_core::db::migrations::latest_version;
use phoenix_core::db::open_db_in_memory;
use phoenix_core::{
    HouseholdKey, RepoError, ResGroupRepository, SqliteCensusRepository, SqliteResGroupRepository,
    EVENT_TYPE_CENSUS,
};
use rusqlite::Connection;

fn key(year: i64, township_id: i64, dwelling_num: i64, household_num: i64) -> HouseholdKey {
    HouseholdKey {
        year,
        township_id,
        dwelling_num,
        household_num,
    }
}

#[test]
fn resolver_creates_group_once_and_reuses_it() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteResGroupRepository::try_new(&conn).unwrap();

    let household = key(1900, 3, 5, 2);
    let first = repo
        .get_or_create_group(&household, EVENT_TYPE_CENSUS, None)
        .unwrap();
    let second = repo
        .get_or_create_group(&household, EVENT_TYPE_CENSUS, None)
        .unwrap();

    assert_eq!(first, second);
    let group_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM ResGroups;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(group_count, 1);
}

#[test]
fn distinct_keys_resolve_to_distinct_groups() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteResGroupRepository::try_new(&conn).unwrap();

    let base = key(1900, 3, 5, 2);
    let variants = [
        key(1910, 3, 5, 2),
        key(1900, 4, 5, 2),
        key(1900, 3, 6, 2),
        key(1900, 3, 5, 3),
    ];

    let base_id = repo
        .get_or_create_group(&base, EVENT_TYPE_CENSUS, None)
        .unwrap();
    for variant in &variants {
        let id = repo
            .get_or_create_group(variant, EVENT_TYPE_CENSUS, None)
            .unwrap();
        assert_ne!(id, base_id, "variant {variant:?} must get its own group");
    }

    let group_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM ResGroups;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(group_count, 5);
}

#[test]
fn created_group_carries_key_and_provenance() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteResGroupRepository::try_new(&conn).unwrap();

    let household = key(1900, 3, 5, 2);
    let id = repo
        .get_or_create_group(&household, EVENT_TYPE_CENSUS, Some("Rebuilt from census records"))
        .unwrap();

    let group = repo.get_group(id).unwrap().expect("group must exist");
    assert_eq!(group.household_key(), household);
    assert_eq!(group.event_type, EVENT_TYPE_CENSUS);
    assert_eq!(group.notes.as_deref(), Some("Rebuilt from census records"));

    // Notes only apply on creation; resolving again must not rewrite them.
    let again = repo
        .get_or_create_group(&household, EVENT_TYPE_CENSUS, Some("other notes"))
        .unwrap();
    assert_eq!(again, id);
    let group = repo.get_group(id).unwrap().expect("group must exist");
    assert_eq!(group.notes.as_deref(), Some("Rebuilt from census records"));
}

#[test]
fn find_group_id_returns_none_for_unknown_key() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteResGroupRepository::try_new(&conn).unwrap();

    assert_eq!(repo.find_group_id(&key(1900, 3, 5, 2)).unwrap(), None);
}

#[test]
fn repositories_reject_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteResGroupRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }

    assert!(matches!(
        SqliteCensusRepository::try_new(&conn),
        Err(RepoError::UninitializedConnection { .. })
    ));
}

#[test]
fn repository_rejects_connection_without_required_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteResGroupRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("ResGroups"))
    ));
    assert!(matches!(
        SqliteCensusRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("Census"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE ResGroups (
            res_group_id INTEGER PRIMARY KEY AUTOINCREMENT,
            res_group_year INTEGER NOT NULL,
            township_id INTEGER NOT NULL,
            dwelling_num INTEGER NOT NULL,
            household_num INTEGER NOT NULL,
            event_type TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteResGroupRepository::try_new(&conn),
        Err(RepoError::MissingRequiredColumn {
            table: "ResGroups",
            column: "household_notes"
        })
    ));
}

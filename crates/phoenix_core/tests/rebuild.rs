use phoenix_core::db::open_db_in_memory;
use phoenix_core::{
    rebuild_residency_groups, HouseholdKey, ResGroupRepository, SqliteResGroupRepository,
};
use rusqlite::{params, Connection};

fn insert_census_row(
    conn: &Connection,
    person_id: i64,
    year: Option<i64>,
    township_id: Option<i64>,
    dwelling_num: Option<i64>,
    household_num: Option<i64>,
) -> i64 {
    conn.execute(
        "INSERT INTO Census (person_id, census_year, township_id, census_dwellnum, census_householdnum)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![person_id, year, township_id, dwelling_num, household_num],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn table_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn res_group_of(conn: &Connection, census_id: i64) -> Option<i64> {
    conn.query_row(
        "SELECT res_group_id FROM Census WHERE id = ?1;",
        [census_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn household_members_collapse_into_one_group() {
    let mut conn = open_db_in_memory().unwrap();
    let first = insert_census_row(&conn, 10, Some(1900), Some(3), Some(5), Some(2));
    let second = insert_census_row(&conn, 11, Some(1900), Some(3), Some(5), Some(2));

    let report = rebuild_residency_groups(&mut conn).unwrap();

    assert_eq!(report.groups_created, 1);
    assert_eq!(report.census_rows_relinked, 2);
    assert_eq!(report.members_inserted, 2);
    assert!(report.verification.is_clean());

    let repo = SqliteResGroupRepository::try_new(&conn).unwrap();
    let group_id = repo
        .find_group_id(&HouseholdKey {
            year: 1900,
            township_id: 3,
            dwelling_num: 5,
            household_num: 2,
        })
        .unwrap()
        .expect("rebuild must create the household's group");

    assert_eq!(res_group_of(&conn, first), Some(group_id));
    assert_eq!(res_group_of(&conn, second), Some(group_id));

    let members = repo.list_members(group_id).unwrap();
    let persons: Vec<i64> = members.iter().map(|member| member.person_id).collect();
    assert_eq!(persons, vec![10, 11]);
}

#[test]
fn keyed_rows_link_back_to_matching_groups() {
    let mut conn = open_db_in_memory().unwrap();
    insert_census_row(&conn, 10, Some(1900), Some(3), Some(5), Some(2));
    insert_census_row(&conn, 11, Some(1900), Some(3), Some(6), Some(1));
    insert_census_row(&conn, 12, Some(1910), Some(3), Some(5), Some(2));

    let report = rebuild_residency_groups(&mut conn).unwrap();
    assert_eq!(report.groups_created, 3);
    assert!(report.verification.is_clean());

    // Every keyed row links to a group whose key fields match the row's.
    let mismatched: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM Census c
             LEFT JOIN ResGroups g
               ON g.res_group_id = c.res_group_id
              AND g.res_group_year = c.census_year
              AND g.township_id = c.township_id
              AND g.dwelling_num = c.census_dwellnum
              AND g.household_num = c.census_householdnum
             WHERE c.census_year IS NOT NULL
               AND c.township_id IS NOT NULL
               AND c.census_dwellnum IS NOT NULL
               AND c.census_householdnum IS NOT NULL
               AND g.res_group_id IS NULL;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(mismatched, 0);
}

#[test]
fn rows_missing_key_fields_are_skipped() {
    let mut conn = open_db_in_memory().unwrap();
    let keyed = insert_census_row(&conn, 10, Some(1900), Some(3), Some(5), Some(2));
    let unkeyed = insert_census_row(&conn, 11, Some(1900), Some(3), None, Some(2));

    let report = rebuild_residency_groups(&mut conn).unwrap();

    assert_eq!(report.groups_created, 1);
    assert_eq!(report.census_rows_relinked, 1);
    assert_eq!(report.members_inserted, 1);
    assert!(res_group_of(&conn, keyed).is_some());
    assert_eq!(res_group_of(&conn, unkeyed), None);
    // A row that can never be linked is not an anomaly.
    assert!(report.verification.is_clean());
}

#[test]
fn rebuild_replaces_stale_groups_and_keeps_backup() {
    let mut conn = open_db_in_memory().unwrap();
    insert_census_row(&conn, 10, Some(1900), Some(3), Some(5), Some(2));

    // Stale state left over from an earlier, divergent linking scheme.
    conn.execute(
        "INSERT INTO ResGroups (res_group_year, township_id, dwelling_num, household_num, event_type)
         VALUES (1800, 1, 1, 1, 'Census');",
        [],
    )
    .unwrap();
    let stale_group = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO ResGroupMembers (res_group_id, res_group_member) VALUES (?1, 99);",
        [stale_group],
    )
    .unwrap();

    let report = rebuild_residency_groups(&mut conn).unwrap();
    assert_eq!(report.groups_created, 1);

    let repo = SqliteResGroupRepository::try_new(&conn).unwrap();
    let stale_key = HouseholdKey {
        year: 1800,
        township_id: 1,
        dwelling_num: 1,
        household_num: 1,
    };
    assert_eq!(repo.find_group_id(&stale_key).unwrap(), None);
    assert_eq!(table_count(&conn, "ResGroups"), 1);
    assert_eq!(table_count(&conn, "ResGroupMembers"), 1);

    // The pre-rebuild state survives in the snapshot tables.
    assert_eq!(table_count(&conn, "ResGroups_backup"), 1);
    assert_eq!(table_count(&conn, "ResGroupMembers_backup"), 1);
    assert_eq!(table_count(&conn, "Census_backup"), 1);
}

#[test]
fn rerunning_rebuild_is_stable() {
    let mut conn = open_db_in_memory().unwrap();
    insert_census_row(&conn, 10, Some(1900), Some(3), Some(5), Some(2));
    insert_census_row(&conn, 11, Some(1900), Some(3), Some(5), Some(2));
    insert_census_row(&conn, 12, Some(1900), Some(3), Some(6), Some(1));

    let first = rebuild_residency_groups(&mut conn).unwrap();
    let second = rebuild_residency_groups(&mut conn).unwrap();

    assert_eq!(second.groups_created, first.groups_created);
    assert_eq!(second.census_rows_relinked, first.census_rows_relinked);
    assert_eq!(second.members_inserted, first.members_inserted);
    assert!(second.verification.is_clean());
    assert_eq!(table_count(&conn, "ResGroups"), 2);
    assert_eq!(table_count(&conn, "ResGroupMembers"), 3);
}

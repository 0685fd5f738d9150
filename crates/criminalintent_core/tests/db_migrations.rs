use criminalintent_core::db::migrations::{latest_version, store_version};
use criminalintent_core::db::{open_db, open_db_in_memory, DbError};
use criminalintent_core::{CrimeDao, SqliteCrimeDao};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(latest_version(), 2);
    assert_eq!(schema_version(&conn), latest_version());
    assert_column_exists(&conn, "crime", "id");
    assert_column_exists(&conn, "crime", "suspect");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crime.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_column_exists(&conn_second, "crime", "suspect");
}

#[test]
fn version_one_store_is_upgraded_without_data_loss() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    let id = Uuid::new_v4();

    let legacy = Connection::open(&path).unwrap();
    legacy
        .execute_batch(
            "CREATE TABLE crime (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                date INTEGER NOT NULL,
                is_solved INTEGER NOT NULL CHECK (is_solved IN (0, 1))
            );
            PRAGMA user_version = 1;",
        )
        .unwrap();
    legacy
        .execute(
            "INSERT INTO crime (id, title, date, is_solved) VALUES (?1, 'Burglary', 1700000000000, 1);",
            [id.to_string()],
        )
        .unwrap();
    drop(legacy);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), 2);

    let crime = SqliteCrimeDao::new(&conn).find(id).unwrap().unwrap();
    assert_eq!(crime.title, "Burglary");
    assert!(crime.is_solved);
    assert_eq!(crime.date().timestamp_millis(), 1_700_000_000_000);
    assert_eq!(crime.suspect, "");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::StoreTooNew {
            store_version,
            supported_version,
        } => {
            assert_eq!(store_version, 999);
            assert_eq!(supported_version, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_upgrade_step_is_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("half-upgraded.db");

    let legacy = Connection::open(&path).unwrap();
    legacy
        .execute_batch(
            "CREATE TABLE crime (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                date INTEGER NOT NULL,
                is_solved INTEGER NOT NULL,
                suspect TEXT NOT NULL DEFAULT ''
            );
            PRAGMA user_version = 1;",
        )
        .unwrap();
    drop(legacy);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::MigrationFailed {
            store_version: 1,
            target_version: 2,
            ..
        }
    ));
    assert!(std::error::Error::source(&err).is_some());

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 1);
}

fn schema_version(conn: &Connection) -> u32 {
    store_version(conn).unwrap()
}

fn assert_column_exists(conn: &Connection, table_name: &str, column_name: &str) {
    let exists: i64 = conn
        .query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM pragma_table_info('{table_name}') WHERE name = ?1);"
            ),
            [column_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "column {table_name}.{column_name} does not exist");
}

//! Crime table schema history.
//!
//! v1 is the first release layout. v2 adds the `suspect` column picked from
//! contacts. Steps only add; a v1 row reads back with an empty suspect.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

/// (schema version, SQL that upgrades the previous version to it)
const SCHEMA_STEPS: &[(u32, &str)] = &[
    (1, include_str!("0001_init.sql")),
    (2, include_str!("0002_suspect.sql")),
];

/// Newest schema version this build can read and write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Schema version recorded in the store (`PRAGMA user_version`).
pub fn store_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Upgrades the store to [`latest_version`].
///
/// Pending steps share one transaction, so a failed step leaves the store
/// exactly as it was.
///
/// # Errors
/// - `DbError::StoreTooNew` when the store is ahead of this build.
/// - `DbError::MigrationFailed` naming the step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = store_version(conn)?;
    let latest = latest_version();

    if from > latest {
        return Err(DbError::StoreTooNew {
            store_version: from,
            supported_version: latest,
        });
    }
    if from == latest {
        debug!("event=db_migrate module=db status=skip version={from}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &(version, sql) in SCHEMA_STEPS.iter().filter(|(version, _)| *version > from) {
        upgrade_to(&tx, version, sql).map_err(|source| DbError::MigrationFailed {
            store_version: from,
            target_version: version,
            source,
        })?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from={from} to={latest}");
    Ok(())
}

fn upgrade_to(tx: &Transaction<'_>, version: u32, sql: &str) -> rusqlite::Result<()> {
    tx.execute_batch(sql)?;
    tx.pragma_update(None, "user_version", version)
}

//! Crime store bootstrap.
//!
//! Opening a store always brings its schema up to [`migrations::latest_version`]
//! before a connection is handed out, so DAO code never sees a v1 table.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or upgrading the crime store.
#[derive(Debug)]
pub enum DbError {
    /// SQLite rejected an open, pragma or query.
    Sqlite(rusqlite::Error),
    /// One schema step failed and was rolled back. The store keeps
    /// `store_version`.
    MigrationFailed {
        store_version: u32,
        target_version: u32,
        source: rusqlite::Error,
    },
    /// The store was written by a newer release of the app.
    StoreTooNew {
        store_version: u32,
        supported_version: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "crime store error: {err}"),
            Self::MigrationFailed {
                store_version,
                target_version,
                source,
            } => write!(
                f,
                "crime store upgrade from v{store_version} to v{target_version} failed: {source}"
            ),
            Self::StoreTooNew {
                store_version,
                supported_version,
            } => write!(
                f,
                "crime store is at v{store_version}, this build reads up to v{supported_version}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::MigrationFailed { source: err, .. } => Some(err),
            Self::StoreTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

//! Crime data access contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the typed read/write surface over the `crime` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `replace` is an upsert; callers never check existence first.
//! - `insert` never overwrites; a duplicate ID is a constraint violation.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::crime::{Crime, CrimeId, CrimeValidationError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CRIME_SELECT_SQL: &str = "SELECT
    id,
    title,
    date,
    is_solved,
    suspect
FROM crime";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for crime persistence, queries and repository access.
#[derive(Debug)]
pub enum RepoError {
    /// The process-wide repository was used before `initialize`.
    Uninitialized,
    /// A row with this ID already exists.
    ConstraintViolation(CrimeId),
    NotFound(CrimeId),
    Db(DbError),
    InvalidData(String),
    /// The write worker has shut down and cannot accept requests.
    WorkerUnavailable,
    /// No live query snapshot arrived within the caller's deadline.
    SnapshotTimeout,
    Io(std::io::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "crime repository must be initialized before use"),
            Self::ConstraintViolation(id) => write!(f, "crime already exists: {id}"),
            Self::NotFound(id) => write!(f, "crime not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted crime data: {message}"),
            Self::WorkerUnavailable => write!(f, "crime write worker is not running"),
            Self::SnapshotTimeout => write!(f, "timed out waiting for crime snapshot"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CrimeValidationError> for RepoError {
    fn from(value: CrimeValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Data access interface for the crime table.
pub trait CrimeDao {
    /// All stored crimes. Order is stable but not part of the contract.
    fn list_all(&self) -> RepoResult<Vec<Crime>>;
    fn find(&self, id: CrimeId) -> RepoResult<Option<Crime>>;
    fn insert(&self, crime: &Crime) -> RepoResult<()>;
    /// Inserts when absent, fully overwrites when present.
    fn replace(&self, crime: &Crime) -> RepoResult<()>;
    /// Overwrites an existing row; `NotFound` when the ID is unknown.
    fn update(&self, crime: &Crime) -> RepoResult<()>;
}

/// SQLite-backed crime DAO over a borrowed connection.
pub struct SqliteCrimeDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCrimeDao<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CrimeDao for SqliteCrimeDao<'_> {
    fn list_all(&self) -> RepoResult<Vec<Crime>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CRIME_SELECT_SQL} ORDER BY date DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut crimes = Vec::new();

        while let Some(row) = rows.next()? {
            crimes.push(parse_crime_row(row)?);
        }

        Ok(crimes)
    }

    fn find(&self, id: CrimeId) -> RepoResult<Option<Crime>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CRIME_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_crime_row(row)?));
        }

        Ok(None)
    }

    fn insert(&self, crime: &Crime) -> RepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO crime (id, title, date, is_solved, suspect)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                crime.id().to_string(),
                crime.title.as_str(),
                crime.date().timestamp_millis(),
                bool_to_int(crime.is_solved),
                crime.suspect.as_str(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => {
                Err(RepoError::ConstraintViolation(crime.id()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn replace(&self, crime: &Crime) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO crime (id, title, date, is_solved, suspect)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                date = excluded.date,
                is_solved = excluded.is_solved,
                suspect = excluded.suspect;",
            params![
                crime.id().to_string(),
                crime.title.as_str(),
                crime.date().timestamp_millis(),
                bool_to_int(crime.is_solved),
                crime.suspect.as_str(),
            ],
        )?;

        Ok(())
    }

    fn update(&self, crime: &Crime) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE crime
             SET
                title = ?1,
                date = ?2,
                is_solved = ?3,
                suspect = ?4
             WHERE id = ?5;",
            params![
                crime.title.as_str(),
                crime.date().timestamp_millis(),
                bool_to_int(crime.is_solved),
                crime.suspect.as_str(),
                crime.id().to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(crime.id()));
        }

        Ok(())
    }
}

fn parse_crime_row(row: &Row<'_>) -> RepoResult<Crime> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{id_text}` in crime.id")))?;

    let date_millis: i64 = row.get("date")?;
    let date = DateTime::<Utc>::from_timestamp_millis(date_millis).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{date_millis}` in crime.date"))
    })?;

    let is_solved = match row.get::<_, i64>("is_solved")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_solved value `{other}` in crime.is_solved"
            )));
        }
    };

    let mut crime = Crime::with_id(id, date)?;
    crime.title = row.get("title")?;
    crime.is_solved = is_solved;
    crime.suspect = row.get("suspect")?;
    Ok(crime)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

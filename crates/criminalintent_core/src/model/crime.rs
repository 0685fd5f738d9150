//! Crime domain model.
//!
//! # Responsibility
//! - Define the canonical crime record edited by the detail screen.
//! - Derive the photo file name from the record identity.
//!
//! # Invariants
//! - `id` is stable and never reused for another crime.
//! - `id` is never the nil UUID.
//! - `date` carries millisecond precision, matching the stored column.
//! - The photo file name is a pure function of `id`.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a crime record.
pub type CrimeId = Uuid;

const PHOTO_FILE_PREFIX: &str = "IMG_";
const PHOTO_FILE_EXTENSION: &str = "jpg";

/// Validation failures for crime construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrimeValidationError {
    /// The nil UUID cannot identify a crime.
    NilId,
}

impl Display for CrimeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "crime id must not be the nil uuid"),
        }
    }
}

impl Error for CrimeValidationError {}

/// One crime entry.
///
/// Deserialization runs the same checks as [`Crime::with_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crime {
    id: CrimeId,
    /// Short free-form title typed by the user.
    pub title: String,
    date: DateTime<Utc>,
    pub is_solved: bool,
    /// Display name picked from contacts, empty when unknown.
    pub suspect: String,
}

impl Crime {
    /// Creates a new crime with a fresh random ID and default fields.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            date: Utc::now().trunc_subsecs(3),
            is_solved: false,
            suspect: String::new(),
        }
    }

    /// Creates a crime with a caller-provided ID, used by import and tests.
    ///
    /// # Errors
    /// - Returns `CrimeValidationError::NilId` for `Uuid::nil()`.
    pub fn with_id(id: CrimeId, date: DateTime<Utc>) -> Result<Self, CrimeValidationError> {
        if id.is_nil() {
            return Err(CrimeValidationError::NilId);
        }

        Ok(Self {
            id,
            title: String::new(),
            date: date.trunc_subsecs(3),
            is_solved: false,
            suspect: String::new(),
        })
    }

    pub fn id(&self) -> CrimeId {
        self.id
    }

    /// When the crime happened. Defaults to creation time.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Sets the crime date, truncated to whole milliseconds.
    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.date = date.trunc_subsecs(3);
    }

    /// Returns whether a non-blank suspect has been assigned.
    pub fn has_suspect(&self) -> bool {
        !self.suspect.trim().is_empty()
    }

    /// File name of the photo attached to this crime, e.g. `IMG_<uuid>.jpg`.
    pub fn photo_file_name(&self) -> String {
        photo_file_name(self.id)
    }
}

impl Default for Crime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct CrimeFields {
    id: CrimeId,
    title: String,
    date: DateTime<Utc>,
    is_solved: bool,
    suspect: String,
}

impl<'de> Deserialize<'de> for Crime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = CrimeFields::deserialize(deserializer)?;
        let mut crime =
            Crime::with_id(fields.id, fields.date).map_err(serde::de::Error::custom)?;
        crime.title = fields.title;
        crime.is_solved = fields.is_solved;
        crime.suspect = fields.suspect;
        Ok(crime)
    }
}

/// Photo file name for a crime ID.
pub fn photo_file_name(id: CrimeId) -> String {
    format!("{PHOTO_FILE_PREFIX}{id}.{PHOTO_FILE_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::{photo_file_name, Crime};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn photo_file_name_embeds_id() {
        let id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
        assert_eq!(
            photo_file_name(id),
            "IMG_11111111-2222-4333-8444-555555555555.jpg"
        );
    }

    #[test]
    fn new_truncates_date_to_millis() {
        let crime = Crime::new();
        assert_eq!(crime.date().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn set_date_drops_sub_millisecond_part() {
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let mut crime = Crime::new();
        crime.set_date(precise);
        assert_eq!(crime.date().timestamp_millis(), 1_700_000_000_123);
        assert_eq!(crime.date().timestamp_subsec_nanos(), 123_000_000);
    }
}

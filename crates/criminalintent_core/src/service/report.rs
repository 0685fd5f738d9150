//! Plain-text crime report used by the share action.
//!
//! # Invariants
//! - The report never contains placeholders; blank suspects get a fixed
//!   phrase.

use crate::model::crime::Crime;
use chrono::TimeZone;
use std::fmt::Display;

const REPORT_DATE_FORMAT: &str = "%a, %m, %d";
const REPORT_SUBJECT: &str = "CriminalIntent Crime Report";

/// Subject line for a shared crime report.
pub fn report_subject() -> &'static str {
    REPORT_SUBJECT
}

/// Renders the share text for `crime`, with its date shown in `tz`.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use criminalintent_core::{crime_report, Crime};
/// use uuid::Uuid;
///
/// let date = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
/// let mut crime = Crime::with_id(Uuid::new_v4(), date).unwrap();
/// crime.title = "Stolen bike".to_string();
///
/// assert_eq!(
///     crime_report(&crime, &Utc),
///     "Stolen bike! The crime was discovered on Fri, 03, 08. \
///      The case is not solved, and there is no suspect."
/// );
/// ```
pub fn crime_report<Tz>(crime: &Crime, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let date = crime
        .date()
        .with_timezone(tz)
        .format(REPORT_DATE_FORMAT)
        .to_string();

    let solved = if crime.is_solved {
        "The case is solved"
    } else {
        "The case is not solved"
    };

    let suspect = if crime.has_suspect() {
        format!("the suspect is {}.", crime.suspect.trim())
    } else {
        "there is no suspect.".to_string()
    };

    format!(
        "{}! The crime was discovered on {date}. {solved}, and {suspect}",
        crime.title
    )
}

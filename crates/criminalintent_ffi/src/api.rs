//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level crime functions to Dart via FRB.
//! - Keep error semantics simple: envelopes and strings, never panics.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Crime IDs cross the boundary as UUID strings, dates as epoch millis.
//! - Every crime call goes through the process-wide repository.

use chrono::{DateTime, Local, Utc};
use criminalintent_core::repo::global;
use criminalintent_core::{
    core_version as core_version_inner, crime_report as crime_report_inner,
    init_logging as init_logging_inner, ping as ping_inner, Crime, CrimeId, CrimeRepository,
    RepoError, RepoResult, RepositoryConfig,
};
use log::{error, warn};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

const FILES_DIR_ENV: &str = "CRIMINALINTENT_FILES_DIR";
const FILES_DIR_FALLBACK_NAME: &str = "criminalintent";
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Opens the crime store under the app-private files directory.
///
/// An empty `files_dir` falls back to `CRIMINALINTENT_FILES_DIR`, then to a
/// directory under the system temp dir.
///
/// # FFI contract
/// - Must run during app startup, before any crime call.
/// - Repeated calls are no-ops.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_repository(files_dir: String) -> String {
    let config = RepositoryConfig::from_files_dir(resolve_files_dir(files_dir.as_str()));
    match global::initialize(config) {
        Ok(()) => String::new(),
        Err(err) => {
            error!("event=ffi_init_repository module=ffi status=error error={err}");
            format!("init_repository failed: {err}")
        }
    }
}

/// Crime shape exchanged with Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrimeItem {
    /// Stable crime ID in UUID string form.
    pub id: String,
    pub title: String,
    /// Unix epoch milliseconds.
    pub date_epoch_ms: i64,
    pub is_solved: bool,
    /// Empty when no suspect was picked.
    pub suspect: String,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrimeListResponse {
    pub items: Vec<CrimeItem>,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the request was accepted.
    pub ok: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Returns a fresh, unsaved crime with default fields.
#[flutter_rust_bridge::frb(sync)]
pub fn crime_new() -> CrimeItem {
    to_crime_item(&Crime::new())
}

/// Lists all stored crimes.
///
/// # FFI contract
/// - Sync call; waits for the current snapshot of the live list.
/// - Never panics; failures yield an empty list and a message.
#[flutter_rust_bridge::frb(sync)]
pub fn crime_list() -> CrimeListResponse {
    match with_repository(|repo| first_snapshot(repo.crimes().recv_timeout(SNAPSHOT_TIMEOUT))) {
        Ok(crimes) => CrimeListResponse {
            message: format!("Found {} crime(s).", crimes.len()),
            items: crimes.iter().map(to_crime_item).collect(),
        },
        Err(err) => CrimeListResponse {
            items: Vec::new(),
            message: format!("crime_list failed: {err}"),
        },
    }
}

/// Gets one crime; `None` when missing, unknown or on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn crime_get(id: String) -> Option<CrimeItem> {
    let crime_id = parse_crime_id(id.as_str()).ok()?;
    with_repository(|repo| first_snapshot(repo.crime(crime_id).recv_timeout(SNAPSHOT_TIMEOUT)))
        .ok()
        .flatten()
        .map(|crime| to_crime_item(&crime))
}

/// Queues an upsert of `item`.
///
/// # FFI contract
/// - Returns once the write is queued; storage errors are only logged.
#[flutter_rust_bridge::frb(sync)]
pub fn crime_save(item: CrimeItem) -> ActionResponse {
    let crime = match from_crime_item(&item) {
        Ok(crime) => crime,
        Err(message) => {
            warn!("event=ffi_crime_save module=ffi status=error error_code=invalid_item");
            return ActionResponse::failure(format!("crime_save failed: {message}"));
        }
    };

    match with_repository(|repo| repo.save(&crime)) {
        Ok(()) => ActionResponse::success("Crime queued for save."),
        Err(err) => {
            error!(
                "event=ffi_crime_save module=ffi status=error crime_id={} error={err}",
                crime.id()
            );
            ActionResponse::failure(format!("crime_save failed: {err}"))
        }
    }
}

/// Absolute path where the photo for crime `id` lives (or will live).
///
/// Returns an empty string for malformed IDs or before `init_repository`.
#[flutter_rust_bridge::frb(sync)]
pub fn crime_photo_path(id: String) -> String {
    let Ok(crime_id) = parse_crime_id(id.as_str()) else {
        return String::new();
    };

    with_repository(|repo| Ok(repo.photo_file_for_id(crime_id)))
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Share text for a stored crime, dated in the device time zone.
///
/// Returns an empty string when the crime cannot be loaded.
#[flutter_rust_bridge::frb(sync)]
pub fn crime_report(id: String) -> String {
    crime_get(id)
        .and_then(|item| from_crime_item(&item).ok())
        .map(|crime| crime_report_inner(&crime, &Local))
        .unwrap_or_default()
}

fn with_repository<T>(f: impl FnOnce(&CrimeRepository) -> RepoResult<T>) -> RepoResult<T> {
    let repo = global::get()?;
    f(repo)
}

fn first_snapshot<T>(snapshot: Option<RepoResult<T>>) -> RepoResult<T> {
    snapshot.unwrap_or(Err(RepoError::SnapshotTimeout))
}

fn resolve_files_dir(files_dir: &str) -> PathBuf {
    let trimmed = files_dir.trim();
    if !trimmed.is_empty() {
        return PathBuf::from(trimmed);
    }
    if let Ok(raw) = std::env::var(FILES_DIR_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(FILES_DIR_FALLBACK_NAME)
}

fn parse_crime_id(id: &str) -> Result<CrimeId, String> {
    Uuid::parse_str(id.trim()).map_err(|_| format!("invalid crime id `{id}`"))
}

fn to_crime_item(crime: &Crime) -> CrimeItem {
    CrimeItem {
        id: crime.id().to_string(),
        title: crime.title.clone(),
        date_epoch_ms: crime.date().timestamp_millis(),
        is_solved: crime.is_solved,
        suspect: crime.suspect.clone(),
    }
}

fn from_crime_item(item: &CrimeItem) -> Result<Crime, String> {
    let id = parse_crime_id(item.id.as_str())?;
    let date = DateTime::<Utc>::from_timestamp_millis(item.date_epoch_ms)
        .ok_or_else(|| format!("invalid date_epoch_ms `{}`", item.date_epoch_ms))?;
    let mut crime = Crime::with_id(id, date).map_err(|err| err.to_string())?;
    crime.title = item.title.clone();
    crime.is_solved = item.is_solved;
    crime.suspect = item.suspect.clone();
    Ok(crime)
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, crime_get, crime_list, crime_new, crime_photo_path, crime_report,
        crime_save, from_crime_item, init_logging, init_repository, ping, to_crime_item,
        CrimeItem,
    };
    use criminalintent_core::repo::global;
    use std::sync::OnceLock;
    use std::time::{Duration, Instant};

    static FILES_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

    fn ensure_repository() {
        let dir = FILES_DIR.get_or_init(|| tempfile::tempdir().expect("create temp files dir"));
        let error = init_repository(dir.path().to_string_lossy().into_owned());
        assert!(error.is_empty(), "{error}");
    }

    fn wait_for_crime(id: &str, accept: impl Fn(&CrimeItem) -> bool) -> Option<CrimeItem> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(item) = crime_get(id.to_string()) {
                if accept(&item) {
                    return Some(item);
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn crime_item_conversion_keeps_fields() {
        let mut item = crime_new();
        item.title = "Robbery".to_string();
        item.suspect = "Jane Doe".to_string();
        item.is_solved = true;

        let crime = from_crime_item(&item).unwrap();
        assert_eq!(to_crime_item(&crime), item);
    }

    #[test]
    fn malformed_id_is_rejected() {
        let mut item = crime_new();
        item.id = "nope".to_string();

        let response = crime_save(item);
        assert!(!response.ok);
        assert!(response.message.contains("invalid crime id"));
        assert_eq!(crime_photo_path("nope".to_string()), "");
    }

    #[test]
    fn out_of_range_date_is_rejected() {
        let mut item = crime_new();
        item.date_epoch_ms = i64::MAX;

        let response = crime_save(item);
        assert!(!response.ok);
        assert!(response.message.contains("invalid date_epoch_ms"));
    }

    #[test]
    fn saved_crime_is_listed_and_fetched() {
        ensure_repository();
        assert!(global::is_initialized());

        let mut item = crime_new();
        item.title = "Stolen bike".to_string();
        let response = crime_save(item.clone());
        assert!(response.ok, "{}", response.message);

        let fetched = wait_for_crime(&item.id, |found| found.title == "Stolen bike");
        assert_eq!(fetched, Some(item.clone()));

        let listed = crime_list();
        assert!(listed.items.iter().any(|found| found.id == item.id));
    }

    #[test]
    fn report_and_photo_path_use_stored_crime() {
        ensure_repository();

        let mut item = crime_new();
        item.title = "Vandalism".to_string();
        item.suspect = "Jane Doe".to_string();
        assert!(crime_save(item.clone()).ok);
        assert!(wait_for_crime(&item.id, |_| true).is_some());

        let report = crime_report(item.id.clone());
        assert!(report.starts_with("Vandalism! The crime was discovered on"));
        assert!(report.ends_with("the suspect is Jane Doe."));

        let photo_path = crime_photo_path(item.id.clone());
        assert!(photo_path.ends_with(&format!("IMG_{}.jpg", item.id)));
    }
}

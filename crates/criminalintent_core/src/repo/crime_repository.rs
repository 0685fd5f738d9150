//! Crime repository with a serial background write queue.
//!
//! # Responsibility
//! - Own the crime store handle; nothing else opens it.
//! - Expose live reads and fire-and-forget writes to UI callers.
//! - Derive photo file paths for crimes.
//!
//! # Invariants
//! - Exactly one worker thread applies writes, strictly in submission order.
//! - A failing write is logged and never stops later queued writes.
//! - Writes already queued run to completion before the worker exits.
//! - Every live query is refreshed after each successful write.

use crate::db::{open_db, open_db_in_memory};
use crate::model::crime::{photo_file_name, Crime, CrimeId};
use crate::repo::crime_dao::{CrimeDao, RepoError, RepoResult, SqliteCrimeDao};
use crate::repo::live::{self, LiveQuery, LiveRegistry, Registration};
use log::{debug, error, info};
use rusqlite::Connection;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const DATABASE_FILE_NAME: &str = "crime-database.sqlite3";
const PHOTO_DIR_NAME: &str = "photos";
const WORKER_THREAD_NAME: &str = "criminalintent-store";

/// Storage locations used to open a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// SQLite file path. `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    /// Directory holding one photo file per crime.
    pub photo_dir: PathBuf,
}

impl RepositoryConfig {
    /// Lays out the store and photo directory under an app-private directory.
    pub fn from_files_dir(files_dir: impl AsRef<Path>) -> Self {
        let files_dir = files_dir.as_ref();
        Self {
            db_path: Some(files_dir.join(DATABASE_FILE_NAME)),
            photo_dir: files_dir.join(PHOTO_DIR_NAME),
        }
    }

    /// In-memory store with photos under `photo_dir`.
    pub fn in_memory(photo_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: None,
            photo_dir: photo_dir.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteKind {
    Replace,
    Insert,
    Update,
}

impl WriteKind {
    fn label(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

enum Command {
    Write(WriteKind, Crime),
    Subscribe(Registration),
    Flush(Sender<()>),
    Shutdown,
}

/// Single access point for crime reads and writes.
///
/// Build one per process with [`CrimeRepository::open`] and hand it to
/// consumers, or use [`crate::repo::global`] for process-wide access.
pub struct CrimeRepository {
    commands: Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    photo_dir: PathBuf,
    next_subscription: AtomicU64,
}

impl CrimeRepository {
    /// Opens the store, applies migrations and starts the write worker.
    ///
    /// # Errors
    /// - Store open or migration failures.
    /// - Photo directory creation or worker spawn failures (`RepoError::Io`).
    pub fn open(config: RepositoryConfig) -> RepoResult<Self> {
        let conn = match &config.db_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                open_db(path)?
            }
            None => open_db_in_memory()?,
        };
        std::fs::create_dir_all(&config.photo_dir)?;

        let (commands, inbox) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(conn, inbox))?;

        info!(
            "event=repo_open module=repo status=ok mode={} photo_dir={}",
            if config.db_path.is_some() { "file" } else { "memory" },
            config.photo_dir.display()
        );

        Ok(Self {
            commands,
            worker: Mutex::new(Some(worker)),
            photo_dir: config.photo_dir,
            next_subscription: AtomicU64::new(1),
        })
    }

    /// Live list of every crime.
    pub fn crimes(&self) -> LiveQuery<Vec<Crime>> {
        let (query, registration) = live::all_crimes_channel(self.next_subscription_id());
        self.subscribe(registration);
        query
    }

    /// Live view of one crime; yields `None` while no row matches.
    pub fn crime(&self, id: CrimeId) -> LiveQuery<Option<Crime>> {
        let (query, registration) = live::crime_channel(self.next_subscription_id(), id);
        self.subscribe(registration);
        query
    }

    /// Queues an upsert of `crime` and returns immediately.
    ///
    /// Storage errors are logged by the worker, not returned here.
    ///
    /// # Errors
    /// - `RepoError::WorkerUnavailable` when the worker has already stopped.
    pub fn save(&self, crime: &Crime) -> RepoResult<()> {
        self.enqueue(WriteKind::Replace, crime)
    }

    /// Queues an insert; a duplicate ID is logged as a constraint violation.
    pub fn add_crime(&self, crime: &Crime) -> RepoResult<()> {
        self.enqueue(WriteKind::Insert, crime)
    }

    /// Queues an overwrite of an existing crime; unknown IDs are logged.
    pub fn update_crime(&self, crime: &Crime) -> RepoResult<()> {
        self.enqueue(WriteKind::Update, crime)
    }

    /// Blocks until every write queued before this call has been applied.
    pub fn flush(&self) -> RepoResult<()> {
        let (done, wait) = mpsc::channel();
        self.commands
            .send(Command::Flush(done))
            .map_err(|_| RepoError::WorkerUnavailable)?;
        wait.recv().map_err(|_| RepoError::WorkerUnavailable)
    }

    /// Path of the photo file for `crime`. Pure; the file may not exist.
    pub fn photo_file(&self, crime: &Crime) -> PathBuf {
        self.photo_file_for_id(crime.id())
    }

    pub fn photo_file_for_id(&self, id: CrimeId) -> PathBuf {
        self.photo_dir.join(photo_file_name(id))
    }

    pub fn photo_dir(&self) -> &Path {
        &self.photo_dir
    }

    fn enqueue(&self, kind: WriteKind, crime: &Crime) -> RepoResult<()> {
        self.commands
            .send(Command::Write(kind, crime.clone()))
            .map_err(|_| {
                error!(
                    "event=crime_write module=repo status=error op={} crime_id={} error_code=worker_unavailable",
                    kind.label(),
                    crime.id()
                );
                RepoError::WorkerUnavailable
            })
    }

    fn subscribe(&self, registration: Registration) {
        // A failed send drops the sender half, so the query reports
        // `WorkerUnavailable` on its first receive.
        if self.commands.send(Command::Subscribe(registration)).is_err() {
            error!("event=live_subscribe module=repo status=error error_code=worker_unavailable");
        }
    }

    fn next_subscription_id(&self) -> live::SubscriptionId {
        self.next_subscription.fetch_add(1, Ordering::Relaxed)
    }
}

impl Drop for CrimeRepository {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        let handle = match self.worker.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("event=repo_close module=repo status=error error_code=worker_panicked");
            }
        }
    }
}

fn run_worker(conn: Connection, inbox: Receiver<Command>) {
    let dao = SqliteCrimeDao::new(&conn);
    let mut registry = LiveRegistry::default();
    debug!("event=worker_start module=repo status=ok");

    while let Ok(command) = inbox.recv() {
        match command {
            Command::Write(kind, crime) => {
                if apply_write(&dao, kind, &crime) {
                    registry.refresh_all(&dao);
                }
            }
            Command::Subscribe(registration) => registry.register(registration, &dao),
            Command::Flush(done) => {
                let _ = done.send(());
            }
            Command::Shutdown => break,
        }
    }

    info!(
        "event=worker_stop module=repo status=ok active_subscriptions={}",
        registry.len()
    );
}

/// Applies one queued write; returns whether it committed.
fn apply_write(dao: &dyn CrimeDao, kind: WriteKind, crime: &Crime) -> bool {
    let started_at = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| match kind {
        WriteKind::Replace => dao.replace(crime),
        WriteKind::Insert => dao.insert(crime),
        WriteKind::Update => dao.update(crime),
    }));

    match outcome {
        Ok(Ok(())) => {
            info!(
                "event=crime_write module=repo status=ok op={} crime_id={} duration_ms={}",
                kind.label(),
                crime.id(),
                started_at.elapsed().as_millis()
            );
            true
        }
        Ok(Err(err)) => {
            error!(
                "event=crime_write module=repo status=error op={} crime_id={} duration_ms={} error_code={} error={}",
                kind.label(),
                crime.id(),
                started_at.elapsed().as_millis(),
                error_code(&err),
                err
            );
            false
        }
        Err(_) => {
            error!(
                "event=crime_write module=repo status=error op={} crime_id={} error_code=write_panicked",
                kind.label(),
                crime.id()
            );
            false
        }
    }
}

fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::Uninitialized => "uninitialized",
        RepoError::ConstraintViolation(_) => "constraint_violation",
        RepoError::NotFound(_) => "not_found",
        RepoError::Db(_) => "db_error",
        RepoError::InvalidData(_) => "invalid_data",
        RepoError::WorkerUnavailable => "worker_unavailable",
        RepoError::SnapshotTimeout => "snapshot_timeout",
        RepoError::Io(_) => "io_error",
    }
}

#[cfg(test)]
mod tests {
    use super::RepositoryConfig;
    use std::path::PathBuf;

    #[test]
    fn files_dir_layout_is_stable() {
        let config = RepositoryConfig::from_files_dir("/data/app/files");
        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/data/app/files/crime-database.sqlite3"))
        );
        assert_eq!(config.photo_dir, PathBuf::from("/data/app/files/photos"));
    }
}

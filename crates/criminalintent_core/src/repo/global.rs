//! Process-wide crime repository.
//!
//! # Invariants
//! - At most one repository exists per process through this module.
//! - `get` before `initialize` fails with `RepoError::Uninitialized` and does
//!   no other work.
//! - A failed `initialize` leaves the slot empty so it can be retried.

use crate::repo::crime_dao::{RepoError, RepoResult};
use crate::repo::crime_repository::{CrimeRepository, RepositoryConfig};
use log::debug;
use once_cell::sync::OnceCell;

static REPOSITORY: OnceCell<CrimeRepository> = OnceCell::new();

/// Builds the process-wide repository once.
///
/// Later calls are no-ops, even with a different `config`.
///
/// # Errors
/// - Store open, migration or worker spawn failures from
///   [`CrimeRepository::open`].
pub fn initialize(config: RepositoryConfig) -> RepoResult<()> {
    if REPOSITORY.get().is_some() {
        debug!("event=repo_init module=repo status=skipped reason=already_initialized");
        return Ok(());
    }

    REPOSITORY.get_or_try_init(|| CrimeRepository::open(config))?;
    Ok(())
}

/// Returns the process-wide repository.
///
/// # Errors
/// - `RepoError::Uninitialized` when `initialize` has not succeeded yet.
pub fn get() -> RepoResult<&'static CrimeRepository> {
    REPOSITORY.get().ok_or(RepoError::Uninitialized)
}

pub fn is_initialized() -> bool {
    REPOSITORY.get().is_some()
}

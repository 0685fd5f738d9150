//! Core domain logic for CriminalIntent.
//! This crate is the single source of truth for crime storage invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::crime::{photo_file_name, Crime, CrimeId, CrimeValidationError};
pub use repo::crime_dao::{CrimeDao, RepoError, RepoResult, SqliteCrimeDao};
pub use repo::crime_repository::{CrimeRepository, RepositoryConfig};
pub use repo::live::{LiveQuery, QueryKey, SubscriptionId};
pub use service::photo::{sample_size, scaled_dimensions, Dimensions};
pub use service::report::{crime_report, report_subject};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

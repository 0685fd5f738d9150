//! Domain model for crime records.
//!
//! # Responsibility
//! - Define canonical data structures shared by storage, repository and FFI.
//!
//! # Invariants
//! - Every crime is identified by a stable `CrimeId`.
//! - Crimes are never deleted; edits overwrite the stored row.

pub mod crime;

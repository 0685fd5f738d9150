//! Crime persistence: data access, live queries and the repository.
//!
//! # Responsibility
//! - Define the typed data access contract over the crime table.
//! - Serialize writes on one worker and publish live query updates.
//!
//! # Invariants
//! - Only the repository worker mutates the store.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `ConstraintViolation`, `Uninitialized`) in addition to DB errors.

pub mod crime_dao;
pub mod crime_repository;
pub mod global;
pub mod live;

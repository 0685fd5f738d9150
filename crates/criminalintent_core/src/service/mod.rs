//! Crime use-case helpers outside the persistence boundary.
//!
//! # Responsibility
//! - Build the share report text for a crime.
//! - Compute photo thumbnail subsampling.

pub mod photo;
pub mod report;

//! Flutter bridge for the CriminalIntent core.

pub mod api;

//! Persistence boundary for generic record access.
//!
//! # Responsibility
//! - Define the datastore contract the record layer is built on.
//! - Isolate SQLite query details from record orchestration.
//! - Decide delete permission from declared child relationships.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `Forbidden`) in
//!   addition to storage transport errors.
//! - Soft-deleted rows are only visible through explicit `deleted` filters
//!   or raw counts.

pub mod datastore;
pub mod error;
pub mod guard;

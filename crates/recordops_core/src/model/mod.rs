//! Capability traits every persisted entity composes with.
//!
//! # Responsibility
//! - Describe entity metadata (type name, table, field whitelist).
//! - Describe soft-delete state and declared child relationships.
//! - Carry the acting-user context threaded through record calls.
//!
//! # Invariants
//! - Every entity table has `id`, `deleted` and `deleted_by` columns.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod context;
pub mod entity;
pub mod relationship;

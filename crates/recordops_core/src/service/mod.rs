//! Record-level use-case services.
//!
//! # Responsibility
//! - Orchestrate datastore, filter and delete-guard calls into the generic
//!   record operations every entity type shares.
//! - Keep host layers decoupled from storage details.

pub mod messages;
pub mod records;

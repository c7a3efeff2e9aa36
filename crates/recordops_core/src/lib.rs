//! Generic record access with soft-delete semantics.
//!
//! Every persisted entity composes with the capability traits in
//! [`model::entity`] and is served through [`Records`], which adds
//! soft-delete visibility, relationship-aware delete guards and a
//! string-encoded filter language on top of a [`Datastore`].

pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, FilterOptions, LogLevel};
pub use filter::{Clause, Comparator, FilterError, FilterExpr, Predicate};
pub use logging::{init_logging, logging_status};
pub use model::context::{RequestContext, TokenClaims, UserInfo};
pub use model::entity::{
    read_soft_delete, Entity, FieldError, FieldKind, FieldSpec, FieldValue,
    HasChildRelationships, RecordKey, SoftDeletable,
};
pub use model::relationship::ChildRelationship;
pub use repo::datastore::{Datastore, SqliteDatastore};
pub use repo::error::{RepoError, RepoResult};
pub use repo::guard::DeleteDecision;
pub use service::messages::humanize_type_name;
pub use service::records::{FieldMap, Records};

/// Minimal health-check API for host wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Dynamic filter language for record queries.
//!
//! # Responsibility
//! - Tokenize and parse filter strings into a `FilterExpr` AST.
//! - Bind the AST against an entity's field whitelist and compile it into
//!   a parameterized `Predicate`.
//!
//! # Invariants
//! - Every failure is raised before any datastore call.
//! - Values are always bound as parameters, never interpolated.
//! - Active-only scoping is added unless a clause targets `deleted`.

use crate::model::entity::FieldKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod eval;
mod parser;

pub(crate) use eval::quote_ident;
pub use eval::{compile, Predicate};
pub use parser::{Clause, Comparator, FilterExpr, CLAUSE_SEPARATOR};

/// Validation failure for a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Expression is empty or whitespace only.
    Empty,
    /// Clause does not have the `field,comparator,value` shape.
    MalformedClause { clause: String },
    /// Field token is not an identifier.
    InvalidField { clause: String, field: String },
    UnknownComparator { clause: String, comparator: String },
    /// Field is not whitelisted for the target entity.
    UnknownField {
        clause: String,
        entity: &'static str,
        field: String,
    },
    /// Value cannot be converted to the field's kind.
    InvalidValue {
        clause: String,
        field: String,
        expected: FieldKind,
    },
    /// Comparator is not defined for the field's kind.
    UnsupportedComparator {
        clause: String,
        field: String,
        comparator: Comparator,
        kind: FieldKind,
    },
}

impl FilterError {
    /// Source text of the offending clause, when there is one.
    pub fn clause(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::MalformedClause { clause }
            | Self::InvalidField { clause, .. }
            | Self::UnknownComparator { clause, .. }
            | Self::UnknownField { clause, .. }
            | Self::InvalidValue { clause, .. }
            | Self::UnsupportedComparator { clause, .. } => Some(clause),
        }
    }
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "filter expression is empty"),
            Self::MalformedClause { clause } => write!(
                f,
                "invalid filter clause `{clause}`: expected `field,comparator,value`"
            ),
            Self::InvalidField { clause, field } => write!(
                f,
                "invalid filter clause `{clause}`: `{field}` is not a valid field name"
            ),
            Self::UnknownComparator { clause, comparator } => write!(
                f,
                "invalid filter clause `{clause}`: unknown comparator `{comparator}`; expected eq|ne|lt|le|gt|ge|like"
            ),
            Self::UnknownField {
                clause,
                entity,
                field,
            } => write!(
                f,
                "invalid filter clause `{clause}`: {entity} has no field `{field}`"
            ),
            Self::InvalidValue {
                clause,
                field,
                expected,
            } => write!(
                f,
                "invalid filter clause `{clause}`: field `{field}` expects a {expected} value"
            ),
            Self::UnsupportedComparator {
                clause,
                field,
                comparator,
                kind,
            } => write!(
                f,
                "invalid filter clause `{clause}`: `{comparator}` is not supported on {kind} field `{field}`"
            ),
        }
    }
}

impl Error for FilterError {}

//! Entity metadata and field-level access.
//!
//! # Responsibility
//! - Define the `Entity`, `SoftDeletable` and `HasChildRelationships`
//!   capabilities a record type composes with.
//! - Provide typed field values and the field whitelist used by `update`
//!   and by the filter evaluator.
//!
//! # Invariants
//! - Field names outside `Entity::fields()` (plus the built-in columns)
//!   are never assigned, filtered on or interpolated into SQL.
//! - Built-in columns (`id`, `deleted`, `deleted_by`) are read-only
//!   through `update`.

use crate::model::relationship::ChildRelationship;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Primary key column shared by every entity table.
pub const ID_COLUMN: &str = "id";
/// Soft-delete flag column (`0`/`1`).
pub const DELETED_COLUMN: &str = "deleted";
/// Soft-delete attribution column (nullable text).
pub const DELETED_BY_COLUMN: &str = "deleted_by";

/// Storage type of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    Bool,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Bool => "boolean",
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whitelisted field declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, FieldKind::Real)
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    /// Marks the field as accepting `FieldValue::Null`.
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }
}

/// Dynamically typed value used by `update` and filter evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => FieldKind::Integer.as_str(),
            Self::Real(_) => FieldKind::Real.as_str(),
            Self::Text(_) => FieldKind::Text.as_str(),
            Self::Bool(_) => FieldKind::Bool.as_str(),
        }
    }

    /// Parses a raw filter value for a field of `kind`.
    ///
    /// Text is taken verbatim; other kinds ignore surrounding whitespace.
    /// Booleans accept `true|false|1|0` in any case.
    pub fn parse_as(kind: FieldKind, raw: &str) -> Option<Self> {
        match kind {
            FieldKind::Text => Some(Self::Text(raw.to_string())),
            FieldKind::Integer => raw.trim().parse().ok().map(Self::Integer),
            FieldKind::Real => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Self::Real),
            FieldKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Self::Bool(true)),
                "false" | "0" => Some(Self::Bool(false)),
                _ => None,
            },
        }
    }

    /// Checks this value against `spec`, widening integers for real fields.
    pub fn coerce_for<E: Entity>(self, spec: &FieldSpec) -> Result<Self, FieldError> {
        match (spec.kind, self) {
            (_, Self::Null) if spec.nullable => Ok(Self::Null),
            (FieldKind::Integer, value @ Self::Integer(_))
            | (FieldKind::Real, value @ Self::Real(_))
            | (FieldKind::Text, value @ Self::Text(_))
            | (FieldKind::Bool, value @ Self::Bool(_)) => Ok(value),
            (FieldKind::Real, Self::Integer(value)) => Ok(Self::Real(value as f64)),
            (expected, value) => Err(FieldError::TypeMismatch {
                entity: E::TYPE_NAME,
                field: spec.name.to_string(),
                expected,
                found: value.kind_name(),
            }),
        }
    }

    pub fn into_sql_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(value) => Value::Integer(value),
            Self::Real(value) => Value::Real(value),
            Self::Text(value) => Value::Text(value),
            Self::Bool(value) => Value::Integer(i64::from(value)),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Caller error raised while assigning fields by name.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    UnknownField {
        entity: &'static str,
        field: String,
    },
    ReadOnly {
        entity: &'static str,
        field: &'static str,
    },
    TypeMismatch {
        entity: &'static str,
        field: String,
        expected: FieldKind,
        found: &'static str,
    },
}

impl FieldError {
    /// Error for a setter that received a field/value pair it cannot apply.
    pub fn rejected<E: Entity>(field: &str, value: &FieldValue) -> Self {
        match E::field_spec(field) {
            Some(spec) => Self::TypeMismatch {
                entity: E::TYPE_NAME,
                field: field.to_string(),
                expected: spec.kind,
                found: value.kind_name(),
            },
            None => Self::UnknownField {
                entity: E::TYPE_NAME,
                field: field.to_string(),
            },
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { entity, field } => {
                write!(f, "{entity} has no field `{field}`")
            }
            Self::ReadOnly { entity, field } => {
                write!(f, "{entity} field `{field}` cannot be updated")
            }
            Self::TypeMismatch {
                entity,
                field,
                expected,
                found,
            } => write!(
                f,
                "{entity} field `{field}` expects {expected}, got {found}"
            ),
        }
    }
}

impl Error for FieldError {}

/// Identifier type usable as an entity primary key.
pub trait RecordKey: Clone + Display {
    /// Field kind the `id` column is filtered as.
    const KIND: FieldKind;

    fn to_sql_value(&self) -> Value;

    fn read(row: &Row<'_>, column: &str) -> RepoResult<Self>;
}

impl RecordKey for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_sql_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn read(row: &Row<'_>, column: &str) -> RepoResult<Self> {
        Ok(row.get(column)?)
    }
}

impl RecordKey for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_sql_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn read(row: &Row<'_>, column: &str) -> RepoResult<Self> {
        Ok(row.get(column)?)
    }
}

impl RecordKey for Uuid {
    const KIND: FieldKind = FieldKind::Text;

    fn to_sql_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn read(row: &Row<'_>, column: &str) -> RepoResult<Self> {
        let text: String = row.get(column)?;
        Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{text}` in column `{column}`"))
        })
    }
}

/// Metadata and row mapping for one persisted record type.
///
/// Implementations list their mutable columns in `fields()`; the built-in
/// `id`, `deleted` and `deleted_by` columns are handled by the record layer.
pub trait Entity: Sized {
    type Id: RecordKey;

    /// Type name used in user-facing messages, e.g. `UserProfile`.
    const TYPE_NAME: &'static str;
    /// Backing table name.
    const TABLE: &'static str;

    /// Whitelisted, non-built-in fields.
    fn fields() -> &'static [FieldSpec];

    fn id(&self) -> &Self::Id;

    /// Decodes one `SELECT *` row, built-in columns included.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Column/value pairs for every entry of `fields()`.
    fn to_values(&self) -> Vec<(&'static str, Value)>;

    /// Assigns one whitelisted field. The record layer has already checked
    /// the name and coerced the value to the declared kind.
    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError>;

    fn field_spec(name: &str) -> Option<&'static FieldSpec> {
        Self::fields().iter().find(|spec| spec.name == name)
    }
}

/// Soft-delete state carried by every entity.
pub trait SoftDeletable {
    fn is_deleted(&self) -> bool;

    fn deleted_by(&self) -> Option<&str>;

    /// Sets the tombstone flag. Never cleared by the record layer.
    fn mark_deleted(&mut self);

    fn set_deleted_by(&mut self, name: String);
}

/// Declared child collections whose existence blocks deletion.
///
/// No default implementation: a type that omits its relationships does not
/// compile. Leaf types return an empty list.
pub trait HasChildRelationships {
    fn child_relationships(&self) -> Vec<ChildRelationship>;
}

/// Resolves a filterable field name, built-in columns included.
pub fn resolve_field<E: Entity>(name: &str) -> Option<FieldSpec> {
    match name {
        ID_COLUMN => Some(FieldSpec::new(ID_COLUMN, <E::Id as RecordKey>::KIND)),
        DELETED_COLUMN => Some(FieldSpec::boolean(DELETED_COLUMN)),
        DELETED_BY_COLUMN => Some(FieldSpec::text(DELETED_BY_COLUMN).nullable()),
        other => E::field_spec(other).copied(),
    }
}

/// Reads `(deleted, deleted_by)` from a row, rejecting flags other than 0/1.
pub fn read_soft_delete(row: &Row<'_>) -> RepoResult<(bool, Option<String>)> {
    let deleted = match row.get::<_, i64>(DELETED_COLUMN)? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid deleted value `{other}` in column `{DELETED_COLUMN}`"
            )));
        }
    };
    let deleted_by = row.get(DELETED_BY_COLUMN)?;
    Ok((deleted, deleted_by))
}

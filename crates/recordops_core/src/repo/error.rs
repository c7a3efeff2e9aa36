//! Error taxonomy for record operations.

use crate::db::DbError;
use crate::filter::FilterError;
use crate::model::entity::FieldError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Every failure a record operation can surface.
///
/// [`RepoError::status_code`] gives the conventional HTTP mapping for host
/// layers that render these as responses.
#[derive(Debug)]
pub enum RepoError {
    /// No active record for the requested identifier.
    NotFound {
        entity: &'static str,
        message: String,
    },
    /// Delete denied because child records still exist.
    Forbidden {
        entity: &'static str,
        blocking: Vec<&'static str>,
        message: String,
    },
    /// Filter expression could not be parsed or bound.
    Filter(FilterError),
    /// `update` named an unknown or read-only field, or a wrong value type.
    Field(FieldError),
    Db(DbError),
    /// Connection has no migrations applied (`user_version = 0`).
    UninitializedConnection,
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be decoded into the entity.
    InvalidData(String),
}

impl RepoError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Forbidden { .. } => 403,
            Self::Filter(_) | Self::Field(_) => 400,
            Self::Db(_)
            | Self::UninitializedConnection
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => 500,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { message, .. } | Self::Forbidden { message, .. } => {
                f.write_str(message)
            }
            Self::Filter(err) => write!(f, "{err}"),
            Self::Field(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection => {
                write!(f, "record access requires a migrated connection")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "record access requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "record access requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Filter(err) => Some(err),
            Self::Field(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::Forbidden { .. }
            | Self::UninitializedConnection
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<FilterError> for RepoError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}

impl From<FieldError> for RepoError {
    fn from(value: FieldError) -> Self {
        Self::Field(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

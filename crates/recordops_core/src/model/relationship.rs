//! Declared parent → child associations used by the delete guard.

use crate::model::entity::{Entity, RecordKey};
use rusqlite::types::Value;

/// One child collection of a parent record.
///
/// The collection is never materialized: the delete guard only asks the
/// datastore whether an active row with `foreign_key = parent_id` exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRelationship {
    type_name: &'static str,
    table: &'static str,
    foreign_key: &'static str,
    parent_id: Value,
}

impl ChildRelationship {
    /// Declares the children of type `C` pointing at `parent_id` via `foreign_key`.
    pub fn of<C: Entity>(foreign_key: &'static str, parent_id: &impl RecordKey) -> Self {
        Self {
            type_name: C::TYPE_NAME,
            table: C::TABLE,
            foreign_key,
            parent_id: parent_id.to_sql_value(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn foreign_key(&self) -> &'static str {
        self.foreign_key
    }

    pub fn parent_id(&self) -> &Value {
        &self.parent_id
    }
}

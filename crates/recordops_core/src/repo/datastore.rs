//! Datastore contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert-or-update, query-by-predicate, count and existence
//!   probes over any `Entity` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Writes open a transaction lazily; `commit` ends it. A transaction
//!   the host opened is left to the host: writes nest in a savepoint.
//! - Only whitelisted, static identifiers are interpolated into SQL.
//! - Read paths reject undecodable rows instead of masking them.

use crate::filter::Predicate;
use crate::model::entity::{
    Entity, RecordKey, SoftDeletable, DELETED_BY_COLUMN, DELETED_COLUMN, ID_COLUMN,
};
use crate::model::relationship::ChildRelationship;
use crate::repo::error::{RepoError, RepoResult};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::cell::Cell;

/// Persistence operations the record layer is built on.
pub trait Datastore {
    /// Stages an insert, or an update of every column when `id` exists.
    fn insert_or_update<E: Entity + SoftDeletable>(&self, record: &E) -> RepoResult<()>;

    /// Stages `deleted = 1` and `deleted_by` for an active row, leaving every
    /// other column untouched. Returns `false` when no active row matched.
    fn soft_delete<E: Entity>(&self, id: &E::Id, deleted_by: Option<&str>) -> RepoResult<bool>;

    /// Makes staged writes durable. No-op when nothing is staged.
    fn commit(&self) -> RepoResult<()>;

    /// Discards staged writes. No-op when nothing is staged.
    fn rollback(&self) -> RepoResult<()>;

    /// Fetches by primary key, soft-deleted rows included.
    fn find_by_id<E: Entity>(&self, id: &E::Id) -> RepoResult<Option<E>>;

    /// Fetches rows matching `predicate` (all rows when `None`) ordered by `id`.
    fn find_all<E: Entity>(&self, predicate: Option<&Predicate>) -> RepoResult<Vec<E>>;

    /// Raw row count, soft-deleted rows included.
    fn count<E: Entity>(&self) -> RepoResult<u64>;

    /// Whether at least one active child row exists for `relationship`.
    fn exists(&self, relationship: &ChildRelationship) -> RepoResult<bool>;

    /// Verifies the backing schema can host `E`.
    fn ensure_ready<E: Entity>(&self) -> RepoResult<()> {
        Ok(())
    }
}

impl<T: Datastore> Datastore for &T {
    fn insert_or_update<E: Entity + SoftDeletable>(&self, record: &E) -> RepoResult<()> {
        (**self).insert_or_update(record)
    }

    fn soft_delete<E: Entity>(&self, id: &E::Id, deleted_by: Option<&str>) -> RepoResult<bool> {
        (**self).soft_delete::<E>(id, deleted_by)
    }

    fn commit(&self) -> RepoResult<()> {
        (**self).commit()
    }

    fn rollback(&self) -> RepoResult<()> {
        (**self).rollback()
    }

    fn find_by_id<E: Entity>(&self, id: &E::Id) -> RepoResult<Option<E>> {
        (**self).find_by_id(id)
    }

    fn find_all<E: Entity>(&self, predicate: Option<&Predicate>) -> RepoResult<Vec<E>> {
        (**self).find_all(predicate)
    }

    fn count<E: Entity>(&self) -> RepoResult<u64> {
        (**self).count::<E>()
    }

    fn exists(&self, relationship: &ChildRelationship) -> RepoResult<bool> {
        (**self).exists(relationship)
    }

    fn ensure_ready<E: Entity>(&self) -> RepoResult<()> {
        (**self).ensure_ready::<E>()
    }
}

const WRITE_SAVEPOINT: &str = "recordops_write";

/// Write scope this datastore opened and therefore owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnedScope {
    None,
    /// `BEGIN` issued on an autocommit connection.
    Transaction,
    /// `SAVEPOINT` nested inside a transaction the host already opened.
    Savepoint,
}

/// SQLite-backed datastore over a borrowed, migrated connection.
///
/// Transactions opened by the host are never committed or rolled back
/// here; staged writes nest in a savepoint instead.
pub struct SqliteDatastore<'conn> {
    conn: &'conn Connection,
    scope: Cell<OwnedScope>,
}

impl<'conn> SqliteDatastore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            scope: Cell::new(OwnedScope::None),
        }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn begin_if_needed(&self) -> RepoResult<()> {
        if self.scope.get() != OwnedScope::None {
            return Ok(());
        }
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN;")?;
            self.scope.set(OwnedScope::Transaction);
        } else {
            self.conn
                .execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT};"))?;
            self.scope.set(OwnedScope::Savepoint);
        }
        Ok(())
    }
}

impl Datastore for SqliteDatastore<'_> {
    fn insert_or_update<E: Entity + SoftDeletable>(&self, record: &E) -> RepoResult<()> {
        let mut columns = vec![ID_COLUMN];
        let mut values = vec![record.id().to_sql_value()];
        for (column, value) in record.to_values() {
            columns.push(column);
            values.push(value);
        }
        columns.push(DELETED_COLUMN);
        values.push(Value::Integer(i64::from(record.is_deleted())));
        columns.push(DELETED_BY_COLUMN);
        values.push(
            record
                .deleted_by()
                .map_or(Value::Null, |name| Value::Text(name.to_string())),
        );

        let column_list = columns
            .iter()
            .map(|column| quote(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let assignments = columns
            .iter()
            .skip(1)
            .map(|column| format!("{0} = excluded.{0}", quote(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} ({column_list})
             VALUES ({placeholders})
             ON CONFLICT({id}) DO UPDATE SET {assignments};",
            table = quote(E::TABLE),
            id = quote(ID_COLUMN),
        );

        self.begin_if_needed()?;
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    fn soft_delete<E: Entity>(&self, id: &E::Id, deleted_by: Option<&str>) -> RepoResult<bool> {
        let sql = format!(
            "UPDATE {table}
             SET {deleted} = 1, {deleted_by} = ?2
             WHERE {id} = ?1 AND {deleted} = 0;",
            table = quote(E::TABLE),
            deleted = quote(DELETED_COLUMN),
            deleted_by = quote(DELETED_BY_COLUMN),
            id = quote(ID_COLUMN),
        );
        let deleted_by = deleted_by.map_or(Value::Null, |name| Value::Text(name.to_string()));

        self.begin_if_needed()?;
        let changed = self
            .conn
            .execute(&sql, params_from_iter([id.to_sql_value(), deleted_by]))?;
        Ok(changed == 1)
    }

    fn commit(&self) -> RepoResult<()> {
        match self.scope.replace(OwnedScope::None) {
            OwnedScope::None => Ok(()),
            OwnedScope::Transaction => {
                if let Err(err) = self.conn.execute_batch("COMMIT;") {
                    if !self.conn.is_autocommit() {
                        if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK;") {
                            warn!(
                                "event=datastore_rollback module=datastore status=error error={}",
                                rollback_err
                            );
                        }
                    }
                    return Err(err.into());
                }
                Ok(())
            }
            OwnedScope::Savepoint => {
                self.conn
                    .execute_batch(&format!("RELEASE SAVEPOINT {WRITE_SAVEPOINT};"))?;
                Ok(())
            }
        }
    }

    fn rollback(&self) -> RepoResult<()> {
        let owned = self.scope.replace(OwnedScope::None);
        // SQLite may already have rolled the whole transaction back on error.
        if owned == OwnedScope::None || self.conn.is_autocommit() {
            return Ok(());
        }
        match owned {
            OwnedScope::Transaction => self.conn.execute_batch("ROLLBACK;")?,
            OwnedScope::Savepoint => self.conn.execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {WRITE_SAVEPOINT}; RELEASE SAVEPOINT {WRITE_SAVEPOINT};"
            ))?,
            OwnedScope::None => {}
        }
        Ok(())
    }

    fn find_by_id<E: Entity>(&self, id: &E::Id) -> RepoResult<Option<E>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1;",
            quote(E::TABLE),
            quote(ID_COLUMN)
        ))?;

        let mut rows = stmt.query([id.to_sql_value()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }

        Ok(None)
    }

    fn find_all<E: Entity>(&self, predicate: Option<&Predicate>) -> RepoResult<Vec<E>> {
        let mut sql = format!("SELECT * FROM {}", quote(E::TABLE));
        if let Some(predicate) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(predicate.sql());
        }
        sql.push_str(&format!(" ORDER BY {} ASC;", quote(ID_COLUMN)));

        let params = predicate.map_or(&[][..], Predicate::params);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(E::from_row(row)?);
        }

        Ok(records)
    }

    fn count<E: Entity>(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", quote(E::TABLE)),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn exists(&self, relationship: &ChildRelationship) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(
                    SELECT 1
                    FROM {}
                    WHERE {} = ?1
                      AND {} = 0
                );",
                quote(relationship.table()),
                quote(relationship.foreign_key()),
                quote(DELETED_COLUMN)
            ),
            [relationship.parent_id()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn ensure_ready<E: Entity>(&self) -> RepoResult<()> {
        let version: u32 = self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if version == 0 {
            return Err(RepoError::UninitializedConnection);
        }

        if !table_exists(self.conn, E::TABLE)? {
            return Err(RepoError::MissingRequiredTable(E::TABLE));
        }

        let builtin = [ID_COLUMN, DELETED_COLUMN, DELETED_BY_COLUMN];
        let declared = E::fields().iter().map(|spec| spec.name);
        for column in builtin.into_iter().chain(declared) {
            if !table_has_column(self.conn, E::TABLE, column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: E::TABLE,
                    column,
                });
            }
        }

        Ok(())
    }
}

fn quote(identifier: &str) -> String {
    crate::filter::quote_ident(identifier)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quote(table)))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

//! Generic record operations shared by every entity type.
//!
//! # Responsibility
//! - Provide save/update/get/delete/query/count over any `Entity`.
//! - Enforce soft-delete visibility and the delete guard.
//!
//! # Invariants
//! - `get`, `get_or_fail` and `query` never return soft-deleted rows unless
//!   the filter names `deleted` explicitly.
//! - `count` is the raw row count, soft-deleted rows included.
//! - `update` applies all fields or none.
//! - `delete` writes only `deleted` and `deleted_by`; concurrent updates to
//!   other columns survive it.
//! - Deleting an already-deleted record is a no-op; attribution is kept.
//!   Of two concurrent deletes the first to reach the store wins and the
//!   second sees the stored tombstone.

use crate::config::FilterOptions;
use crate::filter::{compile, FilterExpr, Predicate};
use crate::model::context::RequestContext;
use crate::model::entity::{
    Entity, FieldError, FieldValue, HasChildRelationships, SoftDeletable, DELETED_BY_COLUMN,
    DELETED_COLUMN, ID_COLUMN,
};
use crate::model::relationship::ChildRelationship;
use crate::repo::datastore::Datastore;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::guard::{self, DeleteDecision};
use crate::service::messages::{delete_blocked_message, not_found_message};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Field name → new value, as accepted by [`Records::update`].
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Record operations for entity type `E` over datastore `S`.
pub struct Records<E, S> {
    store: S,
    filter_options: FilterOptions,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S> Records<E, S>
where
    E: Entity + SoftDeletable + HasChildRelationships + Clone,
    S: Datastore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            filter_options: FilterOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Like [`Records::new`] but first checks the store can host `E`.
    pub fn try_new(store: S) -> RepoResult<Self> {
        store.ensure_ready::<E>()?;
        Ok(Self::new(store))
    }

    pub fn with_filter_options(mut self, options: FilterOptions) -> Self {
        self.filter_options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists a new or modified record and returns it.
    pub fn save(&self, record: E) -> RepoResult<E> {
        self.persist(&record)?;
        debug!(
            "event=record_save module=records status=ok entity={} id={}",
            E::TYPE_NAME,
            record.id()
        );
        Ok(record)
    }

    /// Assigns every entry of `fields`, then persists.
    ///
    /// # Errors
    /// - `RepoError::Field` for unknown, built-in or mistyped fields. The
    ///   record is left untouched and nothing is written.
    /// - `RepoError::Db` when persistence fails; `record` is left untouched.
    pub fn update(&self, record: &mut E, fields: &FieldMap) -> RepoResult<()> {
        let mut updated = record.clone();
        for (name, value) in fields {
            let value = coerce_field::<E>(name, value.clone())?;
            updated.assign(name, value)?;
        }

        self.persist(&updated)?;
        *record = updated;
        debug!(
            "event=record_update module=records status=ok entity={} id={} field_count={}",
            E::TYPE_NAME,
            record.id(),
            fields.len()
        );
        Ok(())
    }

    /// Active record with `id`, or `None`.
    pub fn get(&self, id: &E::Id) -> RepoResult<Option<E>> {
        Ok(self
            .store
            .find_by_id::<E>(id)?
            .filter(|record| !record.is_deleted()))
    }

    /// Active record with `id`, or `RepoError::NotFound`.
    pub fn get_or_fail(&self, id: &E::Id) -> RepoResult<E> {
        self.get(id)?.ok_or_else(not_found::<E>)
    }

    /// Soft-deletes `record` when no child relationship is populated.
    ///
    /// Sets `deleted_by` from `ctx` when an acting user is present. When the
    /// stored row was already deleted elsewhere, `record` is refreshed from
    /// the store instead.
    ///
    /// # Errors
    /// - `RepoError::Forbidden` naming every blocking child type; `record`
    ///   stays active.
    /// - `RepoError::NotFound` when `record` was never saved.
    pub fn delete(&self, record: &mut E, ctx: &RequestContext) -> RepoResult<()> {
        if record.is_deleted() {
            debug!(
                "event=record_delete module=records status=skipped reason=already_deleted entity={} id={}",
                E::TYPE_NAME,
                record.id()
            );
            return Ok(());
        }

        let relationships = self.child_relationships(record);
        if let DeleteDecision::Deny { blocking } = guard::check(&relationships, &self.store)? {
            warn!(
                "event=record_delete module=records status=denied entity={} id={} blocking={}",
                E::TYPE_NAME,
                record.id(),
                blocking.join("|")
            );
            return Err(RepoError::Forbidden {
                entity: E::TYPE_NAME,
                message: delete_blocked_message(E::TYPE_NAME, &blocking),
                blocking,
            });
        }

        let acting_user = ctx.acting_user();
        let applied = self.write(|store| store.soft_delete::<E>(record.id(), acting_user))?;
        if !applied {
            let stored = self
                .store
                .find_by_id::<E>(record.id())?
                .ok_or_else(not_found::<E>)?;
            debug!(
                "event=record_delete module=records status=skipped reason=already_deleted_in_store entity={} id={}",
                E::TYPE_NAME,
                record.id()
            );
            *record = stored;
            return Ok(());
        }

        record.mark_deleted();
        if let Some(user) = acting_user {
            record.set_deleted_by(user.to_string());
        }

        debug!(
            "event=record_delete module=records status=ok entity={} id={} attributed={}",
            E::TYPE_NAME,
            record.id(),
            ctx.acting_user().is_some()
        );
        Ok(())
    }

    /// Active records, optionally narrowed by a filter string.
    ///
    /// A missing or blank filter returns every active record.
    pub fn query(&self, filter: Option<&str>) -> RepoResult<Vec<E>> {
        match filter.map(str::trim).filter(|text| !text.is_empty()) {
            None => self.store.find_all(Some(&Predicate::active_only())),
            Some(text) => {
                let expr = FilterExpr::parse(text).map_err(|err| {
                    warn!(
                        "event=record_query module=records status=rejected entity={} error_code=filter_parse",
                        E::TYPE_NAME
                    );
                    RepoError::from(err)
                })?;
                self.query_expr(&expr)
            }
        }
    }

    /// Runs an already parsed filter.
    pub fn query_expr(&self, expr: &FilterExpr) -> RepoResult<Vec<E>> {
        let predicate = compile::<E>(expr, self.filter_options).map_err(|err| {
            warn!(
                "event=record_query module=records status=rejected entity={} error_code=filter_bind",
                E::TYPE_NAME
            );
            RepoError::from(err)
        })?;

        let records = self.store.find_all(Some(&predicate))?;
        debug!(
            "event=record_query module=records status=ok entity={} clauses={} rows={}",
            E::TYPE_NAME,
            describe_clauses(expr),
            records.len()
        );
        Ok(records)
    }

    /// Raw row count, soft-deleted rows included.
    pub fn count(&self) -> RepoResult<u64> {
        self.store.count::<E>()
    }

    pub fn child_relationships(&self, record: &E) -> Vec<ChildRelationship> {
        record.child_relationships()
    }

    fn persist(&self, record: &E) -> RepoResult<()> {
        self.write(|store| store.insert_or_update(record))
    }

    /// Runs one staged write and commits it, rolling back on failure.
    fn write<T>(&self, op: impl FnOnce(&S) -> RepoResult<T>) -> RepoResult<T> {
        let value = match op(&self.store) {
            Ok(value) => value,
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback() {
                    warn!(
                        "event=record_write module=records status=error entity={} rollback_error={}",
                        E::TYPE_NAME,
                        rollback_err
                    );
                }
                return Err(err);
            }
        };
        self.store.commit()?;
        Ok(value)
    }
}

fn not_found<E: Entity>() -> RepoError {
    RepoError::NotFound {
        entity: E::TYPE_NAME,
        message: not_found_message(E::TYPE_NAME),
    }
}

fn coerce_field<E: Entity>(name: &str, value: FieldValue) -> Result<FieldValue, FieldError> {
    for builtin in [ID_COLUMN, DELETED_COLUMN, DELETED_BY_COLUMN] {
        if name == builtin {
            return Err(FieldError::ReadOnly {
                entity: E::TYPE_NAME,
                field: builtin,
            });
        }
    }

    let spec = E::field_spec(name).ok_or_else(|| FieldError::UnknownField {
        entity: E::TYPE_NAME,
        field: name.to_string(),
    })?;
    value.coerce_for::<E>(spec)
}

/// `field:comparator` pairs; values are never logged.
fn describe_clauses(expr: &FilterExpr) -> String {
    expr.clauses()
        .iter()
        .map(|clause| format!("{}:{}", clause.field, clause.comparator))
        .collect::<Vec<_>>()
        .join("|")
}

mod common;

use common::{setup, UserProfile};
use recordops_core::{
    ChildRelationship, Datastore, Entity, FilterError, FilterExpr, FilterOptions, Predicate,
    Records, RepoError, RepoResult, RequestContext, SoftDeletable, SqliteDatastore,
};
use rusqlite::Connection;
use std::cell::Cell;

/// Wraps the SQLite store and counts every read it serves.
struct CountingStore<'conn> {
    inner: SqliteDatastore<'conn>,
    reads: Cell<usize>,
}

impl<'conn> CountingStore<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteDatastore::new(conn),
            reads: Cell::new(0),
        }
    }

    fn record_read(&self) {
        self.reads.set(self.reads.get() + 1);
    }
}

impl Datastore for CountingStore<'_> {
    fn insert_or_update<E: Entity + SoftDeletable>(&self, record: &E) -> RepoResult<()> {
        self.inner.insert_or_update(record)
    }

    fn soft_delete<E: Entity>(&self, id: &E::Id, deleted_by: Option<&str>) -> RepoResult<bool> {
        self.inner.soft_delete::<E>(id, deleted_by)
    }

    fn commit(&self) -> RepoResult<()> {
        self.inner.commit()
    }

    fn rollback(&self) -> RepoResult<()> {
        self.inner.rollback()
    }

    fn find_by_id<E: Entity>(&self, id: &E::Id) -> RepoResult<Option<E>> {
        self.record_read();
        self.inner.find_by_id(id)
    }

    fn find_all<E: Entity>(&self, predicate: Option<&Predicate>) -> RepoResult<Vec<E>> {
        self.record_read();
        self.inner.find_all(predicate)
    }

    fn count<E: Entity>(&self) -> RepoResult<u64> {
        self.record_read();
        self.inner.count::<E>()
    }

    fn exists(&self, relationship: &ChildRelationship) -> RepoResult<bool> {
        self.record_read();
        self.inner.exists(relationship)
    }
}

fn seed(users: &Records<UserProfile, SqliteDatastore<'_>>) {
    let mut people = vec![
        UserProfile::new(1, "Ada Lovelace", 36),
        UserProfile::new(2, "Grace Hopper", 85),
        UserProfile::new(3, "Alan Turing", 41),
        UserProfile::new(4, "Katherine Johnson", 30),
        UserProfile::new(5, "Edsger Dijkstra", 72),
    ];
    people[2].active = false;
    people[3].email = Some("kj@nasa.example".to_string());
    for person in people {
        users.save(person).unwrap();
    }

    let mut dijkstra = users.get_or_fail(&5).unwrap();
    users
        .delete(&mut dijkstra, &RequestContext::anonymous())
        .unwrap();
}

fn ids(records: &[UserProfile]) -> Vec<i64> {
    records.iter().map(|record| record.id).collect()
}

#[test]
fn gt_filter_returns_only_active_matches() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    let older = users.query(Some("age,gt,30")).unwrap();

    assert_eq!(ids(&older), vec![1, 2, 3]);
    assert!(older.iter().all(|user| user.age > 30 && !user.deleted));
}

#[test]
fn unknown_field_fails_before_any_datastore_read() {
    let conn = setup();
    let store = CountingStore::new(&conn);
    let users = Records::<UserProfile, _>::new(&store);

    let err = users.query(Some("unknownfield,eq,5")).unwrap_err();

    assert!(matches!(
        &err,
        RepoError::Filter(FilterError::UnknownField { field, .. }) if field == "unknownfield"
    ));
    assert!(err.to_string().contains("unknownfield"));
    assert_eq!(err.status_code(), 400);
    assert_eq!(store.reads.get(), 0);
}

#[test]
fn malformed_clauses_fail_before_any_datastore_read() {
    let conn = setup();
    let store = CountingStore::new(&conn);
    let users = Records::<UserProfile, _>::new(&store);

    for filter in ["age,gt", "age,between,3", "age,gt,old", "age,like,3", "2age,eq,1"] {
        let err = users.query(Some(filter)).unwrap_err();
        match err {
            RepoError::Filter(filter_err) => {
                assert_eq!(filter_err.clause(), Some(filter));
            }
            other => panic!("unexpected error for `{filter}`: {other}"),
        }
    }
    assert_eq!(store.reads.get(), 0);
}

#[test]
fn clauses_are_conjoined() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    let result = users.query(Some("age,ge,36;age,lt,85;active,eq,true")).unwrap();

    assert_eq!(ids(&result), vec![1]);
}

#[test]
fn like_is_case_insensitive_substring_by_default() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    let result = users.query(Some("name,like,HOPP")).unwrap();
    assert_eq!(ids(&result), vec![2]);

    let wildcard = users.query(Some("name,like,%")).unwrap();
    assert!(wildcard.is_empty());
}

#[test]
fn like_can_be_case_sensitive() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn)).with_filter_options(
        FilterOptions {
            case_sensitive_like: true,
        },
    );
    seed(&users);

    assert!(users.query(Some("name,like,HOPP")).unwrap().is_empty());
    assert_eq!(ids(&users.query(Some("name,like,Hopp")).unwrap()), vec![2]);
}

#[test]
fn explicit_deleted_filter_is_not_overridden() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    let deleted = users.query(Some("deleted,eq,true")).unwrap();
    assert_eq!(ids(&deleted), vec![5]);

    let everyone = users.query(Some("deleted,ge,0")).unwrap_err();
    assert!(matches!(
        everyone,
        RepoError::Filter(FilterError::UnsupportedComparator { .. })
    ));

    let with_old = users.query(Some("deleted,ne,true;age,gt,70")).unwrap();
    assert_eq!(ids(&with_old), vec![2]);
}

#[test]
fn blank_filter_returns_every_active_record() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    assert_eq!(ids(&users.query(Some("   ")).unwrap()), vec![1, 2, 3, 4]);
    assert_eq!(ids(&users.query(None).unwrap()), vec![1, 2, 3, 4]);
}

#[test]
fn text_fields_compare_lexicographically() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    let result = users.query(Some("name,ge,Grace")).unwrap();
    assert_eq!(ids(&result), vec![2, 4]);
}

#[test]
fn nullable_and_boolean_fields_are_filterable() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    assert_eq!(ids(&users.query(Some("active,eq,false")).unwrap()), vec![3]);
    assert_eq!(
        ids(&users.query(Some("email,eq,kj@nasa.example")).unwrap()),
        vec![4]
    );
}

#[test]
fn values_may_contain_commas() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    let mut person = UserProfile::new(1, "Hopper, Grace", 85);
    person.email = Some("grace@navy.example".to_string());
    users.save(person).unwrap();

    let result = users.query(Some("name,eq,Hopper, Grace")).unwrap();
    assert_eq!(ids(&result), vec![1]);
}

#[test]
fn query_expr_runs_a_preparsed_filter() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    let expr: FilterExpr = "id,le,2".parse().unwrap();
    assert_eq!(ids(&users.query_expr(&expr).unwrap()), vec![1, 2]);
}

#[test]
fn nullable_fields_compare_null_safely() {
    let conn = setup();
    let users = Records::<UserProfile, _>::new(SqliteDatastore::new(&conn));
    seed(&users);

    assert_eq!(
        ids(&users.query(Some("email,ne,kj@nasa.example")).unwrap()),
        vec![1, 2, 3]
    );
    assert_eq!(ids(&users.query(Some("email,eq,null")).unwrap()), vec![1, 2, 3]);
    assert_eq!(ids(&users.query(Some("email,ne,NULL")).unwrap()), vec![4]);
}

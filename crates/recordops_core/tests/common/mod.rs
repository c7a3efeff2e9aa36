#![allow(dead_code)]

use recordops_core::db::{open_db_in_memory, Migration};
use recordops_core::{
    read_soft_delete, ChildRelationship, Entity, FieldError, FieldSpec, FieldValue,
    HasChildRelationships, RecordKey, RepoResult, SoftDeletable,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use uuid::Uuid;

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE user_profiles (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            email TEXT UNIQUE,
            age INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            deleted INTEGER NOT NULL DEFAULT 0,
            deleted_by TEXT
        );",
    ),
    Migration::new(
        2,
        "CREATE TABLE projects (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0,
            deleted_by TEXT
        );
        CREATE TABLE tasks (
            id TEXT PRIMARY KEY NOT NULL,
            project_id TEXT NOT NULL REFERENCES projects(id),
            title TEXT NOT NULL,
            estimate_hours REAL NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0,
            deleted_by TEXT
        );
        CREATE TABLE milestones (
            id TEXT PRIMARY KEY NOT NULL,
            project_id TEXT NOT NULL REFERENCES projects(id),
            name TEXT NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0,
            deleted_by TEXT
        );",
    ),
];

pub fn setup() -> Connection {
    open_db_in_memory(MIGRATIONS).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
    pub active: bool,
    pub deleted: bool,
    pub deleted_by: Option<String>,
}

impl UserProfile {
    pub fn new(id: i64, name: &str, age: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: None,
            age,
            active: true,
            deleted: false,
            deleted_by: None,
        }
    }
}

const USER_PROFILE_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::text("email").nullable(),
    FieldSpec::integer("age"),
    FieldSpec::boolean("active"),
];

impl Entity for UserProfile {
    type Id = i64;
    const TYPE_NAME: &'static str = "UserProfile";
    const TABLE: &'static str = "user_profiles";

    fn fields() -> &'static [FieldSpec] {
        USER_PROFILE_FIELDS
    }

    fn id(&self) -> &i64 {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let (deleted, deleted_by) = read_soft_delete(row)?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            age: row.get("age")?,
            active: row.get("active")?,
            deleted,
            deleted_by,
        })
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::Text(self.name.clone())),
            ("email", self.email.clone().map_or(Value::Null, Value::Text)),
            ("age", Value::Integer(self.age)),
            ("active", Value::Integer(i64::from(self.active))),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError> {
        match (field, value) {
            ("name", FieldValue::Text(name)) => self.name = name,
            ("email", FieldValue::Text(email)) => self.email = Some(email),
            ("email", FieldValue::Null) => self.email = None,
            ("age", FieldValue::Integer(age)) => self.age = age,
            ("active", FieldValue::Bool(active)) => self.active = active,
            (field, value) => return Err(FieldError::rejected::<Self>(field, &value)),
        }
        Ok(())
    }
}

impl SoftDeletable for UserProfile {
    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn deleted_by(&self) -> Option<&str> {
        self.deleted_by.as_deref()
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn set_deleted_by(&mut self, name: String) {
        self.deleted_by = Some(name);
    }
}

impl HasChildRelationships for UserProfile {
    fn child_relationships(&self) -> Vec<ChildRelationship> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub deleted: bool,
    pub deleted_by: Option<String>,
}

impl Project {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            deleted: false,
            deleted_by: None,
        }
    }
}

const PROJECT_FIELDS: &[FieldSpec] = &[FieldSpec::text("title")];

impl Entity for Project {
    type Id = Uuid;
    const TYPE_NAME: &'static str = "Project";
    const TABLE: &'static str = "projects";

    fn fields() -> &'static [FieldSpec] {
        PROJECT_FIELDS
    }

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let (deleted, deleted_by) = read_soft_delete(row)?;
        Ok(Self {
            id: Uuid::read(row, "id")?,
            title: row.get("title")?,
            deleted,
            deleted_by,
        })
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![("title", Value::Text(self.title.clone()))]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError> {
        match (field, value) {
            ("title", FieldValue::Text(title)) => self.title = title,
            (field, value) => return Err(FieldError::rejected::<Self>(field, &value)),
        }
        Ok(())
    }
}

impl SoftDeletable for Project {
    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn deleted_by(&self) -> Option<&str> {
        self.deleted_by.as_deref()
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn set_deleted_by(&mut self, name: String) {
        self.deleted_by = Some(name);
    }
}

impl HasChildRelationships for Project {
    fn child_relationships(&self) -> Vec<ChildRelationship> {
        vec![
            ChildRelationship::of::<Task>("project_id", &self.id),
            ChildRelationship::of::<Milestone>("project_id", &self.id),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub estimate_hours: f64,
    pub deleted: bool,
    pub deleted_by: Option<String>,
}

impl Task {
    pub fn new(project: &Project, title: &str, estimate_hours: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project.id,
            title: title.to_string(),
            estimate_hours,
            deleted: false,
            deleted_by: None,
        }
    }
}

const TASK_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("project_id"),
    FieldSpec::text("title"),
    FieldSpec::real("estimate_hours"),
];

impl Entity for Task {
    type Id = Uuid;
    const TYPE_NAME: &'static str = "Task";
    const TABLE: &'static str = "tasks";

    fn fields() -> &'static [FieldSpec] {
        TASK_FIELDS
    }

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let (deleted, deleted_by) = read_soft_delete(row)?;
        Ok(Self {
            id: Uuid::read(row, "id")?,
            project_id: Uuid::read(row, "project_id")?,
            title: row.get("title")?,
            estimate_hours: row.get("estimate_hours")?,
            deleted,
            deleted_by,
        })
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("project_id", self.project_id.to_sql_value()),
            ("title", Value::Text(self.title.clone())),
            ("estimate_hours", Value::Real(self.estimate_hours)),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError> {
        match (field, value) {
            ("project_id", FieldValue::Text(text)) => match Uuid::parse_str(&text) {
                Ok(project_id) => self.project_id = project_id,
                Err(_) => {
                    return Err(FieldError::rejected::<Self>(field, &FieldValue::Text(text)))
                }
            },
            ("title", FieldValue::Text(title)) => self.title = title,
            ("estimate_hours", FieldValue::Real(hours)) => self.estimate_hours = hours,
            (field, value) => return Err(FieldError::rejected::<Self>(field, &value)),
        }
        Ok(())
    }
}

impl SoftDeletable for Task {
    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn deleted_by(&self) -> Option<&str> {
        self.deleted_by.as_deref()
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn set_deleted_by(&mut self, name: String) {
        self.deleted_by = Some(name);
    }
}

impl HasChildRelationships for Task {
    fn child_relationships(&self) -> Vec<ChildRelationship> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub deleted: bool,
    pub deleted_by: Option<String>,
}

impl Milestone {
    pub fn new(project: &Project, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project.id,
            name: name.to_string(),
            deleted: false,
            deleted_by: None,
        }
    }
}

const MILESTONE_FIELDS: &[FieldSpec] = &[FieldSpec::text("project_id"), FieldSpec::text("name")];

impl Entity for Milestone {
    type Id = Uuid;
    const TYPE_NAME: &'static str = "Milestone";
    const TABLE: &'static str = "milestones";

    fn fields() -> &'static [FieldSpec] {
        MILESTONE_FIELDS
    }

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let (deleted, deleted_by) = read_soft_delete(row)?;
        Ok(Self {
            id: Uuid::read(row, "id")?,
            project_id: Uuid::read(row, "project_id")?,
            name: row.get("name")?,
            deleted,
            deleted_by,
        })
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("project_id", self.project_id.to_sql_value()),
            ("name", Value::Text(self.name.clone())),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError> {
        match (field, value) {
            ("name", FieldValue::Text(name)) => self.name = name,
            (field, value) => return Err(FieldError::rejected::<Self>(field, &value)),
        }
        Ok(())
    }
}

impl SoftDeletable for Milestone {
    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn deleted_by(&self) -> Option<&str> {
        self.deleted_by.as_deref()
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn set_deleted_by(&mut self, name: String) {
        self.deleted_by = Some(name);
    }
}

impl HasChildRelationships for Milestone {
    fn child_relationships(&self) -> Vec<ChildRelationship> {
        Vec::new()
    }
}

//! Fixtures shared by the unit tests: a small `todo` registry, a seeded
//! database and a queue that records instead of running jobs.

use crate::app_state::AppState;
use crate::auth::User;
use crate::config::Config;
use crate::db;
use crate::massadmin::dispatcher::TaskQueue;
use crate::massadmin::records;
use crate::massadmin::registry::{ModelRegistry, QuerySet};
use crate::massadmin::request::{MultiMap, RequestContext};
use actix_web::http::Method;
use common::model::mass_edit::MassEditJob;
use rusqlite::Connection;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const REGISTRY: &str = r#"{ "models": [
    {
        "app_label": "todo", "model_name": "task", "verbose_name": "task",
        "table": "tasks", "primary_key": "id",
        "fields": [
            { "name": "id", "kind": "integer", "editable": false },
            { "name": "title", "kind": "text" },
            { "name": "status", "kind": "text", "unique": false },
            { "name": "priority", "kind": "integer" },
            { "name": "done", "kind": "boolean" },
            { "name": "code", "kind": "text", "nullable": true, "unique": true },
            { "name": "owner", "kind": "text", "nullable": true }
        ],
        "massadmin_exclude": ["title"]
    },
    {
        "app_label": "todo", "model_name": "note", "verbose_name": "note",
        "table": "notes",
        "fields": [
            { "name": "id", "kind": "integer", "editable": false },
            { "name": "body", "kind": "text" },
            { "name": "author", "kind": "text" }
        ],
        "massadmin_queryset": [ { "kind": "current_user", "field": "author" } ]
    }
] }"#;

const FIXTURES: &str = "
CREATE TABLE tasks (
    id       INTEGER PRIMARY KEY,
    title    TEXT NOT NULL,
    status   TEXT NOT NULL,
    priority INTEGER NOT NULL,
    done     INTEGER NOT NULL,
    code     TEXT UNIQUE,
    owner    TEXT
);
INSERT INTO tasks VALUES (1, 'Write docs', 'done', 3, 1, 'T-1', 'alice');
INSERT INTO tasks VALUES (2, 'Fix bug', 'new', 1, 0, NULL, NULL);
INSERT INTO tasks VALUES (3, 'Review', 'new', 2, 0, NULL, NULL);
INSERT INTO tasks VALUES (4, 'Deploy', 'new', 1, 0, 'T-4', NULL);

CREATE TABLE notes (
    id     INTEGER PRIMARY KEY,
    body   TEXT NOT NULL,
    author TEXT NOT NULL
);
INSERT INTO notes VALUES (1, 'mine', 'editor');
INSERT INTO notes VALUES (2, 'theirs', 'someone');

INSERT INTO users (username, is_active, is_staff, is_superuser) VALUES
    ('editor', 1, 1, 0),
    ('viewer', 1, 1, 0),
    ('root', 1, 1, 1),
    ('guest', 1, 0, 0);
INSERT INTO user_permissions (username, codename) VALUES
    ('editor', 'todo.change_task'),
    ('editor', 'todo.change_note'),
    ('guest', 'todo.change_task');
";

pub fn registry() -> ModelRegistry {
    ModelRegistry::from_json(REGISTRY).unwrap()
}

/// A fresh database file in its own temp dir. Keep the `TempDir` alive.
pub fn database() -> (TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = db::open(&database_path(&dir)).unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute_batch(FIXTURES).unwrap();
    (dir, conn)
}

pub fn database_path(dir: &TempDir) -> PathBuf {
    dir.path().join("db.sqlite")
}

/// One task as JSON.
pub fn row(conn: &Connection, id: i64) -> Value {
    let registry = registry();
    let admin = registry.get("todo", "task").unwrap();
    records::fetch(conn, &QuerySet::all(admin.model()), &id.to_string())
        .unwrap()
        .map(Value::Object)
        .unwrap_or(Value::Null)
}

/// Every task, in primary key order.
pub fn rows(conn: &Connection) -> Vec<Value> {
    let ids: Vec<i64> = conn
        .prepare("SELECT id FROM tasks ORDER BY id")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    ids.into_iter().map(|id| row(conn, id)).collect()
}

pub fn column(conn: &Connection, id: i64, field: &str) -> Value {
    row(conn, id).get(field).cloned().unwrap_or(Value::Null)
}

pub fn staff_user(username: &str) -> User {
    User {
        username: username.to_string(),
        is_active: true,
        is_staff: true,
        is_superuser: false,
        permissions: ["todo.change_task", "todo.change_note"]
            .into_iter()
            .map(String::from)
            .collect(),
    }
}

pub fn editor() -> User {
    staff_user("editor")
}

pub fn request_as(user: Option<User>) -> RequestContext {
    RequestContext {
        method: Method::GET,
        path: "/".to_string(),
        query: MultiMap::default(),
        post: MultiMap::default(),
        user,
        headers: Vec::new(),
        remote_addr: None,
    }
}

pub fn job(object_ids: &str, fields: &[&str], template: &str) -> MassEditJob {
    MassEditJob {
        job_id: "job-test".to_string(),
        object_ids: object_ids.to_string(),
        app_name: "todo".to_string(),
        model_name: "task".to_string(),
        mass_changes_fields: fields.iter().map(|f| f.to_string()).collect(),
        template_object_id: template.to_string(),
        request: Value::Null,
        snapshot: Value::Null,
    }
}

#[derive(Default)]
pub struct RecordingQueue(Mutex<Vec<MassEditJob>>);

impl RecordingQueue {
    pub fn jobs(&self) -> Vec<MassEditJob> {
        self.0.lock().unwrap().clone()
    }
}

impl TaskQueue for RecordingQueue {
    fn enqueue(&self, job: MassEditJob) {
        self.0.lock().unwrap().push(job);
    }
}

/// Handler state over the fixture database, with jobs captured by the returned queue.
pub fn app_state(dir: &TempDir) -> (AppState, Arc<RecordingQueue>) {
    let queue = Arc::new(RecordingQueue::default());
    let config = Config {
        database: database_path(dir),
        ..Config::default()
    };
    let state = AppState {
        config: Arc::new(config),
        registry: Arc::new(registry()),
        queue: queue.clone(),
    };
    (state, queue)
}

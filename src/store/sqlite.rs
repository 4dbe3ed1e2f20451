// src/store/sqlite.rs

//! [`Store`] on a SQLite database file.
//!
//! Schema:
//! - `workflows(workflow_id, client_id, status, created_at)`
//! - `tasks(seq, task_id, ..., depends_on_task_id, workflow_id, created_at)`;
//!   `seq` gives insertion order for the scheduling query
//! - `results(result_id, task_id, data, created_at)`, one row per task
//!
//! Ids and timestamps are stored as TEXT (UUID and RFC 3339). Every call runs
//! on the blocking pool against one shared connection. Cross-process
//! exclusivity comes from the conditional updates: a claim only succeeds
//! `WHERE status = 'queued'`, terminal writes only `WHERE status = 'running'`,
//! and a workflow status change only from an allowed predecessor. Multi-statement
//! writes take the write lock up front (`BEGIN IMMEDIATE`).

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;
use uuid::Uuid;

use crate::model::{LoadedTask, ResultRecord, Task, Workflow};
use crate::store::{Store, StoreError, StoreResult};
use crate::types::{TaskStatus, WorkflowStatus};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflows (
    workflow_id TEXT PRIMARY KEY,
    client_id   TEXT NOT NULL,
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    seq                INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id            TEXT NOT NULL UNIQUE,
    client_id          TEXT NOT NULL,
    geo_json           TEXT NOT NULL,
    status             TEXT NOT NULL,
    progress           TEXT,
    result_id          TEXT,
    task_type          TEXT NOT NULL,
    step_number        INTEGER NOT NULL,
    depends_on_task_id TEXT REFERENCES tasks(task_id),
    workflow_id        TEXT NOT NULL REFERENCES workflows(workflow_id),
    created_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
CREATE INDEX IF NOT EXISTS idx_tasks_workflow_step ON tasks(workflow_id, step_number);

CREATE TABLE IF NOT EXISTS results (
    result_id  TEXT PRIMARY KEY,
    task_id    TEXT NOT NULL UNIQUE REFERENCES tasks(task_id),
    data       TEXT,
    created_at TEXT NOT NULL
);
"#;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Task columns in the order [`task_from_row`] reads them.
const TASK_FIELDS: [&str; 11] = [
    "task_id",
    "client_id",
    "geo_json",
    "status",
    "progress",
    "result_id",
    "task_type",
    "step_number",
    "depends_on_task_id",
    "workflow_id",
    "created_at",
];

fn task_columns(alias: &str) -> String {
    TASK_FIELDS
        .iter()
        .map(|c| format!("{alias}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        // Other connections may hold the file while this one switches modes.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Message("sqlite connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await?
    }
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn status_col<S: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<S> {
    let s: String = row.get(idx)?;
    s.parse().map_err(|e: String| conversion_error(idx, e))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        task_id: uuid_col(row, 0)?,
        client_id: row.get(1)?,
        geo_json: row.get(2)?,
        status: status_col(row, 3)?,
        progress: row.get(4)?,
        result_id: opt_uuid_col(row, 5)?,
        task_type: row.get(6)?,
        step_number: row.get(7)?,
        depends_on: opt_uuid_col(row, 8)?,
        workflow_id: uuid_col(row, 9)?,
        created_at: time_col(row, 10)?,
    })
}

fn workflow_from_row(row: &Row<'_>) -> rusqlite::Result<Workflow> {
    Ok(Workflow {
        workflow_id: uuid_col(row, 0)?,
        client_id: row.get(1)?,
        status: status_col(row, 2)?,
        created_at: time_col(row, 3)?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<ResultRecord> {
    Ok(ResultRecord {
        result_id: uuid_col(row, 0)?,
        task_id: uuid_col(row, 1)?,
        data: row.get(2)?,
        created_at: time_col(row, 3)?,
    })
}

fn load_task(conn: &Connection, task_id: Uuid) -> StoreResult<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE task_id = ?1", task_columns(""));
    Ok(conn
        .query_row(&sql, params![task_id.to_string()], task_from_row)
        .optional()?)
}

/// Work out why a conditional task update matched no row.
fn explain_missed_update(conn: &Connection, task_id: Uuid, expected: TaskStatus) -> StoreError {
    match load_task(conn, task_id) {
        Ok(Some(task)) => StoreError::StatusConflict {
            task_id,
            expected,
            actual: task.status,
        },
        Ok(None) => StoreError::TaskNotFound(task_id),
        Err(e) => e,
    }
}

/// `UPDATE ... WHERE status = from RETURNING` for one task.
fn transition_task(
    conn: &Connection,
    task_id: Uuid,
    from: TaskStatus,
    to: TaskStatus,
    progress: Option<&str>,
    result_id: Option<Uuid>,
) -> StoreResult<Option<Task>> {
    let sql = format!(
        "UPDATE tasks SET status = ?1, progress = ?2, result_id = COALESCE(?3, result_id) \
         WHERE task_id = ?4 AND status = ?5 RETURNING {}",
        task_columns("")
    );
    Ok(conn
        .query_row(
            &sql,
            params![
                to.as_str(),
                progress,
                result_id.map(|id| id.to_string()),
                task_id.to_string(),
                from.as_str(),
            ],
            task_from_row,
        )
        .optional()?)
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_workflow(&self, client_id: &str) -> StoreResult<Workflow> {
        let workflow = Workflow::new(client_id);
        let row = workflow.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO workflows (workflow_id, client_id, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    row.workflow_id.to_string(),
                    row.client_id,
                    row.status.as_str(),
                    row.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(workflow)
    }

    async fn get_workflow(&self, workflow_id: Uuid) -> StoreResult<Option<Workflow>> {
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT workflow_id, client_id, status, created_at \
                     FROM workflows WHERE workflow_id = ?1",
                    params![workflow_id.to_string()],
                    workflow_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn advance_workflow_status(
        &self,
        workflow_id: Uuid,
        status: WorkflowStatus,
    ) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            let predecessors: Vec<String> = WorkflowStatus::ALL
                .iter()
                .filter(|from| from.can_transition_to(status))
                .map(|from| format!("'{}'", from.as_str()))
                .collect();
            if predecessors.is_empty() {
                return Ok(false);
            }

            // One conditional statement: no read-then-write window for
            // another connection to commit into.
            let sql = format!(
                "UPDATE workflows SET status = ?1 WHERE workflow_id = ?2 AND status IN ({})",
                predecessors.join(", ")
            );
            let changed = conn.execute(&sql, params![status.as_str(), workflow_id.to_string()])?;
            if changed > 0 {
                return Ok(true);
            }

            let exists = conn
                .prepare("SELECT 1 FROM workflows WHERE workflow_id = ?1")?
                .exists(params![workflow_id.to_string()])?;
            if exists {
                Ok(false)
            } else {
                Err(StoreError::WorkflowNotFound(workflow_id))
            }
        })
        .await
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        let tasks = tasks.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            {
                let mut exists = tx.prepare("SELECT 1 FROM workflows WHERE workflow_id = ?1")?;
                let mut insert = tx.prepare(&format!(
                    "INSERT INTO tasks ({}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    task_columns("")
                ))?;
                for task in &tasks {
                    if !exists.exists(params![task.workflow_id.to_string()])? {
                        return Err(StoreError::WorkflowNotFound(task.workflow_id));
                    }
                    insert.execute(params![
                        task.task_id.to_string(),
                        task.client_id,
                        task.geo_json,
                        task.status.as_str(),
                        task.progress,
                        task.result_id.map(|id| id.to_string()),
                        task.task_type,
                        task.step_number,
                        task.depends_on.map(|id| id.to_string()),
                        task.workflow_id.to_string(),
                        task.created_at.to_rfc3339(),
                    ])?;
                }
            }
            tx.commit()?;
            debug!(count = tasks.len(), "inserted tasks");
            Ok(())
        })
        .await
    }

    async fn save_task_dependencies(&self, links: &[(Uuid, Option<Uuid>)]) -> StoreResult<()> {
        let links = links.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            {
                let mut workflow_of =
                    tx.prepare("SELECT workflow_id FROM tasks WHERE task_id = ?1")?;
                let mut update =
                    tx.prepare("UPDATE tasks SET depends_on_task_id = ?1 WHERE task_id = ?2")?;

                for (task_id, depends_on) in links {
                    let owner: Option<String> = workflow_of
                        .query_row(params![task_id.to_string()], |row| row.get(0))
                        .optional()?;
                    let owner = owner.ok_or(StoreError::TaskNotFound(task_id))?;

                    if let Some(dep_id) = depends_on {
                        let dep_owner: Option<String> = workflow_of
                            .query_row(params![dep_id.to_string()], |row| row.get(0))
                            .optional()?;
                        if dep_owner.as_deref() != Some(owner.as_str()) {
                            return Err(StoreError::InvalidDependency {
                                task_id,
                                depends_on: dep_id,
                            });
                        }
                    }

                    update.execute(params![
                        depends_on.map(|id| id.to_string()),
                        task_id.to_string()
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<Task>> {
        self.with_conn(move |conn| load_task(conn, task_id)).await
    }

    async fn tasks_for_workflow(&self, workflow_id: Uuid) -> StoreResult<Vec<Task>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM tasks WHERE workflow_id = ?1 ORDER BY step_number ASC, seq ASC",
                task_columns("")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![workflow_id.to_string()], task_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn find_eligible(&self, limit: usize, exclude: &[Uuid]) -> StoreResult<Vec<LoadedTask>> {
        let exclude: HashSet<Uuid> = exclude.iter().copied().collect();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {}, w.client_id, w.status, w.created_at \
                 FROM tasks t \
                 JOIN workflows w ON w.workflow_id = t.workflow_id \
                 LEFT JOIN tasks d ON d.task_id = t.depends_on_task_id \
                 WHERE t.status = 'queued' \
                   AND (t.depends_on_task_id IS NULL OR d.status = 'completed') \
                 ORDER BY t.seq ASC \
                 LIMIT ?1",
                task_columns("t.")
            );
            // Over-fetch so excluded ids cannot crowd out eligible ones.
            let fetch = i64::try_from(limit.saturating_add(exclude.len())).unwrap_or(i64::MAX);

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![fetch], |row| {
                let task = task_from_row(row)?;
                let workflow = Workflow {
                    workflow_id: task.workflow_id,
                    client_id: row.get(11)?,
                    status: status_col(row, 12)?,
                    created_at: time_col(row, 13)?,
                };
                Ok(LoadedTask::new(task, workflow))
            })?;

            let mut found = Vec::new();
            for loaded in rows {
                let loaded = loaded?;
                if found.len() >= limit {
                    break;
                }
                if exclude.contains(&loaded.task_id()) {
                    continue;
                }
                found.push(loaded);
            }
            Ok(found)
        })
        .await
    }

    async fn claim_task(&self, task_id: Uuid) -> StoreResult<Option<Task>> {
        self.with_conn(move |conn| {
            let claimed = transition_task(
                conn,
                task_id,
                TaskStatus::Queued,
                TaskStatus::Running,
                None,
                None,
            )?;
            if claimed.is_none() && load_task(conn, task_id)?.is_none() {
                return Err(StoreError::TaskNotFound(task_id));
            }
            Ok(claimed)
        })
        .await
    }

    async fn complete_task(
        &self,
        task_id: Uuid,
        progress: Option<String>,
        result: ResultRecord,
    ) -> StoreResult<Task> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(task) = transition_task(
                &tx,
                task_id,
                TaskStatus::Running,
                TaskStatus::Completed,
                progress.as_deref(),
                Some(result.result_id),
            )?
            else {
                return Err(explain_missed_update(&tx, task_id, TaskStatus::Running));
            };
            tx.execute(
                "INSERT INTO results (result_id, task_id, data, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    result.result_id.to_string(),
                    task_id.to_string(),
                    result.data,
                    result.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(task)
        })
        .await
    }

    async fn fail_task(&self, task_id: Uuid) -> StoreResult<Task> {
        self.with_conn(move |conn| {
            transition_task(
                conn,
                task_id,
                TaskStatus::Running,
                TaskStatus::Failed,
                None,
                None,
            )?
            .ok_or_else(|| explain_missed_update(conn, task_id, TaskStatus::Running))
        })
        .await
    }

    async fn get_result_for_task(&self, task_id: Uuid) -> StoreResult<Option<ResultRecord>> {
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT result_id, task_id, data, created_at FROM results WHERE task_id = ?1",
                    params![task_id.to_string()],
                    result_from_row,
                )
                .optional()?)
        })
        .await
    }
}

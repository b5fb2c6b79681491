use chrono::NaiveDate;
use sked_core::dates;
use sked_core::{NewTask, RepeatRule, SearchQuery, Task, TaskId};
use tracing::{instrument, warn};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;
use crate::schema::CASEFOLD_FN;

const TABLE: &str = "scheduler";

/// Keyed task persistence. No business rules live behind this trait; callers
/// hand it validated values only.
pub trait TaskStore: Send + Sync {
    /// Insert a task and return its generated id.
    fn insert(&self, task: &NewTask) -> Result<TaskId, StoreError>;

    fn get(&self, id: TaskId) -> Result<Task, StoreError>;

    /// Replace every field of an existing task.
    fn update(&self, task: &Task) -> Result<(), StoreError>;

    fn delete(&self, id: TaskId) -> Result<(), StoreError>;

    /// Replace only the date of an existing task.
    fn update_date(&self, id: TaskId, date: NaiveDate) -> Result<(), StoreError>;

    /// Tasks ordered by date ascending, at most `limit` of them.
    fn list(&self, limit: u32) -> Result<Vec<Task>, StoreError>;

    /// Tasks matching `query`, ordered by date ascending, at most `limit`.
    fn search(&self, query: &SearchQuery, limit: u32) -> Result<Vec<Task>, StoreError>;
}

/// SQLite-backed [`TaskStore`].
pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl TaskStore for TaskRepo {
    #[instrument(skip(self, task), fields(date = %task.date))]
    fn insert(&self, task: &NewTask) -> Result<TaskId, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO scheduler (date, title, comment, repeat) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    dates::format_date(task.date),
                    task.title,
                    task.comment,
                    repeat_text(task.repeat),
                ],
            )?;
            Ok(TaskId::from_raw(conn.last_insert_rowid()))
        })
    }

    #[instrument(skip(self), fields(task_id = %id))]
    fn get(&self, id: TaskId) -> Result<Task, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, title, comment, repeat FROM scheduler WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.get()])?;
            match rows.next()? {
                Some(row) => row_to_task(row),
                None => Err(StoreError::NotFound(format!("task {id}"))),
            }
        })
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    fn update(&self, task: &Task) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE scheduler SET date = ?1, title = ?2, comment = ?3, repeat = ?4 WHERE id = ?5",
                rusqlite::params![
                    dates::format_date(task.date),
                    task.title,
                    task.comment,
                    repeat_text(task.repeat),
                    task.id.get(),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("task {}", task.id)));
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(task_id = %id))]
    fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM scheduler WHERE id = ?1", [id.get()])?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(task_id = %id, date = %date))]
    fn update_date(&self, id: TaskId, date: NaiveDate) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE scheduler SET date = ?1 WHERE id = ?2",
                rusqlite::params![dates::format_date(date), id.get()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn list(&self, limit: u32) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, title, comment, repeat FROM scheduler
                 ORDER BY date ASC, id ASC LIMIT ?1",
            )?;
            let mut rows = stmt.query([limit])?;
            collect_tasks(&mut rows)
        })
    }

    #[instrument(skip(self))]
    fn search(&self, query: &SearchQuery, limit: u32) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let (sql, needle) = match query {
                SearchQuery::Date(date) => (
                    "SELECT id, date, title, comment, repeat FROM scheduler
                     WHERE date = ?1
                     ORDER BY date ASC, id ASC LIMIT ?2"
                        .to_string(),
                    dates::format_date(*date),
                ),
                SearchQuery::Text(text) => (
                    format!(
                        "SELECT id, date, title, comment, repeat FROM scheduler
                         WHERE {CASEFOLD_FN}(title) LIKE ?1 ESCAPE '\\'
                            OR {CASEFOLD_FN}(comment) LIKE ?1 ESCAPE '\\'
                         ORDER BY date ASC, id ASC LIMIT ?2"
                    ),
                    format!("%{}%", row_helpers::escape_like(&text.to_lowercase())),
                ),
            };

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params![needle, limit])?;
            collect_tasks(&mut rows)
        })
    }
}

fn repeat_text(rule: Option<RepeatRule>) -> String {
    rule.map(|r| r.to_string()).unwrap_or_default()
}

/// Read every row, skipping rows that fail to decode so one bad record does
/// not hide the rest of a listing.
fn collect_tasks(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<Task>, StoreError> {
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        match row_to_task(row) {
            Ok(task) => results.push(task),
            Err(e @ StoreError::CorruptRow { .. }) => {
                let id: Option<i64> = row.get(0).ok();
                warn!(task_id = ?id, error = %e, "skipping corrupt task row");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(results)
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, StoreError> {
    let id: i64 = row_helpers::get(row, 0, TABLE, "id")?;
    let date: String = row_helpers::get(row, 1, TABLE, "date")?;
    let repeat: String = row_helpers::get(row, 4, TABLE, "repeat")?;

    let date = dates::parse_date(&date).map_err(|e| StoreError::CorruptRow {
        table: TABLE,
        column: "date",
        detail: e.to_string(),
    })?;
    let repeat = if repeat.is_empty() {
        None
    } else {
        Some(row_helpers::parse_column(&repeat, TABLE, "repeat")?)
    };

    Ok(Task {
        id: TaskId::from_raw(id),
        date,
        title: row_helpers::get(row, 2, TABLE, "title")?,
        comment: row_helpers::get(row, 3, TABLE, "comment")?,
        repeat,
    })
}

//! SQLite-based storage for tasks, habit templates and the focus log.
//!
//! Provides persistent storage for:
//! - Tasks and their accumulated focus time
//! - Habit templates and their last generation date
//! - Completed focus sessions
//! - Key-value store for application state (the saved timer session)

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result};
use crate::recurrence::{DayOfWeek, HabitTemplate, NewHabit, RepeatRule};
use crate::store::{FocusStats, TaskStore};
use crate::task::{FocusSession, NewFocusSession, NewTask, Task};

const TASK_COLUMNS: &str = "id, title, completed, time_spent_secs, estimated_secs, location, \
                            purpose, scheduled_at, habit_id, created_at";

const HABIT_COLUMNS: &str = "id, title, estimated_secs, location, purpose, repeat_type, \
                             repeat_day, scheduled_time, last_generated_date, created_at";

// === Helper Functions ===

/// Timestamps are stored in one fixed UTC format so that text comparison
/// orders them chronologically.
fn format_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => parse_ts(row, idx).map(Some),
    }
}

fn parse_opt_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_opt_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| NaiveTime::parse_from_str(&s, "%H:%M:%S").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Split a repeat rule into its `repeat_type` / `repeat_day` columns.
fn format_repeat(rule: &RepeatRule) -> (&'static str, Option<u8>) {
    match rule {
        RepeatRule::Daily => ("daily", None),
        RepeatRule::Weekly { day_of_week } => ("weekly", Some(day_of_week.number())),
    }
}

fn parse_repeat(row: &Row<'_>, type_idx: usize, day_idx: usize) -> rusqlite::Result<RepeatRule> {
    let kind: String = row.get(type_idx)?;
    match kind.as_str() {
        "daily" => Ok(RepeatRule::Daily),
        "weekly" => {
            let day: Option<u8> = row.get(day_idx)?;
            let day = day.ok_or_else(|| {
                conversion_error(
                    day_idx,
                    DatabaseError::Corrupt {
                        column: "repeat_day".into(),
                        message: "weekly habit without a day".into(),
                    },
                )
            })?;
            let day_of_week = DayOfWeek::new(day).map_err(|e| conversion_error(day_idx, e))?;
            Ok(RepeatRule::Weekly { day_of_week })
        }
        other => Err(conversion_error(
            type_idx,
            DatabaseError::Corrupt {
                column: "repeat_type".into(),
                message: format!("unknown repeat type '{other}'"),
            },
        )),
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        completed: row.get(2)?,
        time_spent_secs: row.get(3)?,
        estimated_secs: row.get(4)?,
        location: row.get(5)?,
        purpose: row.get(6)?,
        scheduled_at: parse_opt_ts(row, 7)?,
        habit_id: row.get(8)?,
        created_at: parse_ts(row, 9)?,
    })
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<HabitTemplate> {
    Ok(HabitTemplate {
        id: row.get(0)?,
        title: row.get(1)?,
        estimated_secs: row.get(2)?,
        location: row.get(3)?,
        purpose: row.get(4)?,
        repeat: parse_repeat(row, 5, 6)?,
        scheduled_time: parse_opt_time(row, 7)?,
        last_generated_date: parse_opt_date(row, 8)?,
        created_at: parse_ts(row, 9)?,
    })
}

fn not_found(kind: &'static str, id: &str) -> CoreError {
    CoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// SQLite database backing the [`TaskStore`] contract.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/flowlock.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("flowlock.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id              TEXT PRIMARY KEY,
                    title           TEXT NOT NULL,
                    completed       INTEGER NOT NULL DEFAULT 0,
                    time_spent_secs INTEGER NOT NULL DEFAULT 0,
                    estimated_secs  INTEGER NOT NULL DEFAULT 0,
                    location        TEXT,
                    purpose         TEXT,
                    scheduled_at    TEXT,
                    habit_id        TEXT,
                    created_at      TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS habits (
                    id                  TEXT PRIMARY KEY,
                    title               TEXT NOT NULL,
                    estimated_secs      INTEGER NOT NULL DEFAULT 0,
                    location            TEXT,
                    purpose             TEXT,
                    repeat_type         TEXT NOT NULL,
                    repeat_day          INTEGER,
                    scheduled_time      TEXT,
                    last_generated_date TEXT,
                    created_at          TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS focus_sessions (
                    id               TEXT PRIMARY KEY,
                    task_id          TEXT,
                    duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 1),
                    completed_at     TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_habit_id ON tasks(habit_id);
                CREATE INDEX IF NOT EXISTS idx_focus_sessions_completed_at ON focus_sessions(completed_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl TaskStore for Database {
    fn create_task(&self, task: &NewTask) -> Result<Task> {
        let created = Task {
            id: Uuid::new_v4().to_string(),
            title: task.title.clone(),
            completed: false,
            time_spent_secs: 0,
            estimated_secs: task.estimated_secs,
            location: task.location.clone(),
            purpose: task.purpose.clone(),
            scheduled_at: task.scheduled_at,
            habit_id: task.habit_id.clone(),
            created_at: Utc::now(),
        };
        self.conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                created.id,
                created.title,
                created.completed,
                created.time_spent_secs,
                created.estimated_secs,
                created.location,
                created.purpose,
                created.scheduled_at.as_ref().map(format_ts),
                created.habit_id,
                format_ts(&created.created_at),
            ],
        )?;
        Ok(created)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY rowid"))?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?2, estimated_secs = ?3, location = ?4, purpose = ?5, scheduled_at = ?6
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.estimated_secs,
                task.location,
                task.purpose,
                task.scheduled_at.as_ref().map(format_ts),
            ],
        )?;
        if changed == 0 {
            return Err(not_found("task", &task.id));
        }
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn set_completed(&self, id: &str, completed: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = ?2 WHERE id = ?1",
            params![id, completed],
        )?;
        if changed == 0 {
            return Err(not_found("task", id));
        }
        Ok(())
    }

    fn add_time_spent(&self, id: &str, secs: u64) -> Result<u64> {
        let total = self
            .conn
            .query_row(
                "UPDATE tasks SET time_spent_secs = time_spent_secs + ?2
                 WHERE id = ?1
                 RETURNING time_spent_secs",
                params![id, secs],
                |row| row.get::<_, u64>(0),
            )
            .optional()?;
        total.ok_or_else(|| not_found("task", id))
    }

    fn delete_completed(&self) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM tasks WHERE completed = 1", [])?)
    }

    fn create_habit(&self, habit: &NewHabit) -> Result<HabitTemplate> {
        let created = HabitTemplate {
            id: Uuid::new_v4().to_string(),
            title: habit.title.clone(),
            estimated_secs: habit.estimated_secs,
            location: habit.location.clone(),
            purpose: habit.purpose.clone(),
            repeat: habit.repeat,
            scheduled_time: habit.scheduled_time,
            last_generated_date: habit.last_generated_date,
            created_at: Utc::now(),
        };
        let (repeat_type, repeat_day) = format_repeat(&created.repeat);
        self.conn.execute(
            &format!("INSERT INTO habits ({HABIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                created.id,
                created.title,
                created.estimated_secs,
                created.location,
                created.purpose,
                repeat_type,
                repeat_day,
                created.scheduled_time.map(|t| t.format("%H:%M:%S").to_string()),
                created.last_generated_date.map(|d| d.format("%Y-%m-%d").to_string()),
                format_ts(&created.created_at),
            ],
        )?;
        Ok(created)
    }

    fn list_habits(&self) -> Result<Vec<HabitTemplate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {HABIT_COLUMNS} FROM habits ORDER BY rowid"))?;
        let habits = stmt
            .query_map([], habit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(habits)
    }

    fn delete_habit(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn set_last_generated(&self, habit_id: &str, date: NaiveDate) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE habits
             SET last_generated_date = MAX(COALESCE(last_generated_date, ?2), ?2)
             WHERE id = ?1",
            params![habit_id, date.format("%Y-%m-%d").to_string()],
        )?;
        if changed == 0 {
            return Err(not_found("habit", habit_id));
        }
        Ok(())
    }

    fn log_focus_session(&self, session: &NewFocusSession) -> Result<FocusSession> {
        let logged = FocusSession {
            id: Uuid::new_v4().to_string(),
            task_id: session.task_id.clone(),
            duration_minutes: session.duration_minutes,
            completed_at: session.completed_at,
        };
        self.conn.execute(
            "INSERT INTO focus_sessions (id, task_id, duration_minutes, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                logged.id,
                logged.task_id,
                logged.duration_minutes,
                format_ts(&logged.completed_at),
            ],
        )?;
        Ok(logged)
    }

    fn focus_stats(&self, since: Option<DateTime<Utc>>) -> Result<FocusStats> {
        let since = since
            .as_ref()
            .map(format_ts)
            .unwrap_or_default();
        let (sessions, focus_minutes) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0)
             FROM focus_sessions
             WHERE completed_at >= ?1",
            params![since],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        let (completed_tasks, open_tasks) = self.conn.query_row(
            "SELECT COALESCE(SUM(completed = 1), 0), COALESCE(SUM(completed = 0), 0) FROM tasks",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        Ok(FocusStats {
            sessions,
            focus_minutes,
            completed_tasks,
            open_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn create_and_read_task() {
        let db = Database::open_memory().unwrap();
        let new = NewTask::new("Write", 1500)
            .with_location(Some("Library".into()))
            .with_scheduled_at(Some(Utc::now()));
        let created = db.create_task(&new).unwrap();
        let fetched = db.get_task(&created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Write");
        assert_eq!(fetched.location.as_deref(), Some("Library"));
        assert!(!fetched.completed);
        assert_eq!(fetched.time_spent_secs, 0);
        assert!(fetched.scheduled_at.is_some());
        assert!(db.get_task("missing").unwrap().is_none());
    }

    #[test]
    fn list_keeps_insertion_order() {
        let db = Database::open_memory().unwrap();
        for title in ["a", "b", "c"] {
            db.create_task(&NewTask::new(title, 0)).unwrap();
        }
        let titles: Vec<_> = db.list_tasks().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[test]
    fn time_spent_accumulates() {
        let db = Database::open_memory().unwrap();
        let task = db.create_task(&NewTask::new("t", 600)).unwrap();
        assert_eq!(db.add_time_spent(&task.id, 120).unwrap(), 120);
        assert_eq!(db.add_time_spent(&task.id, 30).unwrap(), 150);
        assert!(matches!(
            db.add_time_spent("missing", 1),
            Err(CoreError::NotFound { kind: "task", .. })
        ));
    }

    #[test]
    fn completed_tasks_are_cleared_by_delete_completed() {
        let db = Database::open_memory().unwrap();
        let done = db.create_task(&NewTask::new("done", 0)).unwrap();
        db.create_task(&NewTask::new("open", 0)).unwrap();
        db.set_completed(&done.id, true).unwrap();
        assert_eq!(db.delete_completed().unwrap(), 1);
        assert_eq!(db.list_tasks().unwrap().len(), 1);
    }

    #[test]
    fn habit_round_trip() {
        let db = Database::open_memory().unwrap();
        let habit = NewHabit {
            title: "Stretch".into(),
            estimated_secs: 600,
            location: None,
            purpose: Some("back".into()),
            repeat: RepeatRule::Weekly {
                day_of_week: DayOfWeek::new(2).unwrap(),
            },
            scheduled_time: NaiveTime::from_hms_opt(7, 15, 0),
            last_generated_date: None,
        };
        let created = db.create_habit(&habit).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        db.set_last_generated(&created.id, date).unwrap();

        let listed = db.list_habits().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].repeat, habit.repeat);
        assert_eq!(listed[0].scheduled_time, habit.scheduled_time);
        assert_eq!(listed[0].last_generated_date, Some(date));

        let earlier = NaiveDate::from_ymd_opt(2023, 12, 26).unwrap();
        db.set_last_generated(&created.id, earlier).unwrap();
        assert_eq!(db.list_habits().unwrap()[0].last_generated_date, Some(date));

        assert!(db.delete_habit(&created.id).unwrap());
        assert!(!db.delete_habit(&created.id).unwrap());
        assert!(db.set_last_generated(&created.id, date).is_err());
    }

    #[test]
    fn focus_stats_filters_by_time() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        for (minutes, at) in [(25, now - Duration::days(2)), (10, now), (5, now)] {
            db.log_focus_session(&NewFocusSession {
                task_id: None,
                duration_minutes: minutes,
                completed_at: at,
            })
            .unwrap();
        }
        let all = db.focus_stats(None).unwrap();
        assert_eq!(all.sessions, 3);
        assert_eq!(all.focus_minutes, 40);

        let recent = db.focus_stats(Some(now - Duration::hours(1))).unwrap();
        assert_eq!(recent.sessions, 2);
        assert_eq!(recent.focus_minutes, 15);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::Cell;

use chrono::{DateTime, NaiveDate};
use flowlock_core::error::{CoreError, DatabaseError, Result};
use flowlock_core::{
    Database, FocusSession, FocusStats, HabitTemplate, NewFocusSession, NewHabit, NewTask, Task,
    TaskStore,
};

/// A real in-memory database with switchable write failures.
pub struct FlakyStore {
    pub inner: Database,
    pub fail_set_completed: Cell<bool>,
    pub fail_add_time_spent: Cell<bool>,
    pub fail_focus_log: Cell<bool>,
    pub fail_set_last_generated: Cell<bool>,
    /// Fail `create_task` for tasks with this title.
    pub fail_create_title: Option<String>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: Database::open_memory().unwrap(),
            fail_set_completed: Cell::new(false),
            fail_add_time_spent: Cell::new(false),
            fail_focus_log: Cell::new(false),
            fail_set_last_generated: Cell::new(false),
            fail_create_title: None,
        }
    }
}

fn injected(what: &str) -> CoreError {
    CoreError::Database(DatabaseError::QueryFailed(format!("injected failure: {what}")))
}

impl TaskStore for FlakyStore {
    fn create_task(&self, task: &NewTask) -> Result<Task> {
        if self.fail_create_title.as_deref() == Some(task.title.as_str()) {
            return Err(injected("create_task"));
        }
        self.inner.create_task(task)
    }
    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.inner.get_task(id)
    }
    fn list_tasks(&self) -> Result<Vec<Task>> {
        self.inner.list_tasks()
    }
    fn update_task(&self, task: &Task) -> Result<()> {
        self.inner.update_task(task)
    }
    fn delete_task(&self, id: &str) -> Result<bool> {
        self.inner.delete_task(id)
    }
    fn set_completed(&self, id: &str, completed: bool) -> Result<()> {
        if self.fail_set_completed.get() {
            return Err(injected("set_completed"));
        }
        self.inner.set_completed(id, completed)
    }
    fn add_time_spent(&self, id: &str, secs: u64) -> Result<u64> {
        if self.fail_add_time_spent.get() {
            return Err(injected("add_time_spent"));
        }
        self.inner.add_time_spent(id, secs)
    }
    fn delete_completed(&self) -> Result<usize> {
        self.inner.delete_completed()
    }
    fn create_habit(&self, habit: &NewHabit) -> Result<HabitTemplate> {
        self.inner.create_habit(habit)
    }
    fn list_habits(&self) -> Result<Vec<HabitTemplate>> {
        self.inner.list_habits()
    }
    fn delete_habit(&self, id: &str) -> Result<bool> {
        self.inner.delete_habit(id)
    }
    fn set_last_generated(&self, habit_id: &str, date: NaiveDate) -> Result<()> {
        if self.fail_set_last_generated.get() {
            return Err(injected("set_last_generated"));
        }
        self.inner.set_last_generated(habit_id, date)
    }
    fn log_focus_session(&self, session: &NewFocusSession) -> Result<FocusSession> {
        if self.fail_focus_log.get() {
            return Err(injected("log_focus_session"));
        }
        self.inner.log_focus_session(session)
    }
    fn focus_stats(&self, since: Option<DateTime<chrono::Utc>>) -> Result<FocusStats> {
        self.inner.focus_stats(since)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

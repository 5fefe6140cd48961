//! Persistence contract consumed by the shell.
//!
//! Every method is a single independent write or read; there are no
//! multi-record transactions. The countdown engine and the expander never
//! call a store themselves.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::recurrence::{HabitTemplate, NewHabit};
use crate::task::{FocusSession, NewFocusSession, NewTask, Task};

/// Aggregated focus-log figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FocusStats {
    pub sessions: u64,
    pub focus_minutes: u64,
    pub completed_tasks: u64,
    pub open_tasks: u64,
}

pub trait TaskStore {
    // Tasks
    fn create_task(&self, task: &NewTask) -> Result<Task>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    /// All tasks in creation order.
    fn list_tasks(&self) -> Result<Vec<Task>>;
    /// Overwrite title, estimate and optional fields of an existing task.
    fn update_task(&self, task: &Task) -> Result<()>;
    fn delete_task(&self, id: &str) -> Result<bool>;
    fn set_completed(&self, id: &str, completed: bool) -> Result<()>;
    /// Add to `time_spent_secs`, returning the new total.
    fn add_time_spent(&self, id: &str, secs: u64) -> Result<u64>;
    /// Remove completed tasks, returning how many were deleted.
    fn delete_completed(&self) -> Result<usize>;

    // Habit templates
    fn create_habit(&self, habit: &NewHabit) -> Result<HabitTemplate>;
    fn list_habits(&self) -> Result<Vec<HabitTemplate>>;
    fn delete_habit(&self, id: &str) -> Result<bool>;
    /// Never moves the date backwards, so backfilling an earlier day cannot
    /// make today eligible again.
    fn set_last_generated(&self, habit_id: &str, date: NaiveDate) -> Result<()>;

    // Focus log
    fn log_focus_session(&self, session: &NewFocusSession) -> Result<FocusSession>;
    /// Focus figures for sessions completed at or after `since` (all time if `None`).
    fn focus_stats(&self, since: Option<DateTime<Utc>>) -> Result<FocusStats>;
}

//! # Flowlock Core Library
//!
//! Business logic for the Flowlock focus timer. Everything here is usable
//! from any shell; the bundled CLI is one such shell.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: A deadline-based state machine that requires the
//!   caller to periodically invoke `tick()`; missed ticks never skew it
//! - **Recurrence**: Pure expansion of habit templates into today's tasks
//! - **Shell**: Write-through of completions and daily expansion against a
//!   [`TaskStore`]
//! - **Storage**: SQLite task store and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Core timer state machine
//! - [`RecurrenceExpander`]: Habit template expansion
//! - [`Database`]: SQLite implementation of [`TaskStore`]
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod recurrence;
pub mod shell;
pub mod storage;
pub mod store;
pub mod task;
pub mod time;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{Completion, CompletionReason, Event, TimerView};
pub use recurrence::{DayOfWeek, Expansion, GeneratedMark, HabitTemplate, NewHabit, RecurrenceExpander, RepeatRule};
pub use storage::{Config, Database};
pub use store::{FocusStats, TaskStore};
pub use task::{FocusSession, NewFocusSession, NewTask, Task, TaskPatch};
pub use timer::{
    BreakActivity, CountdownEngine, Discarded, SessionId, SessionKind, TimerSession, TimerStatus,
};

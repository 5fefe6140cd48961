//! Events emitted by the countdown engine.
//!
//! Every command returns at most one [`Event`]; the shell prints it and
//! writes [`Completion`]s through to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{BreakActivity, SessionId, SessionKind, TimerStatus};

/// Every state change of the countdown produces an Event.
/// The shell renders them and persists completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        session_id: SessionId,
        task_id: String,
        estimated_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        session_id: SessionId,
        task_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        session_id: SessionId,
        task_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        session_id: SessionId,
        task_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Emitted at most once per session.
    Completed(Completion),
    BreakStarted {
        session_id: SessionId,
        activity: Option<BreakActivity>,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// The break ran out, or was skipped. At most once per break.
    BreakEnded {
        session_id: SessionId,
        skipped: bool,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot(TimerView),
}

impl Event {
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            Event::Completed(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The countdown reached zero.
    Expired,
    /// The user finished before (or without) the countdown.
    MarkedDone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub session_id: SessionId,
    pub task_id: String,
    pub elapsed_secs: u64,
    pub reason: CompletionReason,
    pub at: DateTime<Utc>,
}

/// What the rendering layer needs on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerView {
    pub status: TimerStatus,
    #[serde(default)]
    pub kind: SessionKind,
    #[serde(default)]
    pub activity: Option<BreakActivity>,
    pub session_id: SessionId,
    pub active_task_id: Option<String>,
    pub estimated_secs: u64,
    pub remaining_secs: u64,
    pub elapsed_secs: u64,
    pub at: DateTime<Utc>,
}
